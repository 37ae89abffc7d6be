//! 설정 관리.
//!
//! 기본값 → TOML 파일 → `TRADER__` 접두사 환경 변수 순서로 덮어씁니다.
//! 예: `TRADER__STRATEGY__IS_HOLD=true`.

use crate::error::TraderResult;
use crate::logging::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 전략 런타임 설정
    #[serde(default)]
    pub strategy: StrategyConfig,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    /// [`LogConfig`]로 변환합니다. 알 수 없는 형식은 pretty로 처리합니다.
    pub fn to_log_config(&self) -> LogConfig {
        let format = self.format.parse().unwrap_or_else(|_| {
            tracing::warn!(format = %self.format, "Unknown log format, falling back to pretty");
            LogFormat::Pretty
        });
        LogConfig::new(self.level.clone()).with_format(format)
    }
}

/// 전략 런타임 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// 시작 시 전략 보유(hold) 상태. 보유 중에는 생명주기 콜백을 건너뜁니다.
    #[serde(default)]
    pub is_hold: bool,
    /// 사용자 로그 비활성화
    #[serde(default)]
    pub user_log_disabled: bool,
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> TraderResult<Self> {
        let config = Self::defaults()?
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("TRADER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> TraderResult<Self> {
        Self::load("config/default.toml")
    }

    /// TOML 문자열에서 설정을 로드합니다. 환경 변수는 반영하지 않습니다.
    pub fn from_toml_str(toml: &str) -> TraderResult<Self> {
        let config = Self::defaults()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    fn defaults() -> TraderResult<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("strategy.is_hold", false)?
            .set_default("strategy.user_log_disabled", false)?)
    }
}
