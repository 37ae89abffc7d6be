//! tracing을 사용한 로깅 인프라.
//!
//! 두 종류의 로그를 다룹니다:
//! - **시스템 로그**: 런타임 내부 동작. `tracing` 매크로로 직접 기록합니다.
//! - **사용자 로그**: 전략 작성자에게 보여주는 메시지 (deprecated 경고 등).
//!   [`UserLog`] trait을 통해 기록되며, 기본 구현은 `user_log` target으로 전달합니다.
//!
//! 출력 형식:
//! - **pretty**: 개발용 사람이 읽기 쉬운 형식
//! - **json**: 운영환경/로그 집계용 JSON 형식
//! - **compact**: 로그 크기를 줄이기 위한 간결한 형식

use std::sync::{Mutex, PoisonError};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// 사용자 로그의 tracing target.
pub const USER_LOG_TARGET: &str = "user_log";

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 색상이 포함된 사람이 읽기 쉬운 형식 (개발용)
    #[default]
    Pretty,
    /// 로그 집계용 JSON 형식 (운영용)
    Json,
    /// 간결한 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 로그 레벨 필터 (예: "info", "debug", "trader_strategy=debug")
    pub level: String,
    /// 출력 형식
    pub format: LogFormat,
    /// span 이벤트 포함 여부 (진입/종료)
    pub with_span_events: bool,
    /// 파일명과 줄 번호 포함 여부
    pub with_file: bool,
    /// 스레드 ID 포함 여부
    pub with_thread_ids: bool,
    /// 대상(모듈 경로) 포함 여부
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_span_events: false,
            with_file: true,
            with_thread_ids: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    /// 새 로그 설정을 생성합니다.
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// 로그 형식을 설정합니다.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// span 이벤트를 활성화합니다. 생명주기 단계 span의 진입/종료가 기록됩니다.
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// 환경 변수에서 설정을 생성합니다.
    pub fn from_env() -> Self {
        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let format = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Self {
            level,
            format,
            ..Default::default()
        }
    }
}

/// 주어진 설정으로 로깅 시스템을 초기화합니다.
///
/// # 예제
///
/// ```no_run
/// use trader_core::logging::{init_logging, LogConfig, LogFormat};
///
/// let config = LogConfig::new("trader_strategy=debug,user_log=warn")
///     .with_format(LogFormat::Compact);
/// init_logging(config).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .with_thread_ids(config.with_thread_ids)
        .with_target(config.with_target)
        .with_span_events(span_events);

    match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(base.pretty())
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(base.json())
            .try_init()?,
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(base.compact())
            .try_init()?,
    }

    tracing::info!(
        format = ?config.format,
        level = %config.level,
        "Logging initialized"
    );

    Ok(())
}

/// 환경 변수에서 로깅을 초기화합니다.
///
/// 레벨에는 `RUST_LOG`를, 형식에는 `LOG_FORMAT`을 사용합니다.
pub fn init_logging_from_env() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LogConfig::from_env())
}

/// 전략 작성자에게 보여주는 로그.
pub trait UserLog: Send + Sync {
    /// 경고 메시지를 기록합니다. 실패해도 호출자에게 알리지 않습니다.
    fn warn(&self, message: &str);
}

/// `user_log` target으로 tracing 이벤트를 남기는 기본 사용자 로그.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUserLog {
    disabled: bool,
}

impl TracingUserLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 사용자 로그를 버리는 인스턴스.
    pub fn disabled() -> Self {
        Self { disabled: true }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

impl UserLog for TracingUserLog {
    fn warn(&self, message: &str) {
        if self.disabled {
            return;
        }
        tracing::warn!(target: USER_LOG_TARGET, "{}", message);
    }
}

/// 메시지를 메모리에 보관하는 사용자 로그 (UI 표시, 테스트용).
#[derive(Debug, Default)]
pub struct MemoryUserLog {
    warnings: Mutex<Vec<String>>,
}

impl MemoryUserLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 기록된 경고.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl UserLog for MemoryUserLog {
    fn warn(&self, message: &str) {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// 생명주기 단계 span을 생성하는 매크로.
#[macro_export]
macro_rules! lifecycle_span {
    ($phase:expr) => {
        tracing::debug_span!("lifecycle", phase = %$phase)
    };
    ($phase:expr, $hook:expr) => {
        tracing::debug_span!("lifecycle", phase = %$phase, hook = %$hook)
    };
}
