//! 전략 런타임의 에러 타입.
//!
//! 런타임 내부에서 발생한 에러와 사용자 콜백에서 발생한 에러를 구분합니다.
//! 사용자 코드의 에러는 [`TraderError::Tagged`]로 감싸져 [`ExcType::UserExc`]
//! 카테고리가 붙고, 원래 에러는 `source()`로 그대로 보존됩니다.

use crate::execution_context::ExecutionPhase;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 사용자 콜백이 반환하는 박싱된 에러.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 사용자 콜백의 반환 타입.
pub type UserResult = Result<(), BoxError>;

/// 에러 발생 출처 카테고리.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExcType {
    /// 사용자 전략 코드에서 발생
    UserExc,
    /// 런타임 자체에서 발생
    SystemExc,
    /// 아직 분류되지 않음
    NotSet,
}

impl fmt::Display for ExcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcType::UserExc => write!(f, "USER_EXC"),
            ExcType::SystemExc => write!(f, "SYSTEM_EXC"),
            ExcType::NotSet => write!(f, "NOTSET"),
        }
    }
}

/// 핵심 런타임 에러.
#[derive(Debug, Error)]
pub enum TraderError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 이벤트 버스 에러
    #[error("이벤트 에러: {0}")]
    Event(String),

    /// 현재 실행 단계에서 허용되지 않는 호출
    #[error("{api}은(는) {current} 단계에서 호출할 수 없음")]
    PhaseNotAllowed {
        api: String,
        current: ExecutionPhase,
    },

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),

    /// 카테고리가 붙은 에러. 원래 에러는 `source`에 보존됩니다.
    #[error("{exc_type} [{phase}]: {source}")]
    Tagged {
        exc_type: ExcType,
        phase: ExecutionPhase,
        #[source]
        source: BoxError,
    },
}

/// 런타임 작업을 위한 Result 타입.
pub type TraderResult<T> = Result<T, TraderError>;

impl TraderError {
    /// 사용자 코드 에러를 생성합니다.
    pub fn user(phase: ExecutionPhase, source: impl Into<BoxError>) -> Self {
        TraderError::Tagged {
            exc_type: ExcType::UserExc,
            phase,
            source: source.into(),
        }
    }

    /// 에러 카테고리를 반환합니다. 태그가 없는 에러는 모두 런타임 에러입니다.
    pub fn exc_type(&self) -> ExcType {
        match self {
            TraderError::Tagged { exc_type, .. } => *exc_type,
            _ => ExcType::SystemExc,
        }
    }

    /// 사용자 코드에서 발생한 에러인지 확인합니다.
    pub fn is_user_exc(&self) -> bool {
        self.exc_type() == ExcType::UserExc
    }

    /// 에러가 발생한 실행 단계 (태그된 에러만).
    pub fn phase(&self) -> Option<ExecutionPhase> {
        match self {
            TraderError::Tagged { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// 사용자 코드가 반환한 원래 에러.
    pub fn user_cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            TraderError::Tagged {
                exc_type: ExcType::UserExc,
                source,
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TraderError {
    fn from(err: serde_json::Error) -> Self {
        TraderError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for TraderError {
    fn from(err: config::ConfigError) -> Self {
        TraderError::Config(err.to_string())
    }
}

/// `thunk`에서 발생한 에러에 `exc_type` 카테고리를 붙입니다.
///
/// 이미 카테고리가 붙은 [`TraderError::Tagged`]는 다시 감싸지 않고 그대로
/// 전파합니다. 에러를 삼키는 경로는 없습니다.
pub fn translate_exc<T, E, F>(exc_type: ExcType, phase: ExecutionPhase, thunk: F) -> TraderResult<T>
where
    F: FnOnce() -> Result<T, E>,
    E: Into<BoxError>,
{
    thunk().map_err(|err| {
        let err: BoxError = err.into();
        match err.downcast::<TraderError>() {
            Ok(inner)
                if matches!(*inner, TraderError::Tagged { exc_type, .. } if exc_type != ExcType::NotSet) =>
            {
                *inner
            }
            Ok(inner) => TraderError::Tagged {
                exc_type,
                phase,
                source: inner,
            },
            Err(other) => TraderError::Tagged {
                exc_type,
                phase,
                source: other,
            },
        }
    })
}
