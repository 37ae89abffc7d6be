//! # Trader Core
//!
//! 전략 생명주기 런타임이 공유하는 핵심 타입을 제공합니다:
//! - 생명주기 이벤트와 동기 이벤트 버스
//! - 스레드 로컬 실행 단계 추적
//! - 사용자 코드/런타임 에러 분류
//! - 바 데이터
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod execution_context;
pub mod logging;

pub use self::config::*;
pub use domain::*;
pub use error::*;
pub use events::*;
pub use execution_context::*;
pub use logging::*;
