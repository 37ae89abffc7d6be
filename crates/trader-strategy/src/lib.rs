//! 전략 생명주기 런타임.
//!
//! 이 크레이트가 제공하는 기능:
//! - 사용자 콜백 네임스페이스 ([`UserScope`])와 시그니처 정규화
//! - 존재하는 콜백만 이벤트 버스에 연결하는 바인더
//! - 실행 단계 스코프와 `USER_EXC` 에러 변환 경계
//! - 주입 가능한 실행 조건 ([`RunCondition`], [`HoldSwitch`])
//!
//! 주문, 포트폴리오, 스케줄링은 이 크레이트의 범위가 아닙니다.

mod binder;
mod executor;
mod guard;
mod scope;
mod strategy;

// 주요 타입 재내보내기
pub use binder::EventBinder;
pub use executor::run_phased;
pub use guard::{HoldSwitch, RunCondition};
pub use scope::{
    BarFn, BeforeTrading, CallbackRegistry, ContextFn, HookName, LegacyBeforeTradingFn, UserScope,
};
pub use strategy::{Strategy, StrategyBuilder};
