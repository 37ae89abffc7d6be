//! 생명주기 호출 실행 조건.
//!
//! 조건이 거부하면 호출은 아무 일도 하지 않고 정상 반환합니다. 에러가 아닙니다.

use std::sync::atomic::{AtomicBool, Ordering};
use trader_core::StrategyConfig;

/// 생명주기 호출을 실행할지 결정하는 조건.
pub trait RunCondition: Send + Sync {
    fn should_run(&self) -> bool;
}

impl<F> RunCondition for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn should_run(&self) -> bool {
        self()
    }
}

/// 전략 보유(hold) 스위치.
///
/// 보유 중이 아닐 때만 생명주기 콜백이 실행됩니다.
#[derive(Debug, Default)]
pub struct HoldSwitch {
    hold: AtomicBool,
}

impl HoldSwitch {
    pub fn new(is_hold: bool) -> Self {
        Self {
            hold: AtomicBool::new(is_hold),
        }
    }

    /// 설정의 `strategy.is_hold`로 초기화합니다.
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.is_hold)
    }

    pub fn is_hold(&self) -> bool {
        self.hold.load(Ordering::SeqCst)
    }

    pub fn set_hold(&self, is_hold: bool) {
        self.hold.store(is_hold, Ordering::SeqCst);
    }

    /// 보유 상태로 전환합니다.
    pub fn hold(&self) {
        self.set_hold(true);
    }

    /// 보유 상태를 해제합니다.
    pub fn release(&self) {
        self.set_hold(false);
    }
}

impl RunCondition for HoldSwitch {
    fn should_run(&self) -> bool {
        !self.is_hold()
    }
}
