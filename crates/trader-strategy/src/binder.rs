//! 생명주기 콜백을 이벤트 버스에 연결합니다.
//!
//! 존재하는 콜백만 구독하며, 전략 생성 시 한 번만 수행됩니다. 리스너는 전략을
//! 약한 참조로 들고 있어 전략이 drop된 뒤에는 아무 일도 하지 않습니다.
//! `init`은 버스에 연결되지 않고 오케스트레이터가 직접 호출합니다.

use crate::scope::HookName;
use crate::strategy::Strategy;
use std::sync::{Arc, Weak};
use trader_core::{Event, EventBus, EventType, TraderResult};
use tracing::debug;

/// 전략의 생명주기 메서드를 버스 토픽에 연결합니다.
pub struct EventBinder;

impl EventBinder {
    /// 연결된 이벤트 종류를 등록 순서대로 반환합니다.
    pub fn bind<C: Send + 'static>(bus: &EventBus, strategy: &Arc<Strategy<C>>) -> Vec<EventType> {
        let mut bound = Vec::new();

        if strategy.has_hook(HookName::BeforeTrading) {
            Self::listen(bus, EventType::BeforeTrading, strategy, |s, _| s.before_trading());
            bound.push(EventType::BeforeTrading);
        }

        if strategy.has_hook(HookName::HandleBar) {
            Self::listen(bus, EventType::Bar, strategy, |s, event| {
                let bar = event.require_bar()?;
                s.handle_bar(bar)
            });
            bound.push(EventType::Bar);
        }

        if strategy.has_hook(HookName::AfterTrading) {
            Self::listen(bus, EventType::AfterTrading, strategy, |s, _| s.after_trading());
            bound.push(EventType::AfterTrading);
        }

        debug!(events = ?bound, "Strategy bound to event bus");
        bound
    }

    fn listen<C, F>(bus: &EventBus, event_type: EventType, strategy: &Arc<Strategy<C>>, call: F)
    where
        C: Send + 'static,
        F: Fn(&Strategy<C>, &Event) -> TraderResult<()> + Send + Sync + 'static,
    {
        let weak: Weak<Strategy<C>> = Arc::downgrade(strategy);
        bus.add_listener(event_type, move |event| {
            if let Some(strategy) = weak.upgrade() {
                call(&strategy, event)?;
            }
            Ok(false)
        });
    }
}
