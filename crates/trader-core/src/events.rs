//! 동기 이벤트 버스.
//!
//! 스케줄러가 생명주기 이벤트를 발행하면 등록된 리스너가 등록 순서대로
//! 호출됩니다. 리스너가 `Ok(true)`를 반환하면 이후 리스너로 전파되지 않고,
//! 에러를 반환하면 발행이 중단되고 에러가 호출자에게 전파됩니다.

use crate::domain::BarDict;
use crate::error::{TraderError, TraderResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};

/// 생명주기 이벤트 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// 시스템 초기화 완료
    PostSystemInit,
    /// 사용자 `init` 완료
    PostUserInit,
    /// 장 시작 전
    BeforeTrading,
    /// 장 시작 전 처리 완료
    PostBeforeTrading,
    /// 새 바
    Bar,
    /// 바 처리 완료
    PostBar,
    /// 장 마감 후
    AfterTrading,
    /// 장 마감 후 처리 완료
    PostAfterTrading,
    /// 일일 정산
    Settlement,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PostSystemInit => "post_system_init",
            EventType::PostUserInit => "post_user_init",
            EventType::BeforeTrading => "before_trading",
            EventType::PostBeforeTrading => "post_before_trading",
            EventType::Bar => "bar",
            EventType::PostBar => "post_bar",
            EventType::AfterTrading => "after_trading",
            EventType::PostAfterTrading => "post_after_trading",
            EventType::Settlement => "settlement",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 버스로 발행되는 이벤트.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    /// `Bar` 이벤트의 바 데이터
    pub bar: Option<Arc<BarDict>>,
}

impl Event {
    /// 페이로드 없는 이벤트.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            bar: None,
        }
    }

    /// `Bar` 이벤트.
    pub fn bar(bar: Arc<BarDict>) -> Self {
        Self {
            event_type: EventType::Bar,
            bar: Some(bar),
        }
    }

    /// 바 데이터를 반환합니다. 없으면 [`TraderError::Event`].
    pub fn require_bar(&self) -> TraderResult<Arc<BarDict>> {
        self.bar.clone().ok_or_else(|| {
            TraderError::Event(format!("{} 이벤트에 바 데이터가 없음", self.event_type))
        })
    }
}

/// 이벤트 리스너. `Ok(true)`를 반환하면 전파를 멈춥니다.
pub type Listener = Arc<dyn Fn(&Event) -> TraderResult<bool> + Send + Sync>;

/// 이벤트 종류별 리스너 테이블.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<EventType, Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 리스너를 맨 뒤에 등록합니다.
    pub fn add_listener<F>(&self, event_type: EventType, listener: F)
    where
        F: Fn(&Event) -> TraderResult<bool> + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        listeners
            .entry(event_type)
            .or_default()
            .push(Arc::new(listener));

        debug!(event = %event_type, "Listener added");
    }

    /// 리스너를 맨 앞에 등록합니다.
    pub fn prepend_listener<F>(&self, event_type: EventType, listener: F)
    where
        F: Fn(&Event) -> TraderResult<bool> + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        listeners
            .entry(event_type)
            .or_default()
            .insert(0, Arc::new(listener));

        debug!(event = %event_type, "Listener prepended");
    }

    /// 등록된 리스너 수.
    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    /// 이벤트를 발행합니다.
    ///
    /// 호출 시점의 리스너 목록을 복사한 뒤 락 없이 호출하므로, 리스너 안에서
    /// 다른 이벤트를 발행하거나 리스너를 추가해도 됩니다.
    pub fn publish_event(&self, event: &Event) -> TraderResult<()> {
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        trace!(event = %event.event_type, listeners = snapshot.len(), "Publishing event");

        for listener in snapshot {
            if listener(event)? {
                debug!(event = %event.event_type, "Event propagation stopped");
                break;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<EventType, usize> =
            listeners.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus")
            .field("listeners", &counts)
            .finish()
    }
}
