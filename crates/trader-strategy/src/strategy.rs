//! 전략 생명주기 컨트롤러.
//!
//! 사용자 네임스페이스를 받아 콜백을 정규화하고, 존재하는 콜백을 이벤트 버스에
//! 연결한 뒤, 각 생명주기 호출을 실행 조건 → 단계 스코프 → 에러 변환 순서로
//! 실행합니다.
//!
//! # 예제
//!
//! ```
//! use std::sync::Arc;
//! use trader_core::{Event, EventBus, EventType};
//! use trader_strategy::{Strategy, UserScope};
//!
//! #[derive(Default)]
//! struct Context {
//!     days: u32,
//! }
//!
//! let bus = Arc::new(EventBus::new());
//! let scope = UserScope::new().before_trading(|ctx: &mut Context| {
//!     ctx.days += 1;
//!     Ok(())
//! });
//! let strategy = Strategy::new(bus.clone(), scope, Context::default());
//!
//! strategy.init().unwrap();
//! bus.publish_event(&Event::new(EventType::BeforeTrading)).unwrap();
//! assert_eq!(strategy.user_context().days, 1);
//! ```

use crate::binder::EventBinder;
use crate::executor::run_phased;
use crate::guard::{HoldSwitch, RunCondition};
use crate::scope::{CallbackRegistry, HookName, UserScope};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use trader_core::{
    BarDict, Event, EventBus, EventType, ExecutionPhase, StrategyConfig, TracingUserLog,
    TraderError, TraderResult, UserLog, UserResult,
};
use tracing::{debug, info};

/// 전략 생명주기 컨트롤러.
///
/// 생성 후에는 전체 실행 기간 동안 재사용됩니다. 호출은 외부 스케줄러가
/// 한 번에 하나씩 직렬화한다고 가정합니다.
pub struct Strategy<C> {
    event_bus: Arc<EventBus>,
    callbacks: CallbackRegistry<C>,
    user_context: Mutex<C>,
    current_universe: RwLock<HashSet<String>>,
    run_condition: Arc<dyn RunCondition>,
}

/// [`Strategy`] 빌더.
pub struct StrategyBuilder<C> {
    event_bus: Arc<EventBus>,
    scope: UserScope<C>,
    user_context: C,
    run_condition: Option<Arc<dyn RunCondition>>,
    user_log: Option<Arc<dyn UserLog>>,
}

impl<C: Send + 'static> StrategyBuilder<C> {
    pub fn new(event_bus: Arc<EventBus>, scope: UserScope<C>, user_context: C) -> Self {
        Self {
            event_bus,
            scope,
            user_context,
            run_condition: None,
            user_log: None,
        }
    }

    /// 실행 조건. 기본값은 보유 중이 아닌 [`HoldSwitch`]입니다.
    pub fn run_condition(mut self, condition: Arc<dyn RunCondition>) -> Self {
        self.run_condition = Some(condition);
        self
    }

    /// 설정의 `strategy` 섹션을 반영합니다.
    ///
    /// `is_hold`로 [`HoldSwitch`]를 만들고, `user_log_disabled`이면 사용자 로그를 끕니다.
    pub fn with_config(mut self, config: &StrategyConfig) -> Self {
        self.run_condition = Some(Arc::new(HoldSwitch::from_config(config)));
        if config.user_log_disabled {
            self.user_log = Some(Arc::new(TracingUserLog::disabled()));
        }
        self
    }

    /// deprecated 경고를 받을 사용자 로그. 기본값은 [`TracingUserLog`]입니다.
    pub fn user_log(mut self, user_log: Arc<dyn UserLog>) -> Self {
        self.user_log = Some(user_log);
        self
    }

    /// 콜백을 정규화하고 이벤트 버스에 연결합니다.
    pub fn build(self) -> Arc<Strategy<C>> {
        let user_log = self
            .user_log
            .unwrap_or_else(|| Arc::new(TracingUserLog::new()) as Arc<dyn UserLog>);
        let run_condition = self
            .run_condition
            .unwrap_or_else(|| Arc::new(HoldSwitch::default()) as Arc<dyn RunCondition>);

        let callbacks = CallbackRegistry::resolve(self.scope, user_log.as_ref());

        let strategy = Arc::new(Strategy {
            event_bus: self.event_bus,
            callbacks,
            user_context: Mutex::new(self.user_context),
            current_universe: RwLock::new(HashSet::new()),
            run_condition,
        });

        let bound = EventBinder::bind(&strategy.event_bus, &strategy);
        info!(events = ?bound, "Strategy created");

        strategy
    }
}

impl<C: Send + 'static> Strategy<C> {
    /// 기본 실행 조건과 사용자 로그로 전략을 생성합니다.
    pub fn new(event_bus: Arc<EventBus>, scope: UserScope<C>, user_context: C) -> Arc<Self> {
        StrategyBuilder::new(event_bus, scope, user_context).build()
    }

    pub fn builder(event_bus: Arc<EventBus>, scope: UserScope<C>, user_context: C) -> StrategyBuilder<C> {
        StrategyBuilder::new(event_bus, scope, user_context)
    }

    /// 사용자 컨텍스트.
    ///
    /// 생명주기 콜백 안에서 호출하면 교착 상태가 되므로 콜백 밖에서만 사용합니다.
    pub fn user_context(&self) -> MutexGuard<'_, C> {
        self.user_context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 현재 유니버스 (종목 코드 집합).
    pub fn current_universe(&self) -> HashSet<String> {
        self.current_universe
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 현재 유니버스를 교체합니다.
    pub fn set_current_universe(&self, universe: HashSet<String>) {
        *self
            .current_universe
            .write()
            .unwrap_or_else(PoisonError::into_inner) = universe;
    }

    /// 생성 시 해당 콜백이 등록되었는지 확인합니다.
    pub fn has_hook(&self, hook: HookName) -> bool {
        self.callbacks.has(hook)
    }

    /// 사용자 `init`을 실행하고, 성공하면 `PostUserInit`을 발행합니다.
    ///
    /// 실행 조건과 무관하게 실행됩니다. `init`이 없으면 아무 일도 하지 않습니다.
    pub fn init(&self) -> TraderResult<()> {
        let Some(init) = self.callbacks.init() else {
            return Ok(());
        };

        self.run_hook(ExecutionPhase::OnInit, None, |ctx| init(ctx))?;

        self.event_bus
            .publish_event(&Event::new(EventType::PostUserInit))
    }

    /// 장 시작 전 콜백.
    pub fn before_trading(&self) -> TraderResult<()> {
        if !self.should_run(ExecutionPhase::BeforeTrading) {
            return Ok(());
        }
        let Some(before_trading) = self.callbacks.before_trading() else {
            return Ok(());
        };

        self.run_hook(ExecutionPhase::BeforeTrading, None, |ctx| before_trading(ctx))
    }

    /// 바 콜백. 실행 중에는 `bar`가 현재 단계의 페이로드입니다.
    pub fn handle_bar(&self, bar: Arc<BarDict>) -> TraderResult<()> {
        if !self.should_run(ExecutionPhase::OnBar) {
            return Ok(());
        }
        let Some(handle_bar) = self.callbacks.handle_bar() else {
            return Ok(());
        };

        self.run_hook(ExecutionPhase::OnBar, Some(bar.clone()), |ctx| {
            handle_bar(ctx, bar.as_ref())
        })
    }

    /// 장 마감 후 콜백.
    pub fn after_trading(&self) -> TraderResult<()> {
        if !self.should_run(ExecutionPhase::AfterTrading) {
            return Ok(());
        }
        let Some(after_trading) = self.callbacks.after_trading() else {
            return Ok(());
        };

        self.run_hook(ExecutionPhase::AfterTrading, None, |ctx| after_trading(ctx))
    }

    fn should_run(&self, phase: ExecutionPhase) -> bool {
        let run = self.run_condition.should_run();
        if !run {
            debug!(phase = %phase, "Run condition rejected lifecycle call");
        }
        run
    }

    fn run_hook<F>(&self, phase: ExecutionPhase, bar: Option<Arc<BarDict>>, call: F) -> TraderResult<()>
    where
        F: FnOnce(&mut C) -> UserResult,
    {
        let mut context = self.lock_for_callback(phase)?;
        run_phased(phase, bar, || call(&mut *context))
    }

    /// 콜백용 컨텍스트 잠금. 콜백 안에서 다시 생명주기 호출이 들어오면 에러.
    fn lock_for_callback(&self, phase: ExecutionPhase) -> TraderResult<MutexGuard<'_, C>> {
        match self.user_context.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(TraderError::Internal(format!(
                "{phase} 호출 시 사용자 컨텍스트가 이미 사용 중 (재진입 호출)"
            ))),
        }
    }
}

impl<C> fmt::Debug for Strategy<C>
where
    C: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("callbacks", &self.callbacks)
            .field("current_universe", &self.current_universe())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trader_core::ExecutionContext;

    #[derive(Default)]
    struct Ctx {
        phases: Vec<ExecutionPhase>,
    }

    #[test]
    fn test_missing_hooks_are_noops() {
        let bus = Arc::new(EventBus::new());
        let strategy = Strategy::new(bus, UserScope::<Ctx>::new(), Ctx::default());

        strategy.init().unwrap();
        strategy.before_trading().unwrap();
        strategy
            .handle_bar(Arc::new(BarDict::new(chrono::Utc::now())))
            .unwrap();
        strategy.after_trading().unwrap();

        assert!(strategy.user_context().phases.is_empty());
    }

    #[test]
    fn test_callbacks_run_in_their_phase() {
        let bus = Arc::new(EventBus::new());
        let record = |ctx: &mut Ctx| -> UserResult {
            ctx.phases.push(ExecutionContext::phase());
            Ok(())
        };
        let scope = UserScope::new()
            .init(record)
            .before_trading(record)
            .handle_bar(move |ctx, _| record(ctx))
            .after_trading(record);
        let strategy = Strategy::new(bus, scope, Ctx::default());

        strategy.init().unwrap();
        strategy.before_trading().unwrap();
        strategy
            .handle_bar(Arc::new(BarDict::new(chrono::Utc::now())))
            .unwrap();
        strategy.after_trading().unwrap();

        assert_eq!(
            strategy.user_context().phases,
            [
                ExecutionPhase::OnInit,
                ExecutionPhase::BeforeTrading,
                ExecutionPhase::OnBar,
                ExecutionPhase::AfterTrading,
            ]
        );
    }

    #[test]
    fn test_current_universe_starts_empty_and_is_writable() {
        let bus = Arc::new(EventBus::new());
        let strategy = Strategy::new(bus, UserScope::<Ctx>::new(), Ctx::default());
        assert!(strategy.current_universe().is_empty());

        let universe: HashSet<String> = ["000001.XSHE".to_string()].into_iter().collect();
        strategy.set_current_universe(universe.clone());
        assert_eq!(strategy.current_universe(), universe);
    }

    #[test]
    fn test_config_hold_skips_gated_calls() {
        let bus = Arc::new(EventBus::new());
        let record = |ctx: &mut Ctx| -> UserResult {
            ctx.phases.push(ExecutionContext::phase());
            Ok(())
        };
        let scope = UserScope::new().init(record).after_trading(record);
        let config = StrategyConfig {
            is_hold: true,
            user_log_disabled: true,
        };
        let strategy = Strategy::builder(bus, scope, Ctx::default())
            .with_config(&config)
            .build();

        strategy.init().unwrap();
        strategy.after_trading().unwrap();

        assert_eq!(strategy.user_context().phases, [ExecutionPhase::OnInit]);
    }

    #[test]
    fn test_reentrant_call_is_runtime_error() {
        let bus = Arc::new(EventBus::new());
        let inner_bus = Arc::downgrade(&bus);
        let scope = UserScope::<Ctx>::new()
            .before_trading(move |_| {
                if let Some(bus) = inner_bus.upgrade() {
                    bus.publish_event(&Event::new(EventType::BeforeTrading))?;
                }
                Ok(())
            });
        let strategy = Strategy::new(bus.clone(), scope, Ctx::default());

        let err = strategy.before_trading().unwrap_err();
        // 재진입 에러는 사용자 콜백을 통해 전파되므로 USER_EXC로 태그되고,
        // 원인에는 런타임 에러가 남음
        assert!(err.is_user_exc());
        let cause = err.user_cause().unwrap().downcast_ref::<TraderError>().unwrap();
        assert!(matches!(cause, TraderError::Internal(_)));
        assert_eq!(ExecutionContext::phase(), ExecutionPhase::Global);
    }
}
