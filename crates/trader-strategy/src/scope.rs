//! 사용자 콜백 네임스페이스와 콜백 레지스트리.
//!
//! 전략 작성자는 [`UserScope`]에 필요한 콜백만 정의합니다. 정의되지 않은 콜백은
//! 정상적인 경우이며 조용히 건너뜁니다.
//!
//! [`CallbackRegistry::resolve`]는 생성 시 한 번만 호출되어 구 버전 시그니처를
//! 정규화하고 deprecated 콜백에 대해 사용자 로그로 경고합니다. 이후 호출 경로에서는
//! 시그니처 종류를 다시 확인하지 않습니다.

use std::fmt;
use trader_core::{BarDict, UserLog, UserResult};
use tracing::debug;

/// 컨텍스트만 받는 콜백 (`init`, `before_trading`, `after_trading`).
pub type ContextFn<C> = Box<dyn Fn(&mut C) -> UserResult + Send + Sync>;

/// 바 데이터를 함께 받는 콜백 (`handle_bar`).
pub type BarFn<C> = Box<dyn Fn(&mut C, &BarDict) -> UserResult + Send + Sync>;

/// 구 버전 `before_trading(context, bar_dict)` 콜백.
pub type LegacyBeforeTradingFn<C> =
    Box<dyn Fn(&mut C, Option<&BarDict>) -> UserResult + Send + Sync>;

const LEGACY_BEFORE_TRADING_WARNING: &str =
    "deprecated parameter[bar_dict] in before_trading function.";

/// 사용자 네임스페이스의 고정 이름.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    Init,
    BeforeTrading,
    HandleBar,
    AfterTrading,
    /// deprecated: `before_trading` 사용
    BeforeDayTrading,
    /// deprecated: `before_trading` 사용
    BeforeNightTrading,
}

impl HookName {
    pub const ALL: [HookName; 6] = [
        HookName::Init,
        HookName::BeforeTrading,
        HookName::HandleBar,
        HookName::AfterTrading,
        HookName::BeforeDayTrading,
        HookName::BeforeNightTrading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookName::Init => "init",
            HookName::BeforeTrading => "before_trading",
            HookName::HandleBar => "handle_bar",
            HookName::AfterTrading => "after_trading",
            HookName::BeforeDayTrading => "before_day_trading",
            HookName::BeforeNightTrading => "before_night_trading",
        }
    }

    /// 더 이상 이벤트에 연결되지 않는 이름인지 확인합니다.
    pub fn is_deprecated(&self) -> bool {
        matches!(self, HookName::BeforeDayTrading | HookName::BeforeNightTrading)
    }

    fn deprecation_warning(&self) -> String {
        format!(
            "[deprecated] {} is no longer used. use before_trading instead.",
            self.as_str()
        )
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `before_trading` 시그니처. 등록 시점에 결정됩니다.
pub enum BeforeTrading<C> {
    /// `before_trading(context)`
    Modern(ContextFn<C>),
    /// `before_trading(context, bar_dict)`. 두 번째 인자는 항상 `None`.
    Legacy(LegacyBeforeTradingFn<C>),
}

/// 전략 작성자가 정의한 콜백 모음.
///
/// ```
/// use trader_strategy::UserScope;
///
/// #[derive(Default)]
/// struct Context {
///     bars_seen: usize,
/// }
///
/// let scope = UserScope::<Context>::new()
///     .init(|_ctx| Ok(()))
///     .handle_bar(|ctx, _bar| {
///         ctx.bars_seen += 1;
///         Ok(())
///     });
/// assert!(scope.contains(trader_strategy::HookName::HandleBar));
/// ```
pub struct UserScope<C> {
    init: Option<ContextFn<C>>,
    before_trading: Option<BeforeTrading<C>>,
    handle_bar: Option<BarFn<C>>,
    after_trading: Option<ContextFn<C>>,
    before_day_trading: Option<ContextFn<C>>,
    before_night_trading: Option<ContextFn<C>>,
}

impl<C: 'static> UserScope<C> {
    /// 빈 네임스페이스.
    pub fn new() -> Self {
        Self {
            init: None,
            before_trading: None,
            handle_bar: None,
            after_trading: None,
            before_day_trading: None,
            before_night_trading: None,
        }
    }

    pub fn init<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C) -> UserResult + Send + Sync + 'static,
    {
        self.init = Some(Box::new(f));
        self
    }

    pub fn before_trading<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C) -> UserResult + Send + Sync + 'static,
    {
        self.before_trading = Some(BeforeTrading::Modern(Box::new(f)));
        self
    }

    /// 구 버전 2-인자 `before_trading`. 생성 시 deprecated 경고가 기록됩니다.
    pub fn before_trading_with_bar<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C, Option<&BarDict>) -> UserResult + Send + Sync + 'static,
    {
        self.before_trading = Some(BeforeTrading::Legacy(Box::new(f)));
        self
    }

    pub fn handle_bar<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C, &BarDict) -> UserResult + Send + Sync + 'static,
    {
        self.handle_bar = Some(Box::new(f));
        self
    }

    pub fn after_trading<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C) -> UserResult + Send + Sync + 'static,
    {
        self.after_trading = Some(Box::new(f));
        self
    }

    /// deprecated. 이벤트에 연결되지 않고 경고만 기록됩니다.
    pub fn before_day_trading<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C) -> UserResult + Send + Sync + 'static,
    {
        self.before_day_trading = Some(Box::new(f));
        self
    }

    /// deprecated. 이벤트에 연결되지 않고 경고만 기록됩니다.
    pub fn before_night_trading<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C) -> UserResult + Send + Sync + 'static,
    {
        self.before_night_trading = Some(Box::new(f));
        self
    }

    /// 이름에 해당하는 콜백이 정의되어 있는지 확인합니다.
    pub fn contains(&self, hook: HookName) -> bool {
        match hook {
            HookName::Init => self.init.is_some(),
            HookName::BeforeTrading => self.before_trading.is_some(),
            HookName::HandleBar => self.handle_bar.is_some(),
            HookName::AfterTrading => self.after_trading.is_some(),
            HookName::BeforeDayTrading => self.before_day_trading.is_some(),
            HookName::BeforeNightTrading => self.before_night_trading.is_some(),
        }
    }

    /// 정의된 콜백 이름 목록.
    pub fn defined_hooks(&self) -> Vec<HookName> {
        HookName::ALL
            .into_iter()
            .filter(|hook| self.contains(*hook))
            .collect()
    }
}

impl<C: 'static> Default for UserScope<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> fmt::Debug for UserScope<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserScope")
            .field("hooks", &self.defined_hooks())
            .finish()
    }
}

/// 정규화된 생명주기 콜백.
pub struct CallbackRegistry<C> {
    init: Option<ContextFn<C>>,
    before_trading: Option<ContextFn<C>>,
    handle_bar: Option<BarFn<C>>,
    after_trading: Option<ContextFn<C>>,
}

impl<C: 'static> CallbackRegistry<C> {
    /// 네임스페이스를 정규화합니다.
    ///
    /// - 구 버전 `before_trading`은 두 번째 인자에 항상 `None`을 넘기는 어댑터로 감쌉니다.
    /// - `before_day_trading`, `before_night_trading`은 버리고 각각 경고합니다.
    pub fn resolve(scope: UserScope<C>, user_log: &dyn UserLog) -> Self {
        let defined = scope.defined_hooks();

        let before_trading = scope.before_trading.map(|hook| match hook {
            BeforeTrading::Modern(f) => f,
            BeforeTrading::Legacy(f) => {
                user_log.warn(LEGACY_BEFORE_TRADING_WARNING);
                Box::new(move |ctx: &mut C| f(ctx, None)) as ContextFn<C>
            }
        });

        for hook in defined.iter().filter(|hook| hook.is_deprecated()) {
            user_log.warn(&hook.deprecation_warning());
        }

        debug!(hooks = ?defined, "User scope resolved");

        Self {
            init: scope.init,
            before_trading,
            handle_bar: scope.handle_bar,
            after_trading: scope.after_trading,
        }
    }

    /// 해당 생명주기 콜백이 존재하는지 확인합니다. deprecated 이름은 항상 `false`.
    pub fn has(&self, hook: HookName) -> bool {
        match hook {
            HookName::Init => self.init.is_some(),
            HookName::BeforeTrading => self.before_trading.is_some(),
            HookName::HandleBar => self.handle_bar.is_some(),
            HookName::AfterTrading => self.after_trading.is_some(),
            HookName::BeforeDayTrading | HookName::BeforeNightTrading => false,
        }
    }

    pub(crate) fn init(&self) -> Option<&ContextFn<C>> {
        self.init.as_ref()
    }

    pub(crate) fn before_trading(&self) -> Option<&ContextFn<C>> {
        self.before_trading.as_ref()
    }

    pub(crate) fn handle_bar(&self) -> Option<&BarFn<C>> {
        self.handle_bar.as_ref()
    }

    pub(crate) fn after_trading(&self) -> Option<&ContextFn<C>> {
        self.after_trading.as_ref()
    }
}

impl<C: 'static> fmt::Debug for CallbackRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: Vec<HookName> = HookName::ALL
            .into_iter()
            .filter(|hook| self.has(*hook))
            .collect();
        f.debug_struct("CallbackRegistry")
            .field("hooks", &hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trader_core::MemoryUserLog;

    #[derive(Default)]
    struct Ctx {
        legacy_calls: Vec<bool>,
    }

    #[test]
    fn test_empty_scope_resolves_without_warnings() {
        let log = MemoryUserLog::new();
        let registry = CallbackRegistry::resolve(UserScope::<Ctx>::new(), &log);

        for hook in HookName::ALL {
            assert!(!registry.has(hook));
        }
        assert!(log.warnings().is_empty());
    }

    #[test]
    fn test_modern_before_trading_passes_through() {
        let log = MemoryUserLog::new();
        let scope = UserScope::<Ctx>::new().before_trading(|_| Ok(()));
        let registry = CallbackRegistry::resolve(scope, &log);

        assert!(registry.has(HookName::BeforeTrading));
        assert!(log.warnings().is_empty());
    }

    #[test]
    fn test_legacy_before_trading_is_adapted() {
        let log = MemoryUserLog::new();
        let scope = UserScope::<Ctx>::new().before_trading_with_bar(|ctx, bar_dict| {
            ctx.legacy_calls.push(bar_dict.is_none());
            Ok(())
        });
        let registry = CallbackRegistry::resolve(scope, &log);

        assert_eq!(log.warnings(), [LEGACY_BEFORE_TRADING_WARNING]);

        let mut ctx = Ctx::default();
        let hook = registry.before_trading().unwrap();
        hook(&mut ctx).unwrap();
        hook(&mut ctx).unwrap();
        assert_eq!(ctx.legacy_calls, [true, true]);
        // 호출 시점에는 추가 경고 없음
        assert_eq!(log.warnings().len(), 1);
    }

    #[test]
    fn test_deprecated_hooks_warn_and_are_dropped() {
        let log = MemoryUserLog::new();
        let scope = UserScope::<Ctx>::new()
            .before_day_trading(|_| Ok(()))
            .before_night_trading(|_| Ok(()));
        let registry = CallbackRegistry::resolve(scope, &log);

        assert_eq!(
            log.warnings(),
            [
                "[deprecated] before_day_trading is no longer used. use before_trading instead.",
                "[deprecated] before_night_trading is no longer used. use before_trading instead.",
            ]
        );
        assert!(!registry.has(HookName::BeforeDayTrading));
        assert!(!registry.has(HookName::BeforeNightTrading));
        assert!(!registry.has(HookName::BeforeTrading));
    }

    #[test]
    fn test_defined_hooks_in_canonical_order() {
        let scope = UserScope::<Ctx>::new()
            .after_trading(|_| Ok(()))
            .handle_bar(|_, _| Ok(()))
            .init(|_| Ok(()));

        assert_eq!(
            scope.defined_hooks(),
            [HookName::Init, HookName::HandleBar, HookName::AfterTrading]
        );
        assert!(!scope.contains(HookName::BeforeTrading));
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(HookName::HandleBar.to_string(), "handle_bar");
        assert!(HookName::BeforeNightTrading.is_deprecated());
        assert!(!HookName::Init.is_deprecated());
    }
}
