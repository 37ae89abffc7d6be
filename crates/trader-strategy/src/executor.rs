//! 단계 스코프 실행기.
//!
//! 사용자 코드 호출을 실행 단계 스코프와 에러 변환 경계로 감쌉니다.
//! - 진입 시 `(phase, bar)`가 현재 단계가 되고, 어떤 경로로 빠져나가든
//!   이전 단계로 복원됩니다.
//! - 사용자 코드가 반환한 에러는 `USER_EXC`로 태그되어 호출자에게 전파됩니다.
//!   스코프 밖 런타임 로직의 에러는 태그되지 않습니다.

use std::sync::Arc;
use trader_core::{
    lifecycle_span, translate_exc, BarDict, BoxError, ExcType, ExecutionContext, ExecutionPhase,
    TraderResult,
};
use tracing::{trace, warn};

/// `thunk`를 `phase` 단계 안에서 실행합니다.
///
/// 반환 시점에는 단계가 이미 복원되어 있습니다.
pub fn run_phased<T, F>(phase: ExecutionPhase, bar: Option<Arc<BarDict>>, thunk: F) -> TraderResult<T>
where
    F: FnOnce() -> Result<T, BoxError>,
{
    let span = lifecycle_span!(phase);
    let _entered = span.enter();

    let result = {
        let _phase = ExecutionContext::enter(phase, bar);
        trace!(depth = ExecutionContext::depth(), "Phase entered");
        translate_exc(ExcType::UserExc, phase, thunk)
    };

    if let Err(err) = &result {
        warn!(phase = %phase, exc_type = %err.exc_type(), error = %err, "Lifecycle callback failed");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fmt;

    #[derive(Debug)]
    struct ValueError(&'static str);

    impl fmt::Display for ValueError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "ValueError: {}", self.0)
        }
    }

    impl std::error::Error for ValueError {}

    #[test]
    fn test_phase_is_current_inside_thunk() {
        let observed = run_phased(ExecutionPhase::BeforeTrading, None, || {
            Ok(ExecutionContext::phase())
        })
        .unwrap();

        assert_eq!(observed, ExecutionPhase::BeforeTrading);
        assert_eq!(ExecutionContext::phase(), ExecutionPhase::Global);
    }

    #[test]
    fn test_bar_payload_attached_to_on_bar() {
        let bar = Arc::new(BarDict::new(Utc::now()));

        let observed = run_phased(ExecutionPhase::OnBar, Some(bar.clone()), || {
            Ok(ExecutionContext::bar())
        })
        .unwrap();

        assert!(Arc::ptr_eq(&observed.unwrap(), &bar));
        assert!(ExecutionContext::bar().is_none());
    }

    #[test]
    fn test_user_error_is_tagged_and_phase_restored() {
        let outer = ExecutionContext::enter(ExecutionPhase::Scheduled, None);

        let err = run_phased(ExecutionPhase::AfterTrading, None, || -> Result<(), BoxError> {
            Err(Box::new(ValueError("bad")))
        })
        .unwrap_err();

        assert_eq!(ExecutionContext::phase(), ExecutionPhase::Scheduled);
        drop(outer);

        assert!(err.is_user_exc());
        assert_eq!(err.phase(), Some(ExecutionPhase::AfterTrading));
        let cause = err.user_cause().unwrap();
        assert_eq!(cause.downcast_ref::<ValueError>().unwrap().0, "bad");
    }

    #[test]
    fn test_phase_restored_when_user_code_panics() {
        let result = std::panic::catch_unwind(|| {
            run_phased(ExecutionPhase::OnInit, None, || -> Result<(), BoxError> {
                panic!("boom")
            })
        });

        assert!(result.is_err());
        assert_eq!(ExecutionContext::phase(), ExecutionPhase::Global);
        assert_eq!(ExecutionContext::depth(), 0);
    }
}
