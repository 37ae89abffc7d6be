//! 실행 단계 스택 통합 테스트
//!
//! 임의의 중첩 진입/에러 시퀀스 이후에도 단계가 항상 원래대로 복원되는지 확인합니다.

use proptest::prelude::*;
use std::sync::Arc;
use trader_core::{
    translate_exc, BarDict, ExcType, ExecutionContext, ExecutionPhase, TraderResult,
};

fn phase_strategy() -> impl Strategy<Value = ExecutionPhase> {
    prop_oneof![
        Just(ExecutionPhase::OnInit),
        Just(ExecutionPhase::BeforeTrading),
        Just(ExecutionPhase::OnBar),
        Just(ExecutionPhase::AfterTrading),
        Just(ExecutionPhase::Scheduled),
    ]
}

/// `phases`를 차례로 중첩 진입하고, `fail_at` 깊이에서 에러를 반환합니다.
fn run_nested(phases: &[ExecutionPhase], fail_at: usize, depth: usize) -> TraderResult<()> {
    let Some((&phase, rest)) = phases.split_first() else {
        return Ok(());
    };

    let _guard = ExecutionContext::enter(phase, None);
    assert_eq!(ExecutionContext::phase(), phase);
    assert_eq!(ExecutionContext::depth(), depth + 1);

    translate_exc(ExcType::UserExc, phase, || {
        if depth == fail_at {
            return Err("user failure".into());
        }
        run_nested(rest, fail_at, depth + 1).map_err(trader_core::BoxError::from)
    })
}

proptest! {
    #[test]
    fn phase_stack_is_restored_after_any_nesting(
        phases in prop::collection::vec(phase_strategy(), 0..8),
        fail_at in 0usize..10,
    ) {
        let before = ExecutionContext::phase();
        let result = run_nested(&phases, fail_at, 0);

        prop_assert_eq!(ExecutionContext::phase(), before);
        prop_assert_eq!(ExecutionContext::depth(), 0);

        if fail_at < phases.len() {
            let err = result.unwrap_err();
            prop_assert!(err.is_user_exc());
            // 가장 안쪽 단계의 태그가 유지됨
            prop_assert_eq!(err.phase(), Some(phases[fail_at]));
        } else {
            prop_assert!(result.is_ok());
        }
    }
}

#[test]
fn test_bar_payload_is_scoped_to_on_bar() {
    let bar = Arc::new(BarDict::new(chrono::Utc::now()));

    let observed = {
        let _guard = ExecutionContext::enter(ExecutionPhase::OnBar, Some(bar.clone()));
        let _scheduled = ExecutionContext::enter(ExecutionPhase::Scheduled, None);
        // 안쪽 단계에는 바가 없음
        assert!(ExecutionContext::bar().is_none());
        drop(_scheduled);
        ExecutionContext::bar()
    };

    assert!(Arc::ptr_eq(&observed.unwrap(), &bar));
    assert!(ExecutionContext::bar().is_none());
}
