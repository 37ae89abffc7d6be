//! 실행 단계(execution phase) 추적.
//!
//! 사용자 코드가 호출되는 동안 "지금 어떤 생명주기 단계인가"를 다른
//! 서브시스템이 조회할 수 있도록 스레드 로컬 스택으로 관리합니다.
//!
//! 단계 진입은 [`ExecutionContext::enter`]가 반환하는 [`PhaseGuard`]로 표현되며,
//! 가드가 drop되면 (정상 반환, 에러, panic unwinding 모두) 이전 단계로 복원됩니다.
//!
//! ```
//! use trader_core::{ExecutionContext, ExecutionPhase};
//!
//! assert_eq!(ExecutionContext::phase(), ExecutionPhase::Global);
//! {
//!     let _guard = ExecutionContext::enter(ExecutionPhase::BeforeTrading, None);
//!     assert_eq!(ExecutionContext::phase(), ExecutionPhase::BeforeTrading);
//! }
//! assert_eq!(ExecutionContext::phase(), ExecutionPhase::Global);
//! ```

use crate::domain::BarDict;
use crate::error::{TraderError, TraderResult};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 전략 생명주기 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    /// 어떤 생명주기 호출에도 속하지 않음
    Global,
    /// 사용자 `init` 실행 중
    OnInit,
    /// 장 시작 전
    BeforeTrading,
    /// 바 처리 중
    OnBar,
    /// 장 마감 후
    AfterTrading,
    /// 스케줄러 작업 실행 중
    Scheduled,
    /// 실행 종료 후
    Finalized,
}

impl ExecutionPhase {
    /// 단계 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPhase::Global => "global",
            ExecutionPhase::OnInit => "on_init",
            ExecutionPhase::BeforeTrading => "before_trading",
            ExecutionPhase::OnBar => "on_bar",
            ExecutionPhase::AfterTrading => "after_trading",
            ExecutionPhase::Scheduled => "scheduled",
            ExecutionPhase::Finalized => "finalized",
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct PhaseFrame {
    phase: ExecutionPhase,
    bar: Option<Arc<BarDict>>,
}

thread_local! {
    static PHASE_STACK: RefCell<Vec<PhaseFrame>> = const { RefCell::new(Vec::new()) };
}

/// 현재 스레드의 실행 단계 조회 및 진입 API.
pub struct ExecutionContext;

impl ExecutionContext {
    /// `phase`로 진입합니다. 반환된 가드가 살아있는 동안 현재 단계가 됩니다.
    pub fn enter(phase: ExecutionPhase, bar: Option<Arc<BarDict>>) -> PhaseGuard {
        let depth = PHASE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let depth = stack.len();
            stack.push(PhaseFrame { phase, bar });
            depth
        });

        PhaseGuard {
            depth,
            _not_send: PhantomData,
        }
    }

    /// 현재 단계. 진입한 단계가 없으면 [`ExecutionPhase::Global`].
    pub fn phase() -> ExecutionPhase {
        PHASE_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|frame| frame.phase)
                .unwrap_or(ExecutionPhase::Global)
        })
    }

    /// 현재 단계에 연결된 바 데이터.
    pub fn bar() -> Option<Arc<BarDict>> {
        PHASE_STACK.with(|stack| stack.borrow().last().and_then(|frame| frame.bar.clone()))
    }

    /// 중첩된 단계 수.
    pub fn depth() -> usize {
        PHASE_STACK.with(|stack| stack.borrow().len())
    }

    /// 현재 단계가 `allowed` 중 하나가 아니면 [`TraderError::PhaseNotAllowed`].
    pub fn enforce_phase(api: &str, allowed: &[ExecutionPhase]) -> TraderResult<()> {
        let current = Self::phase();
        if allowed.contains(&current) {
            Ok(())
        } else {
            Err(TraderError::PhaseNotAllowed {
                api: api.to_string(),
                current,
            })
        }
    }
}

/// 단계 스코프 가드. drop 시 진입 직전 상태로 스택을 되돌립니다.
#[must_use = "가드를 바로 버리면 단계가 즉시 종료됩니다"]
pub struct PhaseGuard {
    depth: usize,
    // 스레드 로컬 스택을 가리키므로 다른 스레드로 보낼 수 없음
    _not_send: PhantomData<*const ()>,
}

impl PhaseGuard {
    /// 이 가드가 연 단계.
    pub fn phase(&self) -> ExecutionPhase {
        PHASE_STACK.with(|stack| {
            stack
                .borrow()
                .get(self.depth)
                .map(|frame| frame.phase)
                .unwrap_or(ExecutionPhase::Global)
        })
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        let _ = PHASE_STACK.try_with(|stack| stack.borrow_mut().truncate(self.depth));
    }
}

impl fmt::Debug for PhaseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseGuard")
            .field("depth", &self.depth)
            .finish()
    }
}
