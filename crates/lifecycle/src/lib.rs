pub mod availability;
pub mod completion;
pub mod proposal;
pub mod retry;
pub mod state_machine;

pub use availability::AvailabilitySync;
pub use completion::{CompletionCoordinator, CompletionError, CompletionOutcome};
pub use proposal::{ProposalError, ProposalFactory, ProposalOutcome, ProposalRequest};
pub use retry::{ConflictBackoff, RetryPolicy};
pub use state_machine::{
    check_transition, SwapStateMachine, TransitionError, TransitionOutcome,
};

/// Seconds since the Unix epoch
pub(crate) fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp() as u64
}
