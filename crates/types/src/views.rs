use crate::{Plant, Swap, SwapPolicy, SwapRole, SwapStatus};
use serde::{Deserialize, Serialize};

/// Counts over a swap collection, one bucket per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStatistics {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub completed: usize,
}

impl SwapStatistics {
    pub fn from_swaps(swaps: &[Swap]) -> Self {
        let mut stats = Self::default();
        for swap in swaps {
            stats.total += 1;
            match swap.status {
                SwapStatus::Pending => stats.pending += 1,
                SwapStatus::Accepted => stats.accepted += 1,
                SwapStatus::Rejected => stats.rejected += 1,
                SwapStatus::Completed => stats.completed += 1,
            }
        }
        stats
    }

    /// Swaps still moving through the lifecycle
    pub fn active(&self) -> usize {
        self.pending + self.accepted
    }
}

/// What one participant may currently do with one swap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapActions {
    pub can_accept: bool,
    pub can_reject: bool,
    pub can_confirm_completion: bool,
}

impl SwapActions {
    /// Derive the action set for `participant_id`
    ///
    /// Non-participants and terminal swaps get the empty set. The decision
    /// on a pending swap belongs to the receiver alone; cancelling an
    /// accepted swap is open to both sides when policy allows it.
    pub fn for_participant(swap: &Swap, participant_id: &str, policy: &SwapPolicy) -> Self {
        let role = match swap.role_of(participant_id) {
            Some(role) => role,
            None => return Self::default(),
        };

        match swap.status {
            SwapStatus::Pending => Self {
                can_accept: role == SwapRole::Receiver,
                can_reject: role == SwapRole::Receiver,
                can_confirm_completion: false,
            },
            SwapStatus::Accepted => Self {
                can_accept: false,
                can_reject: policy.allow_cancelling_accepted,
                can_confirm_completion: !swap.completed_by(role),
            },
            SwapStatus::Rejected | SwapStatus::Completed => Self::default(),
        }
    }

    pub fn any(&self) -> bool {
        self.can_accept || self.can_reject || self.can_confirm_completion
    }
}

/// Plant fields worth showing in a swap list row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantSummary {
    pub id: String,
    pub name: String,
    pub species: Option<String>,
}

impl From<&Plant> for PlantSummary {
    fn from(plant: &Plant) -> Self {
        Self {
            id: plant.id.clone(),
            name: plant.name.clone(),
            species: plant.species.clone(),
        }
    }
}

/// A swap joined with both plant summaries for display
///
/// Missing plants come back as `None`; a deleted record must not break the
/// rest of a participant's swap list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapDetails {
    pub swap: Swap,
    pub sender_plant: Option<PlantSummary>,
    pub receiver_plant: Option<PlantSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_swap(status: SwapStatus) -> Swap {
        let mut swap = Swap::new(
            "swap-1", "alice", "bob", "plant-a", "plant-b", None, 1_700_000_000,
        );
        swap.status = status;
        swap
    }

    #[test]
    fn test_statistics_counts_by_status() {
        let swaps = vec![
            make_test_swap(SwapStatus::Pending),
            make_test_swap(SwapStatus::Pending),
            make_test_swap(SwapStatus::Accepted),
            make_test_swap(SwapStatus::Rejected),
            make_test_swap(SwapStatus::Completed),
        ];

        let stats = SwapStatistics::from_swaps(&swaps);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active(), 3);
    }

    #[test]
    fn test_statistics_empty() {
        assert_eq!(SwapStatistics::from_swaps(&[]), SwapStatistics::default());
    }

    #[test]
    fn test_pending_actions_belong_to_receiver() {
        let swap = make_test_swap(SwapStatus::Pending);
        let policy = SwapPolicy::default();

        let receiver = SwapActions::for_participant(&swap, "bob", &policy);
        assert!(receiver.can_accept);
        assert!(receiver.can_reject);
        assert!(!receiver.can_confirm_completion);

        let sender = SwapActions::for_participant(&swap, "alice", &policy);
        assert!(!sender.any());
    }

    #[test]
    fn test_accepted_actions_respect_cancel_policy() {
        let swap = make_test_swap(SwapStatus::Accepted);

        let allowed = SwapActions::for_participant(&swap, "alice", &SwapPolicy::default());
        assert!(allowed.can_reject);
        assert!(allowed.can_confirm_completion);
        assert!(!allowed.can_accept);

        let strict = SwapPolicy {
            allow_cancelling_accepted: false,
        };
        let denied = SwapActions::for_participant(&swap, "alice", &strict);
        assert!(!denied.can_reject);
        assert!(denied.can_confirm_completion);
    }

    #[test]
    fn test_confirmed_actor_cannot_confirm_again() {
        let mut swap = make_test_swap(SwapStatus::Accepted);
        swap.sender_completed = true;

        let actions = SwapActions::for_participant(&swap, "alice", &SwapPolicy::default());
        assert!(!actions.can_confirm_completion);

        let other = SwapActions::for_participant(&swap, "bob", &SwapPolicy::default());
        assert!(other.can_confirm_completion);
    }

    #[test]
    fn test_plant_summary_keeps_display_fields() {
        let plant = Plant::new("plant-1", "alice", "Swiss cheese plant", 1_700_000_000)
            .with_species("Monstera deliciosa");

        let summary = PlantSummary::from(&plant);
        assert_eq!(summary.id, "plant-1");
        assert_eq!(summary.name, "Swiss cheese plant");
        assert_eq!(summary.species.as_deref(), Some("Monstera deliciosa"));
    }

    #[test]
    fn test_terminal_and_stranger_get_nothing() {
        let policy = SwapPolicy::default();
        for status in [SwapStatus::Rejected, SwapStatus::Completed] {
            let swap = make_test_swap(status);
            assert!(!SwapActions::for_participant(&swap, "alice", &policy).any());
            assert!(!SwapActions::for_participant(&swap, "bob", &policy).any());
        }

        let swap = make_test_swap(SwapStatus::Pending);
        assert!(!SwapActions::for_participant(&swap, "mallory", &policy).any());
    }
}
