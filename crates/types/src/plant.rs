use serde::{Deserialize, Serialize};

/// A plant listed by a marketplace participant
///
/// The engine only reasons about `id`, `owner_id` and `available`; the
/// remaining fields exist so queries can return display summaries without a
/// second fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    /// Unique identifier
    pub id: String,

    /// Current owner (changes when a swap completes)
    pub owner_id: String,

    /// Display name chosen by the owner
    pub name: String,

    /// Optional botanical species
    pub species: Option<String>,

    /// Whether the plant can be offered in or targeted by a new swap
    pub available: bool,

    pub created_at: u64,
}

impl Plant {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            species: None,
            available: true,
            created_at,
        }
    }

    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    /// Check whether `participant_id` owns this plant
    pub fn is_owned_by(&self, participant_id: &str) -> bool {
        self.owner_id == participant_id
    }
}
