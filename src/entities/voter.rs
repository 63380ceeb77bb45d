// 🙋 Voter Entity
//
// An individual registered at a house. The only mutable field is `met`,
// and it only moves false → true through the update path (ratchet).

use serde::{Deserialize, Serialize};

/// Voter record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voter {
    /// Stable identity (UUID) - never changes
    pub id: String,

    /// Per-house ordinal, starting at 1
    pub serial_number: i64,

    /// Whether an agent has contacted this voter
    pub met: bool,

    /// Owning house (not part of the wire shape)
    #[serde(skip_serializing, default)]
    pub house_id: String,
}

impl Voter {
    pub fn new(serial_number: i64, house_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            serial_number,
            met: false,
            house_id: house_id.to_string(),
        }
    }
}
