// 🏠 House Entity
//
// A residential unit inside a polling station's catchment, identified by a
// block-style number like "4-1-403".

use serde::{Deserialize, Serialize};

use crate::entities::Voter;
use crate::progress::HouseStatus;

/// House record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct House {
    /// Stable identity (UUID) - never changes
    pub id: String,

    /// Block-style house number, e.g. "4-1-403"
    pub house_number: String,

    /// Voter head-count recorded when the house was seeded.
    ///
    /// This is a creation-time snapshot, NOT kept in sync with the live
    /// voter collection. All statistics derive counts from the voters
    /// themselves; this field is display metadata only.
    pub total_voters: i64,

    /// Owning polling station
    pub station_id: String,
}

impl House {
    pub fn new(house_number: &str, total_voters: i64, station_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            house_number: house_number.to_string(),
            total_voters,
            station_id: station_id.to_string(),
        }
    }
}

/// House with its voters and derived visit status, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseDetail {
    pub id: String,
    pub house_number: String,
    pub total_voters: i64,
    pub status: HouseStatus,
    pub voters: Vec<Voter>,
}
