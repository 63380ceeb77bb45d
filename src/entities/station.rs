// 🗳️ Polling Station Entity
//
// Top-level grouping of houses/voters for canvassing. A station is a
// physical voting location; the incharge is the volunteer responsible
// for covering its catchment.

use serde::{Deserialize, Serialize};

/// Polling station record as persisted.
///
/// Only `incharge_name` is mutable after seeding (admin reassignment);
/// everything else is fixed at provisioning time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingStation {
    /// Stable identity (UUID) - never changes
    pub id: String,

    /// Official station number, e.g. "295"
    pub ps_number: String,

    /// Station name, e.g. "Mettuguda Primary School"
    pub ps_name: String,

    /// Ward / locality the station serves
    pub ward: String,

    /// Named volunteer responsible for this station (admin-assigned)
    pub incharge_name: String,
}

impl PollingStation {
    pub fn new(ps_number: &str, ps_name: &str, ward: &str, incharge_name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ps_number: ps_number.to_string(),
            ps_name: ps_name.to_string(),
            ward: ward.to_string(),
            incharge_name: incharge_name.to_string(),
        }
    }
}

/// Slim station view returned after an incharge update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSummary {
    pub id: String,
    pub ps_number: String,
    pub ps_name: String,
    pub ward: String,
    pub incharge_name: String,
}

impl From<PollingStation> for StationSummary {
    fn from(ps: PollingStation) -> Self {
        Self {
            id: ps.id,
            ps_number: ps.ps_number,
            ps_name: ps.ps_name,
            ward: ps.ward,
            incharge_name: ps.incharge_name,
        }
    }
}
