// Entity Models - Canvassing Hierarchy
//
// PollingStation → House → Voter is a strict one-to-many-to-many ownership
// chain: every house belongs to exactly one station, every voter to exactly
// one house. User is the standalone login entity.

pub mod house;
pub mod station;
pub mod user;
pub mod voter;

pub use house::{House, HouseDetail};
pub use station::{PollingStation, StationSummary};
pub use user::{Role, User};
pub use voter::Voter;
