// Canvass - Voter-Contact Progress Tracker - Core Library
// Exposes all modules for use in the seed CLI, API server, and tests

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod progress;
pub mod seed;
pub mod server;

// Re-export commonly used types
pub use auth::{hash_password, sign_token, verify_password, verify_token, Claims, TOKEN_COOKIE};
pub use config::ServerConfig;
pub use db::{
    apply_voter_marks, find_user_by_username, load_all_stations, load_station, parse_marks,
    setup_database, update_incharge, HouseWithVoters, StationWithHouses, VoterMark,
};
pub use entities::{House, HouseDetail, PollingStation, Role, StationSummary, User, Voter};
pub use progress::{
    house_status, natural_cmp, overall_stats, station_stats, HouseStatus, OverallStats,
    StationStats,
};
pub use seed::{run_seed, ward_plan, SeedSummary};
pub use server::{build_router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
