// Seeding - one-shot provisioning of the canvassing database.
//
// All stations, houses, and voters are bulk-created here from the ward
// plan; afterwards only `met` (voters) and `incharge_name` (stations)
// ever change, through the API.

use anyhow::Result;
use rusqlite::Connection;

use crate::auth::hash_password;
use crate::db;
use crate::entities::{House, PollingStation, Role, User, Voter};

/// Default login credentials created by the seed.
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const AGENT_USERNAME: &str = "agent";
pub const AGENT_PASSWORD: &str = "agent123";

/// One station's worth of seed data.
pub struct StationSeed {
    pub ps_number: &'static str,
    pub ps_name: &'static str,
    pub ward: &'static str,
    pub incharge_name: &'static str,
    /// (house number, voter head-count)
    pub houses: &'static [(&'static str, i64)],
}

/// The ward plan: extracted from the per-ward voter rolls, one entry per
/// polling station with its catchment houses and voter counts.
pub fn ward_plan() -> Vec<StationSeed> {
    vec![
        StationSeed {
            ps_number: "295",
            ps_name: "Mettuguda Primary School",
            ward: "Mettuguda",
            incharge_name: "Ramesh Kumar",
            houses: &[
                ("1-1-101", 5),
                ("1-1-102", 3),
                ("1-1-103", 7),
                ("1-1-104", 4),
                ("1-1-105", 6),
                ("1-1-106", 8),
                ("1-1-107", 3),
                ("1-1-108", 5),
                ("1-1-109", 4),
                ("1-1-110", 6),
                ("1-1-111", 9),
                ("1-1-112", 4),
            ],
        },
        StationSeed {
            ps_number: "296",
            ps_name: "Lalaguda Government School",
            ward: "Lalaguda",
            incharge_name: "Suresh Reddy",
            houses: &[
                ("2-3-201", 6),
                ("2-3-202", 4),
                ("2-3-203", 8),
                ("2-3-204", 5),
                ("2-3-205", 3),
                ("2-3-206", 7),
                ("2-3-207", 4),
                ("2-3-208", 6),
                ("2-3-209", 5),
                ("2-3-210", 9),
                ("2-3-211", 3),
                ("2-3-212", 7),
                ("2-3-213", 4),
                ("2-3-214", 5),
                ("2-3-215", 8),
            ],
        },
        StationSeed {
            ps_number: "297",
            ps_name: "Chilkalguda Community Hall",
            ward: "Chilkalguda",
            incharge_name: "Venkat Rao",
            houses: &[
                ("3-5-301", 4),
                ("3-5-302", 7),
                ("3-5-303", 5),
                ("3-5-304", 6),
                ("3-5-305", 3),
                ("3-5-306", 8),
                ("3-5-307", 5),
                ("3-5-308", 4),
                ("3-5-309", 7),
                ("3-5-310", 6),
            ],
        },
        StationSeed {
            ps_number: "298",
            ps_name: "Bhoiguda Municipal School",
            ward: "Bhoiguda",
            incharge_name: "Lakshmi Devi",
            houses: &[
                ("4-1-401", 5),
                ("4-1-402", 3),
                ("4-1-403", 7),
                ("4-1-404", 4),
                ("4-1-405", 6),
                ("4-1-406", 8),
                ("4-1-407", 5),
                ("4-1-408", 3),
                ("4-1-409", 6),
                ("4-1-410", 4),
                ("4-1-411", 7),
                ("4-1-412", 5),
                ("4-1-413", 9),
                ("4-1-414", 4),
                ("4-1-415", 6),
                ("4-1-416", 3),
                ("4-1-417", 7),
                ("4-1-418", 5),
            ],
        },
        StationSeed {
            ps_number: "299",
            ps_name: "Tarnaka Government School",
            ward: "Tarnaka",
            incharge_name: "Srinivas Murthy",
            houses: &[
                ("5-2-501", 6),
                ("5-2-502", 4),
                ("5-2-503", 8),
                ("5-2-504", 5),
                ("5-2-505", 3),
                ("5-2-506", 7),
                ("5-2-507", 4),
                ("5-2-508", 6),
                ("5-2-509", 5),
                ("5-2-510", 9),
                ("5-2-511", 3),
                ("5-2-512", 7),
                ("5-2-513", 4),
                ("5-2-514", 5),
            ],
        },
        StationSeed {
            ps_number: "300",
            ps_name: "Vidyanagar Community Hall",
            ward: "Vidyanagar",
            incharge_name: "Priya Sharma",
            houses: &[
                ("6-4-601", 5),
                ("6-4-602", 7),
                ("6-4-603", 4),
                ("6-4-604", 6),
                ("6-4-605", 3),
                ("6-4-606", 8),
                ("6-4-607", 5),
                ("6-4-608", 4),
                ("6-4-609", 7),
                ("6-4-610", 6),
                ("6-4-611", 9),
            ],
        },
        StationSeed {
            ps_number: "301",
            ps_name: "Nacharam Primary School",
            ward: "Nacharam",
            incharge_name: "Mahesh Babu",
            houses: &[
                ("7-6-701", 4),
                ("7-6-702", 6),
                ("7-6-703", 5),
                ("7-6-704", 7),
                ("7-6-705", 3),
                ("7-6-706", 8),
                ("7-6-707", 4),
                ("7-6-708", 6),
                ("7-6-709", 5),
                ("7-6-710", 9),
                ("7-6-711", 3),
                ("7-6-712", 7),
                ("7-6-713", 4),
                ("7-6-714", 5),
                ("7-6-715", 6),
                ("7-6-716", 8),
            ],
        },
    ]
}

/// What a seeding run created.
#[derive(Debug, Clone, Copy)]
pub struct SeedSummary {
    pub stations: usize,
    pub houses: usize,
    pub voters: usize,
}

/// Wipe and re-provision the database from the ward plan.
///
/// Creates the admin/agent users with freshly hashed passwords, then the
/// full station → house → voter hierarchy with every voter unmet.
pub fn run_seed(conn: &Connection) -> Result<SeedSummary> {
    db::setup_database(conn)?;
    db::clear_all(conn)?;

    let admin = User::new(ADMIN_USERNAME, &hash_password(ADMIN_PASSWORD)?, Role::Admin);
    let agent = User::new(AGENT_USERNAME, &hash_password(AGENT_PASSWORD)?, Role::Agent);
    db::insert_user(conn, &admin)?;
    db::insert_user(conn, &agent)?;

    let mut houses = 0;
    let mut voters = 0;
    let plan = ward_plan();

    for seed in &plan {
        let station =
            PollingStation::new(seed.ps_number, seed.ps_name, seed.ward, seed.incharge_name);
        db::insert_station(conn, &station)?;

        for &(house_number, voter_count) in seed.houses {
            let house = House::new(house_number, voter_count, &station.id);
            db::insert_house(conn, &house)?;
            houses += 1;

            for serial in 1..=voter_count {
                db::insert_voter(conn, &Voter::new(serial, &house.id))?;
                voters += 1;
            }
        }
    }

    Ok(SeedSummary {
        stations: plan.len(),
        houses,
        voters,
    })
}
