use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::{House, HouseDetail, PollingStation, Role, StationSummary, User, Voter};
use crate::progress::{self, house_status};

// ============================================================================
// Schema
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS polling_stations (
            id TEXT PRIMARY KEY,
            ps_number TEXT NOT NULL,
            ps_name TEXT NOT NULL,
            ward TEXT NOT NULL,
            incharge_name TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS houses (
            id TEXT PRIMARY KEY,
            house_number TEXT NOT NULL,
            total_voters INTEGER NOT NULL,
            station_id TEXT NOT NULL REFERENCES polling_stations(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS voters (
            id TEXT PRIMARY KEY,
            serial_number INTEGER NOT NULL,
            met INTEGER NOT NULL DEFAULT 0,
            house_id TEXT NOT NULL REFERENCES houses(id)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_houses_station ON houses(station_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_voters_house ON voters(house_id)",
        [],
    )?;

    Ok(())
}

/// Drop all rows before re-seeding. Children first, referential integrity.
pub fn clear_all(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM voters", [])?;
    conn.execute("DELETE FROM houses", [])?;
    conn.execute("DELETE FROM polling_stations", [])?;
    conn.execute("DELETE FROM users", [])?;
    Ok(())
}

// ============================================================================
// Provisioning inserts (seeding only - no delete/insert in the request path)
// ============================================================================

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.username, user.password_hash, user.role.as_str()],
    )
    .context("Failed to insert user")?;
    Ok(())
}

pub fn insert_station(conn: &Connection, ps: &PollingStation) -> Result<()> {
    conn.execute(
        "INSERT INTO polling_stations (id, ps_number, ps_name, ward, incharge_name)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![ps.id, ps.ps_number, ps.ps_name, ps.ward, ps.incharge_name],
    )
    .context("Failed to insert polling station")?;
    Ok(())
}

pub fn insert_house(conn: &Connection, house: &House) -> Result<()> {
    conn.execute(
        "INSERT INTO houses (id, house_number, total_voters, station_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![house.id, house.house_number, house.total_voters, house.station_id],
    )
    .context("Failed to insert house")?;
    Ok(())
}

pub fn insert_voter(conn: &Connection, voter: &Voter) -> Result<()> {
    conn.execute(
        "INSERT INTO voters (id, serial_number, met, house_id) VALUES (?1, ?2, ?3, ?4)",
        params![voter.id, voter.serial_number, voter.met as i64, voter.house_id],
    )
    .context("Failed to insert voter")?;
    Ok(())
}

// ============================================================================
// Users
// ============================================================================

pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, password_hash, role FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    match row {
        None => Ok(None),
        Some((id, username, password_hash, role_str)) => {
            let role = Role::parse(&role_str)
                .with_context(|| format!("User {} has unknown role {:?}", username, role_str))?;
            Ok(Some(User {
                id,
                username,
                password_hash,
                role,
            }))
        }
    }
}

// ============================================================================
// Stations + houses + voters
// ============================================================================

/// A house together with its voters, ordered by serial number.
#[derive(Debug, Clone)]
pub struct HouseWithVoters {
    pub house: House,
    pub voters: Vec<Voter>,
}

/// A station with all its houses loaded, houses in natural number order.
#[derive(Debug, Clone)]
pub struct StationWithHouses {
    pub station: PollingStation,
    pub houses: Vec<HouseWithVoters>,
}

fn station_from_row(row: &rusqlite::Row) -> rusqlite::Result<PollingStation> {
    Ok(PollingStation {
        id: row.get(0)?,
        ps_number: row.get(1)?,
        ps_name: row.get(2)?,
        ward: row.get(3)?,
        incharge_name: row.get(4)?,
    })
}

fn house_from_row(row: &rusqlite::Row) -> rusqlite::Result<House> {
    Ok(House {
        id: row.get(0)?,
        house_number: row.get(1)?,
        total_voters: row.get(2)?,
        station_id: row.get(3)?,
    })
}

fn voter_from_row(row: &rusqlite::Row) -> rusqlite::Result<Voter> {
    Ok(Voter {
        id: row.get(0)?,
        serial_number: row.get(1)?,
        met: row.get::<_, i64>(2)? != 0,
        house_id: row.get(3)?,
    })
}

pub fn get_station(conn: &Connection, station_id: &str) -> Result<Option<PollingStation>> {
    let station = conn
        .query_row(
            "SELECT id, ps_number, ps_name, ward, incharge_name
             FROM polling_stations WHERE id = ?1",
            params![station_id],
            station_from_row,
        )
        .optional()?;
    Ok(station)
}

/// Load every station with its full house/voter tree.
///
/// Three whole-table scans grouped in memory: at this data scale the
/// statistics are recomputed on every read instead of being maintained
/// as incremental counters.
pub fn load_all_stations(conn: &Connection) -> Result<Vec<StationWithHouses>> {
    let mut stmt = conn.prepare(
        "SELECT id, ps_number, ps_name, ward, incharge_name FROM polling_stations",
    )?;
    let mut stations: Vec<PollingStation> = stmt
        .query_map([], station_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    stations.sort_by(|a, b| progress::natural_cmp(&a.ps_number, &b.ps_number));

    let mut stmt =
        conn.prepare("SELECT id, house_number, total_voters, station_id FROM houses")?;
    let houses: Vec<House> = stmt
        .query_map([], house_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, serial_number, met, house_id FROM voters ORDER BY serial_number ASC",
    )?;
    let voters: Vec<Voter> = stmt
        .query_map([], voter_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut voters_by_house: HashMap<String, Vec<Voter>> = HashMap::new();
    for v in voters {
        voters_by_house.entry(v.house_id.clone()).or_default().push(v);
    }

    let mut houses_by_station: HashMap<String, Vec<HouseWithVoters>> = HashMap::new();
    for h in houses {
        let voters = voters_by_house.remove(&h.id).unwrap_or_default();
        houses_by_station
            .entry(h.station_id.clone())
            .or_default()
            .push(HouseWithVoters { house: h, voters });
    }

    let result = stations
        .into_iter()
        .map(|station| {
            let mut houses = houses_by_station.remove(&station.id).unwrap_or_default();
            houses.sort_by(|a, b| {
                progress::natural_cmp(&a.house.house_number, &b.house.house_number)
            });
            StationWithHouses { station, houses }
        })
        .collect();

    Ok(result)
}

/// Load one station's full tree. None if the station is unknown.
pub fn load_station(conn: &Connection, station_id: &str) -> Result<Option<StationWithHouses>> {
    let Some(station) = get_station(conn, station_id)? else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT id, house_number, total_voters, station_id
         FROM houses WHERE station_id = ?1",
    )?;
    let houses: Vec<House> = stmt
        .query_map(params![station_id], house_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT v.id, v.serial_number, v.met, v.house_id
         FROM voters v JOIN houses h ON v.house_id = h.id
         WHERE h.station_id = ?1
         ORDER BY v.serial_number ASC",
    )?;
    let voters: Vec<Voter> = stmt
        .query_map(params![station_id], voter_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut voters_by_house: HashMap<String, Vec<Voter>> = HashMap::new();
    for v in voters {
        voters_by_house.entry(v.house_id.clone()).or_default().push(v);
    }

    let mut houses: Vec<HouseWithVoters> = houses
        .into_iter()
        .map(|h| {
            let voters = voters_by_house.remove(&h.id).unwrap_or_default();
            HouseWithVoters { house: h, voters }
        })
        .collect();
    houses.sort_by(|a, b| progress::natural_cmp(&a.house.house_number, &b.house.house_number));

    Ok(Some(StationWithHouses { station, houses }))
}

/// Reassign a station's incharge. Returns the updated summary, or None if
/// the station does not exist.
pub fn update_incharge(
    conn: &Connection,
    station_id: &str,
    incharge_name: &str,
) -> Result<Option<StationSummary>> {
    let changed = conn.execute(
        "UPDATE polling_stations SET incharge_name = ?1 WHERE id = ?2",
        params![incharge_name, station_id],
    )?;

    if changed == 0 {
        return Ok(None);
    }

    Ok(get_station(conn, station_id)?.map(StationSummary::from))
}

// ============================================================================
// Update guard - agent voter-state submission
// ============================================================================

/// One submitted `{id, met}` pair from an agent's house visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterMark {
    pub id: String,
    pub met: bool,
}

/// Extract the well-formed `{id, met}` entries from a submitted list.
///
/// Entries with a non-string id or non-bool met are silently dropped:
/// partial submissions are tolerated, and the caller reconciles against
/// the returned house state instead of getting an error.
pub fn parse_marks(raw: &[serde_json::Value]) -> Vec<VoterMark> {
    raw.iter()
        .filter_map(|v| {
            let id = v.get("id")?.as_str()?;
            let met = v.get("met")?.as_bool()?;
            Some(VoterMark {
                id: id.to_string(),
                met,
            })
        })
        .collect()
}

/// Apply an agent's submitted marks to one house's voters.
///
/// Enforces the ratchet: `met` only ever transitions false → true through
/// this path. A submitted true → false flip is skipped, never applied, so
/// no agent can erase previously recorded progress. Unchanged entries are
/// skipped too (no redundant writes), as are ids that don't belong to this
/// house.
///
/// Each accepted flip is one durable write; the batch is deliberately not
/// wrapped in a transaction. A crash mid-batch leaves a partially applied
/// submission that is safe to retry, since every write is an idempotent
/// monotonic flip.
///
/// Returns the house's fresh state so the caller can reconcile its local
/// view with what was actually persisted. None if the house is unknown.
pub fn apply_voter_marks(
    conn: &Connection,
    house_id: &str,
    marks: &[VoterMark],
) -> Result<Option<HouseDetail>> {
    let house = conn
        .query_row(
            "SELECT id, house_number, total_voters, station_id FROM houses WHERE id = ?1",
            params![house_id],
            house_from_row,
        )
        .optional()?;

    let Some(house) = house else {
        return Ok(None);
    };

    let current: HashMap<String, bool> = {
        let mut stmt = conn.prepare("SELECT id, met FROM voters WHERE house_id = ?1")?;
        let rows = stmt
            .query_map(params![house_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? != 0))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    };

    for mark in marks {
        let Some(&currently_met) = current.get(&mark.id) else {
            // Not a voter of this house
            continue;
        };

        // Ratchet: a saved contact can never be unchecked
        if currently_met && !mark.met {
            continue;
        }
        // No change, no write
        if currently_met == mark.met {
            continue;
        }

        conn.execute(
            "UPDATE voters SET met = ?1 WHERE id = ?2",
            params![mark.met as i64, mark.id],
        )?;
    }

    let mut stmt = conn.prepare(
        "SELECT id, serial_number, met, house_id
         FROM voters WHERE house_id = ?1
         ORDER BY serial_number ASC",
    )?;
    let voters: Vec<Voter> = stmt
        .query_map(params![house_id], voter_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let status = house_status(&voters);

    Ok(Some(HouseDetail {
        id: house.id,
        house_number: house.house_number,
        total_voters: house.total_voters,
        status,
        voters,
    }))
}
