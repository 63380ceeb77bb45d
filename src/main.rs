use anyhow::Result;
use rusqlite::Connection;
use std::env;
use std::path::Path;

// Use library instead of local modules
use canvass::{load_all_stations, overall_stats, run_seed, station_stats, ServerConfig};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("seed") => run_seed_cmd(),
        Some("stats") => run_stats_cmd(),
        _ => {
            eprintln!("Usage: canvass <seed|stats>");
            eprintln!("  seed   wipe and re-provision the database from the ward plan");
            eprintln!("  stats  print overall canvassing progress");
            eprintln!("\nDatabase path comes from CANVASS_DB (default: canvass.db)");
            std::process::exit(1);
        }
    }
}

fn run_seed_cmd() -> Result<()> {
    let config = ServerConfig::from_env();

    println!("🗳️  Canvass - Database Seeding");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n🔧 Setting up database at {}...", config.db_path);
    let conn = Connection::open(&config.db_path)?;

    println!("💾 Provisioning ward plan...");
    let summary = run_seed(&conn)?;

    println!("\n✓ Seed complete:");
    println!("  {} polling stations", summary.stations);
    println!("  {} houses", summary.houses);
    println!("  {} voters (all unmet)", summary.voters);
    println!("  Users created: admin / admin123, agent / agent123");

    Ok(())
}

fn run_stats_cmd() -> Result<()> {
    let config = ServerConfig::from_env();

    if !Path::new(&config.db_path).exists() {
        eprintln!("❌ Database not found at {}", config.db_path);
        eprintln!("   Run: canvass seed");
        std::process::exit(1);
    }

    let conn = Connection::open(&config.db_path)?;
    let stations = load_all_stations(&conn)?;

    println!("📊 Canvassing progress");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut per_station = Vec::new();
    for s in &stations {
        let stats = station_stats(s.houses.iter().map(|h| h.voters.as_slice()));
        println!(
            "PS {:>4}  {:<32} {:>3}% ({}/{} voters, {}/{} houses complete)",
            s.station.ps_number,
            s.station.ps_name,
            stats.completion_percentage,
            stats.voters_met,
            stats.total_voters,
            stats.houses_completed,
            stats.total_houses,
        );
        per_station.push(stats);
    }

    let overall = overall_stats(&per_station);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Overall: {} stations, {}/{} voters met ({}%)",
        overall.total_stations, overall.voters_met, overall.total_voters, overall.completion_percentage
    );

    Ok(())
}
