// 📊 Progress Calculator
//
// Pure derivation of visit status and completion statistics from voter
// `met` flags. Nothing in this module mutates state; handlers recompute
// on every read rather than maintaining incremental counters.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::entities::Voter;

// ============================================================================
// HOUSE STATUS
// ============================================================================

/// Derived visit status of a single house. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseStatus {
    /// No voter in the house has been met
    NotMet,

    /// Some but not all voters met
    Partial,

    /// Every voter met (requires at least one voter)
    Complete,
}

/// Derive a house's status from its voters.
///
/// A house with zero voters is `NotMet`: "complete" always requires at
/// least one actual contact.
pub fn house_status(voters: &[Voter]) -> HouseStatus {
    let met = voters.iter().filter(|v| v.met).count();

    if met == 0 {
        HouseStatus::NotMet
    } else if met == voters.len() {
        HouseStatus::Complete
    } else {
        HouseStatus::Partial
    }
}

// ============================================================================
// STATION STATISTICS
// ============================================================================

/// Per-station completion statistics, derived on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationStats {
    pub total_houses: i64,
    /// Houses with at least one voter met
    pub houses_visited: i64,
    /// Houses where every voter is met (and there is at least one voter)
    pub houses_completed: i64,
    /// Visited but not completed
    pub houses_partial: i64,
    /// Not yet visited at all
    pub houses_pending: i64,
    pub total_voters: i64,
    pub voters_met: i64,
    pub voters_not_met: i64,
    /// round(100 * voters_met / total_voters); 0 when there are no voters
    pub completion_percentage: i64,
}

/// Compute a station's statistics from its houses' voter lists.
pub fn station_stats<'a, I>(houses: I) -> StationStats
where
    I: IntoIterator<Item = &'a [Voter]>,
{
    let mut total_houses = 0i64;
    let mut houses_visited = 0i64;
    let mut houses_completed = 0i64;
    let mut total_voters = 0i64;
    let mut voters_met = 0i64;

    for voters in houses {
        total_houses += 1;
        total_voters += voters.len() as i64;

        let met = voters.iter().filter(|v| v.met).count() as i64;
        voters_met += met;

        if met > 0 {
            houses_visited += 1;
        }
        if met > 0 && met == voters.len() as i64 {
            houses_completed += 1;
        }
    }

    let houses_partial = houses_visited - houses_completed;

    StationStats {
        total_houses,
        houses_visited,
        houses_completed,
        houses_partial,
        houses_pending: total_houses - houses_visited,
        total_voters,
        voters_met,
        voters_not_met: total_voters - voters_met,
        completion_percentage: percentage(voters_met, total_voters),
    }
}

/// Overall aggregate across every station, obtained by summing per-station
/// stats (never re-derived from raw voters, so the totals always reconcile
/// with the per-station rows shown next to them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_stations: i64,
    pub total_houses: i64,
    pub houses_completed: i64,
    pub total_voters: i64,
    pub voters_met: i64,
    pub voters_not_met: i64,
    pub completion_percentage: i64,
}

pub fn overall_stats(stations: &[StationStats]) -> OverallStats {
    let mut total_houses = 0i64;
    let mut houses_completed = 0i64;
    let mut total_voters = 0i64;
    let mut voters_met = 0i64;

    for s in stations {
        total_houses += s.total_houses;
        houses_completed += s.houses_completed;
        total_voters += s.total_voters;
        voters_met += s.voters_met;
    }

    OverallStats {
        total_stations: stations.len() as i64,
        total_houses,
        houses_completed,
        total_voters,
        voters_met,
        voters_not_met: total_voters - voters_met,
        completion_percentage: percentage(voters_met, total_voters),
    }
}

/// round(100 * met / total), with the zero-voter degenerate case pinned
/// to 0 instead of dividing by zero.
fn percentage(met: i64, total: i64) -> i64 {
    if total == 0 {
        0
    } else {
        ((met as f64 / total as f64) * 100.0).round() as i64
    }
}

// ============================================================================
// NATURAL ORDERING
// ============================================================================

/// Numeric-aware comparison for block-style house numbers, so "4-1-9"
/// sorts before "4-1-10" (plain lexicographic order would reverse them).
///
/// The string is walked as alternating digit / non-digit runs; digit runs
/// compare as integers, everything else compares case-insensitively.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let na = take_number(&mut ai);
                    let nb = take_number(&mut bi);
                    match na.cmp(&nb) {
                        Ordering::Equal => {}
                        ord => return ord,
                    }
                } else {
                    let la = ca.to_ascii_lowercase();
                    let lb = cb.to_ascii_lowercase();
                    match la.cmp(&lb) {
                        Ordering::Equal => {
                            ai.next();
                            bi.next();
                        }
                        ord => return ord,
                    }
                }
            }
        }
    }
}

/// Consume a run of digits and return its value. Saturates instead of
/// overflowing on absurdly long runs.
fn take_number(it: &mut std::iter::Peekable<std::str::Chars>) -> u64 {
    let mut n: u64 = 0;
    while let Some(&c) = it.peek() {
        if let Some(d) = c.to_digit(10) {
            n = n.saturating_mul(10).saturating_add(d as u64);
            it.next();
        } else {
            break;
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voters(flags: &[bool]) -> Vec<Voter> {
        flags
            .iter()
            .enumerate()
            .map(|(i, &met)| {
                let mut v = Voter::new(i as i64 + 1, "house-1");
                v.met = met;
                v
            })
            .collect()
    }

    #[test]
    fn test_house_status_labels() {
        assert_eq!(house_status(&voters(&[false, false])), HouseStatus::NotMet);
        assert_eq!(house_status(&voters(&[true, false])), HouseStatus::Partial);
        assert_eq!(house_status(&voters(&[true, true])), HouseStatus::Complete);
    }

    #[test]
    fn test_house_status_zero_voters_is_not_met() {
        // Degenerate case: an empty house is never "complete"
        assert_eq!(house_status(&[]), HouseStatus::NotMet);
    }

    #[test]
    fn test_station_stats_counts() {
        let houses = vec![
            voters(&[true, true, true]),   // complete
            voters(&[true, false, false]), // partial
            voters(&[false, false]),       // pending
        ];
        let stats = station_stats(houses.iter().map(|h| h.as_slice()));

        assert_eq!(stats.total_houses, 3);
        assert_eq!(stats.houses_visited, 2);
        assert_eq!(stats.houses_completed, 1);
        assert_eq!(stats.houses_partial, 1);
        assert_eq!(stats.houses_pending, 1);
        assert_eq!(stats.total_voters, 8);
        assert_eq!(stats.voters_met, 4);
        assert_eq!(stats.voters_not_met, 4);
        assert_eq!(stats.completion_percentage, 50);
    }

    #[test]
    fn test_percentage_bounds() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(0, 7), 0);
        assert_eq!(percentage(7, 7), 100);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);

        // Stays inside [0, 100] for any non-negative counts
        for total in 0..50i64 {
            for met in 0..=total {
                let p = percentage(met, total);
                assert!((0..=100).contains(&p), "met={} total={} p={}", met, total, p);
            }
        }
    }

    #[test]
    fn test_overall_matches_per_station_sums() {
        let a = station_stats(
            [voters(&[true, true]), voters(&[false])]
                .iter()
                .map(|h| h.as_slice()),
        );
        let b = station_stats(
            [voters(&[true, false, false])]
                .iter()
                .map(|h| h.as_slice()),
        );

        let overall = overall_stats(&[a, b]);

        assert_eq!(overall.total_stations, 2);
        assert_eq!(overall.total_houses, a.total_houses + b.total_houses);
        assert_eq!(overall.total_voters, a.total_voters + b.total_voters);
        assert_eq!(overall.voters_met, a.voters_met + b.voters_met);
        assert_eq!(
            overall.houses_completed,
            a.houses_completed + b.houses_completed
        );
        assert_eq!(overall.voters_not_met, overall.total_voters - overall.voters_met);
    }

    #[test]
    fn test_natural_cmp_block_numbers() {
        let mut numbers = vec!["4-1-2", "4-1-10", "4-1-1"];
        numbers.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(numbers, vec!["4-1-1", "4-1-2", "4-1-10"]);
    }

    #[test]
    fn test_natural_cmp_mixed_runs() {
        assert_eq!(natural_cmp("4-1-9", "4-1-10"), Ordering::Less);
        assert_eq!(natural_cmp("4-1-403", "4-1-403"), Ordering::Equal);
        assert_eq!(natural_cmp("12B", "12a"), Ordering::Greater);
        assert_eq!(natural_cmp("2", "10"), Ordering::Less);
        assert_eq!(natural_cmp("A-2", "A-2-1"), Ordering::Less);
    }
}
