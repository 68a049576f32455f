//! Weighted mirror selection
//!
//! Each specialty owns a table of mirror weights. Sampling draws a value in
//! `[0, sum)` and walks the cumulative bounds. The reserved name
//! [`SELF_SERVER`] counts toward the sum but has no bound, so draws landing
//! in its share come back empty and the request is served locally.

use std::collections::{BTreeMap, HashMap};

use super::random::RandomSource;
use super::specialty::Specialty;

/// Mirror name meaning "this server"
pub const SELF_SERVER: &str = "self";

// ============================================================================
// Weight Table
// ============================================================================

/// Compiled weights of one specialty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightTable {
    weights: BTreeMap<String, u32>,
    servers: Vec<String>,
    bounds: Vec<u32>,
    sum: u32,
}

impl WeightTable {
    /// Compile a table from mirror weights
    pub fn new(weights: BTreeMap<String, u32>) -> Self {
        let mut servers = Vec::new();
        let mut bounds = Vec::new();
        let mut sum: u32 = 0;

        for (server, &weight) in &weights {
            sum = sum.saturating_add(weight);
            if server != SELF_SERVER && weight > 0 {
                servers.push(server.clone());
                bounds.push(weight);
            }
        }

        Self {
            weights,
            servers,
            bounds,
            sum,
        }
    }

    /// Sum of all weights, including [`SELF_SERVER`]
    pub fn sum(&self) -> u32 {
        self.sum
    }

    /// Configured weights
    pub fn weights(&self) -> &BTreeMap<String, u32> {
        &self.weights
    }

    /// Draw a mirror; `None` means serve locally
    pub fn sample(&self, random: &dyn RandomSource) -> Option<&str> {
        if self.sum == 0 {
            return None;
        }

        let mut value = random.next_below(self.sum);
        for (server, &bound) in self.servers.iter().zip(&self.bounds) {
            if value < bound {
                return Some(server);
            }
            value -= bound;
        }
        None
    }

    /// Share of `server` in whole percent, rounded down
    pub fn percent(&self, server: &str) -> u32 {
        if self.sum == 0 {
            return 0;
        }
        let weight = self.weights.get(server).copied().unwrap_or(0);
        (u64::from(weight) * 100 / u64::from(self.sum)) as u32
    }
}

// ============================================================================
// Server Pool
// ============================================================================

/// Weight tables for all specialties
#[derive(Debug, Clone, Default)]
pub struct ServerPool {
    tables: HashMap<Specialty, WeightTable>,
}

impl ServerPool {
    /// Create a pool from per-specialty tables
    pub fn new(tables: HashMap<Specialty, WeightTable>) -> Self {
        Self { tables }
    }

    /// Table of one specialty, if configured
    pub fn table(&self, specialty: Specialty) -> Option<&WeightTable> {
        self.tables.get(&specialty)
    }

    /// Draw a mirror for `specialty`; `None` means serve locally
    pub fn sample(&self, specialty: Specialty, random: &dyn RandomSource) -> Option<&str> {
        self.table(specialty)?.sample(random)
    }

    /// Share of `server` within `specialty` in whole percent
    pub fn percent(&self, specialty: Specialty, server: &str) -> u32 {
        self.table(specialty).map_or(0, |t| t.percent(server))
    }

    /// Percent table of every configured specialty
    pub fn percentages(&self) -> BTreeMap<Specialty, BTreeMap<String, u32>> {
        self.tables
            .iter()
            .map(|(specialty, table)| {
                let shares = table
                    .weights()
                    .keys()
                    .map(|server| (server.clone(), table.percent(server)))
                    .collect();
                (*specialty, shares)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::random::{SeededRandom, SequenceRandom};

    fn table(entries: &[(&str, u32)]) -> WeightTable {
        WeightTable::new(entries.iter().map(|(s, w)| (s.to_string(), *w)).collect())
    }

    #[test]
    fn test_sample_distribution_matches_weights() {
        let t = table(&[("a.example.net", 30), ("b.example.net", 50), ("c.example.net", 20)]);
        let random = SeededRandom::new(7);

        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..10_000 {
            let server = t.sample(&random).unwrap();
            *counts.entry(server.to_string()).or_default() += 1;
        }

        let share = |name: &str| f64::from(counts[name]) / 10_000.0;
        assert!((0.27..=0.33).contains(&share("a.example.net")));
        assert!((0.47..=0.53).contains(&share("b.example.net")));
        assert!((0.17..=0.23).contains(&share("c.example.net")));
    }

    #[test]
    fn test_cumulative_walk() {
        // servers sorted: a(30) then b(70)
        let t = table(&[("b", 70), ("a", 30)]);
        assert_eq!(t.sample(&SequenceRandom::new([0])), Some("a"));
        assert_eq!(t.sample(&SequenceRandom::new([29])), Some("a"));
        assert_eq!(t.sample(&SequenceRandom::new([30])), Some("b"));
        assert_eq!(t.sample(&SequenceRandom::new([99])), Some("b"));
    }

    #[test]
    fn test_self_share_falls_through_to_local() {
        let t = table(&[("mirror", 40), (SELF_SERVER, 60)]);
        assert_eq!(t.sum(), 100);
        assert_eq!(t.sample(&SequenceRandom::new([39])), Some("mirror"));
        assert_eq!(t.sample(&SequenceRandom::new([40])), None);
        assert_eq!(t.sample(&SequenceRandom::new([99])), None);
        assert_eq!(t.percent(SELF_SERVER), 60);
    }

    #[test]
    fn test_empty_table_is_local() {
        let t = table(&[]);
        assert_eq!(t.sum(), 0);
        assert_eq!(t.sample(&SequenceRandom::new([5])), None);
        assert_eq!(t.percent("anything"), 0);
    }

    #[test]
    fn test_percent_rounds_down() {
        let t = table(&[("a", 1), ("b", 2)]);
        assert_eq!(t.percent("a"), 33);
        assert_eq!(t.percent("b"), 66);
        assert_eq!(t.percent("c"), 0);
    }

    #[test]
    fn test_pool_by_specialty() {
        let mut tables = HashMap::new();
        tables.insert(Specialty::Wiki, table(&[("wiki.example.net", 1)]));
        let pool = ServerPool::new(tables);

        let random = SequenceRandom::new([0]);
        assert_eq!(pool.sample(Specialty::Wiki, &random), Some("wiki.example.net"));
        assert_eq!(pool.sample(Specialty::Main, &random), None);
        assert_eq!(pool.percent(Specialty::Wiki, "wiki.example.net"), 100);
        assert_eq!(pool.percentages()[&Specialty::Wiki]["wiki.example.net"], 100);
    }
}
