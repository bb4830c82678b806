//! Сводная статистика прогона

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::config::StationConfig;
use crate::core::SimTime;
use crate::process::Outcome;
use crate::resources::PoolStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrimeTally {
    pub crime: String,
    pub arrivals: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerTally {
    pub officer: String,
    pub caught: u64,
}

/// Счётчики, которые меняют процессы заявлений. Незавершённые к горизонту
/// заявления учитываются только как прибытия.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStats {
    crimes: Vec<CrimeTally>,
    officers: Vec<OfficerTally>,
    cases_assigned: u64,
    criminals_caught: u64,
    criminals_not_caught: u64,
    cases_interrupted: u64,
}

impl SimulationStats {
    pub fn new(config: &StationConfig) -> Self {
        Self {
            crimes: config
                .crimes
                .iter()
                .map(|kind| CrimeTally { crime: kind.name.clone(), arrivals: 0 })
                .collect(),
            officers: config
                .officer_names()
                .into_iter()
                .map(|officer| OfficerTally { officer, caught: 0 })
                .collect(),
            ..Self::default()
        }
    }

    pub fn record_arrival(&mut self, crime: &str) {
        match self.crimes.iter_mut().find(|t| t.crime == crime) {
            Some(tally) => tally.arrivals += 1,
            None => self.crimes.push(CrimeTally { crime: crime.to_string(), arrivals: 1 }),
        }
    }

    pub fn record_assignment(&mut self) {
        self.cases_assigned += 1;
    }

    pub fn record_resolution(&mut self, outcome: Outcome, officer: usize) {
        match outcome {
            Outcome::Caught => {
                self.criminals_caught += 1;
                if let Some(tally) = self.officers.get_mut(officer) {
                    tally.caught += 1;
                }
            }
            Outcome::NotCaught => self.criminals_not_caught += 1,
        }
    }

    pub fn record_interruption(&mut self) {
        self.cases_interrupted += 1;
    }

    pub fn cases_registered(&self) -> u64 {
        self.crimes.iter().map(|t| t.arrivals).sum()
    }

    pub fn arrivals_for(&self, crime: &str) -> u64 {
        self.crimes
            .iter()
            .find(|t| t.crime == crime)
            .map_or(0, |t| t.arrivals)
    }

    pub fn cases_assigned(&self) -> u64 {
        self.cases_assigned
    }

    pub fn criminals_caught(&self) -> u64 {
        self.criminals_caught
    }

    pub fn criminals_not_caught(&self) -> u64 {
        self.criminals_not_caught
    }

    pub fn cases_interrupted(&self) -> u64 {
        self.cases_interrupted
    }

    pub fn caught_by(&self, officer: usize) -> u64 {
        self.officers.get(officer).map_or(0, |t| t.caught)
    }

    pub fn crimes(&self) -> &[CrimeTally] {
        &self.crimes
    }

    pub fn officers(&self) -> &[OfficerTally] {
        &self.officers
    }
}

/// Итог прогона для отчёта
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub seed: u64,
    pub final_time: SimTime,
    pub cases_registered: u64,
    pub cases_assigned: u64,
    pub criminals_caught: u64,
    pub criminals_not_caught: u64,
    pub cases_interrupted: u64,
    pub shift_changes: u32,
    /// Возобновления, оставшиеся в очереди после горизонта
    pub abandoned_events: usize,
    pub crimes: Vec<CrimeTally>,
    pub officers: Vec<OfficerTally>,
    pub officer_pools: Vec<PoolStats>,
    pub desk_pool: PoolStats,
}

impl Summary {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of cases registered: {}", self.cases_registered)?;
        writeln!(f, "Number of criminals caught: {}", self.criminals_caught)?;
        writeln!(f, "Number of criminals not caught: {}", self.criminals_not_caught)?;
        writeln!(f, "Criminals caught by each officer:")?;
        for tally in &self.officers {
            writeln!(f, "{}: {}", tally.officer, tally.caught)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero_for_catalog_and_officers() {
        let stats = SimulationStats::new(&StationConfig::default());
        assert_eq!(stats.crimes().len(), 5);
        assert_eq!(stats.officers().len(), 5);
        assert_eq!(stats.cases_registered(), 0);
        assert_eq!(stats.caught_by(0), 0);
    }

    #[test]
    fn test_resolution_updates_officer_only_when_caught() {
        let mut stats = SimulationStats::new(&StationConfig::default());
        stats.record_arrival("theft");
        stats.record_arrival("theft");
        stats.record_arrival("murder");
        stats.record_assignment();
        stats.record_assignment();
        stats.record_resolution(Outcome::Caught, 2);
        stats.record_resolution(Outcome::NotCaught, 2);

        assert_eq!(stats.cases_registered(), 3);
        assert_eq!(stats.arrivals_for("theft"), 2);
        assert_eq!(stats.criminals_caught(), 1);
        assert_eq!(stats.criminals_not_caught(), 1);
        assert_eq!(stats.caught_by(2), 1);
        assert_eq!(stats.caught_by(0), 0);
    }

    #[test]
    fn test_summary_display() {
        let summary = Summary {
            seed: 1,
            final_time: SimTime::new(1800),
            cases_registered: 9,
            cases_assigned: 6,
            criminals_caught: 3,
            criminals_not_caught: 2,
            cases_interrupted: 1,
            shift_changes: 2,
            abandoned_events: 4,
            crimes: vec![],
            officers: vec![
                OfficerTally { officer: "officer 1".into(), caught: 2 },
                OfficerTally { officer: "officer 2".into(), caught: 1 },
            ],
            officer_pools: vec![],
            desk_pool: PoolStats::default(),
        };

        let text = summary.to_string();
        assert!(text.starts_with("Number of cases registered: 9\n"));
        assert!(text.contains("Number of criminals not caught: 2\n"));
        assert!(text.ends_with("officer 1: 2\nofficer 2: 1\n"));
        assert_eq!(summary.to_json()["criminals_caught"], 3);
    }
}
