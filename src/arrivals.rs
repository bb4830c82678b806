//! План прибытия граждан

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::config::StationConfig;
use crate::core::Duration;
use crate::SimError;

/// Прибытие: ждать `after` после предыдущего, затем породить процесс
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedArrival {
    pub after: Duration,
    pub crime: String,
    pub high_priority: bool,
}

impl PlannedArrival {
    pub fn case(after: u64, crime: &str) -> Self {
        Self {
            after: Duration::from_units(after),
            crime: crime.to_string(),
            high_priority: false,
        }
    }

    pub fn high_priority(after: u64) -> Self {
        Self {
            after: Duration::from_units(after),
            crime: String::new(),
            high_priority: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalPlan {
    arrivals: Vec<PlannedArrival>,
}

impl ArrivalPlan {
    /// Случайный поток: число граждан, затем для каждого задержка и вид преступления
    pub fn generate<R: Rng + ?Sized>(config: &StationConfig, rng: &mut R) -> Self {
        let count = config.citizens.sample(rng) as usize;
        let hint = config.nominal_interarrival.sample(rng);
        debug!("Граждан за прогон: {}, номинальный интервал {}", count, hint);

        let mut arrivals = Vec::with_capacity(count);
        for index in 0..count {
            let after = Duration::from_units(config.interarrival.sample(rng));
            let Some(kind) = config.crimes.choose(rng) else {
                break;
            };
            arrivals.push(PlannedArrival {
                after,
                crime: kind.name.clone(),
                high_priority: config.high_priority.citizen_index == Some(index),
            });
        }
        Self { arrivals }
    }

    pub fn scripted(arrivals: Vec<PlannedArrival>) -> Self {
        Self { arrivals }
    }

    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlannedArrival> {
        self.arrivals.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedArrival> {
        self.arrivals.iter()
    }

    /// Все обычные заявления должны ссылаться на преступления из каталога
    pub fn validate(&self, config: &StationConfig) -> Result<(), SimError> {
        for arrival in self.arrivals.iter().filter(|a| !a.high_priority) {
            if config.priority_of(&arrival.crime).is_none() {
                return Err(SimError::Config(format!(
                    "planned arrival names unknown crime '{}'",
                    arrival.crime
                )));
            }
        }
        Ok(())
    }
}
