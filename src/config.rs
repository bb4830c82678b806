//! Конфигурация участка: штат, каталог преступлений, диапазоны случайных величин

use std::collections::HashSet;
use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::{Duration, Priority, SimTime};
use crate::SimError;

/// Предел числа пересменок до горизонта: каждая из них отдельный шаг очереди
pub const MAX_SHIFT_CHANGES: u64 = 1_000_000;

/// Замкнутый диапазон `[min, max]` в единицах времени (или штуках)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRange {
    pub min: u64,
    pub max: u64,
}

impl UnitRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub const fn fixed(value: u64) -> Self {
        Self { min: value, max: value }
    }

    /// Равномерная выборка из диапазона включительно
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min..=self.max)
    }

    fn validate(&self, what: &str) -> Result<(), SimError> {
        if self.min > self.max {
            return Err(SimError::Config(format!(
                "{} range is empty: min {} > max {}",
                what, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Вид преступления и его фиксированный приоритет
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrimeKind {
    pub name: String,
    pub priority: Priority,
}

impl CrimeKind {
    pub fn new(name: &str, priority: u8) -> Self {
        Self {
            name: name.to_string(),
            priority: Priority(priority),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighPriorityConfig {
    /// Порядковый номер прибытия (с нуля), которое становится особым случаем
    pub citizen_index: Option<usize>,
    pub checkpoint: SimTime,
    pub occupancy: UnitRange,
    /// Приоритет, с которым занимается сотрудник
    pub priority: Priority,
}

impl Default for HighPriorityConfig {
    fn default() -> Self {
        Self {
            citizen_index: Some(1),
            checkpoint: SimTime::new(600),
            occupancy: UnitRange::new(600, 900),
            priority: Priority(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub officers: usize,
    pub desks: usize,
    pub horizon: SimTime,
    pub crimes: Vec<CrimeKind>,
    pub citizens: UnitRange,
    /// Номинальный интервал прибытия; только логируется
    pub nominal_interarrival: UnitRange,
    pub interarrival: UnitRange,
    pub service: UnitRange,
    pub high_priority: HighPriorityConfig,
    pub shift_interval: Duration,
    pub seed: Option<u64>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            officers: 5,
            desks: 3,
            horizon: SimTime::new(30 * 60),
            crimes: default_crimes(),
            citizens: UnitRange::new(100, 150),
            nominal_interarrival: UnitRange::new(300, 600),
            interarrival: UnitRange::new(150, 210),
            service: UnitRange::new(150, 300),
            high_priority: HighPriorityConfig::default(),
            shift_interval: Duration::from_units(15 * 60),
            seed: None,
        }
    }
}

pub fn default_crimes() -> Vec<CrimeKind> {
    vec![
        CrimeKind::new("murder", 1),
        CrimeKind::new("stalking", 2),
        CrimeKind::new("theft", 3),
        CrimeKind::new("bike stealing", 4),
        CrimeKind::new("pickpocket", 5),
    ]
}

impl StationConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, SimError> {
        let config: StationConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        debug!("Загрузка конфигурации из {}", path.display());
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.officers == 0 {
            return Err(SimError::Config("officer count must be positive".into()));
        }
        if self.desks == 0 {
            return Err(SimError::Config("desk count must be positive".into()));
        }
        if self.crimes.is_empty() {
            return Err(SimError::Config("crime catalog is empty".into()));
        }

        let mut seen = HashSet::new();
        for crime in &self.crimes {
            if !seen.insert(crime.name.as_str()) {
                return Err(SimError::Config(format!(
                    "crime '{}' listed twice in catalog",
                    crime.name
                )));
            }
        }

        self.citizens.validate("citizen count")?;
        self.nominal_interarrival.validate("nominal inter-arrival")?;
        self.interarrival.validate("inter-arrival")?;
        self.service.validate("service duration")?;
        self.high_priority.occupancy.validate("high-priority occupancy")?;

        if self.shift_interval == Duration::ZERO {
            return Err(SimError::Config("shift interval must be positive".into()));
        }
        let shift_changes = self.horizon.as_units() / self.shift_interval.as_units();
        if shift_changes > MAX_SHIFT_CHANGES {
            return Err(SimError::Config(format!(
                "horizon {} needs {} shift changes, at most {} allowed",
                self.horizon.as_units(),
                shift_changes,
                MAX_SHIFT_CHANGES
            )));
        }
        Ok(())
    }

    pub fn priority_of(&self, crime: &str) -> Option<Priority> {
        self.crimes
            .iter()
            .find(|kind| kind.name == crime)
            .map(|kind| kind.priority)
    }

    pub fn officer_names(&self) -> Vec<String> {
        (1..=self.officers).map(|i| format!("officer {}", i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::io::Write;

    #[test]
    fn test_default_is_reference_station() {
        let config = StationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.officers, 5);
        assert_eq!(config.desks, 3);
        assert_eq!(config.horizon, SimTime::new(1800));
        assert_eq!(config.priority_of("murder"), Some(Priority(1)));
        assert_eq!(config.priority_of("pickpocket"), Some(Priority(5)));
        assert_eq!(config.priority_of("arson"), None);
        assert_eq!(config.officer_names()[4], "officer 5");
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let cases: [fn(&mut StationConfig); 7] = [
            |c: &mut StationConfig| c.officers = 0,
            |c: &mut StationConfig| c.desks = 0,
            |c: &mut StationConfig| c.crimes.clear(),
            |c: &mut StationConfig| c.crimes.push(CrimeKind::new("theft", 2)),
            |c: &mut StationConfig| c.service = UnitRange::new(300, 150),
            |c: &mut StationConfig| c.shift_interval = Duration::ZERO,
            |c: &mut StationConfig| c.horizon = SimTime::new(u64::MAX),
        ];

        for mutate in cases {
            let mut config = StationConfig::default();
            mutate(&mut config);
            assert!(matches!(config.validate(), Err(SimError::Config(_))));
        }
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = StationConfig::from_ron_str("(officers: 2, desks: 1, seed: Some(7))").unwrap();
        assert_eq!(config.officers, 2);
        assert_eq!(config.desks, 1);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.service, UnitRange::new(150, 300));
        assert_eq!(config.crimes.len(), 5);
    }

    #[test]
    fn test_ron_with_invalid_values_fails_validation() {
        let err = StationConfig::from_ron_str("(desks: 0)").unwrap_err();
        assert!(matches!(err, SimError::Config(_)));

        let err = StationConfig::from_ron_str("(officers: \"many\")").unwrap_err();
        assert!(matches!(err, SimError::Ron(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"(
                officers: 1,
                horizon: 900,
                crimes: [(name: "fraud", priority: 2)],
                service: (min: 10, max: 20),
            )"#
        )
        .unwrap();

        let config = StationConfig::load(file.path()).unwrap();
        assert_eq!(config.officers, 1);
        assert_eq!(config.horizon, SimTime::new(900));
        assert_eq!(config.priority_of("fraud"), Some(Priority(2)));
        assert_eq!(config.service, UnitRange::new(10, 20));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = StationConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }

    #[test]
    fn test_range_sample_stays_inside() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let range = UnitRange::new(150, 210);
        for _ in 0..200 {
            let v = range.sample(&mut rng);
            assert!((150..=210).contains(&v));
        }
        assert_eq!(UnitRange::fixed(42).sample(&mut rng), 42);
    }
}
