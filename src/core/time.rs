//! Управление временем симуляции

use std::fmt;
use std::ops::{Add, Sub};
use serde::{Serialize, Deserialize};

/// Момент виртуального времени (в условных единицах, одна единица = секунда)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub fn new(units: u64) -> Self {
        SimTime(units)
    }

    pub fn as_units(&self) -> u64 {
        self.0
    }

    /// Сколько осталось до `later`; ноль, если момент уже прошёл
    pub fn until(&self, later: SimTime) -> Duration {
        Duration(later.0.saturating_sub(self.0))
    }

    /// `None`, если момент не помещается в шкалу времени
    pub fn checked_add(&self, delay: Duration) -> Option<SimTime> {
        self.0.checked_add(delay.0).map(SimTime)
    }
}

impl Add<Duration> for SimTime {
    type Output = Self;

    fn add(self, other: Duration) -> Self {
        SimTime(self.0.saturating_add(other.0))
    }
}

impl Sub for SimTime {
    type Output = Duration;

    fn sub(self, other: Self) -> Duration {
        Duration(self.0.saturating_sub(other.0))
    }
}

/// Формат `H:MM:SS`, как у отчёта участка
impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let hours = self.0 / 3600;
        let minutes = (self.0 % 3600) / 60;
        let seconds = self.0 % 60;
        write!(f, "{}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Длительность задержки
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Duration(u64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub fn from_units(units: u64) -> Self {
        Duration(units)
    }

    pub fn as_units(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}u", self.0)
    }
}
