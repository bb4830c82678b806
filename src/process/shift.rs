//! Периодическая пересменка

use crate::core::Duration;

#[derive(Debug, Clone)]
pub struct ShiftChange {
    interval: Duration,
    changes: u32,
}

impl ShiftChange {
    pub fn new(interval: Duration) -> Self {
        Self { interval, changes: 0 }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn changes(&self) -> u32 {
        self.changes
    }

    /// Отметить очередную пересменку, вернуть её номер
    pub fn tick(&mut self) -> u32 {
        self.changes += 1;
        self.changes
    }
}
