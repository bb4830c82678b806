//! Система событий для симуляции

use std::cmp::Ordering;
use std::fmt;
use serde::{Serialize, Deserialize};

use super::time::SimTime;

/// Приоритет заявки на ресурс (меньше = важнее: убийство = 1 … карманная кража = 5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub u8);

impl Priority {
    /// Срочнее ли `self`, чем `other` (строго)
    pub fn outranks(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Событие в очереди симуляции: отложенное возобновление процесса
#[derive(Debug)]
pub struct Event<T> {
    pub time: SimTime,
    pub id: u64, // порядок постановки, разрешает равенство времён
    pub payload: T,
}

impl<T> Event<T> {
    pub fn new(time: SimTime, id: u64, payload: T) -> Self {
        Self { time, id, payload }
    }
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl<T> Eq for Event<T> {}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Event<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Для BinaryHeap нам нужен обратный порядок (меньшее время = выше приоритет)
        match other.time.cmp(&self.time) {
            Ordering::Equal => other.id.cmp(&self.id),
            ordering => ordering,
        }
    }
}
