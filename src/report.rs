//! События для внешнего потребителя отчётов

use std::fmt;
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::{Priority, SimTime};
use crate::process::Outcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StationEvent {
    Arrival {
        citizen: u32,
        crime: String,
        priority: Priority,
    },
    Assignment {
        citizen: u32,
        crime: String,
        priority: Priority,
        officer: String,
    },
    Resolution {
        citizen: u32,
        crime: String,
        officer: String,
        outcome: Outcome,
    },
    Interruption {
        citizen: u32,
        crime: String,
        officer: String,
    },
    HighPriorityAssigned {
        citizen: u32,
        officer: String,
    },
    HighPriorityReleased {
        citizen: u32,
        officer: String,
    },
    HighPriorityUnserved {
        citizen: u32,
    },
    ShiftChange {
        number: u32,
    },
}

/// Событие с отметкой виртуального времени
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub time: SimTime,
    pub event: StationEvent,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let t = self.time;
        match &self.event {
            StationEvent::Arrival { citizen, crime, priority } => write!(
                f,
                "Citizen {} arrived at the police station at {} for {} with priority {}.",
                citizen, t, crime, priority
            ),
            StationEvent::Assignment { citizen, crime, priority, officer } => write!(
                f,
                "Citizen {} assigned to {} at {} for {} with priority {}.",
                citizen, officer, t, crime, priority
            ),
            StationEvent::Resolution { citizen, crime, officer, outcome } => match outcome {
                Outcome::Caught => write!(
                    f,
                    "Citizen {} case for {} registered at {}. Criminal caught by {}.",
                    citizen, crime, t, officer
                ),
                Outcome::NotCaught => write!(
                    f,
                    "Citizen {} case for {} registered at {}. Criminal not caught.",
                    citizen, crime, t
                ),
            },
            StationEvent::Interruption { citizen, crime, .. } => write!(
                f,
                "Citizen {} case for {} was interrupted at {}.",
                citizen, crime, t
            ),
            StationEvent::HighPriorityAssigned { officer, .. } => {
                write!(f, "High-priority case (MLA) handled by {} at {}.", officer, t)
            }
            StationEvent::HighPriorityReleased { officer, .. } => {
                write!(f, "High-priority case (MLA) released {} at {}.", officer, t)
            }
            StationEvent::HighPriorityUnserved { .. } => {
                write!(f, "High-priority case (MLA) found no free officer at {}.", t)
            }
            StationEvent::ShiftChange { .. } => write!(f, "--- Shift change at {} ---", t),
        }
    }
}

/// Потребитель событий участка
pub trait Reporter {
    fn report(&mut self, record: Record);
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, record: Record) {
        (**self).report(record)
    }
}

/// Копит все события в памяти
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    records: Vec<Record>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&StationEvent) -> bool,
    {
        self.records.iter().filter(|r| predicate(&r.event)).count()
    }
}

impl Reporter for EventLog {
    fn report(&mut self, record: Record) {
        self.records.push(record);
    }
}

/// Пишет каждое событие в лог на уровне `debug`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter {
    reported: usize,
}

impl TracingReporter {
    pub fn reported(&self) -> usize {
        self.reported
    }
}

impl Reporter for TracingReporter {
    fn report(&mut self, record: Record) {
        debug!("{}", record);
        self.reported += 1;
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _record: Record) {}
}

/// Пересылает события асинхронному потребителю
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<Record>,
    closed: bool,
}

impl ChannelReporter {
    pub fn new(tx: mpsc::UnboundedSender<Record>) -> Self {
        Self { tx, closed: false }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Record>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Reporter for ChannelReporter {
    fn report(&mut self, record: Record) {
        if self.closed {
            return;
        }
        if self.tx.send(record).is_err() {
            warn!("Получатель событий отключился, дальнейшие события отбрасываются");
            self.closed = true;
        }
    }
}

/// Печатать события из канала, пока отправитель жив. Возвращает их число.
pub async fn print_records(mut rx: mpsc::UnboundedReceiver<Record>) -> usize {
    let mut printed = 0;
    while let Some(record) = rx.recv().await {
        println!("{}", record);
        printed += 1;
    }
    printed
}
