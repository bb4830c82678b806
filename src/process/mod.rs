//! Процессы симуляции: заявление гражданина, особый случай, пересменка
//!
//! Каждый процесс: явный конечный автомат. Он приостанавливается только в
//! точках ожидания (составной запрос ресурсов, таймаут) и возобновляется
//! событием [`Wakeup`] из очереди.

mod case;
mod high_priority;
mod shift;

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::resources::GrantHandle;

pub use case::{CaseProcess, CaseState, Outcome, Slot};
pub use high_priority::{HighPriorityCase, HighPriorityState};
pub use shift::ShiftChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Возобновление, которое ядро ставит в очередь событий
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// Очередной гражданин из плана прибытия
    Arrival(usize),
    /// Первый шаг только что порождённого процесса
    Start(ProcessId),
    /// Составной запрос (сотрудник + стол) выполнен
    Acquired(ProcessId),
    ServiceDone(ProcessId),
    /// Сотрудника отобрали вытеснением
    Interrupt { process: ProcessId, grant: GrantHandle },
    Checkpoint(ProcessId),
    OccupancyDone(ProcessId),
    ShiftChange,
}

pub enum Process {
    Case(CaseProcess),
    HighPriority(HighPriorityCase),
}

impl Process {
    pub fn is_finished(&self) -> bool {
        match self {
            Process::Case(case) => case.state().is_terminal(),
            Process::HighPriority(vip) => vip.state().is_terminal(),
        }
    }
}
