//! Police station intake: дискретно-событийная модель приёма заявлений
//!
//! Граждане приходят с преступлениями разной важности, конкурируют за
//! сотрудников (вытесняемые ресурсы ёмкостью 1) и столы (общий пул без
//! вытеснения), рассматриваются случайное время и могут быть прерваны более
//! срочным делом.

pub mod core;
pub mod resources;
pub mod process;
pub mod config;
pub mod arrivals;
pub mod stats;
pub mod report;
pub mod error;

mod simulator;
pub use simulator::Simulator;
pub use error::SimError;

pub mod prelude {
    pub use crate::core::{Duration, Priority, SimTime};
    pub use crate::config::{CrimeKind, StationConfig, UnitRange};
    pub use crate::arrivals::{ArrivalPlan, PlannedArrival};
    pub use crate::report::{EventLog, Record, Reporter, StationEvent};
    pub use crate::stats::Summary;
    pub use crate::Simulator;
    pub use crate::SimError;
}
