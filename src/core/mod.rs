//! Ядро симуляции

mod simulation;
mod event;
mod time;

pub use simulation::Simulation;
pub use event::{Event, Priority};
pub use time::{SimTime, Duration};
