//! Типы ошибок для симуляции

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    /// Некорректная конфигурация: обнаруживается до начала прогона
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Simulation error: {0}")]
    SimulationError(String),

    #[error("Resource error: {0}")]
    ResourceError(String),

    #[error("Process error: {0}")]
    ProcessError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

impl From<String> for SimError {
    fn from(s: String) -> Self {
        SimError::SimulationError(s)
    }
}

impl From<&str> for SimError {
    fn from(s: &str) -> Self {
        SimError::SimulationError(s.to_string())
    }
}
