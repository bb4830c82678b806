//! Особый случай высокой важности: занимает свободного сотрудника в контрольной точке

use serde::{Serialize, Deserialize};

use super::ProcessId;
use crate::resources::GrantHandle;
use crate::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HighPriorityState {
    /// Ждёт контрольной точки
    Waiting,
    Occupying,
    Done,
    /// В контрольной точке свободных сотрудников не нашлось
    Unserved,
}

impl HighPriorityState {
    pub fn is_terminal(self) -> bool {
        matches!(self, HighPriorityState::Done | HighPriorityState::Unserved)
    }
}

#[derive(Debug)]
pub struct HighPriorityCase {
    pub id: ProcessId,
    pub citizen: u32,
    state: HighPriorityState,
    officer: Option<usize>,
    grant: Option<GrantHandle>,
}

impl HighPriorityCase {
    pub fn new(id: ProcessId, citizen: u32) -> Self {
        Self {
            id,
            citizen,
            state: HighPriorityState::Waiting,
            officer: None,
            grant: None,
        }
    }

    pub fn state(&self) -> HighPriorityState {
        self.state
    }

    pub fn officer(&self) -> Option<usize> {
        self.officer
    }

    fn expect_state(&self, expected: HighPriorityState) -> Result<(), SimError> {
        if self.state != expected {
            return Err(SimError::ProcessError(format!(
                "high-priority case {} is {:?}, expected {:?}",
                self.id, self.state, expected
            )));
        }
        Ok(())
    }

    pub fn occupy(&mut self, officer: usize, grant: GrantHandle) -> Result<(), SimError> {
        self.expect_state(HighPriorityState::Waiting)?;
        self.state = HighPriorityState::Occupying;
        self.officer = Some(officer);
        self.grant = Some(grant);
        Ok(())
    }

    pub fn unserved(&mut self) -> Result<(), SimError> {
        self.expect_state(HighPriorityState::Waiting)?;
        self.state = HighPriorityState::Unserved;
        Ok(())
    }

    /// Завершить занятость; возвращает сотрудника и дескриптор для освобождения
    pub fn finish(&mut self) -> Result<(usize, GrantHandle), SimError> {
        self.expect_state(HighPriorityState::Occupying)?;
        let (Some(officer), Some(grant)) = (self.officer, self.grant.take()) else {
            return Err(SimError::ProcessError(format!(
                "high-priority case {} occupies no officer",
                self.id
            )));
        };
        self.state = HighPriorityState::Done;
        Ok((officer, grant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Priority;
    use crate::resources::{PoolId, ResourcePool};

    #[test]
    fn test_occupy_then_finish() {
        let mut pool = ResourcePool::new(PoolId(0), "officer 1", 1, true).unwrap();
        let mut vip = HighPriorityCase::new(ProcessId(2), 2);
        let grant = pool.claim_idle(vip.id, Priority(0)).unwrap();

        vip.occupy(0, grant).unwrap();
        assert_eq!(vip.state(), HighPriorityState::Occupying);
        assert_eq!(vip.finish().unwrap(), (0, grant));
        assert!(vip.state().is_terminal());
        assert!(vip.finish().is_err());
    }

    #[test]
    fn test_unserved_is_terminal() {
        let mut vip = HighPriorityCase::new(ProcessId(2), 2);
        vip.unserved().unwrap();
        assert!(vip.state().is_terminal());
        assert_eq!(vip.officer(), None);
    }
}
