//! Процесс рассмотрения заявления гражданина

use serde::{Serialize, Deserialize};

use super::ProcessId;
use crate::core::{Priority, SimTime};
use crate::resources::GrantHandle;
use crate::SimError;

/// Состояние заявления: `Arrived → Queued → Assigned → InService → {Resolved | Interrupted}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseState {
    Arrived,
    Queued,
    Assigned,
    InService,
    Resolved,
    Interrupted,
}

impl CaseState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CaseState::Resolved | CaseState::Interrupted)
    }

    fn can_become(self, next: CaseState) -> bool {
        use CaseState::*;
        matches!(
            (self, next),
            (Arrived, Queued)
                | (Queued, Assigned)
                | (Assigned, InService)
                | (InService, Resolved)
                // прерывание возможно, пока заявление держит сотрудника
                | (Queued, Interrupted)
                | (Assigned, Interrupted)
                | (InService, Interrupted)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Caught,
    NotCaught,
}

/// Одна половина составного запроса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub handle: GrantHandle,
    pub granted: bool,
}

#[derive(Debug)]
pub struct CaseProcess {
    pub id: ProcessId,
    pub citizen: u32,
    pub crime: String,
    pub priority: Priority,
    state: CaseState,
    officer: Option<usize>,
    officer_slot: Option<Slot>,
    desk_slot: Option<Slot>,
    arrived_at: Option<SimTime>,
    assigned_at: Option<SimTime>,
    outcome: Option<Outcome>,
}

impl CaseProcess {
    pub fn new(id: ProcessId, citizen: u32, crime: &str, priority: Priority) -> Self {
        Self {
            id,
            citizen,
            crime: crime.to_string(),
            priority,
            state: CaseState::Arrived,
            officer: None,
            officer_slot: None,
            desk_slot: None,
            arrived_at: None,
            assigned_at: None,
            outcome: None,
        }
    }

    pub fn state(&self) -> CaseState {
        self.state
    }

    /// Индекс сотрудника, выбранного при прибытии
    pub fn officer(&self) -> Option<usize> {
        self.officer
    }

    pub fn assigned_officer(&self) -> Result<usize, SimError> {
        self.officer
            .ok_or_else(|| SimError::ProcessError(format!("case {} has no officer", self.id)))
    }

    pub fn arrived_at(&self) -> Option<SimTime> {
        self.arrived_at
    }

    pub fn assigned_at(&self) -> Option<SimTime> {
        self.assigned_at
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn officer_handle(&self) -> Option<GrantHandle> {
        self.officer_slot.map(|slot| slot.handle)
    }

    pub fn desk_handle(&self) -> Option<GrantHandle> {
        self.desk_slot.map(|slot| slot.handle)
    }

    fn transition(&mut self, next: CaseState) -> Result<(), SimError> {
        if !self.state.can_become(next) {
            return Err(SimError::ProcessError(format!(
                "case {} cannot move from {:?} to {:?}",
                self.id, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    pub fn arrive(&mut self, now: SimTime, officer: usize) {
        self.arrived_at = Some(now);
        self.officer = Some(officer);
    }

    /// Оба запроса поданы. Возвращает `true`, если оба уже удовлетворены.
    pub fn queue(&mut self, officer_slot: Slot, desk_slot: Slot) -> Result<bool, SimError> {
        self.transition(CaseState::Queued)?;
        self.officer_slot = Some(officer_slot);
        self.desk_slot = Some(desk_slot);
        Ok(self.has_both_grants())
    }

    /// Отметить выдачу по одному из запросов. Возвращает `true`, когда
    /// составной запрос выполнен целиком; уже выданная половина удерживается.
    pub fn mark_granted(&mut self, handle: GrantHandle) -> Result<bool, SimError> {
        let slot = [self.officer_slot.as_mut(), self.desk_slot.as_mut()]
            .into_iter()
            .flatten()
            .find(|slot| slot.handle == handle)
            .ok_or_else(|| {
                SimError::ProcessError(format!("case {} does not own grant {:?}", self.id, handle))
            })?;
        slot.granted = true;
        Ok(self.has_both_grants())
    }

    pub fn has_both_grants(&self) -> bool {
        matches!(
            (self.officer_slot, self.desk_slot),
            (Some(officer), Some(desk)) if officer.granted && desk.granted
        )
    }

    pub fn assign(&mut self, now: SimTime) -> Result<(), SimError> {
        if !self.has_both_grants() {
            return Err(SimError::ProcessError(format!(
                "case {} assigned without both grants",
                self.id
            )));
        }
        self.transition(CaseState::Assigned)?;
        self.assigned_at = Some(now);
        Ok(())
    }

    pub fn begin_service(&mut self) -> Result<(), SimError> {
        self.transition(CaseState::InService)
    }

    pub fn resolve(&mut self, outcome: Outcome) -> Result<(), SimError> {
        self.transition(CaseState::Resolved)?;
        self.outcome = Some(outcome);
        Ok(())
    }

    pub fn interrupt(&mut self) -> Result<(), SimError> {
        self.transition(CaseState::Interrupted)
    }

    /// Забрать оба дескриптора для освобождения (на любом пути завершения)
    pub fn take_grants(&mut self) -> (Option<GrantHandle>, Option<GrantHandle>) {
        (
            self.officer_slot.take().map(|slot| slot.handle),
            self.desk_slot.take().map(|slot| slot.handle),
        )
    }
}
