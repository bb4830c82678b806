//! Модель участка: порождает процессы, ведёт часы до горизонта, собирает итог

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, debug};

use crate::arrivals::ArrivalPlan;
use crate::config::StationConfig;
use crate::core::{Duration, SimTime, Simulation};
use crate::process::{
    CaseProcess, CaseState, HighPriorityCase, Outcome, Process, ProcessId, ShiftChange, Slot,
    Wakeup,
};
use crate::report::{Record, Reporter, StationEvent};
use crate::resources::{GrantHandle, GrantStatus, PoolId, Released, ResourcePool};
use crate::stats::{SimulationStats, Summary};
use crate::SimError;

/// Однопоточный кооперативный симулятор: в каждый момент выполняется ровно
/// один шаг одного процесса, до следующей точки ожидания.
pub struct Simulator {
    config: StationConfig,
    seed: u64,
    rng: ChaCha8Rng,
    clock: Simulation<Wakeup>,
    officers: Vec<ResourcePool>,
    desks: ResourcePool,
    plan: ArrivalPlan,
    processes: Vec<Process>,
    shift: ShiftChange,
    stats: SimulationStats,
    // горизонт текущего прогона
    horizon: SimTime,
    // составные запросы, выполненные в момент горизонта
    parked: Vec<ProcessId>,
    started: bool,
    finished: bool,
}

impl Simulator {
    /// Участок со случайным потоком граждан
    pub fn new(config: StationConfig) -> Result<Self, SimError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let plan = ArrivalPlan::generate(&config, &mut rng);
        Self::build(config, seed, rng, plan)
    }

    /// Участок с заранее заданным потоком граждан
    pub fn with_plan(config: StationConfig, plan: ArrivalPlan) -> Result<Self, SimError> {
        config.validate()?;
        plan.validate(&config)?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Self::build(config, seed, rng, plan)
    }

    fn build(
        config: StationConfig,
        seed: u64,
        rng: ChaCha8Rng,
        plan: ArrivalPlan,
    ) -> Result<Self, SimError> {
        let officers = config
            .officer_names()
            .iter()
            .enumerate()
            .map(|(i, name)| ResourcePool::new(PoolId(i as u32), name, 1, true))
            .collect::<Result<Vec<_>, _>>()?;
        let desks = ResourcePool::new(PoolId(config.officers as u32), "desks", config.desks, false)?;

        info!(
            "Участок: сотрудников {}, столов {}, граждан в плане {}, seed {}",
            config.officers,
            config.desks,
            plan.len(),
            seed
        );

        Ok(Self {
            shift: ShiftChange::new(config.shift_interval),
            stats: SimulationStats::new(&config),
            config,
            seed,
            rng,
            clock: Simulation::new(),
            officers,
            desks,
            plan,
            processes: Vec::new(),
            horizon: SimTime::ZERO,
            parked: Vec::new(),
            started: false,
            finished: false,
        })
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn plan(&self) -> &ArrivalPlan {
        &self.plan
    }

    pub fn officers(&self) -> &[ResourcePool] {
        &self.officers
    }

    pub fn desks(&self) -> &ResourcePool {
        &self.desks
    }

    pub fn pending_events(&self) -> usize {
        self.clock.pending()
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn cases(&self) -> impl Iterator<Item = &CaseProcess> {
        self.processes.iter().filter_map(|p| match p {
            Process::Case(case) => Some(case),
            Process::HighPriority(_) => None,
        })
    }

    /// Заявление гражданина с номером `citizen` (нумерация с единицы)
    pub fn case_of(&self, citizen: u32) -> Option<&CaseProcess> {
        self.cases().find(|case| case.citizen == citizen)
    }

    pub fn high_priority_case(&self) -> Option<&HighPriorityCase> {
        self.processes.iter().find_map(|p| match p {
            Process::HighPriority(vip) => Some(vip),
            Process::Case(_) => None,
        })
    }

    /// Полный прогон до горизонта из конфигурации
    pub fn run(&mut self, reporter: &mut dyn Reporter) -> Result<Summary, SimError> {
        if self.finished {
            return Err(SimError::SimulationError(
                "simulation already ran to its horizon".into(),
            ));
        }

        info!("Запуск симуляции участка до {}", self.config.horizon);
        self.run_until(self.config.horizon, reporter)?;
        self.finished = true;

        let summary = self.summary();
        let unfinished = self.processes.iter().filter(|p| !p.is_finished()).count();
        debug!("Незавершённых процессов на горизонте: {}", unfinished);
        info!(
            "Симуляция завершена в {}: зарегистрировано {}, поймано {}, не поймано {}, прервано {}",
            self.clock.now(),
            summary.cases_registered,
            summary.criminals_caught,
            summary.criminals_not_caught,
            summary.cases_interrupted
        );
        Ok(summary)
    }

    /// Выполнить все возобновления не позже `horizon`. Можно вызывать
    /// повторно с бо́льшим горизонтом.
    ///
    /// Составной запрос, выполненный уже в момент горизонта, возобновляется
    /// только следующим прогоном: назначение не происходит на самом горизонте.
    pub fn run_until(
        &mut self,
        horizon: SimTime,
        reporter: &mut dyn Reporter,
    ) -> Result<usize, SimError> {
        self.horizon = horizon;
        self.start();
        if self.clock.now() < horizon {
            for pid in std::mem::take(&mut self.parked) {
                self.clock.schedule_after(Duration::ZERO, Wakeup::Acquired(pid));
            }
        }

        let mut processed = 0;
        while let Some(wakeup) = self.clock.advance_until(horizon) {
            self.dispatch(wakeup, reporter)?;
            processed += 1;
        }
        debug!(
            "Шагов выполнено: {}, отложено после {}: {}",
            processed,
            horizon,
            self.clock.pending()
        );
        Ok(processed)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            seed: self.seed,
            final_time: self.clock.now(),
            cases_registered: self.stats.cases_registered(),
            cases_assigned: self.stats.cases_assigned(),
            criminals_caught: self.stats.criminals_caught(),
            criminals_not_caught: self.stats.criminals_not_caught(),
            cases_interrupted: self.stats.cases_interrupted(),
            shift_changes: self.shift.changes(),
            abandoned_events: self.clock.pending() + self.parked.len(),
            crimes: self.stats.crimes().to_vec(),
            officers: self.stats.officers().to_vec(),
            officer_pools: self.officers.iter().map(|pool| pool.stats()).collect(),
            desk_pool: self.desks.stats(),
        }
    }

    fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        self.clock.schedule_after(self.shift.interval(), Wakeup::ShiftChange);
        if let Some(first) = self.plan.get(0) {
            self.clock.schedule_after(first.after, Wakeup::Arrival(0));
        }
    }

    fn dispatch(&mut self, wakeup: Wakeup, reporter: &mut dyn Reporter) -> Result<(), SimError> {
        match wakeup {
            Wakeup::Arrival(index) => self.on_arrival(index),
            Wakeup::Start(pid) => self.on_start(pid, reporter),
            Wakeup::Acquired(pid) => self.on_acquired(pid, reporter),
            Wakeup::ServiceDone(pid) => self.on_service_done(pid, reporter),
            Wakeup::Interrupt { process, grant } => self.on_interrupt(process, grant, reporter),
            Wakeup::Checkpoint(pid) => self.on_checkpoint(pid, reporter),
            Wakeup::OccupancyDone(pid) => self.on_occupancy_done(pid, reporter),
            Wakeup::ShiftChange => {
                self.on_shift_change(reporter);
                Ok(())
            }
        }
    }

    fn emit(&self, reporter: &mut dyn Reporter, event: StationEvent) {
        reporter.report(Record {
            time: self.clock.now(),
            event,
        });
    }

    fn officer_name(&self, index: usize) -> String {
        self.officers
            .get(index)
            .map(|pool| pool.name().to_string())
            .unwrap_or_default()
    }

    fn process_mut(&mut self, pid: ProcessId) -> Result<&mut Process, SimError> {
        self.processes
            .get_mut(pid.0 as usize)
            .ok_or_else(|| SimError::ProcessError(format!("unknown process {}", pid)))
    }

    fn case_mut(&mut self, pid: ProcessId) -> Result<&mut CaseProcess, SimError> {
        match self.process_mut(pid)? {
            Process::Case(case) => Ok(case),
            Process::HighPriority(_) => Err(SimError::ProcessError(format!(
                "process {} is not a citizen case",
                pid
            ))),
        }
    }

    fn vip_mut(&mut self, pid: ProcessId) -> Result<&mut HighPriorityCase, SimError> {
        match self.process_mut(pid)? {
            Process::HighPriority(vip) => Ok(vip),
            Process::Case(_) => Err(SimError::ProcessError(format!(
                "process {} is not the high-priority case",
                pid
            ))),
        }
    }

    /// Породить процесс очередного гражданина и запланировать следующего
    fn on_arrival(&mut self, index: usize) -> Result<(), SimError> {
        let Some(arrival) = self.plan.get(index).cloned() else {
            return Ok(());
        };

        let id = ProcessId(self.processes.len() as u32);
        let citizen = index as u32 + 1;
        let process = if arrival.high_priority {
            Process::HighPriority(HighPriorityCase::new(id, citizen))
        } else {
            let priority = self.config.priority_of(&arrival.crime).ok_or_else(|| {
                SimError::Config(format!("unknown crime '{}'", arrival.crime))
            })?;
            Process::Case(CaseProcess::new(id, citizen, &arrival.crime, priority))
        };
        self.processes.push(process);
        self.clock.schedule_after(Duration::ZERO, Wakeup::Start(id));

        if let Some(next) = self.plan.get(index + 1) {
            self.clock.schedule_after(next.after, Wakeup::Arrival(index + 1));
        }
        Ok(())
    }

    fn on_start(&mut self, pid: ProcessId, reporter: &mut dyn Reporter) -> Result<(), SimError> {
        if matches!(self.process_mut(pid)?, Process::Case(_)) {
            self.start_case(pid, reporter)
        } else {
            let wait = self.clock.now().until(self.config.high_priority.checkpoint);
            debug!("Особый случай {} ждёт контрольной точки {}", pid, wait);
            self.clock.schedule_after(wait, Wakeup::Checkpoint(pid));
            Ok(())
        }
    }

    /// Первый свободный сотрудник при линейном просмотре по возрастанию номера;
    /// если свободных нет, просмотр заканчивается на последнем.
    fn select_officer(&self) -> usize {
        self.officers
            .iter()
            .position(|pool| pool.is_idle())
            .unwrap_or(self.officers.len().saturating_sub(1))
    }

    fn start_case(&mut self, pid: ProcessId, reporter: &mut dyn Reporter) -> Result<(), SimError> {
        let now = self.clock.now();
        let officer = self.select_officer();

        let (citizen, crime, priority) = {
            let case = self.case_mut(pid)?;
            case.arrive(now, officer);
            (case.citizen, case.crime.clone(), case.priority)
        };
        self.stats.record_arrival(&crime);
        self.emit(reporter, StationEvent::Arrival { citizen, crime, priority });

        // составной запрос: сотрудник и стол подаются одновременно
        let officer_request = self.officers[officer].request(pid, priority);
        if let Some(eviction) = officer_request.evicted {
            self.clock.schedule_after(
                Duration::ZERO,
                Wakeup::Interrupt {
                    process: eviction.victim,
                    grant: eviction.handle,
                },
            );
        }
        let desk_request = self.desks.request(pid, priority);

        let ready = self.case_mut(pid)?.queue(
            Slot {
                handle: officer_request.handle,
                granted: officer_request.granted,
            },
            Slot {
                handle: desk_request.handle,
                granted: desk_request.granted,
            },
        )?;
        if ready {
            self.resume_acquired(pid);
        } else {
            debug!("Заявление {} ожидает ресурсы", pid);
        }
        Ok(())
    }

    fn resume_acquired(&mut self, pid: ProcessId) {
        if self.clock.now() >= self.horizon {
            debug!("Заявление {} получило ресурсы на горизонте {}", pid, self.horizon);
            self.parked.push(pid);
        } else {
            self.clock.schedule_after(Duration::ZERO, Wakeup::Acquired(pid));
        }
    }

    fn on_acquired(&mut self, pid: ProcessId, reporter: &mut dyn Reporter) -> Result<(), SimError> {
        let now = self.clock.now();
        let (state, officer, officer_handle) = {
            let case = self.case_mut(pid)?;
            (case.state(), case.officer(), case.officer_handle())
        };
        if state != CaseState::Queued {
            debug!("Заявление {} уже {:?}, выдача устарела", pid, state);
            return Ok(());
        }
        let (Some(officer), Some(officer_handle)) = (officer, officer_handle) else {
            return Err(SimError::ProcessError(format!("case {} has no officer", pid)));
        };
        if self.officers[officer].status(officer_handle) != GrantStatus::Held {
            // сотрудника уже отобрали, сигнал прерывания в очереди
            return Ok(());
        }

        let (citizen, crime, priority) = {
            let case = self.case_mut(pid)?;
            case.assign(now)?;
            case.begin_service()?;
            (case.citizen, case.crime.clone(), case.priority)
        };
        self.stats.record_assignment();
        let officer_name = self.officer_name(officer);
        self.emit(
            reporter,
            StationEvent::Assignment {
                citizen,
                crime,
                priority,
                officer: officer_name,
            },
        );

        let service = Duration::from_units(self.config.service.sample(&mut self.rng));
        debug!("Заявление {} рассматривается {}", pid, service);
        self.clock.schedule_after(service, Wakeup::ServiceDone(pid));
        Ok(())
    }

    fn on_service_done(&mut self, pid: ProcessId, reporter: &mut dyn Reporter) -> Result<(), SimError> {
        if self.case_mut(pid)?.state() != CaseState::InService {
            debug!("Заявление {} прервано раньше, таймаут устарел", pid);
            return Ok(());
        }

        let outcome = if self.rng.gen_bool(0.5) {
            Outcome::Caught
        } else {
            Outcome::NotCaught
        };
        let (citizen, crime, officer) = {
            let case = self.case_mut(pid)?;
            let officer = case.assigned_officer()?;
            case.resolve(outcome)?;
            (case.citizen, case.crime.clone(), officer)
        };
        self.stats.record_resolution(outcome, officer);
        let officer_name = self.officer_name(officer);
        self.emit(
            reporter,
            StationEvent::Resolution {
                citizen,
                crime,
                officer: officer_name,
                outcome,
            },
        );

        self.release_case(pid)
    }

    fn on_interrupt(
        &mut self,
        pid: ProcessId,
        grant: GrantHandle,
        reporter: &mut dyn Reporter,
    ) -> Result<(), SimError> {
        let Process::Case(case) = self.process_mut(pid)? else {
            debug!("Сигнал прерывания для {} проигнорирован", pid);
            return Ok(());
        };
        if case.state().is_terminal() || case.officer_handle() != Some(grant) {
            debug!("Устаревший сигнал прерывания для {}", pid);
            return Ok(());
        }

        let officer = case.assigned_officer()?;
        case.interrupt()?;
        let citizen = case.citizen;
        let crime = case.crime.clone();

        self.stats.record_interruption();
        let officer_name = self.officer_name(officer);
        self.emit(
            reporter,
            StationEvent::Interruption {
                citizen,
                crime,
                officer: officer_name,
            },
        );

        self.release_case(pid)
    }

    /// Вернуть обе единицы на любом пути завершения заявления
    fn release_case(&mut self, pid: ProcessId) -> Result<(), SimError> {
        let (officer, (officer_grant, desk_grant)) = {
            let case = self.case_mut(pid)?;
            (case.officer(), case.take_grants())
        };

        if let (Some(index), Some(handle)) = (officer, officer_grant) {
            let released = self.officers[index].release(handle)?;
            self.hand_over(released)?;
        }
        if let Some(handle) = desk_grant {
            let released = self.desks.release(handle)?;
            self.hand_over(released)?;
        }
        Ok(())
    }

    /// Сообщить получившим единицу из очереди
    fn hand_over(&mut self, released: Released) -> Result<(), SimError> {
        let Released::Freed { promoted } = released else {
            return Ok(());
        };

        for holder in promoted {
            let ready = match self.process_mut(holder.process)? {
                Process::Case(case) => {
                    case.mark_granted(holder.handle)? && case.state() == CaseState::Queued
                }
                Process::HighPriority(_) => false,
            };
            if ready {
                self.resume_acquired(holder.process);
            }
        }
        Ok(())
    }

    fn on_checkpoint(&mut self, pid: ProcessId, reporter: &mut dyn Reporter) -> Result<(), SimError> {
        let priority = self.config.high_priority.priority;
        let idle = self.officers.iter().position(|pool| pool.is_idle());

        let Some(index) = idle else {
            let citizen = {
                let vip = self.vip_mut(pid)?;
                vip.unserved()?;
                vip.citizen
            };
            debug!("Особый случай {}: свободных сотрудников нет", pid);
            self.emit(reporter, StationEvent::HighPriorityUnserved { citizen });
            return Ok(());
        };

        let grant = self.officers[index].claim_idle(pid, priority).ok_or_else(|| {
            SimError::ResourceError(format!("officer {} stopped being idle", index + 1))
        })?;
        let citizen = {
            let vip = self.vip_mut(pid)?;
            vip.occupy(index, grant)?;
            vip.citizen
        };
        let officer_name = self.officer_name(index);
        self.emit(
            reporter,
            StationEvent::HighPriorityAssigned {
                citizen,
                officer: officer_name,
            },
        );

        let occupancy = Duration::from_units(self.config.high_priority.occupancy.sample(&mut self.rng));
        self.clock.schedule_after(occupancy, Wakeup::OccupancyDone(pid));
        Ok(())
    }

    fn on_occupancy_done(&mut self, pid: ProcessId, reporter: &mut dyn Reporter) -> Result<(), SimError> {
        let (citizen, (index, grant)) = {
            let vip = self.vip_mut(pid)?;
            (vip.citizen, vip.finish()?)
        };
        let released = self.officers[index].release(grant)?;
        self.hand_over(released)?;

        let officer_name = self.officer_name(index);
        self.emit(
            reporter,
            StationEvent::HighPriorityReleased {
                citizen,
                officer: officer_name,
            },
        );
        Ok(())
    }

    fn on_shift_change(&mut self, reporter: &mut dyn Reporter) {
        let number = self.shift.tick();
        self.emit(reporter, StationEvent::ShiftChange { number });
        // следующая пересменка не помещается во время: цикл завершается
        if self.clock.now().checked_add(self.shift.interval()).is_none() {
            debug!("Пересменка {} последняя", number);
            return;
        }
        self.clock.schedule_after(self.shift.interval(), Wakeup::ShiftChange);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrivals::PlannedArrival;
    use crate::config::UnitRange;
    use crate::core::Priority;
    use crate::report::EventLog;

    fn fixed_config(officers: usize, desks: usize) -> StationConfig {
        StationConfig {
            officers,
            desks,
            service: UnitRange::fixed(200),
            seed: Some(1),
            ..StationConfig::default()
        }
    }

    #[test]
    fn test_select_officer_prefers_lowest_idle_then_last() {
        let plan = ArrivalPlan::scripted(vec![
            PlannedArrival::case(0, "theft"),
            PlannedArrival::case(0, "theft"),
            PlannedArrival::case(0, "theft"),
        ]);
        let mut sim = Simulator::with_plan(fixed_config(2, 3), plan).unwrap();
        let mut log = EventLog::new();
        sim.run_until(SimTime::ZERO, &mut log).unwrap();

        assert_eq!(sim.case_of(1).unwrap().officer(), Some(0));
        assert_eq!(sim.case_of(2).unwrap().officer(), Some(1));
        assert_eq!(sim.case_of(3).unwrap().officer(), Some(1));
        assert_eq!(sim.case_of(3).unwrap().state(), CaseState::Queued);
    }

    #[test]
    fn test_run_twice_is_rejected() {
        let mut sim = Simulator::new(fixed_config(1, 1)).unwrap();
        let mut log = EventLog::new();
        sim.run(&mut log).unwrap();
        assert!(sim.run(&mut log).is_err());
    }

    #[test]
    fn test_bad_config_fails_before_anything_runs() {
        assert!(matches!(
            Simulator::new(fixed_config(0, 1)),
            Err(SimError::Config(_))
        ));
        assert!(matches!(
            Simulator::with_plan(
                fixed_config(1, 1),
                ArrivalPlan::scripted(vec![PlannedArrival::case(0, "arson")])
            ),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn test_shift_change_every_interval() {
        let mut config = fixed_config(1, 1);
        config.horizon = SimTime::new(2700);
        let mut sim = Simulator::with_plan(config, ArrivalPlan::default()).unwrap();
        let mut log = EventLog::new();
        let summary = sim.run(&mut log).unwrap();

        let times: Vec<u64> = log
            .records()
            .iter()
            .filter(|r| matches!(r.event, StationEvent::ShiftChange { .. }))
            .map(|r| r.time.as_units())
            .collect();
        assert_eq!(times, vec![900, 1800, 2700]);
        assert_eq!(summary.shift_changes, 3);
        assert_eq!(summary.abandoned_events, 1);
    }

    #[test]
    fn test_acquisition_at_horizon_waits_for_next_run() {
        let plan = ArrivalPlan::scripted(vec![PlannedArrival::case(0, "theft")]);
        let mut sim = Simulator::with_plan(fixed_config(1, 1), plan).unwrap();
        let mut log = EventLog::new();

        sim.run_until(SimTime::ZERO, &mut log).unwrap();
        assert_eq!(sim.case_of(1).unwrap().state(), CaseState::Queued);
        assert_eq!(sim.officers()[0].in_use(), 1);
        assert_eq!(sim.summary().cases_assigned, 0);
        // пересменка и отложенное назначение
        assert_eq!(sim.summary().abandoned_events, 2);

        sim.run_until(SimTime::new(5), &mut log).unwrap();
        assert_eq!(sim.case_of(1).unwrap().state(), CaseState::InService);
        assert_eq!(sim.summary().cases_assigned, 1);
        assert_eq!(sim.summary().abandoned_events, 2);
    }

    #[test]
    fn test_shift_changes_stop_at_end_of_time() {
        let mut config = fixed_config(1, 1);
        config.horizon = SimTime::new(u64::MAX);
        config.shift_interval = Duration::from_units(u64::MAX / 2);
        let mut sim = Simulator::with_plan(config, ArrivalPlan::default()).unwrap();
        let mut log = EventLog::new();
        let summary = sim.run(&mut log).unwrap();

        assert_eq!(summary.shift_changes, 2);
        assert_eq!(summary.final_time, SimTime::new(u64::MAX - 1));
        assert_eq!(summary.abandoned_events, 0);
    }

    #[test]
    fn test_case_without_officer_is_process_error() {
        let mut sim = Simulator::with_plan(fixed_config(1, 1), ArrivalPlan::default()).unwrap();
        let pid = ProcessId(0);
        let officer = sim.officers[0].request(pid, Priority(3));
        let desk = sim.desks.request(pid, Priority(3));

        // заявление без прибытия: сотрудник не выбран
        let mut case = CaseProcess::new(pid, 1, "theft", Priority(3));
        let ready = case
            .queue(
                Slot { handle: officer.handle, granted: officer.granted },
                Slot { handle: desk.handle, granted: desk.granted },
            )
            .unwrap();
        assert!(ready);
        case.assign(SimTime::ZERO).unwrap();
        case.begin_service().unwrap();
        sim.processes.push(Process::Case(case));

        let mut log = EventLog::new();
        assert!(matches!(
            sim.on_service_done(pid, &mut log),
            Err(SimError::ProcessError(_))
        ));
        assert!(matches!(
            sim.on_interrupt(pid, officer.handle, &mut log),
            Err(SimError::ProcessError(_))
        ));
        assert!(log.records().is_empty());
        assert_eq!(sim.stats().cases_interrupted(), 0);
    }
}
