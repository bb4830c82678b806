//! Основное ядро симуляции: часы и очередь событий

use std::collections::BinaryHeap;
use tracing::{info, debug};

use super::event::Event;
use super::time::{SimTime, Duration};
use crate::SimError;

/// Виртуальные часы и очередь отложенных возобновлений.
///
/// Время двигается только при извлечении события из очереди и никогда не
/// идёт назад. События с одинаковым временем выполняются в порядке постановки.
pub struct Simulation<T> {
    current_time: SimTime,
    event_queue: BinaryHeap<Event<T>>,
    event_counter: u64,
}

impl<T> Simulation<T> {
    pub fn new() -> Self {
        Self {
            current_time: SimTime::ZERO,
            event_queue: BinaryHeap::new(),
            event_counter: 0,
        }
    }

    pub fn now(&self) -> SimTime {
        self.current_time
    }

    /// Запланировать возобновление через `delay`. Нулевая задержка допустима:
    /// событие выполнится на следующем шаге очереди, после текущего.
    pub fn schedule_after(&mut self, delay: Duration, payload: T) -> u64 {
        let time = self.current_time + delay;
        self.push(time, payload)
    }

    pub fn schedule_at(&mut self, time: SimTime, payload: T) -> Result<u64, SimError> {
        if time < self.current_time {
            return Err(SimError::SimulationError(format!(
                "cannot schedule at {} before current time {}",
                time, self.current_time
            )));
        }
        Ok(self.push(time, payload))
    }

    fn push(&mut self, time: SimTime, payload: T) -> u64 {
        let id = self.event_counter;
        self.event_counter += 1;
        self.event_queue.push(Event::new(time, id, payload));
        debug!("Событие #{} запланировано на время {}", id, time);
        id
    }

    /// Время ближайшего события
    pub fn peek_time(&self) -> Option<SimTime> {
        self.event_queue.peek().map(|e| e.time)
    }

    /// Извлечь ближайшее событие и перевести часы на его время
    pub fn advance(&mut self) -> Option<T> {
        let event = self.event_queue.pop()?;
        debug_assert!(event.time >= self.current_time);
        self.current_time = event.time;
        debug!("Обработка события #{} в {}", event.id, event.time);
        Some(event.payload)
    }

    /// Как `advance`, но только если событие не позже `horizon`
    pub fn advance_until(&mut self, horizon: SimTime) -> Option<T> {
        match self.peek_time() {
            Some(time) if time <= horizon => self.advance(),
            _ => None,
        }
    }

    /// Выполнять события, пока время следующего не превышает `horizon`.
    /// Более поздние события остаются в очереди невыполненными.
    /// Возвращает число обработанных событий.
    pub fn run_until<F>(&mut self, horizon: SimTime, mut handler: F) -> Result<usize, SimError>
    where
        F: FnMut(&mut Self, T) -> Result<(), SimError>,
    {
        info!("Запуск симуляции до времени {}", horizon);

        let mut processed = 0;
        while let Some(payload) = self.advance_until(horizon) {
            handler(self, payload)?;
            processed += 1;
        }

        info!(
            "Симуляция остановлена в {}; обработано {}, отложено {}",
            self.current_time,
            processed,
            self.pending()
        );
        Ok(processed)
    }

    pub fn pending(&self) -> usize {
        self.event_queue.len()
    }
}

impl<T> Default for Simulation<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_simulation() {
        let mut sim = Simulation::new();
        for i in 0..5u64 {
            sim.schedule_after(Duration::from_units(i), i);
        }

        let mut results = Vec::new();
        sim.run_until(SimTime::new(10), |_, i| {
            results.push(i);
            Ok(())
        })
        .unwrap();

        assert_eq!(results, vec![0, 1, 2, 3, 4]);
        assert_eq!(sim.now(), SimTime::new(4));
    }

    #[test]
    fn test_equal_times_run_in_scheduling_order() {
        let mut sim = Simulation::new();
        sim.schedule_after(Duration::from_units(3), "first");
        sim.schedule_after(Duration::ZERO, "zero");
        sim.schedule_after(Duration::from_units(3), "second");

        let mut order = Vec::new();
        while let Some(label) = sim.advance() {
            order.push(label);
        }
        assert_eq!(order, vec!["zero", "first", "second"]);
    }

    #[test]
    fn test_horizon_leaves_later_events_pending() {
        let mut sim = Simulation::new();
        sim.schedule_after(Duration::from_units(10), 1);
        sim.schedule_after(Duration::from_units(20), 2);
        sim.schedule_after(Duration::from_units(21), 3);

        let mut seen = Vec::new();
        let processed = sim
            .run_until(SimTime::new(20), |_, n| {
                seen.push(n);
                Ok(())
            })
            .unwrap();

        assert_eq!(processed, 2);
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(sim.pending(), 1);
        assert_eq!(sim.now(), SimTime::new(20));
    }

    #[test]
    fn test_zero_delay_from_handler_runs_after_current_step() {
        let mut sim = Simulation::new();
        sim.schedule_after(Duration::from_units(5), 0u32);
        sim.schedule_after(Duration::from_units(5), 1u32);

        let mut order = Vec::new();
        sim.run_until(SimTime::new(100), |sim, n| {
            order.push((sim.now().as_units(), n));
            if n == 0 {
                sim.schedule_after(Duration::ZERO, 2);
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(order, vec![(5, 0), (5, 1), (5, 2)]);
    }

    #[test]
    fn test_schedule_in_past_is_rejected() {
        let mut sim = Simulation::new();
        sim.schedule_after(Duration::from_units(50), ());
        sim.advance();
        assert!(sim.schedule_at(SimTime::new(10), ()).is_err());
        assert!(sim.schedule_at(SimTime::new(50), ()).is_ok());
    }

    #[test]
    fn test_handler_error_stops_run() {
        let mut sim = Simulation::new();
        sim.schedule_after(Duration::from_units(1), 1);
        sim.schedule_after(Duration::from_units(2), 2);

        let result = sim.run_until(SimTime::new(10), |_, n| {
            if n == 1 {
                Err(SimError::from("boom"))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert_eq!(sim.pending(), 1);
    }
}
