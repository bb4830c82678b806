//! Пул ресурсов конечной ёмкости с очередью по приоритету и вытеснением

use std::collections::{BTreeMap, HashSet};
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::Priority;
use crate::process::ProcessId;
use crate::SimError;

/// Идентификатор пула; отличает дескрипторы разных пулов друг от друга
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(pub u32);

/// Дескриптор заявки. Выдаётся сразу при запросе и должен быть явно освобождён.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrantHandle {
    pool: PoolId,
    seq: u64,
}

impl GrantHandle {
    pub fn pool(&self) -> PoolId {
        self.pool
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantStatus {
    Waiting,
    Held,
    /// Единица отобрана вытеснением
    Revoked,
    /// Освобождена, отменена или никогда не выдавалась этим пулом
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holder {
    pub handle: GrantHandle,
    pub process: ProcessId,
    pub priority: Priority,
}

/// Вытесненный держатель: ему нужно доставить сигнал прерывания
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub victim: ProcessId,
    pub handle: GrantHandle,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub handle: GrantHandle,
    pub granted: bool,
    pub evicted: Option<Eviction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Released {
    /// Единица освобождена; `promoted` получили её из очереди ожидания
    Freed { promoted: Vec<Holder> },
    /// Заявка ещё ждала и снята с очереди
    Cancelled,
    /// Повторное освобождение или отобранная единица: ничего не изменилось
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub requests: u64,
    pub grants: u64,
    pub preemptions: u64,
    pub cancellations: u64,
    pub peak_in_use: usize,
}

#[derive(Debug, Clone, Copy)]
struct Waiter {
    handle: GrantHandle,
    process: ProcessId,
}

pub struct ResourcePool {
    id: PoolId,
    name: String,
    capacity: usize,
    preemptive: bool,
    holders: Vec<Holder>,
    // (приоритет, порядок поступления) -> заявка
    waiting: BTreeMap<(Priority, u64), Waiter>,
    // отобранные единицы, ещё не возвращённые владельцем
    revoked: HashSet<u64>,
    next_seq: u64,
    stats: PoolStats,
}

impl ResourcePool {
    pub fn new(id: PoolId, name: &str, capacity: usize, preemptive: bool) -> Result<Self, SimError> {
        if capacity == 0 {
            return Err(SimError::Config(format!(
                "resource pool '{}' must have a positive capacity",
                name
            )));
        }

        Ok(Self {
            id,
            name: name.to_string(),
            capacity,
            preemptive,
            holders: Vec::with_capacity(capacity),
            waiting: BTreeMap::new(),
            revoked: HashSet::new(),
            next_seq: 0,
            stats: PoolStats {
                capacity,
                ..PoolStats::default()
            },
        })
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_preemptive(&self) -> bool {
        self.preemptive
    }

    /// Число выданных единиц
    pub fn in_use(&self) -> usize {
        self.holders.len()
    }

    pub fn is_idle(&self) -> bool {
        self.holders.is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn holders(&self) -> &[Holder] {
        &self.holders
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Запросить единицу. Свободная выдаётся сразу; в вытесняющем пуле
    /// наименее срочный держатель уступает строго более срочной заявке;
    /// иначе заявка встаёт в очередь по (приоритет, порядок поступления).
    pub fn request(&mut self, process: ProcessId, priority: Priority) -> RequestOutcome {
        let handle = self.next_handle();
        self.stats.requests += 1;

        if self.holders.len() < self.capacity {
            self.grant(Holder { handle, process, priority });
            return RequestOutcome { handle, granted: true, evicted: None };
        }

        if self.preemptive {
            if let Some(index) = self.least_urgent_holder() {
                let victim = self.holders[index];
                if priority.outranks(victim.priority) {
                    self.holders.remove(index);
                    self.revoked.insert(victim.handle.seq);
                    self.stats.preemptions += 1;
                    debug!(
                        "{}: процесс {} (приоритет {}) вытесняет процесс {} (приоритет {})",
                        self.name, process, priority, victim.process, victim.priority
                    );
                    self.grant(Holder { handle, process, priority });
                    return RequestOutcome {
                        handle,
                        granted: true,
                        evicted: Some(Eviction {
                            victim: victim.process,
                            handle: victim.handle,
                            priority: victim.priority,
                        }),
                    };
                }
            }
        }

        self.waiting.insert((priority, handle.seq), Waiter { handle, process });
        debug!(
            "{}: процесс {} встал в очередь (приоритет {}, длина {})",
            self.name,
            process,
            priority,
            self.waiting.len()
        );
        RequestOutcome { handle, granted: false, evicted: None }
    }

    /// Занять единицу в обход очереди и вытеснения, только если пул полностью свободен
    pub fn claim_idle(&mut self, process: ProcessId, priority: Priority) -> Option<GrantHandle> {
        if !self.is_idle() {
            return None;
        }
        let handle = self.next_handle();
        self.stats.requests += 1;
        self.grant(Holder { handle, process, priority });
        Some(handle)
    }

    /// Освободить единицу (или снять ожидающую заявку). Освободившаяся единица
    /// сразу переходит самой срочной заявке из очереди, при равенстве более ранней.
    pub fn release(&mut self, handle: GrantHandle) -> Result<Released, SimError> {
        if handle.pool != self.id {
            return Err(SimError::ResourceError(format!(
                "grant from pool {:?} released into '{}'",
                handle.pool, self.name
            )));
        }

        if let Some(index) = self.holders.iter().position(|h| h.handle == handle) {
            let holder = self.holders.remove(index);
            debug!("{}: процесс {} освободил единицу", self.name, holder.process);
            let promoted = self.promote_waiters();
            return Ok(Released::Freed { promoted });
        }

        let waiting_key = self
            .waiting
            .iter()
            .find(|(_, w)| w.handle == handle)
            .map(|(key, _)| *key);
        if let Some(key) = waiting_key {
            self.waiting.remove(&key);
            self.stats.cancellations += 1;
            debug!("{}: ожидающая заявка снята", self.name);
            return Ok(Released::Cancelled);
        }

        if self.revoked.remove(&handle.seq) {
            debug!("{}: отобранная единица списана владельцем", self.name);
            return Ok(Released::Ignored);
        }

        debug!("{}: повторное освобождение проигнорировано", self.name);
        Ok(Released::Ignored)
    }

    pub fn status(&self, handle: GrantHandle) -> GrantStatus {
        if handle.pool != self.id {
            GrantStatus::Released
        } else if self.holders.iter().any(|h| h.handle == handle) {
            GrantStatus::Held
        } else if self.waiting.values().any(|w| w.handle == handle) {
            GrantStatus::Waiting
        } else if self.revoked.contains(&handle.seq) {
            GrantStatus::Revoked
        } else {
            GrantStatus::Released
        }
    }

    fn next_handle(&mut self) -> GrantHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        GrantHandle { pool: self.id, seq }
    }

    fn grant(&mut self, holder: Holder) {
        self.holders.push(holder);
        self.stats.grants += 1;
        self.stats.peak_in_use = self.stats.peak_in_use.max(self.holders.len());
        debug_assert!(self.holders.len() <= self.capacity);
        debug!(
            "{}: единица выдана процессу {} ({}/{})",
            self.name,
            holder.process,
            self.holders.len(),
            self.capacity
        );
    }

    fn promote_waiters(&mut self) -> Vec<Holder> {
        let mut promoted = Vec::new();
        while self.holders.len() < self.capacity {
            let Some(((priority, _), waiter)) = self.waiting.pop_first() else {
                break;
            };
            let holder = Holder {
                handle: waiter.handle,
                process: waiter.process,
                priority,
            };
            self.grant(holder);
            promoted.push(holder);
        }
        promoted
    }

    /// Держатель с наибольшим числовым приоритетом; при равенстве получивший позже
    fn least_urgent_holder(&self) -> Option<usize> {
        self.holders
            .iter()
            .enumerate()
            .max_by_key(|(_, h)| (h.priority, h.handle.seq))
            .map(|(index, _)| index)
    }
}
