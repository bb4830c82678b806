//! Управление ресурсами симуляции

mod pool;

pub use pool::{
    Eviction, GrantHandle, GrantStatus, Holder, PoolId, PoolStats, Released, RequestOutcome,
    ResourcePool,
};
