//! Connection pool management with read/write separation.
//!
//! `BatchStats`/`FindQuiescentBatches` are read-heavy polling queries that
//! should not contend with the claim/mark writes on the hot path, so Store
//! keeps a dedicated write pool and read pool rather than one shared pool.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tender_config::StoreConfig;

use crate::error::StoreResult;

/// Manages the write and read connection pools backing a [`crate::postgres::PgStore`].
#[derive(Clone)]
pub struct PoolManager {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PoolManager {
    /// Connect both pools and, if `config.auto_migrate`, run embedded
    /// migrations before returning.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let write_pool = PgPoolOptions::new()
            .max_connections(config.write_pool_size)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(config.idle_timeout())
            .max_lifetime(config.max_lifetime())
            .connect(&config.url)
            .await?;

        let read_pool = PgPoolOptions::new()
            .max_connections(config.read_pool_size)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(config.idle_timeout())
            .max_lifetime(config.max_lifetime())
            .connect(&config.url)
            .await?;

        if config.auto_migrate {
            sqlx::migrate!("./migrations").run(&write_pool).await?;
        }

        Ok(Self {
            write_pool,
            read_pool,
        })
    }

    /// Pool for claim/mark/transition writes.
    pub const fn write_pool(&self) -> &PgPool {
        &self.write_pool
    }

    /// Pool for status/summary/quiescent-scan reads.
    pub const fn read_pool(&self) -> &PgPool {
        &self.read_pool
    }

    /// Combined pool statistics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            write: ConnectionStats {
                size: self.write_pool.size(),
                idle: u32::try_from(self.write_pool.num_idle()).unwrap_or(u32::MAX),
            },
            read: ConnectionStats {
                size: self.read_pool.size(),
                idle: u32::try_from(self.read_pool.num_idle()).unwrap_or(u32::MAX),
            },
        }
    }

    /// Close both pools.
    pub async fn close(&self) {
        self.write_pool.close().await;
        self.read_pool.close().await;
    }
}

/// Point-in-time statistics for one pool.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionStats {
    /// Current number of connections.
    pub size: u32,
    /// Number of idle connections.
    pub idle: u32,
}

/// Point-in-time statistics for both pools.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    /// Write pool statistics.
    pub write: ConnectionStats,
    /// Read pool statistics.
    pub read: ConnectionStats,
}

impl PoolStats {
    /// Fraction of total connections currently checked out, in `[0.0, 100.0]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f32 {
        let total = (self.write.size + self.read.size) as f32;
        let idle = (self.write.idle + self.read.idle) as f32;
        if total > 0.0 {
            ((total - idle) / total) * 100.0
        } else {
            0.0
        }
    }
}

/// Acquire timeout helper shared by tests that build pools manually.
pub fn acquire_timeout(seconds: u64) -> Duration {
    Duration::from_secs(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_stats_utilization_zero_when_empty() {
        let stats = PoolStats {
            write: ConnectionStats { size: 0, idle: 0 },
            read: ConnectionStats { size: 0, idle: 0 },
        };
        assert!((stats.utilization() - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pool_stats_utilization_computed_from_busy_connections() {
        let stats = PoolStats {
            write: ConnectionStats { size: 10, idle: 4 },
            read: ConnectionStats { size: 10, idle: 6 },
        };
        assert!((stats.utilization() - 50.0).abs() < 0.01);
    }
}
