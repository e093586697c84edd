use super::StoreError;
use crate::config::{ConnectionStrategy, DbConfig, PoolSettings, RetryPolicy};
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager, PooledConnection};
use diesel::Connection;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info, warn};

// Connection pool type
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// A connection checked out by a [`ConnectionSource`]. Dropping it closes a
/// direct connection or returns a pooled one.
pub enum DbConnection {
    Direct(PgConnection),
    Pooled(PooledConnection<ConnectionManager<PgConnection>>),
}

impl Deref for DbConnection {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            DbConnection::Direct(conn) => conn,
            DbConnection::Pooled(conn) => &**conn,
        }
    }
}

impl DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            DbConnection::Direct(conn) => conn,
            DbConnection::Pooled(conn) => &mut **conn,
        }
    }
}

/// Anything that can hand out database connections. Called from blocking
/// worker threads only.
pub trait ConnectionSource: Send + Sync {
    fn acquire(&self) -> Result<DbConnection, StoreError>;

    /// Releases shared resources. Later acquisitions may fail.
    fn shutdown(&self) {}

    fn strategy(&self) -> ConnectionStrategy;
}

pub fn connector_for(config: &DbConfig) -> Box<dyn ConnectionSource> {
    match config.strategy {
        ConnectionStrategy::Direct => {
            Box::new(RetryingConnector::new(config.url.clone(), config.retry.clone()))
        }
        ConnectionStrategy::Pooled => Box::new(PooledConnector::new(
            config.url.clone(),
            config.pool.clone(),
            config.connect_timeout,
        )),
    }
}

/// Opens a fresh connection per acquisition, retrying with linear backoff.
pub struct RetryingConnector {
    url: String,
    retry: RetryPolicy,
}

impl RetryingConnector {
    pub fn new(url: String, retry: RetryPolicy) -> Self {
        Self { url, retry }
    }
}

impl ConnectionSource for RetryingConnector {
    fn acquire(&self) -> Result<DbConnection, StoreError> {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            info!("Connecting to database (attempt {}/{})", attempt, attempts);
            match PgConnection::establish(&self.url) {
                Ok(conn) => {
                    info!("Connected to database");
                    return Ok(DbConnection::Direct(conn));
                }
                Err(e) => {
                    warn!("Connection attempt {} failed: {}", attempt, e);
                    last_error = e.to_string();
                    if attempt < attempts {
                        let delay = self.retry.delay_after(attempt);
                        info!("Waiting {}s before retry", delay.as_secs());
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All {} connection attempts failed", attempts);
        Err(StoreError::Connection {
            attempts,
            message: last_error,
        })
    }

    fn strategy(&self) -> ConnectionStrategy {
        ConnectionStrategy::Direct
    }
}

enum PoolState {
    Uninitialized,
    Ready(Pool),
    Closed,
}

/// Hands out connections from a pool created on first use. Once shut down the
/// pool is never recreated.
pub struct PooledConnector {
    url: String,
    settings: PoolSettings,
    connect_timeout: Duration,
    state: Mutex<PoolState>,
}

impl PooledConnector {
    pub fn new(url: String, settings: PoolSettings, connect_timeout: Duration) -> Self {
        Self {
            url,
            settings,
            connect_timeout,
            state: Mutex::new(PoolState::Uninitialized),
        }
    }

    /// Returns the shared pool, building it if this is the first call.
    fn pool(&self) -> Result<Pool, StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Internal("pool state lock poisoned".to_string()))?;

        match &*state {
            PoolState::Ready(pool) => return Ok(pool.clone()),
            PoolState::Closed => {
                return Err(StoreError::Connection {
                    attempts: 0,
                    message: "connection pool has been shut down".to_string(),
                })
            }
            PoolState::Uninitialized => {}
        }

        let manager = ConnectionManager::<PgConnection>::new(&self.url);
        let pool = Pool::builder()
            .min_idle(Some(self.settings.min_idle))
            .max_size(self.settings.max_size)
            .idle_timeout(Some(self.settings.idle_timeout))
            .connection_timeout(self.connect_timeout)
            .build(manager)
            .map_err(|e| {
                error!("Error creating connection pool: {}", e);
                StoreError::Connection {
                    attempts: 1,
                    message: e.to_string(),
                }
            })?;
        info!(
            "Connection pool created (min {}, max {})",
            self.settings.min_idle, self.settings.max_size
        );
        *state = PoolState::Ready(pool.clone());
        Ok(pool)
    }
}

impl ConnectionSource for PooledConnector {
    fn acquire(&self) -> Result<DbConnection, StoreError> {
        let pool = self.pool()?;
        pool.get().map(DbConnection::Pooled).map_err(|e| {
            error!("Error getting connection from pool: {}", e);
            StoreError::Connection {
                attempts: 1,
                message: e.to_string(),
            }
        })
    }

    fn shutdown(&self) {
        match self.state.lock() {
            Ok(mut state) => {
                if matches!(*state, PoolState::Ready(_)) {
                    info!("Connection pool closed");
                }
                *state = PoolState::Closed;
            }
            Err(_) => error!("Could not close connection pool: state lock poisoned"),
        }
    }

    fn strategy(&self) -> ConnectionStrategy {
        ConnectionStrategy::Pooled
    }
}
