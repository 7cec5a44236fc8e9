//! Graceful shutdown coordination for the DNS listeners
//!
//! Provides coordinated shutdown with connection draining, adapted to the
//! std-thread transport model: no async runtime backs the UDP/TCP servers,
//! so draining is implemented with a `Condvar`-bounded poll loop rather than
//! `tokio::time::timeout`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ShutdownError {
    #[display(fmt = "shutdown already in progress")]
    AlreadyShuttingDown,
}

/// Configuration for graceful shutdown
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to wait for in-flight queries to complete
    pub drain_timeout: Duration,
    /// Enable verbose shutdown logging
    pub verbose: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(5),
            verbose: false,
        }
    }
}

/// Shutdown coordinator for graceful server termination
///
/// Listener threads check `is_shutting_down()` between accepts, and register
/// in-flight work with `register_connection`/`register_query` so `shutdown()`
/// can wait for a bounded drain before returning.
pub struct ShutdownCoordinator {
    shutting_down: Arc<AtomicBool>,
    active_connections: Arc<AtomicUsize>,
    active_queries: Arc<AtomicUsize>,
    config: ShutdownConfig,
}

impl ShutdownCoordinator {
    pub fn new(config: ShutdownConfig) -> Self {
        Self {
            shutting_down: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
            active_queries: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    pub fn register_connection(&self) -> ConnectionGuard {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            counter: self.active_connections.clone(),
        }
    }

    pub fn register_query(&self) -> QueryGuard {
        self.active_queries.fetch_add(1, Ordering::Relaxed);
        QueryGuard {
            counter: self.active_queries.clone(),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn query_count(&self) -> usize {
        self.active_queries.load(Ordering::Relaxed)
    }

    /// Initiate graceful shutdown, blocking the caller for up to
    /// `drain_timeout` while in-flight queries and connections finish.
    pub fn shutdown(&self) -> Result<(), ShutdownError> {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return Err(ShutdownError::AlreadyShuttingDown);
        }

        log::info!("initiating graceful shutdown");
        let deadline = Instant::now() + self.config.drain_timeout;

        while Instant::now() < deadline
            && (self.query_count() > 0 || self.connection_count() > 0)
        {
            if self.config.verbose {
                log::debug!(
                    "draining: {} queries, {} connections",
                    self.query_count(),
                    self.connection_count()
                );
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        if self.query_count() > 0 || self.connection_count() > 0 {
            log::warn!(
                "drain timeout reached with {} queries and {} connections still active",
                self.query_count(),
                self.connection_count()
            );
        } else {
            log::info!("graceful shutdown complete");
        }

        Ok(())
    }
}

/// RAII guard decrementing the active-connection counter on drop
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

/// RAII guard decrementing the active-query counter on drop
pub struct QueryGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for QueryGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_before_returning() {
        let coordinator = ShutdownCoordinator::new(ShutdownConfig {
            drain_timeout: Duration::from_millis(200),
            verbose: false,
        });
        let guard = coordinator.register_query();
        assert_eq!(coordinator.query_count(), 1);
        drop(guard);
        assert_eq!(coordinator.query_count(), 0);
        assert!(coordinator.shutdown().is_ok());
    }

    #[test]
    fn double_shutdown_errors() {
        let coordinator = ShutdownCoordinator::new(ShutdownConfig::default());
        assert!(coordinator.shutdown().is_ok());
        assert!(coordinator.shutdown().is_err());
    }
}
