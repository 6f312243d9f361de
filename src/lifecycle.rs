//! Idle lifecycle - keeps the service resident only while it is in use.
//!
//! The manager owns the single piece of shared mutable state in the crate:
//! the time of the last request and the number of requests in flight. The
//! host (or [`run_idle_watchdog`]) calls [`IdleLifecycleManager::poll`] on a
//! timer; it answers `true` exactly once, when the service has been idle for
//! the whole timeout with nothing in flight.
//!
//! ```text
//! Active --(timeout elapsed, in_flight == 0)--> Idle --poll()--> Terminating
//!   ^                                            |
//!   +-------------- new activity ----------------+
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

#[cfg(feature = "async")]
use std::sync::Arc;

#[cfg(feature = "async")]
use tokio_util::sync::CancellationToken;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("service is shutting down")]
    ShuttingDown,
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Follows tokio's clock, so paused test time drives the idle timeout.
#[cfg(feature = "async")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[cfg(feature = "async")]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Requests in flight, or the last one finished less than a timeout ago.
    Active,
    /// Timeout elapsed with nothing in flight; the next poll terminates.
    Idle,
    /// Shutdown initiated. Terminal.
    Terminating,
}

/// Fixed at start-up, not adjustable while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleConfig {
    /// Idle period after which the service quits.
    pub timeout: Duration,
    /// How often [`run_idle_watchdog`] polls.
    pub check_interval: Duration,
}

impl IdleConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_IDLE_TIMEOUT,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

struct IdleState {
    last_activity: Instant,
    in_flight: usize,
    terminating: bool,
}

type ShutdownHook = Box<dyn FnOnce() + Send>;

pub struct IdleLifecycleManager<C: Clock = SystemClock> {
    config: IdleConfig,
    clock: C,
    state: Mutex<IdleState>,
    on_shutdown: Mutex<Option<ShutdownHook>>,
}

impl IdleLifecycleManager<SystemClock> {
    pub fn new(timeout: Duration) -> Self {
        Self::from_config(IdleConfig::with_timeout(timeout))
    }

    pub fn from_config(config: IdleConfig) -> Self {
        Self::with_config(config, SystemClock)
    }
}

impl<C: Clock> IdleLifecycleManager<C> {
    pub fn with_clock(timeout: Duration, clock: C) -> Self {
        Self::with_config(IdleConfig::with_timeout(timeout), clock)
    }

    /// Creates a manager whose idle period starts now.
    pub fn with_config(config: IdleConfig, clock: C) -> Self {
        let state = IdleState {
            last_activity: clock.now(),
            in_flight: 0,
            terminating: false,
        };
        Self {
            config,
            clock,
            state: Mutex::new(state),
            on_shutdown: Mutex::new(None),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn check_interval(&self) -> Duration {
        self.config.check_interval
    }

    /// Registers the hook run once when the manager decides to terminate.
    /// Replaces any previously registered hook.
    pub fn on_shutdown<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.on_shutdown.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(hook));
    }

    // The guarded state is updated field by field with no early returns in
    // between, so a poisoned lock still holds consistent data.
    fn state(&self) -> MutexGuard<'_, IdleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pushes the idle deadline back. No effect once terminating.
    pub fn record_activity(&self) {
        let now = self.clock.now();
        let mut state = self.state();
        if !state.terminating {
            state.last_activity = now;
        }
    }

    /// Marks the start of a request. The returned guard marks its end when
    /// dropped; until then the manager will not terminate.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::ShuttingDown`] once the manager has terminated.
    pub fn begin_request(&self) -> Result<ActivityGuard<'_, C>, LifecycleError> {
        let now = self.clock.now();
        let mut state = self.state();
        if state.terminating {
            return Err(LifecycleError::ShuttingDown);
        }
        state.in_flight += 1;
        state.last_activity = now;
        Ok(ActivityGuard { manager: self })
    }

    fn end_request(&self) {
        let now = self.clock.now();
        let mut state = self.state();
        state.in_flight = state.in_flight.saturating_sub(1);
        if !state.terminating {
            state.last_activity = now;
        }
    }

    pub fn in_flight(&self) -> usize {
        self.state().in_flight
    }

    pub fn phase(&self) -> LifecyclePhase {
        let now = self.clock.now();
        let state = self.state();
        if state.terminating {
            LifecyclePhase::Terminating
        } else if state.in_flight == 0
            && now.saturating_duration_since(state.last_activity) >= self.config.timeout
        {
            LifecyclePhase::Idle
        } else {
            LifecyclePhase::Active
        }
    }

    /// Idle check for the host's timer.
    ///
    /// Returns `true` exactly once: on the first call made with nothing in
    /// flight and at least `timeout` since the last activity. That call moves
    /// the manager to [`LifecyclePhase::Terminating`] and runs the shutdown
    /// hook. Every other call returns `false`.
    pub fn poll(&self) -> bool {
        let now = self.clock.now();
        {
            let mut state = self.state();
            if state.terminating
                || state.in_flight > 0
                || now.saturating_duration_since(state.last_activity) < self.config.timeout
            {
                return false;
            }
            state.terminating = true;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Idle for {:?} with no requests in flight, shutting down",
            self.config.timeout
        );

        let hook = self
            .on_shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(hook) = hook {
            hook();
        }
        true
    }
}

/// Keeps a request counted as in flight until dropped.
#[must_use = "the request ends as soon as the guard is dropped"]
pub struct ActivityGuard<'a, C: Clock> {
    manager: &'a IdleLifecycleManager<C>,
}

impl<C: Clock> Drop for ActivityGuard<'_, C> {
    fn drop(&mut self) {
        self.manager.end_request();
    }
}

/// Polls `manager` every configured check interval until it decides to
/// terminate (returns `true`) or `token` is cancelled (returns `false`).
#[cfg(feature = "async")]
pub async fn run_idle_watchdog<C: Clock>(
    manager: Arc<IdleLifecycleManager<C>>,
    token: CancellationToken,
) -> bool {
    let mut ticker = tokio::time::interval(manager.check_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    #[cfg(feature = "tracing")]
    tracing::debug!("idle watchdog started, timeout {:?}", manager.timeout());

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("idle watchdog cancelled");
                return false;
            }
            _ = ticker.tick() => {
                if manager.poll() {
                    return true;
                }
            }
        }
    }
}
