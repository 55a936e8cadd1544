use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::detector::DetectorState;

use super::{Monitor, TickOutcome};

/// Counters shared between the timer thread and the handle.
#[derive(Debug, Default)]
struct Counters {
    ticks_run: AtomicU64,
    ticks_skipped: AtomicU64,
    plays_recorded: AtomicU64,
    persist_failures: AtomicU64,
}

/// Snapshot of what the scheduler has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks_run: u64,
    /// Fires dropped because a tick was still running.
    pub ticks_skipped: u64,
    pub plays_recorded: u64,
    pub persist_failures: u64,
}

type SharedMonitor = Arc<Mutex<Monitor>>;

/// Run one tick unless another one is in flight.
///
/// Returns `None` when the tick was skipped. A panicking source or sink is
/// contained here and reported as an idle tick.
fn run_guarded(monitor: &SharedMonitor, counters: &Counters) -> Option<TickOutcome> {
    let mut guard = match monitor.try_lock() {
        Ok(g) => g,
        Err(TryLockError::WouldBlock) => {
            counters.ticks_skipped.fetch_add(1, Ordering::Relaxed);
            debug!("tick skipped, previous one still running");
            return None;
        }
        Err(TryLockError::Poisoned(p)) => p.into_inner(),
    };

    let outcome = match catch_unwind(AssertUnwindSafe(|| guard.tick())) {
        Ok(o) => o,
        Err(_) => {
            error!("tick panicked; continuing with the next one");
            TickOutcome::Idle
        }
    };
    drop(guard);

    counters.ticks_run.fetch_add(1, Ordering::Relaxed);
    match &outcome {
        TickOutcome::Emitted(_) => {
            counters.plays_recorded.fetch_add(1, Ordering::Relaxed);
        }
        TickOutcome::PersistFailed(_) => {
            counters.persist_failures.fetch_add(1, Ordering::Relaxed);
        }
        _ => {}
    }
    Some(outcome)
}

pub struct Scheduler;

impl Scheduler {
    /// Start ticking `monitor` every `interval` on a dedicated thread.
    ///
    /// The first tick fires one interval after start. Fires that come due
    /// while a tick is still running are dropped, never queued.
    pub fn start(monitor: Monitor, interval: Duration) -> SchedulerHandle {
        let interval = interval.max(Duration::from_millis(1));
        let monitor: SharedMonitor = Arc::new(Mutex::new(monitor));
        let counters = Arc::new(Counters::default());
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let monitor_for_thread = monitor.clone();
        let counters_for_thread = counters.clone();
        let join = thread::Builder::new()
            .name("playlog-poll".to_string())
            .spawn(move || {
                info!("polling every {} ms", interval.as_millis());
                let mut next = Instant::now() + interval;
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    let started = Instant::now();
                    if let Some(outcome) = run_guarded(&monitor_for_thread, &counters_for_thread)
                    {
                        debug!(?outcome, "tick");
                    }
                    let took = started.elapsed();
                    if took > interval {
                        warn!(
                            "tick took {} ms, longer than the {} ms poll interval",
                            took.as_millis(),
                            interval.as_millis()
                        );
                    }

                    next += interval;
                    let now = Instant::now();
                    if next <= now {
                        // Drop every fire that came due while the tick ran.
                        let behind = now - next;
                        let missed = behind.as_nanos() / interval.as_nanos() + 1;
                        let missed = u32::try_from(missed).unwrap_or(u32::MAX);
                        counters_for_thread
                            .ticks_skipped
                            .fetch_add(u64::from(missed), Ordering::Relaxed);
                        next += interval.saturating_mul(missed);
                    }
                }
                debug!("poll timer disarmed");
            });

        let join = match join {
            Ok(j) => Some(j),
            Err(e) => {
                error!("could not start the poll thread: {e}");
                None
            }
        };

        SchedulerHandle {
            stop_tx: Some(stop_tx),
            join,
            monitor,
            counters,
        }
    }
}

/// Owner of a running scheduler. Dropping it stops polling.
pub struct SchedulerHandle {
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
    monitor: SharedMonitor,
    counters: Arc<Counters>,
}

impl SchedulerHandle {
    pub fn stats(&self) -> SchedulerStats {
        let c = &self.counters;
        SchedulerStats {
            ticks_run: c.ticks_run.load(Ordering::Relaxed),
            ticks_skipped: c.ticks_skipped.load(Ordering::Relaxed),
            plays_recorded: c.plays_recorded.load(Ordering::Relaxed),
            persist_failures: c.persist_failures.load(Ordering::Relaxed),
        }
    }

    /// Run a tick right away from the calling thread.
    ///
    /// Shares the overlap guard with the timer: returns `None` if a tick is
    /// already running.
    pub fn tick_now(&self) -> Option<TickOutcome> {
        run_guarded(&self.monitor, &self.counters)
    }

    /// Host-facing description of the running monitor.
    pub fn describe(&self) -> String {
        match self.monitor.lock() {
            Ok(m) => m.describe(),
            Err(p) => p.into_inner().describe(),
        }
    }

    fn shutdown(&mut self) -> DetectorState {
        // Disarm first: no tick can start after this.
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }

        // Let a tick in flight finish its write.
        if let Some(h) = self.join.take() {
            if h.join().is_err() {
                error!("poll thread panicked");
            }
        }

        let mut monitor = match self.monitor.lock() {
            Ok(m) => m,
            Err(p) => p.into_inner(),
        };
        monitor.close();
        info!("monitor stopped");
        monitor.detector_state().clone()
    }

    /// Stop polling, wait for a running tick, then close the store.
    ///
    /// Returns the detector's final state.
    pub fn stop(mut self) -> DetectorState {
        self.shutdown()
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if self.stop_tx.is_some() {
            self.shutdown();
        }
    }
}
