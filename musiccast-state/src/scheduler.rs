//! Tiered poll scheduler
//!
//! One recurring tick evaluates every registered host against the
//! [`PollTiers`] policy. A due host has its `last_status_update` stamped
//! before its subscribers run, then all of its subscribers run in
//! registration order on a task of their own, so a slow device only holds
//! up its own subscribers. A host whose previous refresh is still running is
//! skipped until that refresh finishes.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::activity::PollTiers;
use crate::error::{Result, StateError};
use crate::model::Host;
use crate::store::HostCache;

/// Refresh logic invoked when a host is due
#[async_trait]
pub trait RefreshSubscriber: Send + Sync {
    async fn refresh(&self) -> Result<()>;
}

/// Ordered subscribers per host, hosts in registration order
#[derive(Default)]
struct CallbackRegistry {
    entries: Vec<(Host, Vec<Arc<dyn RefreshSubscriber>>)>,
}

impl CallbackRegistry {
    fn add(&mut self, host: &Host, subscriber: Arc<dyn RefreshSubscriber>) -> usize {
        match self.entries.iter_mut().find(|(h, _)| h == host) {
            Some((_, subscribers)) => {
                subscribers.push(subscriber);
                subscribers.len()
            }
            None => {
                self.entries.push((host.clone(), vec![subscriber]));
                1
            }
        }
    }

    fn snapshot(&self) -> Vec<(Host, Vec<Arc<dyn RefreshSubscriber>>)> {
        self.entries.clone()
    }

    fn subscriber_count(&self, host: &Host) -> usize {
        self.entries
            .iter()
            .find(|(h, _)| h == host)
            .map_or(0, |(_, subscribers)| subscribers.len())
    }
}

/// Removes a host from the in-flight set when its refresh task ends,
/// including by panic
struct InFlightGuard {
    host: Host,
    in_flight: Arc<Mutex<HashSet<Host>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.host);
    }
}

struct RunningTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Statistics for the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    pub hosts: usize,
    pub subscriptions: usize,
    pub in_flight: usize,
    pub running: bool,
}

/// Drives refreshes for every registered host
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct PollScheduler {
    cache: HostCache,
    tiers: PollTiers,
    registry: Arc<Mutex<CallbackRegistry>>,
    in_flight: Arc<Mutex<HashSet<Host>>>,
    task: Arc<Mutex<Option<RunningTask>>>,
}

impl PollScheduler {
    pub fn new(cache: HostCache, tiers: PollTiers) -> Self {
        Self {
            cache,
            tiers,
            registry: Arc::new(Mutex::new(CallbackRegistry::default())),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            task: Arc::new(Mutex::new(None)),
        }
    }

    /// Register a refresh subscriber for `host`
    ///
    /// The first subscription registers the host with the activity tracker.
    /// Returns the number of subscribers now attached to the host.
    pub fn subscribe(&self, host: &Host, subscriber: Arc<dyn RefreshSubscriber>) -> usize {
        self.cache.register(host);
        let count = self.registry.lock().add(host, subscriber);
        debug!(%host, subscribers = count, "subscribed");
        count
    }

    pub fn subscriber_count(&self, host: &Host) -> usize {
        self.registry.lock().subscriber_count(host)
    }

    /// Evaluate every host once at `now` and start refreshes for due ones
    ///
    /// Returns the hosts that fired together with the handle of their
    /// refresh task.
    pub fn tick(&self, now: Instant) -> Vec<(Host, JoinHandle<()>)> {
        let mut fired = Vec::new();
        let entries = self.registry.lock().snapshot();

        for (host, subscribers) in entries {
            if self.in_flight.lock().contains(&host) {
                debug!(%host, "previous refresh still running");
                continue;
            }
            let Some(record) = self.cache.activity(&host) else {
                continue;
            };
            if !self.tiers.is_due(&record, now) {
                continue;
            }

            self.cache.mark_refreshed(&host, now);
            self.in_flight.lock().insert(host.clone());
            let guard = InFlightGuard {
                host: host.clone(),
                in_flight: Arc::clone(&self.in_flight),
            };

            let task_host = host.clone();
            let handle = tokio::spawn(async move {
                let _guard = guard;
                run_subscribers(&task_host, subscribers).await;
            });
            fired.push((host, handle));
        }

        fired
    }

    /// Spawn the recurring tick
    pub fn start(&self) -> Result<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Err(StateError::AlreadyRunning);
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let scheduler = self.clone();
        let period = self.tiers.tick;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        scheduler.tick(Instant::now());
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("scheduler loop ended");
        });

        *task = Some(RunningTask { shutdown, handle });
        info!(tick = ?period, "scheduler started");
        Ok(())
    }

    /// Stop the recurring tick and wait for it to end
    ///
    /// Refreshes already in flight run to completion on their own. Stopping
    /// a scheduler that is not running is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let Some(task) = self.task.lock().take() else {
            return Ok(());
        };
        // the loop may already be gone if the runtime is shutting down
        let _ = task.shutdown.send(true);
        task.handle
            .await
            .map_err(|e| StateError::TaskFailed(e.to_string()))?;
        info!("scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    pub fn stats(&self) -> SchedulerStats {
        let registry = self.registry.lock();
        SchedulerStats {
            hosts: registry.entries.len(),
            subscriptions: registry.entries.iter().map(|(_, s)| s.len()).sum(),
            in_flight: self.in_flight.lock().len(),
            running: self.is_running(),
        }
    }
}

/// Run one host's subscribers in order, isolating failures
async fn run_subscribers(host: &Host, subscribers: Vec<Arc<dyn RefreshSubscriber>>) {
    for (index, subscriber) in subscribers.iter().enumerate() {
        match AssertUnwindSafe(subscriber.refresh()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%host, subscriber = index, error = %e, "refresh failed"),
            Err(_) => error!(%host, subscriber = index, "refresh panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Counts refreshes and optionally fails, panics or stalls
    #[derive(Default)]
    struct Probe {
        calls: AtomicU32,
        fail: bool,
        panic: bool,
        stall: Option<Duration>,
        log: Option<Arc<Mutex<Vec<&'static str>>>>,
        name: &'static str,
    }

    impl Probe {
        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RefreshSubscriber for Probe {
        async fn refresh(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(log) = &self.log {
                log.lock().push(self.name);
            }
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            if self.panic {
                panic!("probe panic");
            }
            if self.fail {
                return Err(StateError::Api(musiccast_api::ApiError::NetworkError(
                    "unreachable".into(),
                )));
            }
            Ok(())
        }
    }

    async fn drain(fired: Vec<(Host, JoinHandle<()>)>) -> Vec<Host> {
        let mut hosts = Vec::new();
        for (host, handle) in fired {
            handle.await.unwrap();
            hosts.push(host);
        }
        hosts
    }

    fn setup() -> (HostCache, PollScheduler) {
        let cache = HostCache::new();
        let scheduler = PollScheduler::new(cache.clone(), PollTiers::default());
        (cache, scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_host_is_in_fast_tier() {
        let (_, scheduler) = setup();
        let host = Host::new("10.0.0.2");
        let probe = Arc::new(Probe::default());
        scheduler.subscribe(&host, probe.clone());

        let start = Instant::now();
        assert!(drain(scheduler.tick(start)).await.is_empty());
        assert_eq!(drain(scheduler.tick(start + Duration::from_secs(1))).await, vec![host]);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_stamps_update_before_subscribers_run() {
        let (cache, scheduler) = setup();
        let host = Host::new("10.0.0.2");
        scheduler.subscribe(&host, Arc::new(Probe::default()));

        let now = Instant::now() + Duration::from_secs(61);
        let fired = scheduler.tick(now);
        assert_eq!(cache.activity(&host).unwrap().last_status_update, now);
        drain(fired).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_run_in_registration_order() {
        let (_, scheduler) = setup();
        let host = Host::new("10.0.0.2");
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["volume", "inputs", "switches"] {
            scheduler.subscribe(
                &host,
                Arc::new(Probe { name, log: Some(log.clone()), ..Default::default() }),
            );
        }
        assert_eq!(scheduler.subscriber_count(&host), 3);

        drain(scheduler.tick(Instant::now() + Duration::from_secs(61))).await;
        assert_eq!(*log.lock(), vec!["volume", "inputs", "switches"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_isolated() {
        let (_, scheduler) = setup();
        let a = Host::new("10.0.0.2");
        let b = Host::new("10.0.0.3");
        let failing = Arc::new(Probe { fail: true, ..Default::default() });
        let panicking = Arc::new(Probe { panic: true, ..Default::default() });
        let after = Arc::new(Probe::default());
        let other = Arc::new(Probe::default());
        scheduler.subscribe(&a, failing.clone());
        scheduler.subscribe(&a, panicking.clone());
        scheduler.subscribe(&a, after.clone());
        scheduler.subscribe(&b, other.clone());

        let fired = drain(scheduler.tick(Instant::now() + Duration::from_secs(61))).await;
        assert_eq!(fired.len(), 2);
        assert_eq!(failing.calls(), 1);
        assert_eq!(panicking.calls(), 1);
        assert_eq!(after.calls(), 1);
        assert_eq!(other.calls(), 1);
        assert_eq!(scheduler.stats().in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_host_is_not_refired_while_in_flight() {
        let (_, scheduler) = setup();
        let slow = Host::new("10.0.0.2");
        let fast = Host::new("10.0.0.3");
        let stalled = Arc::new(Probe { stall: Some(Duration::from_secs(30)), ..Default::default() });
        let quick = Arc::new(Probe::default());
        scheduler.subscribe(&slow, stalled.clone());
        scheduler.subscribe(&fast, quick.clone());

        let base = Instant::now();
        let first = scheduler.tick(base + Duration::from_secs(1));
        assert_eq!(first.len(), 2);
        let (pending, done): (Vec<_>, Vec<_>) =
            first.into_iter().partition(|(host, _)| *host == slow);
        drain(done).await;
        assert_eq!(quick.calls(), 1);
        assert_eq!(scheduler.stats().in_flight, 1);

        // slow host is still stalled; the fast one keeps going
        let second = scheduler.tick(base + Duration::from_secs(2));
        let hosts: Vec<Host> = second.iter().map(|(h, _)| h.clone()).collect();
        assert_eq!(hosts, vec![fast.clone()]);

        drain(second).await;
        drain(pending).await;
        assert_eq!(stalled.calls(), 1);
        assert_eq!(quick.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness_bound_for_idle_host() {
        let (cache, scheduler) = setup();
        let host = Host::new("10.0.0.2");
        scheduler.subscribe(&host, Arc::new(Probe::default()));

        // let the registration window pass without any activity
        let mut now = Instant::now();
        let end = now + Duration::from_secs(600);
        while now < end {
            now += Duration::from_secs(1);
            drain(scheduler.tick(now)).await;
            let record = cache.activity(&host).unwrap();
            assert!(now.saturating_duration_since(record.last_status_update) <= Duration::from_secs(60));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_ping_raises_cadence() {
        let (cache, scheduler) = setup();
        let host = Host::new("10.0.0.2");
        let probe = Arc::new(Probe::default());
        scheduler.subscribe(&host, probe.clone());

        let base = Instant::now();
        // settle into the idle tier
        drain(scheduler.tick(base + Duration::from_secs(120))).await;
        let calls_after_settle = probe.calls();
        assert!(drain(scheduler.tick(base + Duration::from_secs(125))).await.is_empty());

        cache.ping_at(&host, false, true, base + Duration::from_secs(125));
        for s in 126..=130 {
            drain(scheduler.tick(base + Duration::from_secs(s))).await;
        }
        assert_eq!(probe.calls(), calls_after_settle + 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop() {
        let (_, scheduler) = setup();
        let host = Host::new("10.0.0.2");
        let probe = Arc::new(Probe::default());
        scheduler.subscribe(&host, probe.clone());

        scheduler.start().unwrap();
        assert!(matches!(scheduler.start(), Err(StateError::AlreadyRunning)));
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(probe.calls() >= 2);

        scheduler.stop().await.unwrap();
        assert!(!scheduler.is_running());
        let calls = probe.calls();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(probe.calls(), calls);

        // stopping twice is fine, and the scheduler can be restarted
        scheduler.stop().await.unwrap();
        scheduler.start().unwrap();
        scheduler.stop().await.unwrap();
    }
}
