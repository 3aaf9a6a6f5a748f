//! Bounded waiting for a commanded state to show up in the cache
//!
//! The waiter never fetches anything itself. It re-reads the cache while the
//! scheduler keeps refreshing the host; the activity ping sent with the
//! command moves the host into the fast tier, which matches the wait
//! interval.

use std::time::Duration;

use tracing::debug;

use crate::config::ConvergenceConfig;
use crate::model::Host;
use crate::store::HostCache;
use musiccast_api::Status;

#[derive(Debug, Clone, Copy)]
pub struct ConvergenceWaiter {
    interval: Duration,
    bound: Duration,
}

impl ConvergenceWaiter {
    pub fn new(config: ConvergenceConfig) -> Self {
        Self {
            interval: config.interval,
            bound: config.bound,
        }
    }

    /// Poll `converged` until it holds or the bound is used up
    ///
    /// The last sleep is shortened so the total wait never exceeds the bound.
    /// Returns whether convergence was observed. Running out of time is not
    /// an error; the next scheduled refresh reconciles any difference.
    pub async fn wait_until<F>(&self, mut converged: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let mut elapsed = Duration::ZERO;
        loop {
            if converged() {
                return true;
            }
            if elapsed >= self.bound {
                return false;
            }
            let step = self.interval.min(self.bound - elapsed);
            tokio::time::sleep(step).await;
            elapsed += step;
        }
    }

    /// Wait until the cached power state of `host` equals `on`
    pub async fn wait_for_power(&self, cache: &HostCache, host: &Host, on: bool) -> bool {
        let converged = self
            .wait_until(|| {
                cache
                    .get::<Status>(host)
                    .is_some_and(|status| status.is_powered_on() == on)
            })
            .await;
        if !converged {
            debug!(%host, on, "power did not converge within bound");
        }
        converged
    }
}

impl Default for ConvergenceWaiter {
    fn default() -> Self {
        Self::new(ConvergenceConfig::default())
    }
}
