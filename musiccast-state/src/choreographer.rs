//! Ordered command sequences across linked devices
//!
//! Each step assumes the device state the previous one produced, so steps
//! run strictly one after another.

use std::sync::Arc;

use musiccast_api::{ApiError, Command, DeviceApi, GroupAction};
use tracing::{debug, info, warn};

use crate::convergence::ConvergenceWaiter;
use crate::error::Result;
use crate::model::Host;
use crate::store::HostCache;

#[derive(Clone)]
pub struct Choreographer {
    api: Arc<dyn DeviceApi>,
    cache: HostCache,
    waiter: ConvergenceWaiter,
}

impl Choreographer {
    pub fn new(api: Arc<dyn DeviceApi>, cache: HostCache, waiter: ConvergenceWaiter) -> Self {
        Self { api, cache, waiter }
    }

    /// Join `satellite` to the distribution group of `primary`
    ///
    /// Powers the primary on, waits for both devices to report power, then
    /// re-registers the satellite with the primary and starts distribution.
    /// Convergence timeouts do not abort the sequence.
    pub async fn link_satellite(&self, satellite: &Host, primary: &Host) -> Result<()> {
        info!(%satellite, %primary, "linking satellite");

        self.api
            .send_command(primary.as_str(), Command::SetPower(true))
            .await?;
        self.cache.ping(primary, true, true);

        self.waiter.wait_for_power(&self.cache, primary, true).await;
        self.waiter.wait_for_power(&self.cache, satellite, true).await;

        // clear any membership left over from an earlier link
        let remove = Command::SetServerInfo {
            client: satellite.to_string(),
            action: GroupAction::Remove,
        };
        if let Err(e) = self.api.send_command(primary.as_str(), remove).await {
            warn!(%primary, %satellite, error = %e, "removing stale group membership failed");
        }

        self.api
            .send_command(
                satellite.as_str(),
                Command::SetClientInfo {
                    server: primary.to_string(),
                },
            )
            .await?;
        self.api
            .send_command(
                primary.as_str(),
                Command::SetServerInfo {
                    client: satellite.to_string(),
                    action: GroupAction::Add,
                },
            )
            .await?;
        self.api
            .send_command(primary.as_str(), Command::StartDistribution)
            .await?;

        self.cache.ping(primary, false, true);
        self.cache.ping(satellite, false, true);
        debug!(%satellite, %primary, "distribution started");
        Ok(())
    }

    /// Send power-off to every client, in order
    ///
    /// A failing client does not stop the others. Every client is pinged so
    /// the next ticks confirm the cascade; the failures are returned.
    pub async fn power_off_clients(&self, clients: &[Host]) -> Vec<(Host, ApiError)> {
        let mut failures = Vec::new();
        for client in clients {
            match self
                .api
                .send_command(client.as_str(), Command::SetPower(false))
                .await
            {
                Ok(()) => debug!(%client, "client powered off"),
                Err(e) => {
                    warn!(%client, error = %e, "powering off client failed");
                    failures.push((client.clone(), e));
                }
            }
            self.cache.ping(client, false, true);
        }
        failures
    }
}
