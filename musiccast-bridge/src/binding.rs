//! Accessory binding that reports to the log
//!
//! Stands in for a control surface: layouts are logged once at `info`, and a
//! characteristic is logged only when its value differs from the last one
//! pushed for the same host.

use std::collections::HashMap;
use std::mem::{discriminant, Discriminant};

use musiccast_state::{
    AccessoryBinding, AccessoryLayout, CharacteristicUpdate, Host, VolumeLayout,
};
use parking_lot::Mutex;
use tracing::{debug, info};

type Key = (Host, Discriminant<CharacteristicUpdate>);

#[derive(Default)]
pub struct LoggingBinding {
    last: Mutex<HashMap<Key, CharacteristicUpdate>>,
}

impl LoggingBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `update`, returning whether it differs from the previous value
    fn record(&self, host: &Host, update: CharacteristicUpdate) -> bool {
        let key = (host.clone(), discriminant(&update));
        self.last.lock().insert(key, update) != Some(update)
    }
}

impl AccessoryBinding for LoggingBinding {
    fn publish(&self, host: &Host, layout: &AccessoryLayout) {
        let volume = match &layout.volume {
            VolumeLayout::Stepped(steps) => format!("{} steps", steps.len()),
            VolumeLayout::Continuous { min, max } => format!("{min}..={max}"),
        };
        info!(
            %host,
            model = %layout.info.model,
            category = ?layout.category,
            %volume,
            sources = layout.sources.as_ref().map_or(0, Vec::len),
            lip_sync = layout.lip_sync,
            surround_decoder = layout.surround_decoder,
            "accessory ready"
        );
        if let Some(sources) = &layout.sources {
            for source in sources {
                debug!(%host, identifier = source.identifier, name = %source.name, "source");
            }
        }
    }

    fn push(&self, host: &Host, update: CharacteristicUpdate) {
        if self.record(host, update) {
            info!(%host, ?update, "characteristic changed");
        }
    }
}
