use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::io::host::{HostHub, HubError};

#[async_trait]
pub trait OccupancyManager {
    /// Whether anybody is in the monitored zone right now.
    async fn anyone_home(&self) -> Result<bool, HubError>;
}

/// Reads a zone entity whose state is its occupant count; "0" means away.
pub struct HubOccupancy {
    hub: Arc<dyn HostHub + Send + Sync>,
    zone_entity_id: String,
}

impl HubOccupancy {
    pub fn new(hub: Arc<dyn HostHub + Send + Sync>, zone_entity_id: String) -> Self {
        Self {
            hub,
            zone_entity_id,
        }
    }
}

#[async_trait]
impl OccupancyManager for HubOccupancy {
    async fn anyone_home(&self) -> Result<bool, HubError> {
        match self.hub.get_state(&self.zone_entity_id).await? {
            Some(state) => Ok(state.get_state() != "0"),
            None => {
                debug!(
                    "Zone entity {} not found, assuming occupied",
                    self.zone_entity_id
                );
                Ok(true)
            }
        }
    }
}
