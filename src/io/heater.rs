use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::brain::planner::HvacMode;
use crate::io::host::{HostHub, HubError};

/// Outbound control of the downstream boiler/heater climate entity.
///
/// Both operations are idempotent on the host side, so repeating a command
/// is always safe.
#[async_trait]
pub trait HeaterControl {
    async fn set_hvac_mode(&self, mode: HvacMode) -> Result<(), HubError>;

    async fn set_target_temperature(&self, temperature: f32) -> Result<(), HubError>;
}

pub struct HubHeater {
    hub: Arc<dyn HostHub + Send + Sync>,
    entity_id: String,
}

impl HubHeater {
    pub fn new(hub: Arc<dyn HostHub + Send + Sync>, entity_id: String) -> Self {
        Self { hub, entity_id }
    }
}

#[async_trait]
impl HeaterControl for HubHeater {
    async fn set_hvac_mode(&self, mode: HvacMode) -> Result<(), HubError> {
        self.hub
            .call_service(
                "climate",
                "set_hvac_mode",
                json!({
                    "entity_id": self.entity_id,
                    "hvac_mode": mode.to_string(),
                }),
            )
            .await
    }

    async fn set_target_temperature(&self, temperature: f32) -> Result<(), HubError> {
        self.hub
            .call_service(
                "climate",
                "set_temperature",
                json!({
                    "entity_id": self.entity_id,
                    "temperature": temperature,
                }),
            )
            .await
    }
}
