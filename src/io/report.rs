use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::brain::demand::DemandSummary;
use crate::io::host::{HostHub, HubError};

/// The observable face of the aggregator: one on/off flag plus a fixed
/// attribute bag describing the TRV that most urgently wants heat.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandReport {
    demanding: bool,
    attributes: ReportAttributes,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct ReportAttributes {
    trv_climate_entities: Vec<String>,
    max_demand_delta: f32,
    max_demand_current_temperature: Option<f32>,
    max_demand_target_temperature: Option<f32>,
    max_demand_trv_entity_id: Option<String>,
    max_demand_trv_name: Option<String>,
    heater_entity_id: Option<String>,
    away_mode: bool,
    away_temperature: f32,
}

impl DemandReport {
    pub fn new(
        summary: &DemandSummary,
        trv_climate_entities: Vec<String>,
        heater_entity_id: Option<String>,
        away_mode: bool,
        away_temperature: f32,
    ) -> Self {
        let max = summary.get_max_deficit();
        let reading = max.map(|max| max.get_reading());
        Self {
            demanding: summary.is_any_demand(),
            attributes: ReportAttributes {
                trv_climate_entities,
                max_demand_delta: summary.get_deficit(),
                max_demand_current_temperature: reading
                    .and_then(|reading| reading.get_current_temperature()),
                max_demand_target_temperature: reading
                    .and_then(|reading| reading.get_target_temperature()),
                max_demand_trv_entity_id: reading
                    .map(|reading| reading.get_entity_id().to_owned()),
                max_demand_trv_name: reading
                    .and_then(|reading| reading.get_name().map(str::to_owned)),
                heater_entity_id,
                away_mode,
                away_temperature,
            },
        }
    }

    pub fn is_demanding(&self) -> bool {
        self.demanding
    }

    pub fn state_str(&self) -> &'static str {
        if self.demanding { "on" } else { "off" }
    }

    pub fn get_max_demand_delta(&self) -> f32 {
        self.attributes.max_demand_delta
    }

    pub fn get_max_demand_trv_entity_id(&self) -> Option<&str> {
        self.attributes.max_demand_trv_entity_id.as_deref()
    }
}

#[async_trait]
pub trait DemandPublisher {
    async fn publish(&self, report: &DemandReport) -> Result<(), HubError>;
}

pub struct HubPublisher {
    hub: Arc<dyn HostHub + Send + Sync>,
    entity_id: String,
}

impl HubPublisher {
    pub fn new(hub: Arc<dyn HostHub + Send + Sync>, entity_id: String) -> Self {
        Self { hub, entity_id }
    }
}

#[async_trait]
impl DemandPublisher for HubPublisher {
    async fn publish(&self, report: &DemandReport) -> Result<(), HubError> {
        let attributes = serde_json::to_value(&report.attributes).map_err(HubError::Json)?;
        self.hub
            .set_state(&self.entity_id, report.state_str(), attributes)
            .await
    }
}
