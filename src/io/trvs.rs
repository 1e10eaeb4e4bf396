use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use log::{debug, warn};

use crate::brain::demand::TrvReading;
use crate::io::host::{EntityState, HostHub, HubError};

/// How long a TRV may go without reporting before we flag it. It still takes
/// part in the snapshot; its valve state is the best information we have.
const MAX_READING_AGE_SECONDS: i64 = 2 * 60 * 60;

#[async_trait]
pub trait TrvManager {
    /// Take a fresh snapshot of every monitored TRV, in configuration order.
    ///
    /// TRVs the host does not know are left out of the snapshot; a transport
    /// failure fails the whole retrieval.
    async fn retrieve_readings(&self) -> Result<Vec<TrvReading>, HubError>;
}

pub struct HubTrvs {
    hub: Arc<dyn HostHub + Send + Sync>,
    entity_ids: Vec<String>,
}

impl HubTrvs {
    pub fn new(hub: Arc<dyn HostHub + Send + Sync>, entity_ids: Vec<String>) -> Self {
        Self { hub, entity_ids }
    }
}

#[async_trait]
impl TrvManager for HubTrvs {
    async fn retrieve_readings(&self) -> Result<Vec<TrvReading>, HubError> {
        let states = join_all(
            self.entity_ids
                .iter()
                .map(|entity_id| self.hub.get_state(entity_id)),
        )
        .await;

        let mut readings = Vec::with_capacity(self.entity_ids.len());
        for (entity_id, state) in self.entity_ids.iter().zip(states) {
            match state? {
                Some(state) => {
                    warn_if_stale(&state);
                    readings.push(reading_from_state(&state));
                }
                None => debug!("TRV entity {} not found", entity_id),
            }
        }
        Ok(readings)
    }
}

fn warn_if_stale(state: &EntityState) {
    if let Some(last_updated) = state.get_last_updated() {
        let age_seconds = Utc::now().signed_duration_since(*last_updated).num_seconds();
        if age_seconds > MAX_READING_AGE_SECONDS {
            warn!(
                "{} has not reported for {}s",
                state.get_entity_id(),
                age_seconds
            );
        }
    }
}

/// Pull the demand-relevant parts out of a climate entity's state.
///
/// A TRV is calling for heat when its valve reports an active heating action,
/// or when it is in heat mode and sitting below its own target.
fn reading_from_state(state: &EntityState) -> TrvReading {
    let current_temperature = state.attribute_f32("current_temperature");
    let target_temperature = state.attribute_f32("temperature");

    let below_target = matches!(
        (current_temperature, target_temperature),
        (Some(current), Some(target)) if current < target
    );
    let calling_for_heat = state.attribute_str("hvac_action") == Some("heating")
        || (state.get_state() == "heat" && below_target);

    TrvReading::new(
        state.get_entity_id().to_owned(),
        state.attribute_str("friendly_name").map(str::to_owned),
        calling_for_heat,
        current_temperature,
        target_temperature,
    )
}
