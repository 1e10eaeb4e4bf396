use serde::Deserialize;
use serde_with::serde_as;
#[allow(unused_imports)]
use serde_with::DurationSeconds;
use std::time::Duration;

#[derive(Deserialize, Clone)]
pub struct Config {
    host: HostConfig,
    demand: DemandConfig,
}

impl Config {
    pub fn get_host(&self) -> &HostConfig {
        &self.host
    }

    pub fn get_demand(&self) -> &DemandConfig {
        &self.demand
    }
}

#[derive(Deserialize, Clone)]
pub struct HostConfig {
    base_url: String,
    token: String,
}

impl HostConfig {
    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get_token(&self) -> &str {
        &self.token
    }
}

/// What happens while the monitored zone is empty.
#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "snake_case")]
pub enum AwayPolicy {
    /// TRV targets are replaced by the away temperature when ranking
    /// deficits; demand itself still follows the valves.
    #[default]
    OverrideTarget,
    /// Demand is reported off outright until somebody comes home.
    SuppressDemand,
}

#[serde_as]
#[derive(Deserialize, Clone)]
pub struct DemandConfig {
    /// The climate entities whose demand is being followed, in the order
    /// ties between equal deficits are broken.
    trv_climate_entities: Vec<String>,
    /// Boiler to drive from the aggregate demand. Without one we only report.
    heater_entity_id: Option<String>,
    /// Zone whose occupant count drives away mode.
    zone_entity_id: Option<String>,
    /// Frost protection floor sent to the heater when nothing wants heat.
    #[serde(default = "default_minimum_temperature")]
    minimum_temperature: f32,
    /// Setpoint used in place of each TRV's own while the zone is empty.
    #[serde(default = "default_away_temperature")]
    away_temperature: f32,
    #[serde(default)]
    away_policy: AwayPolicy,
    /// Where the aggregate demand state is published on the host.
    #[serde(default = "default_demand_entity_id")]
    demand_entity_id: String,
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_update_interval")]
    update_interval_secs: Duration,
}

fn default_minimum_temperature() -> f32 {
    5.0
}

fn default_away_temperature() -> f32 {
    12.0
}

fn default_demand_entity_id() -> String {
    "binary_sensor.central_heating_demand".to_owned()
}

fn default_update_interval() -> Duration {
    Duration::from_secs(30)
}

impl DemandConfig {
    pub fn get_trv_climate_entities(&self) -> &[String] {
        &self.trv_climate_entities
    }

    pub fn get_heater_entity_id(&self) -> Option<&str> {
        self.heater_entity_id.as_deref()
    }

    pub fn get_zone_entity_id(&self) -> Option<&str> {
        self.zone_entity_id.as_deref()
    }

    pub fn get_minimum_temperature(&self) -> f32 {
        self.minimum_temperature
    }

    pub fn get_away_temperature(&self) -> f32 {
        self.away_temperature
    }

    pub fn get_away_policy(&self) -> AwayPolicy {
        self.away_policy
    }

    pub fn get_demand_entity_id(&self) -> &str {
        &self.demand_entity_id
    }

    pub fn get_update_interval(&self) -> Duration {
        self.update_interval_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_deserialize() {
        let config_str = fs::read_to_string("test/testconfig.toml")
            .expect("Unable to read test config file. Is it missing?");
        let config: Config = toml::from_str(&config_str).expect("Error reading test config file");

        assert_eq!(config.host.base_url, "http://localhost:8123");
        assert_eq!(config.host.token, "test-token");

        assert_eq!(
            config.demand.trv_climate_entities,
            vec!["climate.lounge_trv", "climate.study_trv"]
        );
        assert_eq!(config.demand.heater_entity_id.as_deref(), Some("climate.boiler"));
        assert_eq!(config.demand.zone_entity_id.as_deref(), Some("zone.home"));
        assert_eq!(config.demand.minimum_temperature, 7.0);
        assert_eq!(config.demand.away_temperature, 14.0);
        assert_eq!(config.demand.away_policy, AwayPolicy::SuppressDemand);
        assert_eq!(config.demand.demand_entity_id, "binary_sensor.heating_demand");
        assert_eq!(config.demand.update_interval_secs, Duration::from_secs(15));
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str(
            r#"
            [host]
            base_url = "http://localhost:8123"
            token = "test-token"

            [demand]
            trv_climate_entities = ["climate.lounge_trv"]
            "#,
        )
        .expect("Minimal config should parse");

        assert_eq!(config.demand.heater_entity_id, None);
        assert_eq!(config.demand.zone_entity_id, None);
        assert_eq!(config.demand.minimum_temperature, 5.0);
        assert_eq!(config.demand.away_temperature, 12.0);
        assert_eq!(config.demand.away_policy, AwayPolicy::OverrideTarget);
        assert_eq!(
            config.demand.demand_entity_id,
            "binary_sensor.central_heating_demand"
        );
        assert_eq!(config.demand.update_interval_secs, Duration::from_secs(30));
    }
}
