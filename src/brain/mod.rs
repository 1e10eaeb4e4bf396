use log::{debug, error, info, warn};
use tokio::runtime::Runtime;

use crate::brain::demand::{AwayOverride, evaluate};
use crate::brain::planner::{HeaterCommand, HvacMode, plan_heater_command};
use crate::config::{AwayPolicy, DemandConfig};
use crate::io::IOBundle;
use crate::io::heater::HeaterControl;
use crate::io::host::HubError;
use crate::io::report::DemandReport;

pub mod demand;
pub mod planner;

/// Follows the TRVs: each run takes one snapshot, recomputes the aggregate
/// demand, publishes it when it changed, and nudges the heater when what we
/// would tell it differs from what we last told it.
pub struct DemandBrain {
    config: DemandConfig,
    last_published: Option<DemandReport>,
    last_sent_target_temperature: Option<f32>,
    last_sent_hvac_mode: Option<HvacMode>,
}

impl DemandBrain {
    pub fn new(config: DemandConfig) -> Self {
        Self {
            config,
            last_published: None,
            last_sent_target_temperature: None,
            last_sent_hvac_mode: None,
        }
    }

    pub fn run(&mut self, rt: &Runtime, io_bundle: &mut IOBundle) -> Result<(), HubError> {
        rt.block_on(self.tick(io_bundle))
    }

    /// Send the heater to its frost protection floor on the way out, so it is
    /// never left chasing a demand nobody is updating any more.
    pub fn make_safe(&mut self, rt: &Runtime, io_bundle: &mut IOBundle) {
        if let Some(heater) = io_bundle.heater() {
            info!("Parking heater at frost protection before exit");
            let command = HeaterCommand::frost_protect(self.config.get_minimum_temperature());
            rt.block_on(send_heater_command(
                heater,
                &command,
                &mut self.last_sent_target_temperature,
                &mut self.last_sent_hvac_mode,
            ));
        }
    }

    async fn tick(&mut self, io_bundle: &mut IOBundle) -> Result<(), HubError> {
        let readings = io_bundle.trvs().retrieve_readings().await?;

        let away_active = match io_bundle.occupancy() {
            Some(occupancy) => match occupancy.anyone_home().await {
                Ok(home) => !home,
                Err(e) => {
                    warn!("Failed to read zone occupancy: {}, assuming occupied", e);
                    false
                }
            },
            None => false,
        };

        let away = if away_active && self.config.get_away_policy() == AwayPolicy::OverrideTarget {
            AwayOverride::new(true, self.config.get_away_temperature())
        } else {
            AwayOverride::inactive()
        };
        let mut summary = evaluate(&readings, &away);
        if away_active && self.config.get_away_policy() == AwayPolicy::SuppressDemand {
            summary = summary.suppressed();
        }

        let report = DemandReport::new(
            &summary,
            self.config.get_trv_climate_entities().to_vec(),
            self.config.get_heater_entity_id().map(str::to_owned),
            away_active,
            self.config.get_away_temperature(),
        );
        if self.last_published.as_ref() != Some(&report) {
            let flipped = self.last_published.as_ref().map(DemandReport::is_demanding)
                != Some(report.is_demanding());
            let description = match report.get_max_demand_trv_entity_id() {
                Some(leader) => format!(
                    "Demand now {}, led by {} (deficit {:.1})",
                    report.state_str(),
                    leader,
                    report.get_max_demand_delta()
                ),
                None => format!("Demand now {}, no rankable TRV", report.state_str()),
            };
            if flipped {
                info!("{}", description);
            } else {
                debug!("{}", description);
            }
            io_bundle.publisher().publish(&report).await?;
            self.last_published = Some(report);
        }

        if let Some(heater) = io_bundle.heater() {
            let command =
                plan_heater_command(&summary, self.config.get_minimum_temperature());
            send_heater_command(
                heater,
                &command,
                &mut self.last_sent_target_temperature,
                &mut self.last_sent_hvac_mode,
            )
            .await;
        }

        Ok(())
    }
}

/// Sends only the parts of the command that differ from what was last sent.
/// A failed send is logged and left for the next tick to retry.
async fn send_heater_command(
    heater: &dyn HeaterControl,
    command: &HeaterCommand,
    last_sent_target_temperature: &mut Option<f32>,
    last_sent_hvac_mode: &mut Option<HvacMode>,
) {
    if *last_sent_target_temperature != Some(command.get_target_temperature()) {
        debug!(
            "Setting heater target temperature to {:.1}",
            command.get_target_temperature()
        );
        match heater
            .set_target_temperature(command.get_target_temperature())
            .await
        {
            Ok(()) => *last_sent_target_temperature = Some(command.get_target_temperature()),
            Err(e) => error!("Failed to set heater temperature: {}", e),
        }
    }

    if *last_sent_hvac_mode != Some(command.get_mode()) {
        debug!("Setting heater hvac mode to {}", command.get_mode());
        match heater.set_hvac_mode(command.get_mode()).await {
            Ok(()) => *last_sent_hvac_mode = Some(command.get_mode()),
            Err(e) => error!("Failed to set heater hvac mode: {}", e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::brain::demand::TrvReading;
    use crate::io::dummy::{
        DummyHeater, DummyIO, DummyOccupancy, DummyPublisher, DummyTrvs, HeaterCall,
        OccupancyModify, TrvModify,
    };
    use std::sync::mpsc::{Receiver, Sender};

    fn demand_config(toml_str: &str) -> DemandConfig {
        let config: crate::config::Config = toml::from_str(toml_str).unwrap();
        config.get_demand().clone()
    }

    const FULL_CONFIG: &str = r#"
        [host]
        base_url = "http://localhost:8123"
        token = "t"

        [demand]
        trv_climate_entities = ["climate.a", "climate.b"]
        heater_entity_id = "climate.boiler"
        zone_entity_id = "zone.home"
    "#;

    struct Harness {
        brain: DemandBrain,
        io_bundle: IOBundle,
        trvs: Sender<TrvModify>,
        occupancy: Sender<OccupancyModify>,
        heater_calls: Receiver<HeaterCall>,
        published: Receiver<DemandReport>,
    }

    fn harness(config: &str) -> Harness {
        let (trvs, trv_sender) = DummyTrvs::create(&());
        let (occupancy, occupancy_sender) = DummyOccupancy::create(&());
        let (heater, heater_calls) = DummyHeater::create();
        let (publisher, published) = DummyPublisher::create();
        Harness {
            brain: DemandBrain::new(demand_config(config)),
            io_bundle: IOBundle::new(trvs, Some(occupancy), Some(heater), publisher),
            trvs: trv_sender,
            occupancy: occupancy_sender,
            heater_calls,
            published,
        }
    }

    fn calling(entity_id: &str, current: f32, target: f32) -> TrvReading {
        TrvReading::new(entity_id.to_owned(), None, true, Some(current), Some(target))
    }

    fn quiet(entity_id: &str, current: f32, target: f32) -> TrvReading {
        TrvReading::new(entity_id.to_owned(), None, false, Some(current), Some(target))
    }

    #[test_log::test(tokio::test)]
    async fn demand_drives_heater_to_leader_target() {
        let mut h = harness(FULL_CONFIG);
        h.trvs
            .send(TrvModify::SetReadings(vec![
                quiet("climate.a", 20.0, 20.0),
                calling("climate.b", 17.0, 21.5),
            ]))
            .unwrap();

        h.brain.tick(&mut h.io_bundle).await.unwrap();

        let report = h.published.try_recv().unwrap();
        assert!(report.is_demanding());
        assert_eq!(report.get_max_demand_trv_entity_id(), Some("climate.b"));
        assert_eq!(h.heater_calls.try_recv(), Ok(HeaterCall::Target(21.5)));
        assert_eq!(h.heater_calls.try_recv(), Ok(HeaterCall::Mode(HvacMode::Heat)));
    }

    #[test_log::test(tokio::test)]
    async fn unchanged_state_is_not_republished_or_resent() {
        let mut h = harness(FULL_CONFIG);
        h.trvs
            .send(TrvModify::SetReadings(vec![calling("climate.a", 18.0, 21.0)]))
            .unwrap();

        h.brain.tick(&mut h.io_bundle).await.unwrap();
        h.brain.tick(&mut h.io_bundle).await.unwrap();

        assert!(h.published.try_recv().is_ok());
        assert!(h.published.try_recv().is_err(), "second tick should not republish");
        assert!(h.heater_calls.try_recv().is_ok());
        assert!(h.heater_calls.try_recv().is_ok());
        assert!(
            h.heater_calls.try_recv().is_err(),
            "second tick should not resend the same command"
        );
    }

    #[test_log::test(tokio::test)]
    async fn losing_demand_parks_the_heater() {
        let mut h = harness(FULL_CONFIG);
        h.trvs
            .send(TrvModify::SetReadings(vec![calling("climate.a", 18.0, 21.0)]))
            .unwrap();
        h.brain.tick(&mut h.io_bundle).await.unwrap();
        while h.heater_calls.try_recv().is_ok() {}

        h.trvs
            .send(TrvModify::SetReadings(vec![quiet("climate.a", 21.2, 21.0)]))
            .unwrap();
        h.brain.tick(&mut h.io_bundle).await.unwrap();

        assert_eq!(h.heater_calls.try_recv(), Ok(HeaterCall::Target(5.0)));
        assert_eq!(h.heater_calls.try_recv(), Ok(HeaterCall::Mode(HvacMode::Off)));
        let report = h.published.try_iter().last();
        assert!(report.is_some_and(|report| !report.is_demanding()));
    }

    #[test_log::test(tokio::test)]
    async fn away_override_flattens_deficits_but_not_demand() {
        let mut h = harness(FULL_CONFIG);
        h.trvs
            .send(TrvModify::SetReadings(vec![calling("climate.a", 15.0, 21.0)]))
            .unwrap();
        h.occupancy.send(OccupancyModify::SetHome(false)).unwrap();

        h.brain.tick(&mut h.io_bundle).await.unwrap();

        let report = h.published.try_recv().unwrap();
        assert!(report.is_demanding());
        assert_eq!(report.get_max_demand_delta(), 0.0);
    }

    #[test_log::test(tokio::test)]
    async fn suppress_policy_kills_demand_while_away() {
        let config = FULL_CONFIG.to_owned() + "\naway_policy = \"suppress_demand\"\n";
        let mut h = harness(&config);
        h.trvs
            .send(TrvModify::SetReadings(vec![calling("climate.a", 15.0, 21.0)]))
            .unwrap();
        h.occupancy.send(OccupancyModify::SetHome(false)).unwrap();

        h.brain.tick(&mut h.io_bundle).await.unwrap();

        let report = h.published.try_recv().unwrap();
        assert!(!report.is_demanding());
        // Frost protection, since demand is suppressed.
        assert_eq!(h.heater_calls.try_recv(), Ok(HeaterCall::Target(5.0)));
        assert_eq!(h.heater_calls.try_recv(), Ok(HeaterCall::Mode(HvacMode::Off)));
    }

    #[test]
    fn make_safe_sends_frost_protection() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let mut h = harness(FULL_CONFIG);
        h.trvs
            .send(TrvModify::SetReadings(vec![calling("climate.a", 18.0, 21.0)]))
            .unwrap();
        h.brain.run(&rt, &mut h.io_bundle).unwrap();
        while h.heater_calls.try_recv().is_ok() {}

        h.brain.make_safe(&rt, &mut h.io_bundle);

        assert_eq!(h.heater_calls.try_recv(), Ok(HeaterCall::Target(5.0)));
        assert_eq!(h.heater_calls.try_recv(), Ok(HeaterCall::Mode(HvacMode::Off)));
    }
}
