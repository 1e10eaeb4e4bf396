use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;
use std::time::Duration;

use itertools::Itertools;
use log::{error, info};
use tokio::runtime::{Builder, Runtime};

use crate::brain::DemandBrain;
use crate::brain::demand::TrvReading;
use crate::config::Config;
use crate::io::IOBundle;
use crate::io::dummy::{
    DummyHeater, DummyIO, DummyOccupancy, DummyPublisher, DummyTrvs, OccupancyModify, TrvModify,
};
use crate::io::heater::HubHeater;
use crate::io::host::{HostHub, RestHostHub};
use crate::io::occupancy::HubOccupancy;
use crate::io::report::HubPublisher;
use crate::io::trvs::HubTrvs;

mod brain;
mod config;
mod io;
mod logging;

const CONFIG_FILE: &str = "heating_demand.toml";

fn main() {
    let _logging_handle = logging::init_logging().expect("Failed to initialise logging");
    info!("Preparing...");

    if std::env::args().any(|arg| arg == "--simulate") {
        simulate();
        return;
    }

    let config = fs::read_to_string(CONFIG_FILE)
        .expect("Unable to read config file. Is it missing?");
    let config: Config = toml::from_str(&config).expect("Error reading config file");

    let demand = config.get_demand();
    info!(
        "Following demand of {} TRVs: {}",
        demand.get_trv_climate_entities().len(),
        demand.get_trv_climate_entities().iter().join(", ")
    );

    let hub: Arc<dyn HostHub + Send + Sync> = Arc::new(RestHostHub::new(
        config.get_host().get_base_url().to_owned(),
        config.get_host().get_token().to_owned(),
    ));

    let io_bundle = IOBundle::new(
        HubTrvs::new(hub.clone(), demand.get_trv_climate_entities().to_vec()),
        demand
            .get_zone_entity_id()
            .map(|zone| HubOccupancy::new(hub.clone(), zone.to_owned())),
        demand
            .get_heater_entity_id()
            .map(|heater| HubHeater::new(hub.clone(), heater.to_owned())),
        HubPublisher::new(hub.clone(), demand.get_demand_entity_id().to_owned()),
    );

    let brain = DemandBrain::new(demand.clone());
    let interval = demand.get_update_interval();

    let rt = Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .enable_io()
        .build()
        .expect("Expected to be able to make runtime");

    main_loop(brain, io_bundle, rt, interval);
}

fn main_loop(mut brain: DemandBrain, mut io_bundle: IOBundle, rt: Runtime, interval: Duration) {
    let should_exit = Arc::new(AtomicBool::new(false));
    {
        let should_exit = should_exit.clone();
        ctrlc::set_handler(move || {
            info!("Received termination signal.");
            should_exit.store(true, Ordering::Relaxed);
        })
        .expect("Failed to attach kill handler.");
    }

    info!("Beginning main loop.");
    loop {
        if should_exit.load(Ordering::Relaxed) {
            info!("Stopping safely...");
            brain.make_safe(&rt, &mut io_bundle);
            rt.shutdown_background();
            info!("Stopped safely.");
            return;
        }

        if let Err(e) = brain.run(&rt, &mut io_bundle) {
            error!("Failed to update heating demand: {} - will retry next tick", e);
        }
        sleep(interval);
    }
}

/// Runs the whole loop against scripted dummy IO, no host required.
fn simulate() {
    let config: Config = toml::from_str(
        r#"
        [host]
        base_url = "http://localhost:8123"
        token = "unused"

        [demand]
        trv_climate_entities = ["climate.lounge_trv", "climate.study_trv"]
        heater_entity_id = "climate.boiler"
        zone_entity_id = "zone.home"
        update_interval_secs = 5
        "#,
    )
    .expect("Simulation config should parse");

    let (trvs, trv_sender) = DummyTrvs::create(&());
    let (occupancy, occupancy_sender) = DummyOccupancy::create(&());
    let (heater, _heater_calls) = DummyHeater::create();
    let (publisher, _published) = DummyPublisher::create();

    let io_bundle = IOBundle::new(trvs, Some(occupancy), Some(heater), publisher);
    let brain = DemandBrain::new(config.get_demand().clone());

    let rt = Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .enable_io()
        .build()
        .expect("Expected to be able to make runtime");

    rt.spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        info!("Simulation: lounge starts calling for heat");
        trv_sender
            .send(TrvModify::SetReadings(vec![
                TrvReading::new(
                    "climate.lounge_trv".to_owned(),
                    Some("Lounge TRV".to_owned()),
                    true,
                    Some(17.5),
                    Some(21.0),
                ),
                TrvReading::new(
                    "climate.study_trv".to_owned(),
                    Some("Study TRV".to_owned()),
                    false,
                    Some(20.0),
                    Some(19.0),
                ),
            ]))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;
        info!("Simulation: everyone leaves the house");
        occupancy_sender
            .send(OccupancyModify::SetHome(false))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;
        info!("Simulation: lounge satisfied, everyone back");
        occupancy_sender.send(OccupancyModify::SetHome(true)).unwrap();
        trv_sender
            .send(TrvModify::SetReadings(vec![TrvReading::new(
                "climate.lounge_trv".to_owned(),
                Some("Lounge TRV".to_owned()),
                false,
                Some(21.1),
                Some(21.0),
            )]))
            .unwrap();
    });

    main_loop(brain, io_bundle, rt, config.get_demand().get_update_interval());
}
