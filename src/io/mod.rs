pub mod dummy;
pub mod heater;
pub mod host;
pub mod occupancy;
pub mod report;
pub mod trvs;

use crate::io::heater::HeaterControl;
use crate::io::occupancy::OccupancyManager;
use crate::io::report::DemandPublisher;
use crate::io::trvs::TrvManager;

/// Everything external the brain talks to, behind trait objects so the REST
/// and dummy implementations are interchangeable.
pub struct IOBundle {
    trvs: Box<dyn TrvManager + Send + Sync>,
    occupancy: Option<Box<dyn OccupancyManager + Send + Sync>>,
    heater: Option<Box<dyn HeaterControl + Send + Sync>>,
    publisher: Box<dyn DemandPublisher + Send + Sync>,
}

impl IOBundle {
    pub fn new(
        trvs: impl TrvManager + Send + Sync + 'static,
        occupancy: Option<impl OccupancyManager + Send + Sync + 'static>,
        heater: Option<impl HeaterControl + Send + Sync + 'static>,
        publisher: impl DemandPublisher + Send + Sync + 'static,
    ) -> IOBundle {
        IOBundle {
            trvs: Box::new(trvs),
            occupancy: occupancy
                .map(|occupancy| Box::new(occupancy) as Box<dyn OccupancyManager + Send + Sync>),
            heater: heater.map(|heater| Box::new(heater) as Box<dyn HeaterControl + Send + Sync>),
            publisher: Box::new(publisher),
        }
    }

    pub fn trvs(&self) -> &dyn TrvManager {
        &*self.trvs
    }

    pub fn occupancy(&self) -> Option<&dyn OccupancyManager> {
        self.occupancy
            .as_ref()
            .map(|occupancy| occupancy.as_ref() as &dyn OccupancyManager)
    }

    pub fn heater(&self) -> Option<&dyn HeaterControl> {
        self.heater
            .as_ref()
            .map(|heater| heater.as_ref() as &dyn HeaterControl)
    }

    pub fn publisher(&self) -> &dyn DemandPublisher {
        &*self.publisher
    }
}
