use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use async_trait::async_trait;
use log::debug;

use crate::brain::demand::TrvReading;
use crate::brain::planner::HvacMode;
use crate::io::heater::HeaterControl;
use crate::io::host::HubError;
use crate::io::occupancy::OccupancyManager;
use crate::io::report::{DemandPublisher, DemandReport};
use crate::io::trvs::TrvManager;

/// An input that can be driven from a test or the simulator by sending it
/// messages over a channel.
pub trait DummyIO {
    type MessageType;
    type Config;

    fn create(config: &Self::Config) -> (Self, Sender<Self::MessageType>)
    where
        Self: Sized,
    {
        let (sender, receiver) = mpsc::channel();
        let dummy = Self::new(receiver, config);
        (dummy, sender)
    }

    fn new(receiver: Receiver<Self::MessageType>, config: &Self::Config) -> Self;
}

pub fn read_all<T, F>(receiver: &Receiver<T>, on_value: F)
where
    F: Fn(T),
{
    loop {
        match receiver.try_recv() {
            Ok(x) => on_value(x),
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => panic!("Disconnected!"),
        }
    }
}

pub enum TrvModify {
    SetReadings(Vec<TrvReading>),
}

pub struct DummyTrvs {
    receiver: Mutex<Receiver<TrvModify>>,
    readings: Mutex<Vec<TrvReading>>,
}

impl DummyIO for DummyTrvs {
    type MessageType = TrvModify;
    type Config = ();

    fn new(receiver: Receiver<Self::MessageType>, _config: &Self::Config) -> Self {
        Self {
            receiver: Mutex::new(receiver),
            readings: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TrvManager for DummyTrvs {
    async fn retrieve_readings(&self) -> Result<Vec<TrvReading>, HubError> {
        let guard = self.receiver.lock().unwrap();
        read_all(&guard, |message| match message {
            TrvModify::SetReadings(readings) => *self.readings.lock().unwrap() = readings,
        });
        Ok(self.readings.lock().unwrap().clone())
    }
}

pub enum OccupancyModify {
    SetHome(bool),
}

pub struct DummyOccupancy {
    receiver: Mutex<Receiver<OccupancyModify>>,
    home: Mutex<bool>,
}

impl DummyIO for DummyOccupancy {
    type MessageType = OccupancyModify;
    type Config = ();

    fn new(receiver: Receiver<Self::MessageType>, _config: &Self::Config) -> Self {
        Self {
            receiver: Mutex::new(receiver),
            home: Mutex::new(true),
        }
    }
}

#[async_trait]
impl OccupancyManager for DummyOccupancy {
    async fn anyone_home(&self) -> Result<bool, HubError> {
        let guard = self.receiver.lock().unwrap();
        read_all(&guard, |message| match message {
            OccupancyModify::SetHome(home) => *self.home.lock().unwrap() = home,
        });
        Ok(*self.home.lock().unwrap())
    }
}

/// What a dummy heater was told to do, in the order it was told.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaterCall {
    Mode(HvacMode),
    Target(f32),
}

pub struct DummyHeater {
    sent: Sender<HeaterCall>,
}

impl DummyHeater {
    pub fn create() -> (Self, Receiver<HeaterCall>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sent: sender }, receiver)
    }
}

#[async_trait]
impl HeaterControl for DummyHeater {
    async fn set_hvac_mode(&self, mode: HvacMode) -> Result<(), HubError> {
        debug!("Dummy heater set to {}", mode);
        let _ = self.sent.send(HeaterCall::Mode(mode));
        Ok(())
    }

    async fn set_target_temperature(&self, temperature: f32) -> Result<(), HubError> {
        debug!("Dummy heater target set to {:.1}", temperature);
        let _ = self.sent.send(HeaterCall::Target(temperature));
        Ok(())
    }
}

pub struct DummyPublisher {
    published: Sender<DemandReport>,
}

impl DummyPublisher {
    pub fn create() -> (Self, Receiver<DemandReport>) {
        let (sender, receiver) = mpsc::channel();
        (Self { published: sender }, receiver)
    }
}

#[async_trait]
impl DemandPublisher for DummyPublisher {
    async fn publish(&self, report: &DemandReport) -> Result<(), HubError> {
        debug!(
            "Dummy publisher: demand {} (delta {:.1})",
            report.state_str(),
            report.get_max_demand_delta()
        );
        let _ = self.published.send(report.clone());
        Ok(())
    }
}
