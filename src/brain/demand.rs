use log::debug;

/// A snapshot of a single TRV's reported state, taken at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct TrvReading {
    entity_id: String,
    name: Option<String>,
    calling_for_heat: bool,
    current_temperature: Option<f32>,
    target_temperature: Option<f32>,
}

impl TrvReading {
    pub fn new(
        entity_id: String,
        name: Option<String>,
        calling_for_heat: bool,
        current_temperature: Option<f32>,
        target_temperature: Option<f32>,
    ) -> Self {
        Self {
            entity_id,
            name,
            calling_for_heat,
            current_temperature,
            target_temperature,
        }
    }

    pub fn get_entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_calling_for_heat(&self) -> bool {
        self.calling_for_heat
    }

    pub fn get_current_temperature(&self) -> Option<f32> {
        self.current_temperature
    }

    pub fn get_target_temperature(&self) -> Option<f32> {
        self.target_temperature
    }
}

/// Whether the monitored zone is unoccupied, and the setpoint that replaces
/// every TRV's own target while it is.
#[derive(Debug, Clone, PartialEq)]
pub struct AwayOverride {
    active: bool,
    away_temperature: f32,
}

impl AwayOverride {
    pub fn new(active: bool, away_temperature: f32) -> Self {
        Self {
            active,
            away_temperature,
        }
    }

    pub fn inactive() -> Self {
        Self::new(false, 0.0)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn get_away_temperature(&self) -> f32 {
        self.away_temperature
    }
}

/// The TRV furthest below its (effective) target, with the clamped gap.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxDemand {
    reading: TrvReading,
    deficit: f32,
}

impl MaxDemand {
    pub fn get_reading(&self) -> &TrvReading {
        &self.reading
    }

    /// Never negative.
    pub fn get_deficit(&self) -> f32 {
        self.deficit
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandSummary {
    any_demand: bool,
    max_deficit: Option<MaxDemand>,
}

impl DemandSummary {
    pub fn is_any_demand(&self) -> bool {
        self.any_demand
    }

    pub fn get_max_deficit(&self) -> Option<&MaxDemand> {
        self.max_deficit.as_ref()
    }

    pub fn get_deficit(&self) -> f32 {
        self.max_deficit.as_ref().map_or(0.0, MaxDemand::get_deficit)
    }

    /// The same summary with demand forced off. Used when the away policy is
    /// to drop demand entirely while nobody is home.
    pub fn suppressed(self) -> Self {
        Self {
            any_demand: false,
            ..self
        }
    }
}

/// Aggregate a snapshot of TRV readings into a single demand summary.
///
/// Readings missing either temperature still count towards overall demand via
/// their calling-for-heat flag, but cannot take part in deficit ranking.
/// Deficits are clamped at zero; ties go to the earliest reading.
pub fn evaluate(readings: &[TrvReading], away: &AwayOverride) -> DemandSummary {
    let any_demand = readings.iter().any(TrvReading::is_calling_for_heat);

    let mut max_deficit: Option<MaxDemand> = None;
    for reading in readings {
        let (current, target) = match (
            reading.get_current_temperature(),
            reading.get_target_temperature(),
        ) {
            (Some(current), Some(target)) => (current, target),
            _ => {
                debug!(
                    "{} has no temperature pair, excluding from deficit ranking",
                    reading.get_entity_id()
                );
                continue;
            }
        };

        let effective_target = if away.is_active() {
            away.get_away_temperature()
        } else {
            target
        };
        let deficit = (effective_target - current).max(0.0);

        if max_deficit.as_ref().map_or(true, |max| deficit > max.deficit) {
            max_deficit = Some(MaxDemand {
                reading: reading.clone(),
                deficit,
            });
        }
    }

    DemandSummary {
        any_demand,
        max_deficit,
    }
}
