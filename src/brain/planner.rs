use strum_macros::{Display, EnumString};

use crate::brain::demand::DemandSummary;

/// The two modes we ever ask of the downstream heater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HvacMode {
    Heat,
    Off,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaterCommand {
    mode: HvacMode,
    target_temperature: f32,
}

impl HeaterCommand {
    pub fn new(mode: HvacMode, target_temperature: f32) -> Self {
        Self {
            mode,
            target_temperature,
        }
    }

    /// Off, holding the frost protection floor.
    pub fn frost_protect(minimum_temperature: f32) -> Self {
        Self::new(HvacMode::Off, minimum_temperature)
    }

    pub fn get_mode(&self) -> HvacMode {
        self.mode
    }

    pub fn get_target_temperature(&self) -> f32 {
        self.target_temperature
    }
}

/// Decide what the heater should be told, given the current demand summary.
///
/// Demand with a ranked leader follows that TRV's own target; anything else
/// falls back to frost protection. Actually sending the command is the
/// caller's business.
pub fn plan_heater_command(summary: &DemandSummary, minimum_temperature: f32) -> HeaterCommand {
    if summary.is_any_demand() {
        if let Some(max) = summary.get_max_deficit() {
            if let Some(target) = max.get_reading().get_target_temperature() {
                return HeaterCommand::new(HvacMode::Heat, target);
            }
        }
    }
    HeaterCommand::frost_protect(minimum_temperature)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::brain::demand::{AwayOverride, TrvReading, evaluate};

    #[test]
    fn no_demand_means_frost_protection() {
        let readings = [TrvReading::new(
            "climate.a".to_owned(),
            None,
            false,
            Some(19.0),
            Some(21.0),
        )];
        let summary = evaluate(&readings, &AwayOverride::inactive());
        let command = plan_heater_command(&summary, 5.0);
        assert_eq!(command, HeaterCommand::frost_protect(5.0));
        assert_eq!(command.get_mode(), HvacMode::Off);
        assert_eq!(command.get_target_temperature(), 5.0);
    }

    #[test]
    fn demand_follows_the_leading_trv_target() {
        let readings = [
            TrvReading::new("climate.a".to_owned(), None, true, Some(19.0), Some(21.0)),
            TrvReading::new("climate.b".to_owned(), None, true, Some(17.0), Some(22.5)),
        ];
        let summary = evaluate(&readings, &AwayOverride::inactive());
        let command = plan_heater_command(&summary, 5.0);
        assert_eq!(command, HeaterCommand::new(HvacMode::Heat, 22.5));
    }

    #[test]
    fn demand_without_a_rankable_leader_stays_off() {
        // Calling for heat but no temperature pair anywhere, so there is
        // nothing sensible to follow.
        let readings = [TrvReading::new("climate.a".to_owned(), None, true, None, None)];
        let summary = evaluate(&readings, &AwayOverride::inactive());
        assert_eq!(
            plan_heater_command(&summary, 7.0),
            HeaterCommand::frost_protect(7.0)
        );
    }

    #[test]
    fn mode_names_match_the_climate_service_vocabulary() {
        assert_eq!(HvacMode::Heat.to_string(), "heat");
        assert_eq!(HvacMode::Off.to_string(), "off");
        assert_eq!("heat".parse::<HvacMode>(), Ok(HvacMode::Heat));
    }
}
