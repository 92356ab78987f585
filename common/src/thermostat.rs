use crate::{config::ThermostatBand, types::HvacMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisController {
    lower_c: f64,
    upper_c: f64,
}

impl HysteresisController {
    pub fn new(band: &ThermostatBand) -> Self {
        Self {
            lower_c: band.lower_c,
            upper_c: band.upper_c,
        }
    }

    /// Mode for the next tick given the temperature after this tick's update.
    pub fn next_mode(&self, current: HvacMode, room_temp_c: f64) -> HvacMode {
        match current {
            HvacMode::Off if room_temp_c >= self.upper_c => HvacMode::On,
            HvacMode::On if room_temp_c <= self.lower_c => HvacMode::Off,
            unchanged => unchanged,
        }
    }

    pub fn crossed_bound(&self, next: HvacMode) -> f64 {
        match next {
            HvacMode::On => self.upper_c,
            HvacMode::Off => self.lower_c,
        }
    }

    pub fn clamp(&self, room_temp_c: f64) -> f64 {
        room_temp_c.clamp(self.lower_c, self.upper_c)
    }
}
