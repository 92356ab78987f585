use crate::{
    config::SimulationConfig,
    types::{CoolingEffectPolicy, EnergyBasis},
};

#[derive(Debug, Clone, Copy)]
pub struct ThermalModel<'a> {
    config: &'a SimulationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoolingOutput {
    pub efficiency: f64,
    pub power_kw: f64,
    /// Temperature-rate equivalent before the cooling scale is applied.
    pub effect: f64,
}

impl<'a> ThermalModel<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self { config }
    }

    pub fn heat_gain(&self, room_temp_c: f64, outdoor_temp_c: f64, humidity_pct: f64) -> f64 {
        let room = &self.config.room;
        let conduction = room.wall_insulation * (outdoor_temp_c - room_temp_c);
        let latent = room.humidity_removal_efficiency * (humidity_pct / 100.0);
        let occupants = room.occupants as f64 * room.occupant_heat_kw;
        conduction + latent + occupants + room.sunlight_heat_gain_kw
    }

    pub fn efficiency(&self, room_temp_c: f64, outdoor_temp_c: f64) -> f64 {
        let cooling = &self.config.cooling;
        let base = cooling.efficiency.max
            - (outdoor_temp_c - cooling.efficiency_reference_temp_c) * cooling.outdoor_temp_impact;

        let scaled = match cooling.effect_policy {
            CoolingEffectPolicy::Plain => base,
            CoolingEffectPolicy::SetpointScaled {
                gap_floor_c,
                gap_span_c,
            } => {
                let gap = (room_temp_c - self.config.band.setpoint_c).max(gap_floor_c);
                base * (gap / gap_span_c)
            }
        };

        cooling.efficiency.clamp(scaled)
    }

    pub fn cooling(&self, room_temp_c: f64, outdoor_temp_c: f64) -> CoolingOutput {
        let cooling = &self.config.cooling;
        let room = &self.config.room;

        let efficiency = self.efficiency(room_temp_c, outdoor_temp_c);
        let power_kw = cooling.power_kw.clamp(cooling.power_kw.max * efficiency);
        let airflow = cooling.airflow_efficiency.unwrap_or(1.0);
        let effect = (power_kw * cooling.blower_speed * airflow)
            / (room.volume_m3 * room.air_heat_capacity);

        CoolingOutput {
            efficiency,
            power_kw,
            effect,
        }
    }

    pub fn tick_energy_kwh(&self, output: &CoolingOutput) -> f64 {
        let cooling = &self.config.cooling;
        let charged = match cooling.energy_basis {
            EnergyBasis::RatedPower => cooling.power_kw.max,
            EnergyBasis::DeliveredPower => output.power_kw,
        };
        charged / cooling.energy_divisor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn heat_gain_sums_all_terms() {
        let config = SimulationConfig::smart();
        let model = ThermalModel::new(&config);

        // 0.5 * 5.5 + 0.3 * 0.6 + 5 * 0.06 + 1.5
        assert_abs_diff_eq!(model.heat_gain(24.5, 30.0, 60.0), 4.73, epsilon = 1e-12);
    }

    #[test]
    fn conduction_turns_negative_when_room_is_warmer() {
        let config = SimulationConfig::smart();
        let model = ThermalModel::new(&config);

        let warm_outside = model.heat_gain(24.0, 30.0, 0.0);
        let cold_outside = model.heat_gain(24.0, 10.0, 0.0);

        assert_abs_diff_eq!(warm_outside - cold_outside, 0.5 * 20.0, epsilon = 1e-12);
        assert!(cold_outside < 0.0);
    }

    #[test]
    fn efficiency_degrades_above_reference_and_stays_in_band() {
        let config = SimulationConfig::smart();
        let model = ThermalModel::new(&config);

        assert_abs_diff_eq!(model.efficiency(25.0, 30.0), 0.995, epsilon = 1e-12);
        assert_abs_diff_eq!(model.efficiency(25.0, 34.0), 0.995 - 4.0 * 0.0015, epsilon = 1e-12);
        // Cold outside would push it above the ceiling.
        assert_abs_diff_eq!(model.efficiency(25.0, 10.0), 0.995, epsilon = 1e-12);
        // Far above reference hits the floor.
        assert_abs_diff_eq!(model.efficiency(25.0, 200.0), 0.85, epsilon = 1e-12);
    }

    #[test]
    fn setpoint_scaled_efficiency_uses_gap_floor() {
        let config = SimulationConfig::traditional();
        let model = ThermalModel::new(&config);

        // 0.9 * (1.2 / 2) = 0.54, raised to the 0.6 floor.
        assert_abs_diff_eq!(model.efficiency(25.2, 30.0), 0.6, epsilon = 1e-12);
        // 0.9 * (2.0 / 2) = 0.9
        assert_abs_diff_eq!(model.efficiency(26.0, 30.0), 0.9, epsilon = 1e-12);
        // Below setpoint the gap floor (0.1) applies before the band does.
        assert_abs_diff_eq!(model.efficiency(23.0, 30.0), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn smart_cooling_effect_matches_reference() {
        let config = SimulationConfig::smart();
        let model = ThermalModel::new(&config);

        let output = model.cooling(25.2, 30.0);

        assert_abs_diff_eq!(output.power_kw, 3.5 * 0.995, epsilon = 1e-12);
        assert_abs_diff_eq!(output.effect, 174.125, epsilon = 1e-9);
        assert_abs_diff_eq!(model.tick_energy_kwh(&output), 0.035, epsilon = 1e-12);
    }

    #[test]
    fn traditional_cooling_applies_airflow_and_delivered_power() {
        let config = SimulationConfig::traditional();
        let model = ThermalModel::new(&config);

        let output = model.cooling(25.2, 30.0);

        assert_abs_diff_eq!(output.power_kw, 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(output.effect, 6.0 * 3.0 * 0.7 / 0.06, epsilon = 1e-9);
        assert_abs_diff_eq!(model.tick_energy_kwh(&output), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn cooling_power_never_drops_below_minimum() {
        let mut config = SimulationConfig::traditional();
        config.cooling.efficiency.min = 0.1;
        let model = ThermalModel::new(&config);

        let output = model.cooling(23.0, 30.0);

        assert_abs_diff_eq!(output.power_kw, 2.5, epsilon = 1e-12);
    }
}
