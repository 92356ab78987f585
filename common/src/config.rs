use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ClampPolicy, CoolingEffectPolicy, EnergyBasis};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("hysteresis band must satisfy lower < setpoint < upper, got {lower} / {setpoint} / {upper}")]
    InvalidBand {
        lower: f64,
        setpoint: f64,
        upper: f64,
    },
    #[error("room volume x air heat capacity must be positive, got {volume_m3} x {air_heat_capacity}")]
    NoThermalMass {
        volume_m3: f64,
        air_heat_capacity: f64,
    },
    #[error("{field} bounds must be positive with min <= max, got [{min}, {max}]")]
    InvalidBounds {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} of {value} exceeds the width {max} of its clamp range")]
    ExcessiveVariability {
        field: &'static str,
        value: f64,
        max: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn width(self) -> f64 {
        self.max - self.min
    }

    fn ordered(self, field: &'static str) -> Result<(), ConfigError> {
        finite(field, self.min)?;
        finite(field, self.max)?;
        if self.min > self.max {
            return Err(ConfigError::InvalidBounds {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn positive_ordered(self, field: &'static str) -> Result<(), ConfigError> {
        self.ordered(field)?;
        if self.min <= 0.0 {
            return Err(ConfigError::InvalidBounds {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub initial_temp_c: f64,
    pub volume_m3: f64,
    pub air_heat_capacity: f64,
    pub wall_insulation: f64,
    pub humidity_removal_efficiency: f64,
    pub occupants: u32,
    pub occupant_heat_kw: f64,
    pub sunlight_heat_gain_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermostatBand {
    pub setpoint_c: f64,
    pub lower_c: f64,
    pub upper_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolingConfig {
    pub power_kw: Bounds,
    pub efficiency: Bounds,
    /// Efficiency lost per degree of outdoor temperature above the reference.
    pub outdoor_temp_impact: f64,
    pub efficiency_reference_temp_c: f64,
    pub blower_speed: f64,
    /// Air-mixing factor; `None` leaves the raw effect untouched.
    #[serde(default)]
    pub airflow_efficiency: Option<f64>,
    pub effect_policy: CoolingEffectPolicy,
    pub energy_basis: EnergyBasis,
    /// Divides the charged power on every active tick. 60 turns kW-minutes into kWh.
    pub energy_divisor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub fallback_outdoor_temp_c: f64,
    pub initial_humidity_pct: f64,
    pub temp_variability_c: f64,
    pub humidity_variability_pct: f64,
    pub outdoor_range_c: Bounds,
    pub humidity_range_pct: Bounds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub horizon_minutes: u32,
    pub room: RoomConfig,
    pub band: ThermostatBand,
    pub cooling: CoolingConfig,
    pub weather: WeatherConfig,
    pub heat_gain_scale: f64,
    pub cooling_scale: f64,
    pub clamp_policy: ClampPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::smart()
    }
}

impl SimulationConfig {
    pub fn smart() -> Self {
        Self {
            horizon_minutes: 60,
            room: RoomConfig {
                initial_temp_c: 24.5,
                volume_m3: 50.0,
                air_heat_capacity: 0.0012,
                wall_insulation: 0.5,
                humidity_removal_efficiency: 0.3,
                occupants: 5,
                occupant_heat_kw: 0.06,
                sunlight_heat_gain_kw: 1.5,
            },
            band: ThermostatBand {
                setpoint_c: 24.0,
                lower_c: 23.8,
                upper_c: 25.2,
            },
            cooling: CoolingConfig {
                power_kw: Bounds::new(0.5, 3.5),
                efficiency: Bounds::new(0.85, 0.995),
                outdoor_temp_impact: 0.0015,
                efficiency_reference_temp_c: 30.0,
                blower_speed: 3.0,
                airflow_efficiency: None,
                effect_policy: CoolingEffectPolicy::Plain,
                energy_basis: EnergyBasis::RatedPower,
                energy_divisor: 100.0,
            },
            weather: WeatherConfig {
                fallback_outdoor_temp_c: 30.0,
                initial_humidity_pct: 60.0,
                temp_variability_c: 0.2,
                humidity_variability_pct: 1.0,
                outdoor_range_c: Bounds::new(22.0, 34.0),
                humidity_range_pct: Bounds::new(35.0, 85.0),
            },
            heat_gain_scale: 0.10,
            cooling_scale: 0.18,
            clamp_policy: ClampPolicy::Always,
        }
    }

    pub fn traditional() -> Self {
        let smart = Self::smart();
        Self {
            room: RoomConfig {
                occupant_heat_kw: 0.1,
                ..smart.room
            },
            cooling: CoolingConfig {
                power_kw: Bounds::new(2.5, 10.0),
                efficiency: Bounds::new(0.6, 0.9),
                outdoor_temp_impact: 0.01,
                airflow_efficiency: Some(0.7),
                effect_policy: CoolingEffectPolicy::SetpointScaled {
                    gap_floor_c: 0.1,
                    gap_span_c: 2.0,
                },
                energy_basis: EnergyBasis::DeliveredPower,
                energy_divisor: 60.0,
                ..smart.cooling
            },
            weather: WeatherConfig {
                temp_variability_c: 0.5,
                humidity_variability_pct: 2.0,
                outdoor_range_c: Bounds::new(20.0, 35.0),
                humidity_range_pct: Bounds::new(30.0, 90.0),
                ..smart.weather
            },
            heat_gain_scale: 0.3,
            cooling_scale: 0.4,
            clamp_policy: ClampPolicy::OnThresholdOnly,
            ..smart
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.weather.temp_variability_c = 0.0;
        self.weather.humidity_variability_pct = 0.0;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let room = &self.room;
        finite("room.initial_temp_c", room.initial_temp_c)?;
        finite("room.wall_insulation", room.wall_insulation)?;
        finite(
            "room.humidity_removal_efficiency",
            room.humidity_removal_efficiency,
        )?;
        finite("room.occupant_heat_kw", room.occupant_heat_kw)?;
        finite("room.sunlight_heat_gain_kw", room.sunlight_heat_gain_kw)?;
        finite("room.volume_m3", room.volume_m3)?;
        finite("room.air_heat_capacity", room.air_heat_capacity)?;
        let thermal_mass = room.volume_m3 * room.air_heat_capacity;
        if !(thermal_mass > 0.0 && thermal_mass.is_finite()) {
            return Err(ConfigError::NoThermalMass {
                volume_m3: room.volume_m3,
                air_heat_capacity: room.air_heat_capacity,
            });
        }

        let band = &self.band;
        finite("band.setpoint_c", band.setpoint_c)?;
        finite("band.lower_c", band.lower_c)?;
        finite("band.upper_c", band.upper_c)?;
        if !(band.lower_c < band.setpoint_c && band.setpoint_c < band.upper_c) {
            return Err(ConfigError::InvalidBand {
                lower: band.lower_c,
                setpoint: band.setpoint_c,
                upper: band.upper_c,
            });
        }

        let cooling = &self.cooling;
        cooling.power_kw.positive_ordered("cooling.power_kw")?;
        cooling.efficiency.positive_ordered("cooling.efficiency")?;
        finite("cooling.outdoor_temp_impact", cooling.outdoor_temp_impact)?;
        finite(
            "cooling.efficiency_reference_temp_c",
            cooling.efficiency_reference_temp_c,
        )?;
        finite("cooling.blower_speed", cooling.blower_speed)?;
        if let Some(airflow) = cooling.airflow_efficiency {
            positive("cooling.airflow_efficiency", airflow)?;
        }
        if let CoolingEffectPolicy::SetpointScaled {
            gap_floor_c,
            gap_span_c,
        } = cooling.effect_policy
        {
            positive("cooling.effect_policy.gap_floor_c", gap_floor_c)?;
            positive("cooling.effect_policy.gap_span_c", gap_span_c)?;
        }
        positive("cooling.energy_divisor", cooling.energy_divisor)?;

        let weather = &self.weather;
        finite(
            "weather.fallback_outdoor_temp_c",
            weather.fallback_outdoor_temp_c,
        )?;
        finite("weather.initial_humidity_pct", weather.initial_humidity_pct)?;
        weather.outdoor_range_c.ordered("weather.outdoor_range_c")?;
        weather
            .humidity_range_pct
            .ordered("weather.humidity_range_pct")?;
        variability(
            "weather.temp_variability_c",
            weather.temp_variability_c,
            weather.outdoor_range_c,
        )?;
        variability(
            "weather.humidity_variability_pct",
            weather.humidity_variability_pct,
            weather.humidity_range_pct,
        )?;

        finite("heat_gain_scale", self.heat_gain_scale)?;
        finite("cooling_scale", self.cooling_scale)?;

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerVariant {
    Smart,
    Traditional,
}

impl ControllerVariant {
    pub const ALL: [Self; 2] = [Self::Smart, Self::Traditional];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Traditional => "traditional",
        }
    }

    pub fn config(self) -> SimulationConfig {
        match self {
            Self::Smart => SimulationConfig::smart(),
            Self::Traditional => SimulationConfig::traditional(),
        }
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn variability(field: &'static str, value: f64, range: Bounds) -> Result<(), ConfigError> {
    non_negative(field, value)?;
    let max = range.width();
    if value <= max {
        Ok(())
    } else {
        Err(ConfigError::ExcessiveVariability { field, value, max })
    }
}
