use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HvacMode {
    Off,
    On,
}

impl HvacMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClampPolicy {
    Always,
    OnThresholdOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoolingEffectPolicy {
    Plain,
    /// Efficiency is multiplied by `max(room - setpoint, gap_floor_c) / gap_span_c`
    /// before the efficiency band is applied.
    SetpointScaled { gap_floor_c: f64, gap_span_c: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyBasis {
    RatedPower,
    DeliveredPower,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomState {
    pub room_temp_c: f64,
    pub mode: HvacMode,
    pub active_minutes: u32,
    pub energy_kwh: f64,
    pub outdoor_temp_c: f64,
    pub humidity_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u32,
    pub room_temp_c: f64,
    pub outdoor_temp_c: f64,
    pub humidity_pct: f64,
    pub mode: HvacMode,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeTransition {
    pub tick: u32,
    pub from: HvacMode,
    pub to: HvacMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleOrigin {
    Feed,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherSample {
    pub outdoor_temp_c: f64,
    pub humidity_pct: f64,
    pub origin: SampleOrigin,
}
