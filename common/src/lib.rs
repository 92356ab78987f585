pub mod config;
pub mod engine;
pub mod report;
pub mod thermal;
pub mod thermostat;
pub mod types;
pub mod weather;

pub use config::{
    Bounds, ConfigError, ControllerVariant, CoolingConfig, RoomConfig, SimulationConfig,
    ThermostatBand, WeatherConfig,
};
pub use engine::{SimulationEngine, TickOutcome};
pub use report::{RunSummary, SimulationRun, TraceStats, VariantComparison};
pub use thermal::{CoolingOutput, ThermalModel};
pub use thermostat::HysteresisController;
pub use types::{
    ClampPolicy, CoolingEffectPolicy, EnergyBasis, HvacMode, ModeTransition, RoomState,
    SampleOrigin, Snapshot, WeatherSample,
};
pub use weather::{FixedFeed, ScriptedFeed, TemperatureFeed, UnavailableFeed, WeatherFetchError};
