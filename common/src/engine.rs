use rand::{rngs::StdRng, Rng};
use tracing::{debug, info};

use crate::{
    config::{ConfigError, SimulationConfig},
    report::SimulationRun,
    thermal::ThermalModel,
    thermostat::HysteresisController,
    types::{
        ClampPolicy, HvacMode, ModeTransition, RoomState, SampleOrigin, Snapshot, WeatherSample,
    },
    weather::{TemperatureFeed, WeatherSource},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub tick: u32,
    pub sample: WeatherSample,
    pub transition: Option<ModeTransition>,
}

#[derive(Debug, Clone)]
pub struct SimulationEngine<F, R = StdRng> {
    config: SimulationConfig,
    controller: HysteresisController,
    weather: WeatherSource<F, R>,
    state: RoomState,
    series: Vec<Snapshot>,
    transitions: Vec<ModeTransition>,
    fallback_ticks: u32,
    next_tick: u32,
}

impl<F: TemperatureFeed> SimulationEngine<F, StdRng> {
    pub fn seeded(config: SimulationConfig, feed: F, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let weather = WeatherSource::seeded(feed, &config.weather, seed);
        Ok(Self::assemble(config, weather))
    }

    pub fn from_entropy(config: SimulationConfig, feed: F) -> Result<Self, ConfigError> {
        config.validate()?;
        let weather = WeatherSource::from_entropy(feed, &config.weather);
        Ok(Self::assemble(config, weather))
    }
}

impl<F: TemperatureFeed, R: Rng> SimulationEngine<F, R> {
    fn assemble(config: SimulationConfig, weather: WeatherSource<F, R>) -> Self {
        let state = RoomState {
            room_temp_c: config.room.initial_temp_c,
            mode: HvacMode::Off,
            active_minutes: 0,
            energy_kwh: 0.0,
            outdoor_temp_c: config.weather.fallback_outdoor_temp_c,
            humidity_pct: config.weather.initial_humidity_pct,
        };

        Self {
            controller: HysteresisController::new(&config.band),
            series: Vec::with_capacity(config.horizon_minutes as usize),
            transitions: Vec::new(),
            fallback_ticks: 0,
            next_tick: 0,
            weather,
            state,
            config,
        }
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    pub fn series(&self) -> &[Snapshot] {
        &self.series
    }

    pub fn transitions(&self) -> &[ModeTransition] {
        &self.transitions
    }

    pub fn is_finished(&self) -> bool {
        self.next_tick >= self.config.horizon_minutes
    }

    pub fn run(mut self) -> SimulationRun {
        while self.step().is_some() {}

        info!(
            runtime_min = self.state.active_minutes,
            energy_kwh = self.state.energy_kwh,
            transitions = self.transitions.len(),
            fallback_ticks = self.fallback_ticks,
            "simulation finished"
        );

        self.finish()
    }

    pub fn step(&mut self) -> Option<TickOutcome> {
        if self.is_finished() {
            return None;
        }
        let tick = self.next_tick;

        self.record(tick);
        let sample = self.weather.sample();
        let transition = self.apply(tick, sample);
        self.next_tick += 1;

        Some(TickOutcome {
            tick,
            sample,
            transition,
        })
    }

    pub fn finish(self) -> SimulationRun {
        SimulationRun {
            series: self.series,
            transitions: self.transitions,
            final_state: self.state,
            fallback_ticks: self.fallback_ticks,
        }
    }

    fn record(&mut self, tick: u32) {
        self.series.push(Snapshot {
            tick,
            room_temp_c: self.state.room_temp_c,
            outdoor_temp_c: self.state.outdoor_temp_c,
            humidity_pct: self.state.humidity_pct,
            mode: self.state.mode,
            energy_kwh: self.state.energy_kwh,
        });
    }

    fn apply(&mut self, tick: u32, sample: WeatherSample) -> Option<ModeTransition> {
        if sample.origin == SampleOrigin::Fallback {
            self.fallback_ticks += 1;
        }
        self.state.outdoor_temp_c = sample.outdoor_temp_c;
        self.state.humidity_pct = sample.humidity_pct;

        let model = ThermalModel::new(&self.config);
        let room_temp_c = self.state.room_temp_c;
        let heat_gain = model.heat_gain(room_temp_c, sample.outdoor_temp_c, sample.humidity_pct);

        let current = self.state.mode;
        let updated = match current {
            HvacMode::On => {
                let cooling = model.cooling(room_temp_c, sample.outdoor_temp_c);
                self.state.active_minutes += 1;
                self.state.energy_kwh += model.tick_energy_kwh(&cooling);
                debug!(
                    tick,
                    efficiency = cooling.efficiency,
                    power_kw = cooling.power_kw,
                    "cooling"
                );
                room_temp_c - cooling.effect * self.config.cooling_scale
            }
            HvacMode::Off => {
                debug!(tick, heat_gain, "passive drift");
                room_temp_c + heat_gain * self.config.heat_gain_scale
            }
        };

        let next = self.controller.next_mode(current, updated);
        let transition = (next != current).then_some(ModeTransition {
            tick,
            from: current,
            to: next,
        });

        self.state.room_temp_c = match (self.config.clamp_policy, transition) {
            (ClampPolicy::Always, _) => self.controller.clamp(updated),
            (ClampPolicy::OnThresholdOnly, Some(transition)) => {
                self.controller.crossed_bound(transition.to)
            }
            (ClampPolicy::OnThresholdOnly, None) => updated,
        };
        self.state.mode = next;

        if let Some(transition) = transition {
            info!(
                tick,
                room_temp_c = self.state.room_temp_c,
                "hvac {} -> {}",
                transition.from.as_str(),
                transition.to.as_str()
            );
            self.transitions.push(transition);
        }

        transition
    }
}
