use std::io;

use serde::Serialize;

use crate::types::{HvacMode, ModeTransition, RoomState, Snapshot};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRun {
    pub series: Vec<Snapshot>,
    pub transitions: Vec<ModeTransition>,
    pub final_state: RoomState,
    pub fallback_ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_runtime_minutes: u32,
    pub total_energy_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraceStats {
    pub min_room_temp_c: f64,
    pub max_room_temp_c: f64,
    pub on_cycles: usize,
    pub duty_cycle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariantComparison {
    pub runtime_saved_minutes: i64,
    pub energy_saved_kwh: f64,
    /// `None` when the baseline used no energy.
    pub energy_saved_pct: Option<f64>,
}

impl SimulationRun {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_runtime_minutes: self.final_state.active_minutes,
            total_energy_kwh: round2(self.final_state.energy_kwh),
        }
    }

    pub fn stats(&self) -> TraceStats {
        let temps = self
            .series
            .iter()
            .map(|snapshot| snapshot.room_temp_c)
            .chain(std::iter::once(self.final_state.room_temp_c));
        let (min_room_temp_c, max_room_temp_c) = temps.fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), temp| (min.min(temp), max.max(temp)),
        );

        let on_cycles = self
            .transitions
            .iter()
            .filter(|transition| transition.to == HvacMode::On)
            .count();
        let duty_cycle = if self.series.is_empty() {
            0.0
        } else {
            self.final_state.active_minutes as f64 / self.series.len() as f64
        };

        TraceStats {
            min_room_temp_c,
            max_room_temp_c,
            on_cycles,
            duty_cycle,
        }
    }

    pub fn compare_to(&self, baseline: &SimulationRun) -> VariantComparison {
        let ours = &self.final_state;
        let theirs = &baseline.final_state;
        let energy_saved_kwh = theirs.energy_kwh - ours.energy_kwh;
        let runtime_saved_minutes =
            i64::from(theirs.active_minutes) - i64::from(ours.active_minutes);

        VariantComparison {
            runtime_saved_minutes,
            energy_saved_kwh: round2(energy_saved_kwh),
            energy_saved_pct: (theirs.energy_kwh > 0.0)
                .then(|| round2(energy_saved_kwh / theirs.energy_kwh * 100.0)),
        }
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for snapshot in &self.series {
            csv.serialize(TraceRow::from(snapshot))?;
        }
        csv.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct TraceRow {
    tick: u32,
    room_temp_c: f64,
    outdoor_temp_c: f64,
    humidity_pct: f64,
    mode: &'static str,
    energy_kwh: f64,
}

impl From<&Snapshot> for TraceRow {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            tick: snapshot.tick,
            room_temp_c: snapshot.room_temp_c,
            outdoor_temp_c: snapshot.outdoor_temp_c,
            humidity_pct: snapshot.humidity_pct,
            mode: snapshot.mode.as_str(),
            energy_kwh: snapshot.energy_kwh,
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
