use std::collections::VecDeque;

use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::{Bounds, WeatherConfig},
    types::{SampleOrigin, WeatherSample},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeatherFetchError {
    #[error("weather request failed: {0}")]
    Transport(String),
    #[error("weather service returned status {0}")]
    Status(u16),
    #[error("malformed weather response: {0}")]
    Parse(String),
    #[error("weather response is missing {0}")]
    MissingField(&'static str),
    #[error("no weather feed configured")]
    Unavailable,
}

pub trait TemperatureFeed {
    /// Current outdoor temperature in °C.
    fn current_temperature(&mut self) -> Result<f64, WeatherFetchError>;
}

impl<F: TemperatureFeed + ?Sized> TemperatureFeed for &mut F {
    fn current_temperature(&mut self) -> Result<f64, WeatherFetchError> {
        (**self).current_temperature()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFeed(pub f64);

impl TemperatureFeed for FixedFeed {
    fn current_temperature(&mut self) -> Result<f64, WeatherFetchError> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableFeed;

impl TemperatureFeed for UnavailableFeed {
    fn current_temperature(&mut self) -> Result<f64, WeatherFetchError> {
        Err(WeatherFetchError::Unavailable)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedFeed {
    outcomes: VecDeque<Result<f64, WeatherFetchError>>,
}

impl ScriptedFeed {
    pub fn new(outcomes: impl IntoIterator<Item = Result<f64, WeatherFetchError>>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
        }
    }

}

impl TemperatureFeed for ScriptedFeed {
    fn current_temperature(&mut self) -> Result<f64, WeatherFetchError> {
        self.outcomes
            .pop_front()
            .unwrap_or(Err(WeatherFetchError::Unavailable))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct WeatherSource<F, R = StdRng> {
    feed: F,
    rng: R,
    fallback_temp_c: f64,
    temp_variability_c: f64,
    humidity_variability_pct: f64,
    outdoor_range_c: Bounds,
    humidity_range_pct: Bounds,
    humidity_pct: f64,
}

impl<F: TemperatureFeed> WeatherSource<F, StdRng> {
    pub(crate) fn seeded(feed: F, config: &WeatherConfig, seed: u64) -> Self {
        Self::with_rng(feed, config, StdRng::seed_from_u64(seed))
    }

    pub(crate) fn from_entropy(feed: F, config: &WeatherConfig) -> Self {
        Self::with_rng(feed, config, StdRng::from_entropy())
    }
}

impl<F: TemperatureFeed, R: Rng> WeatherSource<F, R> {
    fn with_rng(feed: F, config: &WeatherConfig, rng: R) -> Self {
        Self {
            feed,
            rng,
            fallback_temp_c: config.fallback_outdoor_temp_c,
            temp_variability_c: config.temp_variability_c,
            humidity_variability_pct: config.humidity_variability_pct,
            outdoor_range_c: config.outdoor_range_c,
            humidity_range_pct: config.humidity_range_pct,
            humidity_pct: config.initial_humidity_pct,
        }
    }

    pub(crate) fn sample(&mut self) -> WeatherSample {
        let (reading, origin) = match self.feed.current_temperature() {
            Ok(temp) if temp.is_finite() => (temp, SampleOrigin::Feed),
            Ok(temp) => {
                warn!(
                    "weather feed returned non-finite temperature {temp}, using fallback {}",
                    self.fallback_temp_c
                );
                (self.fallback_temp_c, SampleOrigin::Fallback)
            }
            Err(WeatherFetchError::Unavailable) => {
                debug!("no weather feed, using fallback {}", self.fallback_temp_c);
                (self.fallback_temp_c, SampleOrigin::Fallback)
            }
            Err(err) => {
                warn!("{err}, using fallback {}", self.fallback_temp_c);
                (self.fallback_temp_c, SampleOrigin::Fallback)
            }
        };

        let temp_jitter = jitter(&mut self.rng, self.temp_variability_c);
        let outdoor_temp_c = self.outdoor_range_c.clamp(reading + temp_jitter);

        let humidity_jitter = jitter(&mut self.rng, self.humidity_variability_pct);
        self.humidity_pct = self
            .humidity_range_pct
            .clamp(self.humidity_pct + humidity_jitter);

        WeatherSample {
            outdoor_temp_c,
            humidity_pct: self.humidity_pct,
            origin,
        }
    }
}

// Scaling a unit draw keeps any finite magnitude clear of range overflow.
fn jitter<R: Rng>(rng: &mut R, magnitude: f64) -> f64 {
    if magnitude > 0.0 {
        rng.gen_range(-1.0_f64..=1.0) * magnitude
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use pretty_assertions::assert_eq;

    fn calm() -> WeatherConfig {
        SimulationConfig::smart().without_jitter().weather
    }

    #[test]
    fn transport_failure_yields_exact_fallback() {
        let mut source = WeatherSource::seeded(
            ScriptedFeed::new([Err(WeatherFetchError::Transport(
                "connection refused".to_string(),
            ))]),
            &calm(),
            7,
        );

        let sample = source.sample();

        assert_eq!(sample.outdoor_temp_c, 30.0);
        assert_eq!(sample.origin, SampleOrigin::Fallback);
    }

    #[test]
    fn every_error_kind_falls_back() {
        let mut source = WeatherSource::seeded(
            ScriptedFeed::new([
                Err(WeatherFetchError::Status(500)),
                Err(WeatherFetchError::Parse("eof".to_string())),
                Err(WeatherFetchError::MissingField("main.temp")),
                Ok(f64::NAN),
                Ok(31.5),
            ]),
            &calm(),
            7,
        );

        let samples: Vec<_> = (0..6).map(|_| source.sample()).collect();

        assert!(samples[..4].iter().all(|sample| {
            sample.origin == SampleOrigin::Fallback && sample.outdoor_temp_c == 30.0
        }));
        assert_eq!(samples[4].origin, SampleOrigin::Feed);
        assert_eq!(samples[4].outdoor_temp_c, 31.5);
        // Script exhausted.
        assert_eq!(samples[5].origin, SampleOrigin::Fallback);
    }

    #[test]
    fn feed_reading_is_clamped_into_range() {
        let mut source = WeatherSource::seeded(FixedFeed(41.0), &calm(), 1);

        assert_eq!(source.sample().outdoor_temp_c, 34.0);
    }

    #[test]
    fn zero_variability_keeps_humidity_constant() {
        let mut source = WeatherSource::seeded(FixedFeed(30.0), &calm(), 99);

        for _ in 0..10 {
            let sample = source.sample();
            assert_eq!(sample.humidity_pct, 60.0);
            assert_eq!(sample.outdoor_temp_c, 30.0);
        }
    }

    #[test]
    fn jitter_stays_within_variability_and_ranges() {
        let config = SimulationConfig::traditional().weather;
        let mut source = WeatherSource::seeded(FixedFeed(34.8), &config, 42);
        let mut previous_humidity = config.initial_humidity_pct;

        for _ in 0..500 {
            let sample = source.sample();
            assert!(config.outdoor_range_c.contains(sample.outdoor_temp_c));
            assert!(sample.outdoor_temp_c >= 34.8 - 0.5);
            assert!(config.humidity_range_pct.contains(sample.humidity_pct));
            assert!((sample.humidity_pct - previous_humidity).abs() <= 2.0 + 1e-12);
            previous_humidity = sample.humidity_pct;
        }
    }

    #[test]
    fn huge_variability_does_not_overflow_the_draw() {
        let mut config = calm();
        config.temp_variability_c = f64::MAX;
        config.humidity_variability_pct = f64::MAX;
        let mut source = WeatherSource::seeded(FixedFeed(30.0), &config, 3);

        for _ in 0..20 {
            let sample = source.sample();
            assert!(config.outdoor_range_c.contains(sample.outdoor_temp_c));
            assert!(config.humidity_range_pct.contains(sample.humidity_pct));
        }
    }

    #[test]
    fn same_seed_reproduces_samples() {
        let config = SimulationConfig::smart().weather;
        let mut first = WeatherSource::seeded(FixedFeed(29.0), &config, 1234);
        let mut second = WeatherSource::seeded(FixedFeed(29.0), &config, 1234);

        for _ in 0..60 {
            assert_eq!(first.sample(), second.sample());
        }
    }
}
