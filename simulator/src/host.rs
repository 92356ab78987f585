use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use hvac_sim_common::{
    ConfigError, ControllerVariant, RunSummary, SimulationConfig, SimulationEngine, SimulationRun,
    TemperatureFeed, TraceStats, UnavailableFeed, VariantComparison,
};
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::openweather::{OpenWeatherFeed, DEFAULT_BASE_URL};

#[derive(Debug, Clone, PartialEq)]
struct RunnerSettings {
    api_key: Option<String>,
    city: String,
    base_url: String,
    http_timeout: Duration,
    seed: Option<u64>,
    data_dir: PathBuf,
}

#[derive(Debug, Clone)]
struct RunStore {
    data_dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct VariantReport {
    variant: &'static str,
    summary: RunSummary,
    stats: TraceStats,
    fallback_ticks: u32,
}

#[derive(Debug, Serialize)]
struct ResultsFile {
    generated_at: String,
    city: String,
    live_weather: bool,
    seed: Option<u64>,
    variants: Vec<VariantReport>,
    smart_vs_traditional: Option<VariantComparison>,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Arc::new(RunnerSettings::from_env());
    let store = RunStore::new(&settings.data_dir);

    if settings.api_key.is_none() {
        warn!("OPENWEATHER_API_KEY not set, using the configured fallback temperature");
    }

    let mut tasks = Vec::new();
    for (index, variant) in ControllerVariant::ALL.into_iter().enumerate() {
        let config = store.load_config(variant).await.unwrap_or_else(|err| {
            warn!("failed to load {} config from store: {err:#}", variant.as_str());
            variant.config()
        });
        config
            .validate()
            .with_context(|| format!("invalid {} configuration", variant.as_str()))?;

        let seed = settings.seed.map(|seed| seed.wrapping_add(index as u64));
        let settings = Arc::clone(&settings);
        let task = tokio::task::spawn_blocking(move || simulate(variant, config, &settings, seed));
        tasks.push((variant, task));
    }

    let mut runs = Vec::with_capacity(tasks.len());
    for (variant, task) in tasks {
        let run = task
            .await
            .with_context(|| format!("{} simulation task failed", variant.as_str()))?
            .with_context(|| format!("invalid {} configuration", variant.as_str()))?;
        runs.push((variant, run));
    }

    let results = build_results(&settings, &runs);
    print_report(&results)?;

    store
        .save_results(&results, &runs)
        .await
        .context("failed to write simulation results")?;
    info!("results written to {}", store.results_dir().display());

    Ok(())
}

fn simulate(
    variant: ControllerVariant,
    config: SimulationConfig,
    settings: &RunnerSettings,
    seed: Option<u64>,
) -> Result<SimulationRun, ConfigError> {
    let _span = info_span!("simulation", variant = variant.as_str()).entered();

    let Some(api_key) = settings.api_key.as_deref() else {
        return run_with_feed(config, UnavailableFeed, seed);
    };

    match OpenWeatherFeed::new(
        &settings.base_url,
        &settings.city,
        api_key,
        settings.http_timeout,
    ) {
        Ok(feed) => {
            info!("fetching live weather for {}", settings.city);
            run_with_feed(config, feed, seed)
        }
        Err(err) => {
            warn!("live weather unavailable, running offline: {err}");
            run_with_feed(config, UnavailableFeed, seed)
        }
    }
}

fn run_with_feed<F: TemperatureFeed>(
    config: SimulationConfig,
    feed: F,
    seed: Option<u64>,
) -> Result<SimulationRun, ConfigError> {
    let engine = match seed {
        Some(seed) => SimulationEngine::seeded(config, feed, seed)?,
        None => SimulationEngine::from_entropy(config, feed)?,
    };
    Ok(engine.run())
}

fn build_results(
    settings: &RunnerSettings,
    runs: &[(ControllerVariant, SimulationRun)],
) -> ResultsFile {
    let find = |wanted: ControllerVariant| {
        runs.iter()
            .find(|(variant, _)| *variant == wanted)
            .map(|(_, run)| run)
    };
    let smart_vs_traditional = find(ControllerVariant::Smart)
        .zip(find(ControllerVariant::Traditional))
        .map(|(smart, traditional)| smart.compare_to(traditional));

    ResultsFile {
        generated_at: chrono::Utc::now().to_rfc3339(),
        city: settings.city.clone(),
        live_weather: settings.api_key.is_some(),
        seed: settings.seed,
        variants: runs
            .iter()
            .map(|(variant, run)| VariantReport {
                variant: variant.as_str(),
                summary: run.summary(),
                stats: run.stats(),
                fallback_ticks: run.fallback_ticks,
            })
            .collect(),
        smart_vs_traditional,
    }
}

fn print_report(results: &ResultsFile) -> anyhow::Result<()> {
    for report in &results.variants {
        println!("[{}]", report.variant);
        println!("Total HVAC Runtime: {} minutes", report.summary.total_runtime_minutes);
        println!("Total Energy Consumed: {:.2} kWh", report.summary.total_energy_kwh);
        println!("{}", serde_json::to_string(&report.summary)?);
    }

    if let Some(comparison) = &results.smart_vs_traditional {
        let pct = comparison
            .energy_saved_pct
            .map(|pct| format!(" ({pct:.2}%)"))
            .unwrap_or_default();
        println!(
            "smart vs traditional: {} runtime minutes saved, {:.2} kWh saved{pct}",
            comparison.runtime_saved_minutes, comparison.energy_saved_kwh
        );
    }

    Ok(())
}

impl RunnerSettings {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: lookup("OPENWEATHER_API_KEY").filter(|key| !key.trim().is_empty()),
            city: lookup("OPENWEATHER_CITY").unwrap_or_else(|| "Madurai".to_string()),
            base_url: lookup("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            http_timeout: Duration::from_millis(
                lookup("HVAC_SIM_HTTP_TIMEOUT_MS")
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(5_000),
            ),
            seed: lookup("HVAC_SIM_SEED").and_then(|value| value.parse::<u64>().ok()),
            data_dir: lookup("HVAC_SIM_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./.hvac-sim")),
        }
    }
}

impl RunStore {
    fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    fn config_path(&self, variant: ControllerVariant) -> PathBuf {
        self.data_dir.join(format!("{}.json", variant.as_str()))
    }

    fn results_dir(&self) -> PathBuf {
        self.data_dir.join("results")
    }

    async fn load_config(&self, variant: ControllerVariant) -> anyhow::Result<SimulationConfig> {
        let path = self.config_path(variant);
        match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice::<SimulationConfig>(&raw)
                .with_context(|| format!("invalid config file {}", path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(variant.config()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_results(
        &self,
        results: &ResultsFile,
        runs: &[(ControllerVariant, SimulationRun)],
    ) -> anyhow::Result<()> {
        let dir = self.results_dir();
        tokio::fs::create_dir_all(&dir).await?;

        for (variant, run) in runs {
            let mut trace = Vec::new();
            run.write_csv(&mut trace)?;
            tokio::fs::write(dir.join(format!("{}-trace.csv", variant.as_str())), trace).await?;
        }

        let payload = serde_json::to_vec_pretty(results)?;
        tokio::fs::write(dir.join("summary.json"), payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use hvac_sim_common::FixedFeed;
    use pretty_assertions::assert_eq;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hvac-sim-{name}-{}", std::process::id()))
    }

    fn settings(vars: &[(&str, &str)]) -> RunnerSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        RunnerSettings::from_lookup(|key| vars.get(key).cloned())
    }

    fn calm_run(variant: ControllerVariant) -> SimulationRun {
        run_with_feed(variant.config().without_jitter(), FixedFeed(30.0), Some(1)).unwrap()
    }

    #[test]
    fn settings_defaults() {
        let settings = settings(&[]);

        assert_eq!(settings.api_key, None);
        assert_eq!(settings.city, "Madurai");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.http_timeout, Duration::from_secs(5));
        assert_eq!(settings.seed, None);
        assert_eq!(settings.data_dir, PathBuf::from("./.hvac-sim"));
    }

    #[test]
    fn settings_overrides_and_bad_values() {
        let settings = settings(&[
            ("OPENWEATHER_API_KEY", "abc"),
            ("OPENWEATHER_CITY", "Chennai"),
            ("HVAC_SIM_HTTP_TIMEOUT_MS", "250"),
            ("HVAC_SIM_SEED", "not-a-number"),
        ]);

        assert_eq!(settings.api_key.as_deref(), Some("abc"));
        assert_eq!(settings.city, "Chennai");
        assert_eq!(settings.http_timeout, Duration::from_millis(250));
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn blank_api_key_means_offline() {
        assert_eq!(settings(&[("OPENWEATHER_API_KEY", "  ")]).api_key, None);
    }

    #[test]
    fn offline_simulation_uses_fallback_every_tick() {
        let settings = settings(&[("HVAC_SIM_SEED", "9")]);
        let run = simulate(
            ControllerVariant::Smart,
            SimulationConfig::smart(),
            &settings,
            settings.seed,
        )
        .unwrap();

        assert_eq!(run.series.len(), 60);
        assert_eq!(run.fallback_ticks, 60);
    }

    #[test]
    fn invalid_config_is_reported_instead_of_run() {
        let mut config = SimulationConfig::traditional();
        config.band.lower_c = 26.0;

        let result = simulate(ControllerVariant::Traditional, config, &settings(&[]), Some(1));

        assert!(matches!(result, Err(ConfigError::InvalidBand { .. })));
    }

    #[test]
    fn results_compare_smart_against_traditional() {
        let runs = vec![
            (ControllerVariant::Smart, calm_run(ControllerVariant::Smart)),
            (
                ControllerVariant::Traditional,
                calm_run(ControllerVariant::Traditional),
            ),
        ];

        let results = build_results(&settings(&[]), &runs);

        assert_eq!(results.variants.len(), 2);
        assert_eq!(results.variants[0].summary.total_runtime_minutes, 15);
        assert_eq!(results.variants[1].summary.total_runtime_minutes, 30);
        assert_eq!(results.variants[1].summary.total_energy_kwh, 3.0);
        let comparison = results.smart_vs_traditional.unwrap();
        assert_eq!(comparison.runtime_saved_minutes, 15);
        assert!(comparison.energy_saved_kwh > 2.4);
    }

    #[tokio::test]
    async fn missing_config_file_loads_preset() {
        let store = RunStore::new(&scratch_dir("missing"));

        let config = store.load_config(ControllerVariant::Traditional).await.unwrap();

        assert_eq!(config, SimulationConfig::traditional());
    }

    #[tokio::test]
    async fn config_override_and_results_round_trip() {
        let dir = scratch_dir("store");
        let store = RunStore::new(&dir);
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let mut custom = SimulationConfig::smart();
        custom.horizon_minutes = 10;
        tokio::fs::write(
            store.config_path(ControllerVariant::Smart),
            serde_json::to_vec(&custom).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(
            store.load_config(ControllerVariant::Smart).await.unwrap(),
            custom
        );

        tokio::fs::write(store.config_path(ControllerVariant::Traditional), b"{ nope")
            .await
            .unwrap();
        assert!(store
            .load_config(ControllerVariant::Traditional)
            .await
            .is_err());

        let runs = vec![(ControllerVariant::Smart, calm_run(ControllerVariant::Smart))];
        let results = build_results(&settings(&[]), &runs);
        store.save_results(&results, &runs).await.unwrap();

        let trace = tokio::fs::read_to_string(store.results_dir().join("smart-trace.csv"))
            .await
            .unwrap();
        assert_eq!(trace.lines().count(), 61);
        let summary: serde_json::Value = serde_json::from_slice(
            &tokio::fs::read(store.results_dir().join("summary.json"))
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(summary["variants"][0]["summary"]["total_runtime_minutes"], 15);
        assert!(summary["smart_vs_traditional"].is_null());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
