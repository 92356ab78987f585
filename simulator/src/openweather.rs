use std::time::Duration;

use hvac_sim_common::{TemperatureFeed, WeatherFetchError};
use reqwest::{blocking::Client, Url};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org";

pub struct OpenWeatherFeed {
    client: Client,
    url: Url,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: Option<MainReadings>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: Option<f64>,
}

impl OpenWeatherFeed {
    /// Must be built off the async runtime; the blocking client owns its own.
    pub fn new(
        base_url: &str,
        city: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, WeatherFetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| WeatherFetchError::Transport(err.to_string()))?;

        let url = current_weather_url(base_url, city, api_key)?;

        Ok(Self { client, url })
    }
}

impl TemperatureFeed for OpenWeatherFeed {
    fn current_temperature(&mut self) -> Result<f64, WeatherFetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .map_err(|err| WeatherFetchError::Transport(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherFetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|err| WeatherFetchError::Transport(err.without_url().to_string()))?;
        let temp = parse_temperature(&body)?;
        debug!("openweather reported {temp}");
        Ok(temp)
    }
}

pub fn current_weather_url(
    base_url: &str,
    city: &str,
    api_key: &str,
) -> Result<Url, WeatherFetchError> {
    Url::parse_with_params(
        &format!("{}/data/2.5/weather", base_url.trim_end_matches('/')),
        &[("q", city), ("appid", api_key), ("units", "metric")],
    )
    .map_err(|err| WeatherFetchError::Transport(format!("invalid weather url: {err}")))
}

pub fn parse_temperature(body: &str) -> Result<f64, WeatherFetchError> {
    let weather: CurrentWeather =
        serde_json::from_str(body).map_err(|err| WeatherFetchError::Parse(err.to_string()))?;

    weather
        .main
        .and_then(|main| main.temp)
        .ok_or(WeatherFetchError::MissingField("main.temp"))
}
