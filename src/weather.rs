use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::models::Weather;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather api key is not configured")]
    MissingApiKey,
    #[error("weather request failed: {0}")]
    Http(String),
    #[error("weather api error {code:?}: {message}")]
    Api { code: Option<i64>, message: String },
    #[error("invalid weather response: {0}")]
    Decode(String),
    #[error("weather lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Current conditions for a free-form location string.
pub trait WeatherLookup {
    fn current(&self, location: &str) -> impl Future<Output = Result<Weather, WeatherError>>;
}

pub async fn lookup_with_timeout<W: WeatherLookup>(
    lookup: &W,
    location: &str,
    timeout: Duration,
) -> Result<Weather, WeatherError> {
    match tokio::time::timeout(timeout, lookup.current(location)).await {
        Ok(result) => result,
        Err(_) => Err(WeatherError::Timeout(timeout)),
    }
}

/// Best-effort enrichment: any failure, including the timeout, yields `None`.
pub async fn resolve_weather<W: WeatherLookup>(
    lookup: &W,
    location: &str,
    timeout: Duration,
) -> Option<Weather> {
    match lookup_with_timeout(lookup, location, timeout).await {
        Ok(weather) => Some(weather),
        Err(err) => {
            log::warn!("weather lookup skipped location={location} err={err}");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: Option<Current>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_c: f64,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// Parses a weatherapi.com `current.json` body.
pub fn parse_current(body: &str) -> Result<Weather, WeatherError> {
    let response: CurrentResponse =
        serde_json::from_str(body).map_err(|err| WeatherError::Decode(err.to_string()))?;
    if let Some(error) = response.error {
        return Err(WeatherError::Api {
            code: error.code,
            message: error.message,
        });
    }
    let current = response
        .current
        .ok_or_else(|| WeatherError::Decode("missing `current` block".to_string()))?;
    Ok(Weather {
        temp_c: current.temp_c,
        condition: current.condition.text,
        icon_ref: current.condition.icon.filter(|icon| !icon.is_empty()),
    })
}

#[cfg(feature = "app")]
pub use client::WeatherApiClient;

#[cfg(feature = "app")]
mod client {
    use super::{parse_current, WeatherError, WeatherLookup};
    use crate::config::WeatherConfig;
    use crate::models::Weather;

    /// weatherapi.com client.
    pub struct WeatherApiClient {
        client: reqwest::Client,
        base_url: String,
        api_key: String,
    }

    impl WeatherApiClient {
        pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
            let api_key = config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or(WeatherError::MissingApiKey)?;
            let client = reqwest::Client::builder()
                .timeout(config.timeout())
                .build()
                .map_err(|err| WeatherError::Http(format!("failed to build http client: {err}")))?;
            Ok(Self {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key,
            })
        }
    }

    impl WeatherLookup for WeatherApiClient {
        async fn current(&self, location: &str) -> Result<Weather, WeatherError> {
            let resp = self
                .client
                .get(format!("{}/current.json", self.base_url))
                .query(&[("key", self.api_key.as_str()), ("q", location)])
                .send()
                .await
                .map_err(|err| WeatherError::Http(err.to_string()))?;

            let status = resp.status();
            let text = resp
                .text()
                .await
                .map_err(|err| WeatherError::Http(format!("failed to read response: {err}")))?;

            // Errors such as an unknown location come back as 4xx with an `error` body.
            match parse_current(&text) {
                Err(WeatherError::Decode(_)) if !status.is_success() => {
                    Err(WeatherError::Http(format!("http {status}: {text}")))
                }
                other => other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLookup(Result<Weather, &'static str>);

    impl WeatherLookup for FixedLookup {
        async fn current(&self, _location: &str) -> Result<Weather, WeatherError> {
            self.0
                .clone()
                .map_err(|message| WeatherError::Http(message.to_string()))
        }
    }

    struct SlowLookup;

    impl WeatherLookup for SlowLookup {
        async fn current(&self, _location: &str) -> Result<Weather, WeatherError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(rain())
        }
    }

    fn rain() -> Weather {
        Weather {
            temp_c: 12.0,
            condition: "Light rain".to_string(),
            icon_ref: Some("//cdn.weatherapi.com/weather/64x64/day/296.png".to_string()),
        }
    }

    #[test]
    fn parse_current_reads_temperature_condition_and_icon() {
        let body = r#"
        {
          "location": { "name": "London" },
          "current": {
            "temp_c": 12.0,
            "condition": { "text": "Light rain", "icon": "//cdn.weatherapi.com/weather/64x64/day/296.png", "code": 1183 }
          }
        }
        "#;
        let weather = parse_current(body).expect("weather");
        assert_eq!(weather, rain());
    }

    #[test]
    fn parse_current_surfaces_api_error() {
        let body = r#"{ "error": { "code": 1006, "message": "No matching location found." } }"#;
        match parse_current(body) {
            Err(WeatherError::Api { code, message }) => {
                assert_eq!(code, Some(1006));
                assert_eq!(message, "No matching location found.");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn parse_current_rejects_garbage() {
        assert!(matches!(
            parse_current("<html>"),
            Err(WeatherError::Decode(_))
        ));
        assert!(matches!(parse_current("{}"), Err(WeatherError::Decode(_))));
    }

    #[test]
    fn parse_current_treats_empty_icon_as_absent() {
        let body = r#"{ "current": { "temp_c": -3.5, "condition": { "text": "Snow", "icon": "" } } }"#;
        let weather = parse_current(body).expect("weather");
        assert_eq!(weather.icon_ref, None);
        assert_eq!(weather.temp_c, -3.5);
    }

    #[tokio::test]
    async fn resolve_weather_returns_lookup_result() {
        let lookup = FixedLookup(Ok(rain()));
        let weather = resolve_weather(&lookup, "London", Duration::from_secs(1)).await;
        assert_eq!(weather, Some(rain()));
    }

    #[tokio::test]
    async fn resolve_weather_swallows_errors() {
        let lookup = FixedLookup(Err("connection refused"));
        assert_eq!(
            resolve_weather(&lookup, "London", Duration::from_secs(1)).await,
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_times_out() {
        let err = lookup_with_timeout(&SlowLookup, "London", Duration::from_millis(50))
            .await
            .expect_err("timeout");
        assert!(matches!(err, WeatherError::Timeout(_)));
        assert_eq!(
            resolve_weather(&SlowLookup, "London", Duration::from_millis(50)).await,
            None
        );
    }
}
