//! Open-Meteo adapter: Daily precipitation from the forecast API.

use std::time::Duration;

use chrono::{Days, NaiveDate};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::{GeoPoint, PRECIPITATION_WINDOW_DAYS};
use crate::ports::{PrecipitationSample, PrecipitationSource, SourceError};

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEZONE: &str = "Asia/Singapore";

const SERVICE: &str = "Open-Meteo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    daily: Option<DailySeries>,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    reason: String,
}

/// Blocking Open-Meteo client.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    url: String,
    timezone: String,
}

impl OpenMeteoClient {
    /// # Errors
    /// Returns `SourceError::Transport` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timezone: impl Into<String>) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            url: url.into(),
            timezone: timezone.into(),
        })
    }

    fn daily_series(
        &self,
        point: GeoPoint,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Option<f64>>, SourceError> {
        let resp = self
            .http
            .get(&self.url)
            .query(&[
                ("latitude", point.lat.to_string()),
                ("longitude", point.lon.to_string()),
                ("daily", "precipitation_sum".to_string()),
                ("timezone", self.timezone.clone()),
                ("start_date", start.to_string()),
                ("end_date", end.to_string()),
            ])
            .send()
            .map_err(|e| SourceError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.reason)
                .unwrap_or(body);
            return Err(SourceError::Status {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let forecast: ForecastResponse = resp.json().map_err(|e| SourceError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;
        Ok(forecast
            .daily
            .map(|d| d.precipitation_sum)
            .unwrap_or_default())
    }
}

/// First day of the precipitation window ending (inclusive) at `end`.
#[must_use]
pub fn window_start(end: NaiveDate) -> NaiveDate {
    end.checked_sub_days(Days::new(PRECIPITATION_WINDOW_DAYS - 1))
        .unwrap_or(end)
}

/// Last-day and whole-window totals; null days read as 0.
#[must_use]
pub fn summarize(series: &[Option<f64>]) -> PrecipitationSample {
    let one_day = series.last().copied().flatten().unwrap_or(0.0);
    let three_day = series.iter().map(|d| d.unwrap_or(0.0)).sum();
    PrecipitationSample {
        one_day: Some(one_day),
        three_day: Some(three_day),
    }
}

impl PrecipitationSource for OpenMeteoClient {
    fn precipitation(
        &self,
        point: GeoPoint,
        end: NaiveDate,
    ) -> Result<PrecipitationSample, SourceError> {
        let start = window_start(end);
        let series = self.daily_series(point, start, end)?;
        tracing::debug!("Open-Meteo returned {} daily values", series.len());
        Ok(summarize(&series))
    }
}
