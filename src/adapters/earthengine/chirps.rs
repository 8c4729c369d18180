//! CHIRPS daily precipitation read through Earth Engine.
//!
//! The dataset is published with a lag of a few days, so both windows end
//! `PUBLICATION_LAG_DAYS` before the reference date.

use std::sync::Arc;

use chrono::{Days, NaiveDate};

use super::{queries, EarthEngineClient};
use crate::domain::{DateWindow, GeoPoint, PRECIPITATION_WINDOW_DAYS};
use crate::ports::{PrecipitationSample, PrecipitationSource, SourceError};

pub const PUBLICATION_LAG_DAYS: u64 = 3;

/// Precipitation source backed by the CHIRPS daily collection.
#[derive(Debug, Clone)]
pub struct ChirpsPrecipitation {
    ee: Arc<EarthEngineClient>,
}

impl ChirpsPrecipitation {
    pub fn new(ee: Arc<EarthEngineClient>) -> Self {
        Self { ee }
    }

    /// Summed precipitation over `window`, or `None` when it holds no images.
    fn window_total(&self, point: GeoPoint, window: DateWindow) -> Result<Option<f64>, SourceError> {
        let days = self.ee.compute_count(&queries::chirps_day_count(point, window))?;
        if days == 0 {
            tracing::debug!("No CHIRPS images between {} and {}", window.start, window.end);
            return Ok(None);
        }
        let result = self.ee.compute(&queries::chirps_total(point, window))?;
        Ok(queries::band_value(&result, queries::CHIRPS_TOTAL_KEY))
    }
}

/// Last day with published data for a reference date.
#[must_use]
pub fn latest_published(reference: NaiveDate) -> NaiveDate {
    reference
        .checked_sub_days(Days::new(PUBLICATION_LAG_DAYS))
        .unwrap_or(reference)
}

impl PrecipitationSource for ChirpsPrecipitation {
    fn precipitation(
        &self,
        point: GeoPoint,
        end: NaiveDate,
    ) -> Result<PrecipitationSample, SourceError> {
        let safe_end = latest_published(end);
        let one_day = self.window_total(point, DateWindow::ending(safe_end, 1))?;
        let three_day =
            self.window_total(point, DateWindow::ending(safe_end, PRECIPITATION_WINDOW_DAYS))?;
        Ok(PrecipitationSample { one_day, three_day })
    }
}
