//! Feature builder: Assembles the flood feature vector for one location.
//!
//! Sources are queried one after another in feature order. The first failing
//! source aborts the build; no partial vector is returned.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::hydrology::{
    permanent_water_flag, safe_read, topographic_wetness_index, upstream_area_km2,
    wetness_slope_rad,
};
use crate::domain::{DateWindow, FloodFeatures, GeoPoint, ReferenceDates, INDEX_WINDOW_DAYS};
use crate::ports::{EarthObservation, PrecipitationSource, SourceError};

/// Builds [`FloodFeatures`] from the remote sources.
pub struct FeatureBuilder<E = dyn EarthObservation, P = dyn PrecipitationSource>
where
    E: EarthObservation + ?Sized,
    P: PrecipitationSource + ?Sized,
{
    earth: Arc<E>,
    precipitation: Arc<P>,
}

impl<E, P> FeatureBuilder<E, P>
where
    E: EarthObservation + ?Sized,
    P: PrecipitationSource + ?Sized,
{
    pub fn new(earth: Arc<E>, precipitation: Arc<P>) -> Self {
        Self {
            earth,
            precipitation,
        }
    }

    /// 1.0 if the point is permanent water, else 0.0.
    ///
    /// # Errors
    /// Propagates the source error.
    pub fn permanent_water(&self, point: GeoPoint) -> Result<f64, SourceError> {
        let occurrence = self.earth.surface_water_occurrence(point)?;
        tracing::debug!("Surface water occurrence at {}: {:?}", point, occurrence);
        Ok(permanent_water_flag(occurrence))
    }

    /// `(precip_1d, precip_3d)` in mm for the windows ending at `end`.
    ///
    /// # Errors
    /// Propagates the source error.
    pub fn precipitation(&self, point: GeoPoint, end: NaiveDate) -> Result<(f64, f64), SourceError> {
        let sample = self.precipitation.precipitation(point, end)?;
        tracing::debug!("Precipitation ending {}: {:?}", end, sample);
        Ok((safe_read(sample.one_day, 0.0), safe_read(sample.three_day, 0.0)))
    }

    /// `(NDVI, NDWI)` from the composite around `center`; zeros when no scene qualifies.
    ///
    /// # Errors
    /// Propagates the source error.
    pub fn spectral_indices(
        &self,
        point: GeoPoint,
        center: NaiveDate,
    ) -> Result<(f64, f64), SourceError> {
        let window = DateWindow::centered(center, INDEX_WINDOW_DAYS);
        let sample = self.earth.spectral_indices(point, window)?.unwrap_or_default();
        tracing::debug!("Spectral indices around {}: {:?}", center, sample);
        Ok((safe_read(sample.ndvi, 0.0), safe_read(sample.ndwi, 0.0)))
    }

    /// # Errors
    /// Propagates the source error.
    pub fn landcover(&self, point: GeoPoint) -> Result<f64, SourceError> {
        Ok(safe_read(self.earth.landcover_class(point)?, 0.0))
    }

    /// `(elevation, slope, aspect)`.
    ///
    /// # Errors
    /// Propagates the source error.
    pub fn terrain(&self, point: GeoPoint) -> Result<(f64, f64, f64), SourceError> {
        let t = self.earth.terrain(point)?;
        tracing::debug!("Terrain at {}: {:?}", point, t);
        Ok((
            safe_read(t.elevation, 0.0),
            safe_read(t.slope, 0.0),
            safe_read(t.aspect, 0.0),
        ))
    }

    /// `(upstream_area_km2, TWI)`. TWI may be non-finite.
    ///
    /// # Errors
    /// Propagates the source error.
    pub fn hydrology(&self, point: GeoPoint) -> Result<(f64, f64), SourceError> {
        let h = self.earth.hydrology(point)?;
        tracing::debug!("Hydrology at {}: {:?}", point, h);
        let area = upstream_area_km2(h.upstream_area_m2);
        let twi = topographic_wetness_index(area, wetness_slope_rad(h.slope_deg));
        Ok((area, twi))
    }

    /// Query every source in feature order and assemble the vector.
    ///
    /// # Errors
    /// Returns the first source error; later sources are not queried.
    pub fn build(&self, point: GeoPoint, dates: ReferenceDates) -> Result<FloodFeatures, SourceError> {
        let jrc_perm_water = self.permanent_water(point)?;
        let (precip_1d, precip_3d) = self.precipitation(point, dates.precipitation_end)?;
        let (ndvi, ndwi) = self.spectral_indices(point, dates.index_center)?;
        let landcover = self.landcover(point)?;
        let (elevation, slope, aspect) = self.terrain(point)?;
        let (upstream_area, twi) = self.hydrology(point)?;

        let features = FloodFeatures {
            jrc_perm_water,
            precip_1d,
            precip_3d,
            ndvi,
            ndwi,
            landcover,
            elevation,
            slope,
            aspect,
            upstream_area,
            twi,
        };
        tracing::info!("Built features for {}: {:?}", point, features.named());
        Ok(features)
    }
}

impl<E, P> Clone for FeatureBuilder<E, P>
where
    E: EarthObservation + ?Sized,
    P: PrecipitationSource + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            earth: Arc::clone(&self.earth),
            precipitation: Arc::clone(&self.precipitation),
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::Mutex;

    use super::*;
    use crate::ports::{HydrologySample, PrecipitationSample, SpectralSample, TerrainSample};

    /// Scripted sources that record the order they are called in.
    #[derive(Default)]
    pub struct FakeSources {
        pub calls: Mutex<Vec<&'static str>>,
        pub occurrence: Option<f64>,
        pub spectral: Option<SpectralSample>,
        pub landcover: Option<f64>,
        pub terrain: TerrainSample,
        pub hydrology: HydrologySample,
        pub precipitation: PrecipitationSample,
        pub fail_on: Option<&'static str>,
    }

    impl FakeSources {
        fn record(&self, name: &'static str) -> Result<(), SourceError> {
            self.calls.lock().expect("lock").push(name);
            if self.fail_on == Some(name) {
                return Err(SourceError::Status {
                    service: "Earth Engine",
                    status: 429,
                    message: "Too many concurrent aggregations.".into(),
                });
            }
            Ok(())
        }

        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().expect("lock").clone()
        }

        /// A location with ordinary values from every source.
        pub fn typical() -> Self {
            Self {
                occurrence: Some(12.0),
                spectral: Some(SpectralSample {
                    ndvi: Some(0.42),
                    ndwi: Some(-0.31),
                }),
                landcover: Some(50.0),
                terrain: TerrainSample {
                    elevation: Some(8.0),
                    slope: Some(1.5),
                    aspect: Some(270.0),
                },
                hydrology: HydrologySample {
                    upstream_area_m2: Some(2_500_000.0),
                    slope_deg: Some(1.5),
                },
                precipitation: PrecipitationSample {
                    one_day: Some(12.4),
                    three_day: Some(30.1),
                },
                ..Self::default()
            }
        }
    }

    impl EarthObservation for FakeSources {
        fn surface_water_occurrence(&self, _: GeoPoint) -> Result<Option<f64>, SourceError> {
            self.record("jrc_perm_water")?;
            Ok(self.occurrence)
        }

        fn spectral_indices(
            &self,
            _: GeoPoint,
            _: DateWindow,
        ) -> Result<Option<SpectralSample>, SourceError> {
            self.record("spectral")?;
            Ok(self.spectral)
        }

        fn landcover_class(&self, _: GeoPoint) -> Result<Option<f64>, SourceError> {
            self.record("landcover")?;
            Ok(self.landcover)
        }

        fn terrain(&self, _: GeoPoint) -> Result<TerrainSample, SourceError> {
            self.record("terrain")?;
            Ok(self.terrain)
        }

        fn hydrology(&self, _: GeoPoint) -> Result<HydrologySample, SourceError> {
            self.record("hydrology")?;
            Ok(self.hydrology)
        }
    }

    impl PrecipitationSource for FakeSources {
        fn precipitation(
            &self,
            _: GeoPoint,
            _: NaiveDate,
        ) -> Result<PrecipitationSample, SourceError> {
            self.record("precipitation")?;
            Ok(self.precipitation)
        }
    }

    pub fn builder(sources: FakeSources) -> (Arc<FakeSources>, FeatureBuilder) {
        let sources = Arc::new(sources);
        let builder = FeatureBuilder::new(
            Arc::clone(&sources) as Arc<dyn EarthObservation>,
            Arc::clone(&sources) as Arc<dyn PrecipitationSource>,
        );
        (sources, builder)
    }
}
