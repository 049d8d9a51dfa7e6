use std::path::{Path, PathBuf};

use super::aggregate::aggregate_all;
use super::config::ExposureConfig;
use super::dli::DliClass;
use super::error::{ExposureError, ValidationError};
use super::period::Period;
use super::radiation::{PatchIrradiance, RadiationDecoder, SkyComponent};
use super::result::{ExposureResult, PeriodResult};
use super::sample::SamplePoint;
use super::sky_dome::SkyDome;
use super::tregenza::TregenzaScheme;
use super::visibility::{VisibilityEngine, VisibilityRow};
use crate::Mesh;
use crate::io::sky_matrix::SkyMatrixSource;
use crate::io::weather::write_monthly;
use crate::sim::engine::{ContextMesh, RayOccluder};

/// Sky-patch exposure simulation.
///
/// Visibility is computed once per run and reused for every period. A run
/// is atomic: the first failing period aborts it and no partial result is
/// returned.
pub struct ExposureSimulation {
    config: ExposureConfig,
    scheme: TregenzaScheme,
    dome: SkyDome,
    pool: Option<rayon::ThreadPool>,
    work_dir: Option<PathBuf>,
}

impl ExposureSimulation {
    pub fn new(config: ExposureConfig) -> Result<Self, ExposureError> {
        Self::with_scheme(config, TregenzaScheme::new())
    }

    pub fn with_scheme(config: ExposureConfig, scheme: TregenzaScheme) -> Result<Self, ExposureError> {
        config.validate()?;
        let dome = SkyDome::generate(&scheme, config.ground.is_enabled());
        let pool = match config.threads {
            Some(n) => Some(rayon::ThreadPoolBuilder::new().num_threads(n).build()?),
            None => None,
        };
        Ok(Self {
            config,
            scheme,
            dome,
            pool,
            work_dir: None,
        })
    }

    /// Directory for the monthly weather files (default: next to the
    /// weather file).
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &ExposureConfig {
        &self.config
    }

    pub fn dome(&self) -> &SkyDome {
        &self.dome
    }

    pub fn scheme(&self) -> &TregenzaScheme {
        &self.scheme
    }

    /// Periods simulated by [`ExposureSimulation::run`], annual first.
    pub fn periods(&self) -> Vec<Period> {
        let mut periods = vec![Period::Annual];
        if self.config.monthly {
            periods.extend(Period::months());
        }
        periods
    }

    /// Merges the given meshes and builds the occluding scene.
    pub fn context_mesh(&self, meshes: &[&Mesh]) -> Result<ContextMesh, ExposureError> {
        let mut merged = Mesh::default();
        for mesh in meshes {
            merged.merge(mesh);
        }
        Ok(ContextMesh::new(&merged, self.config.voxel_size)?)
    }

    /// Computes the visibility rows of all sample points.
    pub fn visibility<O: RayOccluder + ?Sized>(
        &self,
        points: &[SamplePoint],
        occluder: &O,
    ) -> Result<Vec<VisibilityRow>, ExposureError> {
        let engine = VisibilityEngine::new(occluder, self.config.surface_offset)?;
        let rows = self.install(|| engine.compute(points, self.dome.directions()))?;
        tracing::debug!(
            points = rows.len(),
            directions = self.dome.len(),
            "visibility computed"
        );
        Ok(rows)
    }

    /// Turns the sky-matrix texts of one period into per-point results.
    pub fn run_period(
        &self,
        rows: &[VisibilityRow],
        period: Period,
        direct_text: &str,
        diffuse_text: &str,
    ) -> Result<PeriodResult, ExposureError> {
        let decoder = RadiationDecoder::new(&self.scheme, self.config.decoder);
        let decode = |text: &str, component: SkyComponent| {
            decoder
                .decode(text, period.duration_hours())
                .map_err(|source| ExposureError::Decode {
                    period,
                    component,
                    source,
                })
        };
        let direct = decode(direct_text, SkyComponent::Direct)?;
        let diffuse = decode(diffuse_text, SkyComponent::Diffuse)?;

        let irradiance = self.period_irradiance(&direct, &diffuse, period)?;
        let totals = self
            .install(|| aggregate_all(rows, &irradiance, self.config.transmittance))
            .map_err(|source| ExposureError::Aggregation { period, source })?;

        let dli: Vec<f64> = totals
            .iter()
            .map(|&v| self.config.dli.convert_rounded(v, period))
            .collect();
        let classes = dli.iter().map(|&v| DliClass::classify(v)).collect();

        tracing::debug!(%period, points = totals.len(), "period aggregated");
        Ok(PeriodResult {
            period,
            irradiance: totals,
            dli,
            classes,
        })
    }

    /// Total (direct + diffuse) irradiance per direction, extended with the
    /// ground directions when ground is modeled.
    fn period_irradiance(
        &self,
        direct: &PatchIrradiance,
        diffuse: &PatchIrradiance,
        period: Period,
    ) -> Result<PatchIrradiance, ExposureError> {
        let total_sky = direct
            .combine(diffuse)
            .ok_or_else(|| ExposureError::Aggregation {
                period,
                source: ValidationError::LengthMismatch {
                    what: "direct and diffuse irradiance",
                    expected: direct.len(),
                    found: diffuse.len(),
                },
            })?;
        Ok(self.config.ground.extend(total_sky.clone(), &total_sky))
    }

    /// Runs all periods for the given weather file.
    ///
    /// The annual period uses `weather` directly. Monthly periods use the
    /// weather file split into 12 files.
    pub fn run<O, S>(
        &self,
        points: &[SamplePoint],
        occluder: &O,
        weather: &Path,
        source: &S,
    ) -> Result<ExposureResult, ExposureError>
    where
        O: RayOccluder + ?Sized,
        S: SkyMatrixSource + ?Sized,
    {
        tracing::info!(
            points = points.len(),
            directions = self.dome.len(),
            monthly = self.config.monthly,
            "starting exposure run"
        );

        let rows = self.visibility(points, occluder)?;
        let intersection_failures = rows.iter().map(|r| r.intersection_failures()).sum();

        let monthly_files = if self.config.monthly {
            let dir = match &self.work_dir {
                Some(dir) => dir.clone(),
                None => weather
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
            };
            write_monthly(weather, &dir)?
        } else {
            Vec::new()
        };

        let mut periods = Vec::new();
        for period in self.periods() {
            let file = match period {
                Period::Annual => weather,
                Period::Month(m) => monthly_files[(m - 1) as usize].as_path(),
            };
            tracing::info!(%period, weather = %file.display(), "simulating period");
            let direct = source.sky_matrix(file, SkyComponent::Direct, period)?;
            let diffuse = source.sky_matrix(file, SkyComponent::Diffuse, period)?;
            periods.push(self.run_period(&rows, period, &direct, &diffuse)?);
        }

        tracing::info!(periods = periods.len(), intersection_failures, "exposure run finished");
        Ok(ExposureResult {
            point_count: rows.len(),
            direction_count: self.dome.len(),
            intersection_failures,
            periods,
        })
    }

    fn install<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::exposure::aggregate::GroundRadiation;
    use crate::sim::exposure::dli::RoundingPolicy;
    use crate::sim::exposure::error::{DecodeError, Stage, ToolInvocationError};
    use crate::sim::exposure::tregenza::NUM_PATCHES;
    use crate::{Point, Vector};
    use approx::assert_relative_eq;
    use std::cell::RefCell;

    fn uniform_matrix(value: &str) -> String {
        vec![value; NUM_PATCHES].join("\n")
    }

    fn raw_config() -> ExposureConfig {
        let mut config = ExposureConfig::default();
        config.decoder.header_lines = 0;
        config.decoder.leading_ground_rows = 0;
        config.ground = GroundRadiation::Disabled;
        config.dli.rounding = RoundingPolicy::None;
        config
    }

    fn up_point() -> SamplePoint {
        SamplePoint::new(Point::new(0., 0., 0.), Vector::new(0., 0., 1.))
    }

    /// Serves fixed texts and records the requested periods.
    struct FixedSource {
        direct: String,
        diffuse: String,
        calls: RefCell<Vec<(PathBuf, SkyComponent, Period)>>,
    }

    impl SkyMatrixSource for FixedSource {
        fn sky_matrix(
            &self,
            weather: &Path,
            component: SkyComponent,
            period: Period,
        ) -> Result<String, ToolInvocationError> {
            self.calls
                .borrow_mut()
                .push((weather.to_path_buf(), component, period));
            Ok(match component {
                SkyComponent::Direct => self.direct.clone(),
                SkyComponent::Diffuse => self.diffuse.clone(),
            })
        }
    }

    #[test]
    fn test_unobstructed_upward_point() {
        let sim = ExposureSimulation::new(raw_config()).unwrap();
        let scene = sim.context_mesh(&[]).unwrap();
        let rows = sim.visibility(&[up_point()], &scene).unwrap();
        let result = sim
            .run_period(&rows, Period::Annual, &uniform_matrix("1 1 1"), &uniform_matrix("0 0 0"))
            .unwrap();

        let expected: f64 = sim
            .dome()
            .directions()
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let row = sim.dome().row_of(i).unwrap();
                d.dz * sim.scheme().row_weights()[row] * 8.76
            })
            .sum();
        assert_relative_eq!(result.irradiance[0], expected, epsilon = 1e-9);
        assert_relative_eq!(
            result.dli[0],
            sim.config().dli.convert(expected, Period::Annual),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_ground_extends_directions() {
        let mut config = raw_config();
        config.ground = GroundRadiation::Constant(1.0);
        let sim = ExposureSimulation::new(config).unwrap();
        assert_eq!(sim.dome().len(), 2 * NUM_PATCHES);

        // Facing straight down only ground directions contribute
        let down = SamplePoint::new(Point::new(0., 0., 5.), Vector::new(0., 0., -1.));
        let scene = sim.context_mesh(&[]).unwrap();
        let rows = sim.visibility(&[down], &scene).unwrap();
        let result = sim
            .run_period(&rows, Period::Annual, &uniform_matrix("0 0 0"), &uniform_matrix("0 0 0"))
            .unwrap();
        let expected: f64 = sim.dome().ground_directions().iter().map(|d| -d.dz).sum();
        assert_relative_eq!(result.irradiance[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_decode_error_names_period_and_component() {
        let sim = ExposureSimulation::new(raw_config()).unwrap();
        let rows = vec![VisibilityRow::default()];
        let err = sim
            .run_period(&rows, Period::Month(4), &uniform_matrix("1 1 1"), "1 1 1")
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Decode);
        assert_eq!(err.period(), Some(Period::Month(4)));
        assert!(matches!(
            err,
            ExposureError::Decode {
                component: SkyComponent::Diffuse,
                source: DecodeError::Truncated { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_row_length_mismatch_is_aggregation_error() {
        let sim = ExposureSimulation::new(raw_config()).unwrap();
        let rows = vec![VisibilityRow::default()];
        let err = sim
            .run_period(&rows, Period::Annual, &uniform_matrix("1 1 1"), &uniform_matrix("1 1 1"))
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Aggregation);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = raw_config();
        config.transmittance = 2.0;
        assert!(matches!(
            ExposureSimulation::new(config),
            Err(ExposureError::Validation(ValidationError::Transmittance(_)))
        ));
    }

    #[test]
    fn test_run_monthly_splits_weather() {
        let dir = tempfile::tempdir().unwrap();
        let weather = dir.path().join("site.wea");
        std::fs::write(
            &weather,
            "place x\nlatitude 0\nlongitude 0\ntime_zone 0\nsite_elevation 0\nweather_data_file_units 1\n5 1 12.5 100 50\n",
        )
        .unwrap();

        let mut config = raw_config();
        config.monthly = true;
        config.threads = Some(2);
        let sim = ExposureSimulation::new(config).unwrap();
        let scene = sim.context_mesh(&[]).unwrap();
        let source = FixedSource {
            direct: uniform_matrix("1 1 1"),
            diffuse: uniform_matrix("1 1 1"),
            calls: RefCell::new(Vec::new()),
        };

        let result = sim.run(&[up_point()], &scene, &weather, &source).unwrap();
        assert_eq!(result.periods.len(), 13);
        assert_eq!(result.periods[0].period, Period::Annual);
        assert_eq!(result.periods[5].period, Period::Month(5));

        let calls = source.calls.borrow();
        assert_eq!(calls.len(), 26);
        assert_eq!(calls[0].0, weather);
        assert_eq!(calls[2].0, dir.path().join("site_1.wea"));
        assert_eq!(calls[2].2, Period::Month(1));

        // Same sky, scaled by the period length
        let annual = result.annual().unwrap().irradiance[0];
        let feb = result.period(Period::Month(2)).unwrap().irradiance[0];
        assert_relative_eq!(feb, annual * 28.0 / 365.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tool_failure_aborts_run() {
        struct Failing;
        impl SkyMatrixSource for Failing {
            fn sky_matrix(
                &self,
                _weather: &Path,
                _component: SkyComponent,
                period: Period,
            ) -> Result<String, ToolInvocationError> {
                Err(ToolInvocationError::NonZeroExit {
                    command: "gendaymtx".into(),
                    period,
                    status: "exit status: 1".into(),
                    stderr: "bad weather file".into(),
                })
            }
        }

        let sim = ExposureSimulation::new(raw_config()).unwrap();
        let scene = sim.context_mesh(&[]).unwrap();
        let err = sim
            .run(&[up_point()], &scene, Path::new("site.wea"), &Failing)
            .unwrap_err();
        assert_eq!(err.stage(), Stage::SkyMatrix);
        assert_eq!(err.period(), Some(Period::Annual));
        assert!(err.to_string().contains("bad weather file"));
    }
}
