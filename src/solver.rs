//! RAIM position solver
use itertools::Itertools;
use log::{debug, error, info};

use crate::{
    bias::TroposphereBias,
    cfg::Config,
    ephemeris::EphemerisSource,
    geometry::Geometry,
    navigation::{least_squares, AprioriMemory, DilutionOfPrecision, LeastSquares},
    prelude::{DMatrix, Epoch, Error},
    satellite::{constellations, Satellite, SatelliteStatus},
    solutions::{Degradation, EpochSolution, Status},
};

/// [Solver] resolves one [EpochSolution] per epoch, from pseudo ranges,
/// rejecting faulty satellites (RAIM) when the residuals are too large.
#[derive(Debug, Clone)]
pub struct Solver {
    /// Solver parametrization
    pub cfg: Config,
    /// Optional [AprioriMemory], carried from one epoch to the next
    memory: Option<AprioriMemory>,
}

impl Solver {
    /// Creates a new [Solver].
    /// The a-priori memory is created when [Config] enables it.
    pub fn new(cfg: &Config) -> Result<Self, Error> {
        cfg.validate()?;

        debug!("{}", cfg.summary("solver configuration"));

        Ok(Self {
            cfg: cfg.clone(),
            memory: if cfg.memory {
                Some(AprioriMemory::new(&cfg.allowed_constellations))
            } else {
                None
            },
        })
    }

    /// [AprioriMemory], if any.
    pub fn memory(&self) -> Option<&AprioriMemory> {
        self.memory.as_ref()
    }

    /// Fixes the a-priori position (ECEF, m) used to initialize
    /// the next resolutions. This creates the memory if need be,
    /// which is then only updated if [Config] enables it.
    pub fn fix_apriori(&mut self, x_m: f64, y_m: f64, z_m: f64) {
        let memory = self
            .memory
            .get_or_insert_with(|| AprioriMemory::new(&self.cfg.allowed_constellations));
        memory.fix_position(x_m, y_m, z_m);
    }

    /// Forgets past solutions.
    pub fn reset_memory(&mut self) {
        if let Some(memory) = &mut self.memory {
            memory.reset();
        }
    }

    fn seed(&self) -> Option<&AprioriMemory> {
        self.memory.as_ref().filter(|memory| memory.is_initialized())
    }

    /// Prepares the [Geometry]: satellite positions and clock corrected
    /// pseudo ranges at transmission time.
    ///
    /// ## Input
    /// - t: reception [Epoch]
    /// - satellites: proposed [Satellite]s. Excluded ones are ignored.
    /// - pseudo_ranges_m: one pseudo range (m) per [Satellite]
    /// - ephemeris: [EphemerisSource]
    pub fn prepare(
        &self,
        t: Epoch,
        satellites: &[Satellite],
        pseudo_ranges_m: &[f64],
        ephemeris: &dyn EphemerisSource,
    ) -> Result<Geometry, Error> {
        Geometry::prepare(&self.cfg, t, satellites, pseudo_ranges_m, ephemeris)
    }

    /// Solves the [Geometry] once, using the satellites that `marks`
    /// include, without any fault detection. Seeded from the
    /// [AprioriMemory] when there is one.
    ///
    /// ## Input
    /// - geometry: [Geometry] from [Self::prepare]
    /// - marks: one [Satellite] per [Geometry] row
    /// - inv_cov: inverse measurement covariance (all rows), or
    ///   None for an unweighted solution
    /// - tropo: [TroposphereBias]
    pub fn solve(
        &self,
        geometry: &Geometry,
        marks: &[Satellite],
        inv_cov: Option<&DMatrix<f64>>,
        tropo: &dyn TroposphereBias,
    ) -> Result<LeastSquares, Error> {
        least_squares(&self.cfg, geometry, marks, inv_cov, tropo, self.seed())
    }

    /// Resolves the receiver position and clock offsets at reception
    /// [Epoch] `t`, with fault detection and exclusion.
    ///
    /// All satellites are first used together. If the RMS residual
    /// exceeds the limit, one satellite is rejected at a time, then two, etc.,
    /// and the solution with the smallest RMS residual is retained.
    ///
    /// The returned [EpochSolution] reports any resolution failure in its
    /// [Status]. Errors are returned for invalid inputs only.
    ///
    /// [Status::NoEphemeris] is only reported when some satellites passed
    /// the constellation filter but none of them has an ephemeris. When no
    /// satellite is left to query (all excluded by you, or not allowed),
    /// the epoch is reported as [Status::NotEnoughSatellites].
    ///
    /// ## Input
    /// - t: reception [Epoch]
    /// - satellites: proposed [Satellite]s
    /// - pseudo_ranges_m: one pseudo range (m) per [Satellite]
    /// - inv_cov: inverse measurement covariance, one row and column
    ///   per [Satellite]. None for an unweighted solution.
    /// - ephemeris: [EphemerisSource]
    /// - tropo: [TroposphereBias]
    pub fn resolve(
        &mut self,
        t: Epoch,
        satellites: &[Satellite],
        pseudo_ranges_m: &[f64],
        inv_cov: Option<&DMatrix<f64>>,
        ephemeris: &dyn EphemerisSource,
        tropo: &dyn TroposphereBias,
    ) -> Result<EpochSolution, Error> {
        if let Some(inv_cov) = inv_cov {
            if inv_cov.nrows() != satellites.len() || inv_cov.ncols() != satellites.len() {
                error!("{}: invalid measurement covariance dimensions", t);
                return Err(Error::DimensionMismatch("measurement covariance"));
            }
        }

        let geometry = self.prepare(t, satellites, pseudo_ranges_m, ephemeris)?;

        if geometry.no_ephemeris() {
            error!("{}: no ephemeris for any satellite", t);
            return Ok(EpochSolution::failure(
                t,
                Status::NoEphemeris,
                geometry.satellites,
            ));
        }

        if geometry.usable() == 0 {
            error!("{}: no satellite to work with", t);
            return Ok(EpochSolution::failure(
                t,
                Status::NotEnoughSatellites,
                geometry.satellites,
            ));
        }

        let usable = geometry.usable_indexes();
        let full_set = constellations(&geometry.satellites, &self.cfg.allowed_constellations);

        let (best, failure) = self.search(&geometry, &usable, inv_cov, tropo)?;

        let best = match best {
            Some(best) => best,
            None => {
                let status = failure.unwrap_or(Status::NotEnoughSatellites);
                error!("{}: resolution failed ({})", t, status);
                return Ok(EpochSolution::failure(t, status, geometry.satellites));
            },
        };

        let position_m = best.state.fixed_rows::<3>(0).into_owned();
        let dop = DilutionOfPrecision::from_design(t, &best.design, position_m);
        let degradation = Degradation::new(&self.cfg, &best);

        // constellations that were entirely rejected keep their a-priori clock
        if self.cfg.memory {
            if let Some(memory) = &mut self.memory {
                memory.update(
                    self.cfg.memory_update,
                    &best.constellations,
                    &best.state,
                    &best.covariance,
                    best.prefit_residuals.as_ref(),
                );
            }
        }

        let solution = EpochSolution::new(t, best, &full_set, dop, degradation);

        info!(
            "{}: {} - rms={:.3}m slope={:.1} rejected={:?}",
            t,
            solution.status,
            solution.rms_m,
            solution.max_slope,
            solution.rejected()
        );

        Ok(solution)
    }

    /// [Self::resolve] without measurement weighting.
    pub fn resolve_unweighted(
        &mut self,
        t: Epoch,
        satellites: &[Satellite],
        pseudo_ranges_m: &[f64],
        ephemeris: &dyn EphemerisSource,
        tropo: &dyn TroposphereBias,
    ) -> Result<EpochSolution, Error> {
        self.resolve(t, satellites, pseudo_ranges_m, None, ephemeris, tropo)
    }

    /// Rejection stages: all combinations of `stage` satellites
    /// among the `usable` rows are rejected in turn.
    /// Returns the lowest RMS solution, and the least severe failure seen.
    fn search(
        &self,
        geometry: &Geometry,
        usable: &[usize],
        inv_cov: Option<&DMatrix<f64>>,
        tropo: &dyn TroposphereBias,
    ) -> Result<(Option<LeastSquares>, Option<Status>), Error> {
        let t = geometry.t;
        let rms_limit = self.cfg.rms_limit;

        let mut best: Option<LeastSquares> = None;
        let mut failure: Option<Status> = None;
        let mut stage = 0;

        loop {
            let mut exhausted = false;

            for combination in (0..usable.len()).combinations(stage) {
                let mut marks = geometry.satellites.clone();
                for index in combination.iter() {
                    marks[usable[*index]].status = SatelliteStatus::ExcludedRaim;
                }

                debug!(
                    "{}: raim stage #{} - {}",
                    t,
                    stage,
                    marks.iter().map(|sat| sat.to_string()).join(" ")
                );

                match self.solve(geometry, &marks, inv_cov, tropo) {
                    Ok(ls) => {
                        debug!(
                            "{}: raim stage #{} - rms={:.3}m slope={:.1} iter={}",
                            t, stage, ls.rms_m, ls.max_slope, ls.iterations
                        );

                        let rms_m = ls.rms_m;

                        if best.as_ref().map_or(true, |best| rms_m < best.rms_m) {
                            best = Some(ls);
                        }

                        if stage == 0 && rms_m < rms_limit {
                            break;
                        }
                    },
                    Err(e) => {
                        let status = Status::from(&e);
                        if failure.map_or(true, |f| status.code() > f.code()) {
                            failure = Some(status);
                        }

                        if e.is_recoverable() {
                            debug!("{}: raim stage #{} - {}", t, stage, e);
                        } else if let Error::NotEnoughSatellites { .. } = e {
                            debug!("{}: raim stage #{} - {}", t, stage, e);
                            exhausted = true;
                            break;
                        } else {
                            return Err(e);
                        }
                    },
                }
            }

            if let Some(best) = &best {
                if best.rms_m < rms_limit {
                    debug!("{}: raim success at stage #{}", t, stage);
                    break;
                }
            }

            stage += 1;

            if let Some(max) = self.cfg.max_rejected {
                if stage > max {
                    debug!("{}: raim - rejection limit reached", t);
                    break;
                }
            }

            if exhausted || stage > usable.len() {
                debug!("{}: raim - too few satellites for stage #{}", t, stage);
                break;
            }
        }

        Ok((best, failure))
    }
}
