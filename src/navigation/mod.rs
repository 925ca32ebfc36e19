//! Weighted least squares
use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Vector3};

mod apriori;
mod dop;

pub use apriori::AprioriMemory;
pub use dop::DilutionOfPrecision;

use crate::{
    bias::{BiasRuntime, TroposphereBias},
    cfg::Config,
    constants::{
        DIVERGENCE_LIMIT_M, EARTH_ANGULAR_VEL_RAD, INITIAL_TRANSIT_TIME_S, MIN_TROPO_HEIGHT_M,
        SINGULAR_VALUE_TOLERANCE, SLOPE_PROJECTION_TOLERANCE, SPEED_OF_LIGHT_M_S,
    },
    geometry::Geometry,
    prelude::{Constellation, Error},
    satellite::{constellations, Satellite, SatelliteStatus},
};

/// Outcome of one converged least squares solve.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquares {
    /// x, y, z (m) then one clock offset (m) per constellation
    pub state: DVector<f64>,
    /// (HᵀWH)⁻¹
    pub covariance: DMatrix<f64>,
    /// Design matrix H, one row per included satellite
    pub design: DMatrix<f64>,
    /// Inverse measurement covariance W that was used
    pub weight: DMatrix<f64>,
    /// Constellations, in the order of the clock terms
    pub constellations: Vec<Constellation>,
    /// All satellites and how they were used
    pub satellites: Vec<Satellite>,
    /// Residuals (m) of the last iteration, one per included satellite
    pub residuals: DVector<f64>,
    /// RAIM slopes, one per included satellite
    pub slopes: DVector<f64>,
    /// Largest slope
    pub max_slope: f64,
    /// RMS of residuals (m)
    pub rms_m: f64,
    /// Number of iterations
    pub iterations: usize,
    /// Norm of the last update step (m)
    pub convergence_m: f64,
    /// Troposphere correction could not be applied
    /// to at least one satellite
    pub tropo_not_applied: bool,
    /// H·(x - x_apriori) - r, when seeded from an a-priori state
    pub prefit_residuals: Option<DVector<f64>>,
}

impl LeastSquares {
    /// Number of satellites that contributed
    pub fn included(&self) -> usize {
        self.residuals.len()
    }
}

/// Inverts a symmetric matrix through its SVD.
/// Rank deficient matrices are rejected.
pub(crate) fn svd_inverse(m: DMatrix<f64>) -> Result<DMatrix<f64>, Error> {
    let svd = m.svd(true, true);

    let max = svd.singular_values.max();
    let min = svd.singular_values.min();

    if !(max > 0.0 && min > max * SINGULAR_VALUE_TOLERANCE) {
        debug!("singular values: min={:.3E} max={:.3E}", min, max);
        return Err(Error::SingularMatrix);
    }

    svd.pseudo_inverse(max * SINGULAR_VALUE_TOLERANCE)
        .map_err(|_| Error::SingularMatrix)
}

/// Satellite position compensated for Earth rotation during `transit_s`.
fn earth_rotation(sv_m: Vector3<f64>, transit_s: f64) -> Vector3<f64> {
    let (sin, cos) = (EARTH_ANGULAR_VEL_RAD * transit_s).sin_cos();
    Vector3::new(
        cos * sv_m[0] + sin * sv_m[1],
        -sin * sv_m[0] + cos * sv_m[1],
        sv_m[2],
    )
}

/// Troposphere delay (m), None when it cannot be modeled.
fn troposphere(tropo: &dyn TroposphereBias, rtm: &BiasRuntime) -> Option<f64> {
    let (h, elev) = (rtm.height_m(), rtm.elevation_deg);

    if !h.is_finite() || !elev.is_finite() {
        return None;
    }
    if elev < 0.0 || h < MIN_TROPO_HEIGHT_M {
        return None;
    }
    if let Some(limit) = tropo.height_limit_m() {
        if h > limit {
            return None;
        }
    }

    let delay = tropo.troposphere_bias_m(rtm);
    if delay.is_finite() {
        Some(delay)
    } else {
        None
    }
}

/// Iterative, linearized, (weighted) least squares solution, using the
/// satellites marked as included only.
///
/// ## Input
/// - cfg: [Config] preset
/// - geometry: prepared [Geometry]
/// - marks: one [Satellite] per [Geometry] row
/// - inv_cov: inverse measurement covariance, covering all rows.
///   Identity when not provided.
/// - tropo: [TroposphereBias] model
/// - apriori: a-priori state, laid out on the allowed constellations
///   (see [AprioriMemory]).
pub(crate) fn least_squares(
    cfg: &Config,
    geometry: &Geometry,
    marks: &[Satellite],
    inv_cov: Option<&DMatrix<f64>>,
    tropo: &dyn TroposphereBias,
    apriori: Option<&AprioriMemory>,
) -> Result<LeastSquares, Error> {
    cfg.validate()?;

    let rows = geometry.len();
    if marks.len() != rows {
        return Err(Error::DimensionMismatch("marks and geometry"));
    }

    if let Some(inv_cov) = inv_cov {
        if inv_cov.nrows() != rows || inv_cov.ncols() != rows {
            return Err(Error::DimensionMismatch("measurement covariance"));
        }
    }

    // rows that geometry invalidated, or not allowed, cannot contribute
    let satellites = marks
        .iter()
        .zip(geometry.satellites.iter())
        .map(|(mark, prepared)| {
            if !mark.is_included() {
                *mark
            } else if !prepared.is_included() {
                mark.with_status(prepared.status)
            } else if !cfg.allowed_constellations.contains(&mark.constellation()) {
                mark.with_status(SatelliteStatus::ExcludedConstellation)
            } else {
                *mark
            }
        })
        .collect::<Vec<_>>();

    let set = constellations(&satellites, &cfg.allowed_constellations);

    let included = satellites
        .iter()
        .enumerate()
        .filter_map(|(i, sat)| if sat.is_included() { Some(i) } else { None })
        .collect::<Vec<_>>();

    let (n, dim) = (included.len(), 3 + set.len());

    if n < dim {
        debug!("{}: {} satellites for {} unknowns", geometry.t, n, dim);
        return Err(Error::NotEnoughSatellites {
            available: n,
            required: dim,
        });
    }

    let w = match inv_cov {
        Some(inv_cov) => DMatrix::from_fn(n, n, |i, j| inv_cov[(included[i], included[j])]),
        None => DMatrix::identity(n, n),
    };

    let seed = apriori.map(|memory| memory.seed(&set));

    let mut x = match &seed {
        Some(seed) => seed.clone(),
        None => DVector::zeros(dim),
    };

    // clock term index, per included satellite
    let clock_index = included
        .iter()
        .map(|i| {
            let constellation = satellites[*i].constellation();
            set.iter()
                .position(|c| *c == constellation)
                .map(|j| 3 + j)
                .ok_or(Error::DimensionMismatch("constellation set"))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let iteration_limit = cfg.iteration_limit();

    let mut iteration = 0;
    let mut h = DMatrix::<f64>::zeros(n, dim);
    let mut r = DVector::<f64>::zeros(n);
    let mut g;
    let mut covariance;
    let mut convergence;
    let mut tropo_not_applied;

    loop {
        iteration += 1;
        tropo_not_applied = false;

        let rx = Vector3::new(x[0], x[1], x[2]);

        for (j, i) in included.iter().enumerate() {
            let sv = geometry.position_m(*i);

            let transit_s = if iteration == 1 {
                INITIAL_TRANSIT_TIME_S
            } else {
                (sv - rx).norm() / SPEED_OF_LIGHT_M_S
            };

            let sv = if cfg.earth_rotation {
                earth_rotation(sv, transit_s)
            } else {
                sv
            };

            let rho = (sv - rx).norm();
            let dir = (rx - sv) / rho;

            let trop = if iteration > 1 {
                let rtm = BiasRuntime::new(geometry.t, rx, sv);
                match troposphere(tropo, &rtm) {
                    Some(delay) => {
                        debug!(
                            "{} ({}) - elev={:.3}° tropo={:.3}m",
                            geometry.t, satellites[*i].sv, rtm.elevation_deg, delay
                        );
                        delay
                    },
                    None => {
                        debug!(
                            "{} ({}) - tropo not applied (h={:.3}m elev={:.3}°)",
                            geometry.t,
                            satellites[*i].sv,
                            rtm.height_m(),
                            rtm.elevation_deg
                        );
                        tropo_not_applied = true;
                        0.0
                    },
                }
            } else {
                0.0
            };

            let clk = clock_index[j];

            r[j] = geometry.corrected_range_m(*i) - rho - trop - x[clk];

            h.row_mut(j).fill(0.0);
            h[(j, 0)] = dir[0];
            h[(j, 1)] = dir[1];
            h[(j, 2)] = dir[2];
            h[(j, clk)] = 1.0;
        }

        let ht = h.transpose();
        let ht_w = &ht * &w;

        covariance = svd_inverse(&ht_w * &h)?;
        g = &covariance * &ht_w;

        let dx = &g * &r;
        x += &dx;

        convergence = dx.norm();

        debug!(
            "{}: iteration #{} |dx|={:.3E}m",
            geometry.t, iteration, convergence
        );

        if iteration > 1 && convergence < cfg.convergence_limit {
            break;
        }
        if convergence > DIVERGENCE_LIMIT_M {
            return Err(Error::Diverged(convergence));
        }
        if iteration >= iteration_limit {
            return Err(Error::NotConverged(iteration));
        }
    }

    if tropo_not_applied {
        warn!("{}: troposphere correction not applied", geometry.t);
    }

    let pg = &h * &g;

    let mut slopes = DVector::<f64>::zeros(n);
    let mut max_slope = 0.0_f64;

    for j in 0..n {
        let one_minus_pg = 1.0 - pg[(j, j)];
        if one_minus_pg.abs() < SLOPE_PROJECTION_TOLERANCE {
            continue;
        }
        let sum = (0..dim).map(|k| g[(k, j)].powi(2)).sum::<f64>();
        slopes[j] = (sum * (n - dim) as f64 / one_minus_pg).sqrt();
        if slopes[j] > max_slope {
            max_slope = slopes[j];
        }
    }

    let prefit_residuals = seed.map(|seed| &h * (&x - seed) - &r);

    let rms_m = (r.norm_squared() / n as f64).sqrt();

    Ok(LeastSquares {
        state: x,
        covariance,
        design: h,
        weight: w,
        constellations: set,
        satellites,
        residuals: r,
        slopes,
        max_slope,
        rms_m,
        iterations: iteration,
        convergence_m: convergence,
        tropo_not_applied,
        prefit_residuals,
    })
}

#[cfg(test)]
mod test {
    use super::{earth_rotation, svd_inverse};
    use crate::prelude::{DMatrix, Error, Vector3};

    #[test]
    fn singular_inversion() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert_eq!(svd_inverse(m), Err(Error::SingularMatrix));

        let m = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let inv = svd_inverse(m).unwrap();
        assert!((inv[(0, 0)] - 0.5).abs() < 1.0E-12);
        assert!((inv[(1, 1)] - 0.25).abs() < 1.0E-12);
        assert!(inv[(0, 1)].abs() < 1.0E-12);
    }

    #[test]
    fn rotation_preserves_norm() {
        let sv = Vector3::new(15600.0E3, 7540.0E3, 20140.0E3);
        let rotated = earth_rotation(sv, 0.070);
        assert!((rotated.norm() - sv.norm()).abs() < 1.0E-6);
        assert_eq!(rotated[2], sv[2]);
        assert!((rotated - sv).norm() > 1.0);
    }
}
