//! Epoch solution
use crate::{
    constants::SPEED_OF_LIGHT_M_S,
    navigation::{DilutionOfPrecision, LeastSquares},
    prelude::{Constellation, DMatrix, DVector, Duration, Epoch, Error, TimeScale, Vector3, SV},
    satellite::{Satellite, SatelliteStatus},
};

pub(crate) mod validator;
pub use validator::Degradation;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of one epoch resolution, with stable numerical codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Status {
    /// Solution is valid but one of the [Degradation] criteria was met
    Degraded,
    /// Solution is valid
    Ok,
    /// Solver failed to converge, or diverged
    NotConverged,
    /// Normal equations were singular
    Singular,
    /// Not enough satellites to attempt a solution
    NotEnoughSatellites,
    /// Not a single satellite with ephemeris
    NoEphemeris,
}

impl Status {
    /// Numerical code: 1 (degraded), 0 (ok) or negative on failure.
    pub fn code(&self) -> i8 {
        match self {
            Self::Degraded => 1,
            Self::Ok => 0,
            Self::NotConverged => -1,
            Self::Singular => -2,
            Self::NotEnoughSatellites => -3,
            Self::NoEphemeris => -4,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Degraded | Self::Ok)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Degraded => write!(f, "ok but perhaps degraded"),
            Self::Ok => write!(f, "ok"),
            Self::NotConverged => write!(f, "failed to converge"),
            Self::Singular => write!(f, "singular solution"),
            Self::NotEnoughSatellites => write!(f, "not enough satellites"),
            Self::NoEphemeris => write!(f, "not any ephemeris"),
        }
    }
}

impl From<&Error> for Status {
    fn from(e: &Error) -> Self {
        match e {
            Error::NotConverged(_) | Error::Diverged(_) => Self::NotConverged,
            Error::SingularMatrix | Error::MatrixInversion => Self::Singular,
            Error::NoEphemeris => Self::NoEphemeris,
            Error::NotEnoughSatellites { .. }
            | Error::NoAllowedConstellation
            | Error::DimensionMismatch(_) => Self::NotEnoughSatellites,
        }
    }
}

/// [EpochSolution] is the result of one epoch resolution.
/// The solution vector is laid out as x, y, z (m) then one clock
/// offset (m) per [Constellation], in the order of `constellations`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EpochSolution {
    /// Reception [Epoch]
    pub t: Epoch,
    /// Resolution [Status]
    pub status: Status,
    /// True when a solution was retained
    pub valid: bool,
    /// Solution vector
    pub state: DVector<f64>,
    /// Solution covariance
    pub covariance: DMatrix<f64>,
    /// Design matrix, one row per included satellite
    pub design: DMatrix<f64>,
    /// Inverse measurement covariance that was used
    pub weight: DMatrix<f64>,
    /// Clock terms layout
    pub constellations: Vec<Constellation>,
    /// Every proposed [Satellite] and its final status
    pub satellites: Vec<Satellite>,
    /// Residuals (m), one per included satellite
    pub residuals: DVector<f64>,
    /// RAIM slopes, one per included satellite
    pub slopes: DVector<f64>,
    /// RMS residual (m)
    pub rms_m: f64,
    /// Largest RAIM slope
    pub max_slope: f64,
    /// [DilutionOfPrecision]
    pub dop: DilutionOfPrecision,
    /// Number of iterations of the retained solution
    pub iterations: usize,
    /// Convergence metric (m) of the retained solution
    pub convergence_m: f64,
    /// [Degradation] criteria
    pub degradation: Degradation,
    /// Pre-fit residuals (m), when seeded from an a-priori state
    pub prefit_residuals: Option<DVector<f64>>,
}

impl EpochSolution {
    /// Failed resolution: no state.
    pub(crate) fn failure(t: Epoch, status: Status, satellites: Vec<Satellite>) -> Self {
        Self {
            t,
            status,
            satellites,
            valid: false,
            state: DVector::zeros(3),
            covariance: DMatrix::zeros(3, 3),
            design: DMatrix::zeros(0, 3),
            weight: DMatrix::zeros(0, 0),
            constellations: Vec::new(),
            residuals: DVector::zeros(0),
            slopes: DVector::zeros(0),
            rms_m: 0.0,
            max_slope: 0.0,
            dop: DilutionOfPrecision::default(),
            iterations: 0,
            convergence_m: 0.0,
            degradation: Degradation::default(),
            prefit_residuals: None,
        }
    }

    /// Retained solution, re-expanded with null clock terms to `constellations`.
    pub(crate) fn new(
        t: Epoch,
        ls: LeastSquares,
        constellations: &[Constellation],
        dop: DilutionOfPrecision,
        degradation: Degradation,
    ) -> Self {
        let dim = 3 + constellations.len();

        // solution index, per expanded index
        let indexes = (0..3)
            .map(Some)
            .chain(constellations.iter().map(|c| {
                ls.constellations
                    .iter()
                    .position(|k| k == c)
                    .map(|j| 3 + j)
            }))
            .collect::<Vec<_>>();

        let state = DVector::from_fn(dim, |i, _| indexes[i].map(|k| ls.state[k]).unwrap_or(0.0));

        let covariance = DMatrix::from_fn(dim, dim, |i, j| match (indexes[i], indexes[j]) {
            (Some(a), Some(b)) => ls.covariance[(a, b)],
            _ => 0.0,
        });

        let design = DMatrix::from_fn(ls.design.nrows(), dim, |r, i| {
            indexes[i].map(|k| ls.design[(r, k)]).unwrap_or(0.0)
        });

        let status = if degradation.is_degraded() {
            Status::Degraded
        } else {
            Status::Ok
        };

        Self {
            t,
            status,
            state,
            covariance,
            design,
            dop,
            degradation,
            valid: true,
            weight: ls.weight,
            constellations: constellations.to_vec(),
            satellites: ls.satellites,
            residuals: ls.residuals,
            slopes: ls.slopes,
            rms_m: ls.rms_m,
            max_slope: ls.max_slope,
            iterations: ls.iterations,
            convergence_m: ls.convergence_m,
            prefit_residuals: ls.prefit_residuals,
        }
    }

    /// ECEF position (m)
    pub fn position_ecef_m(&self) -> Vector3<f64> {
        Vector3::new(self.state[0], self.state[1], self.state[2])
    }

    /// Receiver clock offset (m) to this [Constellation], if solved:
    /// at least one satellite of this [Constellation] contributed.
    /// Clock terms of rejected constellations are null in [Self::state].
    pub fn clock_offset_m(&self, constellation: Constellation) -> Option<f64> {
        let index = self
            .constellations
            .iter()
            .position(|c| *c == constellation)?;

        let solved = self
            .satellites
            .iter()
            .any(|sat| sat.is_included() && sat.constellation() == constellation);

        if solved {
            Some(self.state[3 + index])
        } else {
            None
        }
    }

    /// Receiver clock offset to this [Constellation] as [Duration], if solved.
    pub fn clock_offset(&self, constellation: Constellation) -> Option<Duration> {
        let offset_m = self.clock_offset_m(constellation)?;
        Some(Duration::from_seconds(offset_m / SPEED_OF_LIGHT_M_S))
    }

    /// [SV]s that contributed
    pub fn included(&self) -> Vec<SV> {
        self.satellites
            .iter()
            .filter_map(|sat| if sat.is_included() { Some(sat.sv) } else { None })
            .collect()
    }

    /// [SV]s rejected by the fault detection and exclusion process
    pub fn rejected(&self) -> Vec<SV> {
        self.satellites
            .iter()
            .filter_map(|sat| {
                if sat.status == SatelliteStatus::ExcludedRaim {
                    Some(sat.sv)
                } else {
                    None
                }
            })
            .collect()
    }

    /// GPS week and second of week
    fn gps_time(&self) -> String {
        let (week, nanos) = self.t.to_time_scale(TimeScale::GPST).to_time_of_week();
        format!("{:4} {:10.3}", week, nanos as f64 * 1.0E-9)
    }

    fn time_width(&self) -> usize {
        self.gps_time().len()
    }

    /// Status and validity suffix, shared by all records
    fn validity(&self) -> String {
        let mut s = format!(" ({} {}", self.status.code(), self.status);
        if self.status == Status::Degraded {
            s.push_str(&format!(" due to{}", self.degradation));
        }
        s.push_str(&format!(") {}V", if self.valid { "" } else { "N" }));
        s
    }

    fn clocks(&self) -> String {
        self.constellations
            .iter()
            .enumerate()
            .map(|(i, c)| format!(" {} {:11.3}", c, self.state[3 + i]))
            .collect()
    }

    pub fn pos_header(&self, tag: &str) -> String {
        format!(
            "#{} POS {:>width$} {:>16} {:>16} {:>16} (ret code) Valid/Not",
            tag,
            "time",
            "Sol-X(m)",
            "Sol-Y(m)",
            "Sol-Z(m)",
            width = self.time_width().saturating_sub(3)
        )
    }

    /// tag POS week sow x y z (status) [N]V
    pub fn pos_record(&self, tag: &str) -> String {
        format!(
            "{} POS {} {:16.6} {:16.6} {:16.6}{}",
            tag,
            self.gps_time(),
            self.state[0],
            self.state[1],
            self.state[2],
            self.validity()
        )
    }

    pub fn nav_header(&self, tag: &str) -> String {
        format!(
            "#{} NAV {:>width$} {:>18} {:>18} {:>18} {:>18} [sys clock ...]   Valid/Not",
            tag,
            "time",
            "Sol/Resid:X(m)",
            "Sol/Resid:Y(m)",
            "Sol/Resid:Z(m)",
            "sys clock",
            width = self.time_width()
        )
    }

    /// tag NAV week sow x y z sys clk [sys clk...] (status) [N]V
    pub fn nav_record(&self, tag: &str) -> String {
        format!(
            "{} NAV {} {:16.6} {:16.6} {:16.6}{}{}",
            tag,
            self.gps_time(),
            self.state[0],
            self.state[1],
            self.state[2],
            self.clocks(),
            self.validity()
        )
    }

    pub fn clk_header(&self, tag: &str) -> String {
        format!(
            "#{} CLK {:>width$} sys {:>11} ...",
            tag,
            "time",
            "clock",
            width = self.time_width().saturating_sub(3)
        )
    }

    /// tag CLK week sow sys clk [sys clk...] (status) [N]V
    pub fn clk_record(&self, tag: &str) -> String {
        format!(
            "{} CLK {}{}{}",
            tag,
            self.gps_time(),
            self.clocks(),
            self.validity()
        )
    }

    pub fn rms_header(&self, tag: &str) -> String {
        format!(
            "#{} RMS {:>width$} {:>2} {:>8} {:>7} {:>7} {:>7} {:>5} {:>2} {:>8} sats(-rej)... (ret code) Valid/Not",
            tag,
            "time",
            "Ngood",
            "resid",
            "TDOP",
            "PDOP",
            "GDOP",
            "Slope",
            "nit",
            "converge",
            width = self.time_width().saturating_sub(3)
        )
    }

    /// tag RMS week sow ngood rms tdop pdop gdop slope nit conv sats... (status) [N]V
    pub fn rms_record(&self, tag: &str) -> String {
        let satellites = self
            .satellites
            .iter()
            .map(|sat| format!(" {}", sat))
            .collect::<String>();

        format!(
            "{} RMS {} {:2} {:8.3} {:7.2} {:7.2} {:7.2} {:5.1} {:2} {:8.2E}{}{}",
            tag,
            self.gps_time(),
            self.included().len(),
            self.rms_m,
            self.dop.tdop,
            self.dop.pdop,
            self.dop.gdop,
            self.max_slope,
            self.iterations,
            self.convergence_m,
            satellites,
            self.validity()
        )
    }

    /// NAV and RMS records
    pub fn records(&self, tag: &str) -> String {
        format!("{}\n{}", self.nav_record(tag), self.rms_record(tag))
    }
}

#[cfg(test)]
mod test {
    use super::Status;
    use crate::prelude::Error;

    #[test]
    fn status_codes() {
        for (status, code, valid) in [
            (Status::Degraded, 1, true),
            (Status::Ok, 0, true),
            (Status::NotConverged, -1, false),
            (Status::Singular, -2, false),
            (Status::NotEnoughSatellites, -3, false),
            (Status::NoEphemeris, -4, false),
        ] {
            assert_eq!(status.code(), code);
            assert_eq!(status.is_valid(), valid);
        }

        assert_eq!(Status::from(&Error::Diverged(1.0E11)), Status::NotConverged);
        assert_eq!(Status::from(&Error::SingularMatrix), Status::Singular);
        assert_eq!(Status::Degraded.to_string(), "ok but perhaps degraded");
        assert_eq!(Status::NoEphemeris.to_string(), "not any ephemeris");
    }
}
