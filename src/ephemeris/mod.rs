use crate::prelude::{Epoch, Vector3, SV};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Health criteria attached to an ephemeris request
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HealthFilter {
    /// Only data flagged healthy
    #[default]
    Healthy,
    /// Only data flagged unhealthy
    Unhealthy,
    /// Health status is disregarded
    Any,
}

/// Validity criteria attached to an ephemeris request
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValidityFilter {
    /// Only data that passed validity checks
    #[default]
    ValidOnly,
    /// Only data that failed validity checks
    InvalidOnly,
    /// Validity is disregarded
    Any,
}

/// Strategy to select one ephemeris frame among several candidates
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SearchOrder {
    /// Most recent frame transmitted prior the requested [Epoch]
    #[default]
    User,
    /// Frame whose reference time is the closest to the requested [Epoch]
    Nearest,
}

/// Satellite state at transmission time.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteState {
    /// ECEF position in meters
    pub position_m: Vector3<f64>,
    /// ECEF velocity in m.s⁻¹
    pub velocity_m_s: Vector3<f64>,
    /// Onboard clock offset to system time, in seconds
    pub clock_bias_s: f64,
    /// Relativistic clock correction, in seconds
    pub relativistic_correction_s: f64,
}

impl SatelliteState {
    /// Builds a [SatelliteState] from ECEF position (m) and clock bias (s),
    /// without velocity nor relativistic correction.
    pub fn from_position(position_m: Vector3<f64>, clock_bias_s: f64) -> Self {
        Self {
            position_m,
            clock_bias_s,
            ..Default::default()
        }
    }

    /// Copies and returns Self with updated relativistic correction (s).
    pub fn with_relativistic_correction(&self, correction_s: f64) -> Self {
        let mut s = *self;
        s.relativistic_correction_s = correction_s;
        s
    }

    /// Total clock correction (s) applied to the pseudo range.
    pub(crate) fn total_clock_correction_s(&self) -> f64 {
        self.clock_bias_s + self.relativistic_correction_s
    }
}

/// Any ephemeris provider should implement the [EphemerisSource] trait
/// to contribute to the solving process.
pub trait EphemerisSource {
    /// Provide the [SatelliteState] at requested transmission [Epoch].
    ///
    /// Return None when no frame matches the [HealthFilter] and
    /// [ValidityFilter] criteria: the [SV] is then excluded
    /// for the ongoing epoch only.
    ///
    /// The solver is synchronous and may query the same [SV] twice per epoch
    /// (to refine the transmission time). This should not modify any state
    /// that the solver relies on.
    fn evaluate(
        &self,
        sv: SV,
        t: Epoch,
        health: HealthFilter,
        validity: ValidityFilter,
        order: SearchOrder,
    ) -> Option<SatelliteState>;
}
