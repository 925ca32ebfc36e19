//! Satellite marking
use crate::prelude::{Constellation, SV};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Contribution status of one satellite to a solution attempt.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SatelliteStatus {
    /// Contributes to the solution
    #[default]
    Included,
    /// Marked by the caller prior processing
    ExcludedUser,
    /// Constellation is not part of the allowed constellations
    ExcludedConstellation,
    /// No valid (or healthy) ephemeris at transmission time
    ExcludedNoEphemeris,
    /// Rejected by the fault detection and exclusion process
    ExcludedRaim,
}

impl std::fmt::Display for SatelliteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Included => write!(f, "included"),
            Self::ExcludedUser => write!(f, "excluded (user)"),
            Self::ExcludedConstellation => write!(f, "excluded (constellation)"),
            Self::ExcludedNoEphemeris => write!(f, "excluded (no ephemeris)"),
            Self::ExcludedRaim => write!(f, "excluded (raim)"),
        }
    }
}

/// [SV] and its [SatelliteStatus].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Satellite {
    /// [SV] identity
    pub sv: SV,
    /// Current [SatelliteStatus]
    pub status: SatelliteStatus,
}

impl From<SV> for Satellite {
    fn from(sv: SV) -> Self {
        Self::new(sv)
    }
}

impl std::fmt::Display for Satellite {
    /// Excluded satellites are prefixed with '-'
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_included() {
            write!(f, "{}", self.sv)
        } else {
            write!(f, "-{}", self.sv)
        }
    }
}

impl Satellite {
    /// Builds a new [Satellite] that will be considered by the solver.
    pub fn new(sv: SV) -> Self {
        Self {
            sv,
            status: SatelliteStatus::Included,
        }
    }

    /// Builds a new [Satellite] that the solver should ignore.
    pub fn excluded(sv: SV) -> Self {
        Self {
            sv,
            status: SatelliteStatus::ExcludedUser,
        }
    }

    /// Returns a copy of Self with updated [SatelliteStatus]
    pub fn with_status(&self, status: SatelliteStatus) -> Self {
        let mut s = *self;
        s.status = status;
        s
    }

    pub fn is_included(&self) -> bool {
        self.status == SatelliteStatus::Included
    }

    pub fn constellation(&self) -> Constellation {
        self.sv.constellation
    }
}

/// Distinct [Constellation]s of included [Satellite]s, sorted as in `allowed`.
/// Constellations that are not allowed never show up.
pub(crate) fn constellations(
    satellites: &[Satellite],
    allowed: &[Constellation],
) -> Vec<Constellation> {
    allowed
        .iter()
        .filter(|c| {
            satellites
                .iter()
                .any(|sat| sat.is_included() && sat.constellation() == **c)
        })
        .copied()
        .collect()
}
