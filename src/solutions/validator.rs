use log::warn;

use crate::{cfg::Config, navigation::LeastSquares};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reasons why a valid solution is graded as degraded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Degradation {
    /// RAIM slope limit exceeded
    pub slope: bool,
    /// RMS residual limit exceeded
    pub rms: bool,
    /// Troposphere correction could not be applied
    pub tropo: bool,
}

impl Degradation {
    /// Grades the retained [LeastSquares] solution.
    pub(crate) fn new(cfg: &Config, ls: &LeastSquares) -> Self {
        let included = ls.included();

        let slope = ls.max_slope > cfg.slope_limit
            || (ls.max_slope > cfg.slope_limit / 2.0 && included == 5);

        let rms = ls.rms_m >= cfg.rms_limit;

        let s = Self {
            slope,
            rms,
            tropo: ls.tropo_not_applied,
        };

        if s.is_degraded() {
            warn!(
                "degraded solution: rms={:.3}m slope={:.1} ({})",
                ls.rms_m, ls.max_slope, s
            );
        }

        s
    }

    pub fn is_degraded(&self) -> bool {
        self.slope || self.rms || self.tropo
    }
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.rms {
            write!(f, " large RMS residual")?;
        }
        if self.slope {
            write!(f, " large slope")?;
        }
        if self.tropo {
            write!(f, " missed trop. corr.")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::Degradation;

    #[test]
    fn display() {
        let degradation = Degradation {
            slope: true,
            rms: true,
            tropo: false,
        };
        assert!(degradation.is_degraded());
        assert_eq!(degradation.to_string(), " large RMS residual large slope");
        assert!(!Degradation::default().is_degraded());
    }
}
