#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    ephemeris::SearchOrder,
    prelude::{Constellation, Error},
};

/// How the a-priori memory absorbs a new solution
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MemoryUpdate {
    /// Latest solution replaces the a-priori state.
    #[default]
    Replace,
    /// a-priori = alpha * latest + (1 - alpha) * a-priori,
    /// alpha being in ]0, 1].
    Exponential(f64),
}

fn default_constellations() -> Vec<Constellation> {
    vec![Constellation::GPS]
}

fn default_max_iterations() -> usize {
    10
}

fn default_convergence_limit() -> f64 {
    3.0E-7
}

fn default_rms_limit() -> f64 {
    6.5
}

fn default_slope_limit() -> f64 {
    1000.0
}

fn default_max_rejected() -> Option<usize> {
    None
}

fn default_memory() -> bool {
    false
}

fn default_earth_rotation() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Constellations allowed to contribute. Defines the order of the
    /// clock terms in every solution vector. Must not be empty.
    #[cfg_attr(feature = "serde", serde(default = "default_constellations"))]
    pub allowed_constellations: Vec<Constellation>,
    /// Maximal number of iterations of the least squares solver.
    /// The solver always iterates at least twice.
    #[cfg_attr(feature = "serde", serde(default = "default_max_iterations"))]
    pub max_iterations: usize,
    /// Convergence criteria on the update step norm [m].
    #[cfg_attr(feature = "serde", serde(default = "default_convergence_limit"))]
    pub convergence_limit: f64,
    /// RMS residual [m] under which a solution is accepted.
    #[cfg_attr(feature = "serde", serde(default = "default_rms_limit"))]
    pub rms_limit: f64,
    /// RAIM slope limit [m].
    #[cfg_attr(feature = "serde", serde(default = "default_slope_limit"))]
    pub slope_limit: f64,
    /// Maximal number of satellites the RAIM process may reject.
    /// None means unbounded. Keep this small (2 or 3):
    /// the search cost grows combinatorially.
    #[cfg_attr(feature = "serde", serde(default = "default_max_rejected"))]
    pub max_rejected: Option<usize>,
    /// Store solutions in the a-priori memory and use them
    /// to initialize the next epoch.
    #[cfg_attr(feature = "serde", serde(default = "default_memory"))]
    pub memory: bool,
    /// [MemoryUpdate] policy, only meaningful when `memory` is turned on.
    #[cfg_attr(feature = "serde", serde(default))]
    pub memory_update: MemoryUpdate,
    /// Compensate for Earth rotation during signal propagation.
    #[cfg_attr(feature = "serde", serde(default = "default_earth_rotation"))]
    pub earth_rotation: bool,
    /// Ephemeris [SearchOrder] forwarded to the ephemeris source.
    #[cfg_attr(feature = "serde", serde(default))]
    pub search_order: SearchOrder,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_constellations: default_constellations(),
            max_iterations: default_max_iterations(),
            convergence_limit: default_convergence_limit(),
            rms_limit: default_rms_limit(),
            slope_limit: default_slope_limit(),
            max_rejected: default_max_rejected(),
            memory: default_memory(),
            memory_update: MemoryUpdate::default(),
            earth_rotation: default_earth_rotation(),
            search_order: SearchOrder::default(),
        }
    }
}

impl Config {
    /// Returns a copy of Self with updated allowed [Constellation]s.
    pub fn with_constellations(&self, allowed: &[Constellation]) -> Self {
        let mut s = self.clone();
        s.allowed_constellations = allowed.to_vec();
        s
    }

    /// Returns a copy of Self with updated RAIM rejection bound.
    pub fn with_max_rejected(&self, max_rejected: Option<usize>) -> Self {
        let mut s = self.clone();
        s.max_rejected = max_rejected;
        s
    }

    /// Returns a copy of Self with a-priori memory enabled or disabled.
    pub fn with_memory(&self, memory: bool, update: MemoryUpdate) -> Self {
        let mut s = self.clone();
        s.memory = memory;
        s.memory_update = update;
        s
    }

    /// Returns a copy of Self with Earth rotation compensation turned on or off.
    pub fn with_earth_rotation(&self, earth_rotation: bool) -> Self {
        let mut s = self.clone();
        s.earth_rotation = earth_rotation;
        s
    }

    /// Verifies Self is usable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.allowed_constellations.is_empty() {
            return Err(Error::NoAllowedConstellation);
        }
        Ok(())
    }

    /// Iteration limit actually applied.
    pub(crate) fn iteration_limit(&self) -> usize {
        self.max_iterations.max(2)
    }

    /// Multi line description of Self, first line being `tag`.
    pub fn summary(&self, tag: &str) -> String {
        let constellations = self
            .allowed_constellations
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let max_rejected = match self.max_rejected {
            Some(max) => max.to_string(),
            None => "unbounded".to_string(),
        };

        let mut s = String::from(tag);
        s.push_str(&format!("\n   constellations {}", constellations));
        s.push_str(&format!("\n   iterations {}", self.max_iterations));
        s.push_str(&format!("\n   convergence {:.2E}", self.convergence_limit));
        s.push_str(&format!("\n   RMS residual limit {:.3}", self.rms_limit));
        s.push_str(&format!("\n   RAIM slope limit {:.3} meters", self.slope_limit));
        s.push_str(&format!(
            "\n   Maximum number of satellites to reject is {}",
            max_rejected
        ));
        s.push_str(&format!(
            "\n   Memory information IS {}stored",
            if self.memory { "" } else { "NOT " }
        ));
        s
    }
}

#[cfg(test)]
mod test {
    use super::Config;
    use crate::prelude::{Constellation, Error};

    #[test]
    fn empty_constellations() {
        let cfg = Config::default().with_constellations(&[]);
        assert_eq!(cfg.validate(), Err(Error::NoAllowedConstellation));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn iteration_limit() {
        let mut cfg = Config::default();
        cfg.max_iterations = 0;
        assert_eq!(cfg.iteration_limit(), 2);
        cfg.max_iterations = 12;
        assert_eq!(cfg.iteration_limit(), 12);
    }

    #[test]
    fn summary() {
        let cfg = Config::default()
            .with_constellations(&[Constellation::GPS, Constellation::Galileo])
            .with_max_rejected(Some(2));
        let summary = cfg.summary("PRS");
        assert!(summary.starts_with("PRS"));
        assert!(summary.contains("constellations GPS,GAL"));
        assert!(summary.contains("reject is 2"));
        assert!(summary.contains("IS NOT stored"));
    }
}
