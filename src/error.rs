use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The allowed constellations list must be defined prior any processing.
    #[error("allowed constellations must be defined before processing")]
    NoAllowedConstellation,

    /// Satellites, pseudo ranges, geometry rows or measurement covariance
    /// were proposed with inconsistent dimensions.
    #[error("invalid dimensions: {0}")]
    DimensionMismatch(&'static str),

    /// Fewer included satellites than unknowns (3 coordinates plus
    /// one clock offset per constellation): no attempt.
    #[error("not enough satellites: {available} for {required} unknowns")]
    NotEnoughSatellites { available: usize, required: usize },

    /// Not a single candidate could be attached to a valid ephemeris.
    #[error("no ephemeris for any satellite")]
    NoEphemeris,

    /// Normal equations are rank deficient (bad geometry or bad input).
    #[error("singular normal equations")]
    SingularMatrix,

    /// Iteration limit was reached before the update step became small enough.
    #[error("failed to converge after {0} iterations")]
    NotConverged(usize),

    /// Update step norm blew up.
    #[error("solution is diverging (step norm {0:.3E})")]
    Diverged(f64),

    /// Failed to invert the geometry matrix of the retained solution.
    #[error("failed to invert matrix")]
    MatrixInversion,
}

impl Error {
    /// True for failures that only concern one satellite combination
    /// and that excluding other satellites may solve.
    pub(crate) fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SingularMatrix | Self::NotConverged(_) | Self::Diverged(_)
        )
    }
}
