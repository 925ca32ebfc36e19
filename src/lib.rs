#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod averager;
mod bias;
mod cfg;
mod ephemeris;
mod error;
mod geometry;
mod navigation;
mod satellite;
mod solutions;
mod solver;

pub mod constants;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::averager::WeightedAverager;
    pub use crate::bias::{BiasRuntime, NullTroposphere, TroposphereBias, TroposphereModel};
    pub use crate::cfg::{Config, MemoryUpdate};
    pub use crate::ephemeris::{
        EphemerisSource, HealthFilter, SatelliteState, SearchOrder, ValidityFilter,
    };
    pub use crate::error::Error;
    pub use crate::geometry::Geometry;
    pub use crate::navigation::{AprioriMemory, DilutionOfPrecision, LeastSquares};
    pub use crate::satellite::{Satellite, SatelliteStatus};
    pub use crate::solutions::{Degradation, EpochSolution, Status};
    pub use crate::solver::Solver;
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::{DMatrix, DVector, Vector3};
}

// pub export
pub use error::Error;
