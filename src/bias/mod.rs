use crate::prelude::{Epoch, Vector3};

pub(crate) mod tropo;
pub use tropo::{NullTroposphere, TroposphereModel};

/// Conditions of one receiver to satellite path,
/// at the ongoing iteration of the solver.
#[derive(Debug, Clone, Copy)]
pub struct BiasRuntime {
    /// Reception [Epoch]
    pub t: Epoch,
    /// Receiver ECEF position (m)
    pub rx_ecef_m: Vector3<f64>,
    /// Receiver geodetic coordinates: latitude (rad), longitude (rad),
    /// height above ellipsoid (m)
    pub rx_geodetic: (f64, f64, f64),
    /// Satellite ECEF position (m), Earth rotation compensated
    pub sv_ecef_m: Vector3<f64>,
    /// Elevation angle of the satellite (°)
    pub elevation_deg: f64,
    /// Azimuth angle of the satellite (°)
    pub azimuth_deg: f64,
}

impl BiasRuntime {
    pub(crate) fn new(t: Epoch, rx_ecef_m: Vector3<f64>, sv_ecef_m: Vector3<f64>) -> Self {
        let (lat_rad, lon_rad, h_m) = map_3d::ecef2geodetic(
            rx_ecef_m[0],
            rx_ecef_m[1],
            rx_ecef_m[2],
            map_3d::Ellipsoid::WGS84,
        );

        let (azim_rad, elev_rad, _) = map_3d::ecef2aer(
            sv_ecef_m[0],
            sv_ecef_m[1],
            sv_ecef_m[2],
            lat_rad,
            lon_rad,
            h_m,
            map_3d::Ellipsoid::WGS84,
        );

        Self {
            t,
            rx_ecef_m,
            sv_ecef_m,
            rx_geodetic: (lat_rad, lon_rad, h_m),
            elevation_deg: map_3d::rad2deg(elev_rad),
            azimuth_deg: map_3d::rad2deg(azim_rad),
        }
    }

    /// Receiver height above ellipsoid (m)
    pub fn height_m(&self) -> f64 {
        self.rx_geodetic.2
    }

    /// Receiver latitude (°)
    pub fn latitude_deg(&self) -> f64 {
        map_3d::rad2deg(self.rx_geodetic.0)
    }
}

/// Troposphere delay modeling. You can either deploy one of
/// the proposed [TroposphereModel]s or apply your own equations.
pub trait TroposphereBias {
    /// Slant delay (m) along the path described by [BiasRuntime].
    fn troposphere_bias_m(&self, rtm: &BiasRuntime) -> f64;

    /// Receiver height (m) above which the model is not valid.
    /// The solver does not request any correction above this height.
    fn height_limit_m(&self) -> Option<f64> {
        None
    }
}
