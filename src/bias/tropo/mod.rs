use crate::bias::{BiasRuntime, TroposphereBias};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod unb3;

/// Height (m) above which [TroposphereModel::UNB3] is not evaluated.
const UNB3_MAX_HEIGHT_M: f64 = 44247.0;

/// Troposphere delay models
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TroposphereModel {
    /// UNB3 seasonal model, from latitude, height and day of year.
    UNB3,
    /// Total zenith delay (m) that you measured or estimated,
    /// projected along the line of sight.
    Zenith { total_m: f64 },
}

impl Default for TroposphereModel {
    fn default() -> Self {
        Self::UNB3
    }
}

/// Projects a zenith delay onto the line of sight
fn slant_mapping(elevation_deg: f64) -> f64 {
    1.001_f64 / (0.002001_f64 + elevation_deg.to_radians().sin().powi(2)).sqrt()
}

impl TroposphereBias for TroposphereModel {
    fn troposphere_bias_m(&self, rtm: &BiasRuntime) -> f64 {
        let zenith = match self {
            Self::UNB3 => {
                let (zwd, zdd) = unb3::unb3_model(rtm);
                zwd + zdd
            },
            Self::Zenith { total_m } => *total_m,
        };
        zenith * slant_mapping(rtm.elevation_deg)
    }

    fn height_limit_m(&self) -> Option<f64> {
        match self {
            Self::UNB3 => Some(UNB3_MAX_HEIGHT_M),
            Self::Zenith { .. } => None,
        }
    }
}

/// Use [NullTroposphere] when your pseudo ranges are already
/// corrected for the troposphere delay.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct NullTroposphere;

impl TroposphereBias for NullTroposphere {
    fn troposphere_bias_m(&self, _: &BiasRuntime) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::{slant_mapping, TroposphereModel};
    use crate::bias::{BiasRuntime, TroposphereBias};
    use crate::prelude::{Epoch, Vector3};
    use std::str::FromStr;

    fn runtime(height_m: f64, elevation_deg: f64) -> BiasRuntime {
        BiasRuntime {
            t: Epoch::from_str("2020-06-25T12:00:00 GPST").unwrap(),
            rx_ecef_m: Vector3::zeros(),
            rx_geodetic: (45.0_f64.to_radians(), 5.0_f64.to_radians(), height_m),
            sv_ecef_m: Vector3::zeros(),
            elevation_deg,
            azimuth_deg: 0.0,
        }
    }

    #[test]
    fn mapping_function() {
        assert!((slant_mapping(90.0) - 1.0).abs() < 1.0E-3);
        assert!(slant_mapping(10.0) > 5.0);
        assert!(slant_mapping(5.0) > slant_mapping(10.0));
    }

    #[test]
    fn unb3_zenith() {
        let model = TroposphereModel::UNB3;
        let zenith = model.troposphere_bias_m(&runtime(0.0, 90.0));
        assert!(zenith > 2.2 && zenith < 2.7, "unrealistic zenith delay {}", zenith);

        let high = model.troposphere_bias_m(&runtime(2000.0, 90.0));
        assert!(high < zenith, "delay should decrease with height");

        let slant = model.troposphere_bias_m(&runtime(0.0, 15.0));
        assert!(slant > 3.0 * zenith);

        assert_eq!(model.height_limit_m(), Some(44247.0));
    }

    #[test]
    fn measured_zenith() {
        let model = TroposphereModel::Zenith { total_m: 2.0 };
        let delay = model.troposphere_bias_m(&runtime(100.0, 90.0));
        assert!((delay - 2.0).abs() < 1.0E-2);
        assert!(model.height_limit_m().is_none());
    }
}
