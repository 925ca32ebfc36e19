use log::error;
use nalgebra::{DMatrix, Matrix3, Vector3};

use crate::prelude::{Epoch, Error};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// [DilutionOfPrecision] of one solution
#[derive(Debug, Clone, Default, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DilutionOfPrecision {
    /// Geometric DOP
    pub gdop: f64,

    /// Position DOP
    pub pdop: f64,

    /// Temporal DOP, all clock terms
    pub tdop: f64,

    /// Horizontal DOP
    pub hdop: f64,

    /// Vertical DOP
    pub vdop: f64,
}

impl DilutionOfPrecision {
    /// Rotates the position block of `q` to local East North Up.
    pub(crate) fn q_enu(q: &DMatrix<f64>, lat_rad: f64, lon_rad: f64) -> Matrix3<f64> {
        let r = Matrix3::<f64>::new(
            -lon_rad.sin(),
            -lat_rad.sin() * lon_rad.cos(),
            lat_rad.cos() * lon_rad.cos(),
            lon_rad.cos(),
            -lat_rad.sin() * lon_rad.sin(),
            lat_rad.cos() * lon_rad.sin(),
            0.0_f64,
            lat_rad.cos(),
            lat_rad.sin(),
        );

        let q_3 = q.fixed_view::<3, 3>(0, 0).into_owned();

        r.transpose() * q_3 * r
    }

    /// Creates new [DilutionOfPrecision].
    ///
    /// ## Input
    /// - design: design matrix of the solution (one row per satellite,
    ///   3 coordinates then one clock term per constellation)
    /// - position_m: ECEF position of the solution, defines the local frame.
    pub fn new(design: &DMatrix<f64>, position_m: Vector3<f64>) -> Result<Self, Error> {
        let ncols = design.ncols();
        if ncols < 4 {
            return Err(Error::DimensionMismatch("design matrix"));
        }

        let q = (design.transpose() * design)
            .try_inverse()
            .ok_or(Error::MatrixInversion)?;

        let pdop = (q[(0, 0)] + q[(1, 1)] + q[(2, 2)]).sqrt();
        let tdop = (3..ncols).map(|i| q[(i, i)]).sum::<f64>().sqrt();

        let (lat_rad, lon_rad, _) = map_3d::ecef2geodetic(
            position_m[0],
            position_m[1],
            position_m[2],
            map_3d::Ellipsoid::WGS84,
        );

        let q_enu = Self::q_enu(&q, lat_rad, lon_rad);

        Ok(Self {
            pdop,
            tdop,
            gdop: (pdop.powi(2) + tdop.powi(2)).sqrt(),
            hdop: (q_enu[(0, 0)] + q_enu[(1, 1)]).sqrt(),
            vdop: q_enu[(2, 2)].sqrt(),
        })
    }

    /// [Self::new] for a solution that is retained whatever happens:
    /// null values when the design matrix cannot be inverted.
    pub(crate) fn from_design(t: Epoch, design: &DMatrix<f64>, position_m: Vector3<f64>) -> Self {
        match Self::new(design, position_m) {
            Ok(dop) => dop,
            Err(e) => {
                error!("{}: dilution of precision - {}", t, e);
                Self::default()
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::DilutionOfPrecision;
    use crate::prelude::{Epoch, Vector3};
    use nalgebra::DMatrix;

    #[test]
    fn enu_rotation_is_orthogonal() {
        let q = DMatrix::<f64>::identity(4, 4);
        for (lat, lon) in [(0.0_f64, 0.0_f64), (45.0, 10.0), (-33.0, 151.0)] {
            let q_enu = DilutionOfPrecision::q_enu(&q, lat.to_radians(), lon.to_radians());
            for i in 0..3 {
                for j in 0..3 {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert!((q_enu[(i, j)] - expected).abs() < 1.0E-12);
                }
            }
        }
    }

    #[test]
    fn retained_solution() {
        let t = Epoch::from_gpst_seconds(1.0E9);
        let position = Vector3::new(4_200_000.0, 170_000.0, 4_780_000.0);

        let dop = DilutionOfPrecision::from_design(t, &DMatrix::zeros(5, 4), position);
        assert_eq!(dop, DilutionOfPrecision::default());

        let design = DMatrix::<f64>::identity(4, 4);
        let dop = DilutionOfPrecision::from_design(t, &design, position);
        assert!((dop.pdop - 3.0_f64.sqrt()).abs() < 1.0E-12);
        assert!((dop.tdop - 1.0).abs() < 1.0E-12);
        assert!((dop.gdop - 2.0).abs() < 1.0E-12);
    }
}
