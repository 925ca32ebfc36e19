//! Measurement preparation
use log::{debug, error};

use crate::{
    cfg::Config,
    constants::SPEED_OF_LIGHT_M_S,
    ephemeris::{EphemerisSource, HealthFilter, ValidityFilter},
    prelude::{DMatrix, Duration, Epoch, Error, Vector3},
    satellite::{Satellite, SatelliteStatus},
};

/// [Geometry] holds one row per proposed [Satellite]:
/// satellite ECEF position at transmission time (m)
/// and pseudo range corrected for the satellite clock (m).
/// Rows of excluded satellites are meaningless and left to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Reception [Epoch]
    pub t: Epoch,
    /// Proposed [Satellite]s, marked by the preparation process
    pub satellites: Vec<Satellite>,
    /// Number of satellites that passed the constellation filter
    pub candidates: usize,
    /// (x, y, z, corrected range) per satellite
    rows: DMatrix<f64>,
    /// Number of satellites with valid geometry
    usable: usize,
}

impl Geometry {
    /// Prepares the [Geometry] at reception time `t`.
    /// Satellites excluded by the caller are left untouched.
    pub(crate) fn prepare(
        cfg: &Config,
        t: Epoch,
        satellites: &[Satellite],
        pseudo_ranges_m: &[f64],
        ephemeris: &dyn EphemerisSource,
    ) -> Result<Self, Error> {
        cfg.validate()?;

        if satellites.len() != pseudo_ranges_m.len() {
            error!(
                "{}: {} satellites for {} pseudo ranges",
                t,
                satellites.len(),
                pseudo_ranges_m.len()
            );
            return Err(Error::DimensionMismatch("satellites and pseudo ranges"));
        }

        let mut marks = satellites.to_vec();
        let mut rows = DMatrix::<f64>::zeros(satellites.len(), 4);
        let (mut candidates, mut usable) = (0, 0);

        for (i, sat) in marks.iter_mut().enumerate() {
            if !sat.is_included() {
                continue;
            }

            if !cfg.allowed_constellations.contains(&sat.constellation()) {
                debug!("{} ({}) - constellation not allowed", t, sat.sv);
                sat.status = SatelliteStatus::ExcludedConstellation;
                continue;
            }

            candidates += 1;

            let pr = pseudo_ranges_m[i];

            match Self::transmission_state(cfg, t, sat, pr, ephemeris) {
                Some((position_m, correction_s)) => {
                    rows[(i, 0)] = position_m[0];
                    rows[(i, 1)] = position_m[1];
                    rows[(i, 2)] = position_m[2];
                    rows[(i, 3)] = pr + SPEED_OF_LIGHT_M_S * correction_s;
                    usable += 1;
                },
                None => {
                    sat.status = SatelliteStatus::ExcludedNoEphemeris;
                },
            }
        }

        debug!(
            "{}: {} candidates - {} with valid ephemeris",
            t, candidates, usable
        );

        Ok(Self {
            t,
            rows,
            usable,
            candidates,
            satellites: marks,
        })
    }

    /// Two queries: first guess of the transmission time from the
    /// pseudo range, then refined with the satellite clock correction.
    /// Returns ECEF position (m) and total clock correction (s).
    fn transmission_state(
        cfg: &Config,
        t: Epoch,
        sat: &Satellite,
        pr_m: f64,
        ephemeris: &dyn EphemerisSource,
    ) -> Option<(Vector3<f64>, f64)> {
        let (health, validity) = (HealthFilter::Healthy, ValidityFilter::ValidOnly);

        let t_tx = t - Duration::from_seconds(pr_m / SPEED_OF_LIGHT_M_S);

        let state = match ephemeris.evaluate(sat.sv, t_tx, health, validity, cfg.search_order) {
            Some(state) => state,
            None => {
                debug!("{} ({}) - no ephemeris at {}", t, sat.sv, t_tx);
                return None;
            },
        };

        let t_tx = t_tx - Duration::from_seconds(state.total_clock_correction_s());

        match ephemeris.evaluate(sat.sv, t_tx, health, validity, cfg.search_order) {
            Some(state) => {
                let correction_s = state.total_clock_correction_s();
                debug!(
                    "{} ({}) - t_tx={} clock correction={:.3E}s",
                    t, sat.sv, t_tx, correction_s
                );
                Some((state.position_m, correction_s))
            },
            None => {
                debug!("{} ({}) - no ephemeris at refined {}", t, sat.sv, t_tx);
                None
            },
        }
    }

    /// Builds a [Geometry] from satellite positions (m) and pseudo ranges
    /// already corrected for the satellite clock (m), when you do not
    /// wish to go through an [EphemerisSource]. Satellites proposed
    /// as excluded are left as is.
    pub fn from_states(
        t: Epoch,
        satellites: &[Satellite],
        positions_m: &[Vector3<f64>],
        corrected_ranges_m: &[f64],
    ) -> Result<Self, Error> {
        let size = satellites.len();

        if positions_m.len() != size || corrected_ranges_m.len() != size {
            return Err(Error::DimensionMismatch("satellites and states"));
        }

        let mut rows = DMatrix::<f64>::zeros(size, 4);
        let mut usable = 0;

        for (i, sat) in satellites.iter().enumerate() {
            if !sat.is_included() {
                continue;
            }
            rows[(i, 0)] = positions_m[i][0];
            rows[(i, 1)] = positions_m[i][1];
            rows[(i, 2)] = positions_m[i][2];
            rows[(i, 3)] = corrected_ranges_m[i];
            usable += 1;
        }

        Ok(Self {
            t,
            rows,
            usable,
            candidates: usable,
            satellites: satellites.to_vec(),
        })
    }

    /// Number of rows (proposed satellites)
    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }

    /// Number of satellites with valid geometry
    pub fn usable(&self) -> usize {
        self.usable
    }

    /// True when candidates were proposed but none of them
    /// could be attached to an ephemeris.
    pub fn no_ephemeris(&self) -> bool {
        self.candidates > 0 && self.usable == 0
    }

    /// Indexes of rows with valid geometry
    pub fn usable_indexes(&self) -> Vec<usize> {
        self.satellites
            .iter()
            .enumerate()
            .filter_map(|(i, sat)| if sat.is_included() { Some(i) } else { None })
            .collect()
    }

    /// Satellite ECEF position (m) of row `i`
    pub fn position_m(&self, i: usize) -> Vector3<f64> {
        Vector3::new(self.rows[(i, 0)], self.rows[(i, 1)], self.rows[(i, 2)])
    }

    /// Clock corrected pseudo range (m) of row `i`
    pub fn corrected_range_m(&self, i: usize) -> f64 {
        self.rows[(i, 3)]
    }
}

#[cfg(test)]
mod test {
    use super::Geometry;
    use crate::prelude::{Constellation, Epoch, Error, Satellite, Vector3, SV};

    #[test]
    fn from_states() {
        let t = Epoch::from_gpst_seconds(1.0E9);
        let sats = [
            Satellite::new(SV::new(Constellation::GPS, 1)),
            Satellite::excluded(SV::new(Constellation::GPS, 2)),
        ];
        let positions = [Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)];

        let geometry = Geometry::from_states(t, &sats, &positions, &[10.0, 20.0]).unwrap();
        assert_eq!(geometry.len(), 2);
        assert_eq!(geometry.usable(), 1);
        assert!(!geometry.no_ephemeris());
        assert_eq!(geometry.usable_indexes(), vec![0]);
        assert_eq!(geometry.position_m(0), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(geometry.corrected_range_m(0), 10.0);
        assert_eq!(geometry.corrected_range_m(1), 0.0);

        assert_eq!(
            Geometry::from_states(t, &sats, &positions[..1], &[10.0, 20.0]),
            Err(Error::DimensionMismatch("satellites and states"))
        );
    }
}
