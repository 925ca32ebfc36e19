use crate::bias::BiasRuntime;
use log::debug;
use std::f64::consts::PI;

#[derive(Copy, Clone, Debug)]
pub(crate) enum UNB3Param {
    // pressure in mBar
    Pressure = 0,
    // temperature in Kelvin
    Temperature = 1,
    // water vapour pressure in mBar
    WaterVapourPressure = 2,
    // beta is temperature lapse rate (Kelvin/m)
    Beta = 3,
    // lambda is wvp height factor (N/A)
    Lambda = 4,
}

const ANNUAL_AVERAGE: [(f64, [f64; 5]); 5] = [
    (15.0, [1013.25, 299.65, 26.31, 6.30E-3, 2.77]),
    (30.0, [1017.25, 294.15, 21.79, 6.05E-3, 3.15]),
    (45.0, [1015.75, 283.15, 11.66, 5.58E-3, 2.57]),
    (60.0, [1011.75, 272.15, 6.78, 5.39E-3, 1.81]),
    (75.0, [1013.00, 263.65, 4.11, 4.53E-3, 1.55]),
];

const AVERAGE_AMPLITUDE: [(f64, [f64; 5]); 5] = [
    (15.0, [0.0, 0.0, 0.0, 0.0, 0.0]),
    (30.0, [-3.75, 7.0, 8.85, 0.25E-3, 0.33]),
    (45.0, [-2.25, 11.0, 7.24, 0.32E-3, 0.46]),
    (60.0, [-1.75, 15.0, 5.36, 0.81E-3, 0.74]),
    (75.0, [-0.50, 14.5, 3.39, 0.62E-3, 0.30]),
];

/*
 * Linear interpolation in 15° latitude bands,
 * constant beyond 15° and 75°
 */
fn interpolate(lut: &[(f64, [f64; 5]); 5], prm: UNB3Param, abs_lat_ddeg: f64) -> f64 {
    let prm = prm as usize;
    if abs_lat_ddeg <= lut[0].0 {
        lut[0].1[prm]
    } else if abs_lat_ddeg >= lut[4].0 {
        lut[4].1[prm]
    } else {
        let index = ((abs_lat_ddeg - lut[0].0) / 15.0).floor() as usize;
        let (lat_0, low) = lut[index];
        let (_, high) = lut[index + 1];
        low[prm] + (high[prm] - low[prm]) * (abs_lat_ddeg - lat_0) / 15.0
    }
}

pub(crate) fn unb3_parameter(prm: UNB3Param, lat_ddeg: f64, day_of_year: f64) -> f64 {
    let dmin = if lat_ddeg.is_sign_positive() {
        28.0_f64
    } else {
        211.0_f64
    };
    let abs_lat = lat_ddeg.abs();
    let annual = interpolate(&ANNUAL_AVERAGE, prm, abs_lat);
    let amplitude = interpolate(&AVERAGE_AMPLITUDE, prm, abs_lat);
    annual - amplitude * ((day_of_year - dmin) * 2.0_f64 * PI / 365.25_f64).cos()
}

/*
 * Evaluate (ZWD, ZDD) in meters at given Epoch, latitude and height.
 * Infaillible below the height limit of the model.
 */
pub(crate) fn unb3_model(rtm: &BiasRuntime) -> (f64, f64) {
    const K_1: f64 = 77.604;
    const K_2: f64 = 382000.0_f64;
    const R_D: f64 = 287.054;
    const G: f64 = 9.80665_f64;
    const G_M: f64 = 9.784_f64;

    let day_of_year = rtm.t.day_of_year();
    let lat_ddeg = rtm.latitude_deg();
    let h = rtm.height_m();

    let beta = unb3_parameter(UNB3Param::Beta, lat_ddeg, day_of_year);
    let p = unb3_parameter(UNB3Param::Pressure, lat_ddeg, day_of_year);
    let lambda = unb3_parameter(UNB3Param::Lambda, lat_ddeg, day_of_year);
    let temp = unb3_parameter(UNB3Param::Temperature, lat_ddeg, day_of_year);
    let e = unb3_parameter(UNB3Param::WaterVapourPressure, lat_ddeg, day_of_year);

    let z0_zdd = 1.0E-6 * K_1 * R_D * p / G_M;
    let denom = (lambda + 1.0_f64) * G_M - beta * R_D;
    let z0_zwd = 1.0E-6 * K_2 * R_D * e / temp / denom;
    let value = 1.0_f64 - beta * h / temp;

    let zdd = value.powf(G / R_D / beta) * z0_zdd;
    let zwd = value.powf((lambda + 1.0_f64) * G / R_D / beta - 1.0_f64) * z0_zwd;

    debug!(
        "{}: unb3 - beta: {:.3E} p: {:.3} temp: {:.3} e: {:.3} lambda: {:.3}",
        rtm.t, beta, p, temp, e, lambda
    );
    debug!(
        "{}: unb3 - zdd(h={:.3}) {:.3} zwd(h={:.3}) {:.3}",
        rtm.t, h, zdd, h, zwd
    );

    (zwd, zdd)
}

#[cfg(test)]
mod test {
    use super::{unb3_parameter, UNB3Param};

    #[test]
    fn latitude_bands() {
        // 15° band has no seasonal amplitude
        for doy in [1.0, 100.0, 200.0, 300.0] {
            assert_eq!(unb3_parameter(UNB3Param::Pressure, 10.0, doy), 1013.25);
            assert_eq!(unb3_parameter(UNB3Param::Temperature, -5.0, doy), 299.65);
        }

        // halfway in between 30° and 45°, at dmin: avg - amplitude
        let p = unb3_parameter(UNB3Param::Pressure, 37.5, 28.0);
        let expected = (1017.25 + 1015.75) / 2.0 - (-3.75 - 2.25) / 2.0;
        assert!((p - expected).abs() < 1.0E-9);

        // constant beyond 75°
        let t_80 = unb3_parameter(UNB3Param::Temperature, 80.0, 28.0);
        assert!((t_80 - (263.65 - 14.5)).abs() < 1.0E-9);
    }
}
