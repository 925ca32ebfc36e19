use crate::{
    bias::{BiasRuntime, TroposphereBias, TroposphereModel},
    constants::{EARTH_ANGULAR_VEL_RAD, SPEED_OF_LIGHT_M_S},
    prelude::{Constellation, Epoch, SatelliteState, Satellite, TimeScale, Vector3, SV},
    tests::StaticEphemeris,
};

/// (azimuth, elevation) in degrees, well spread over the sky
const SKY: [(f64, f64); 13] = [
    (0.0, 80.0),
    (45.0, 30.0),
    (100.0, 45.0),
    (160.0, 20.0),
    (210.0, 60.0),
    (260.0, 25.0),
    (310.0, 40.0),
    (20.0, 15.0),
    (70.0, 65.0),
    (135.0, 35.0),
    (235.0, 50.0),
    (290.0, 70.0),
    (340.0, 20.0),
];

/// Distance to the satellites (m)
const RANGE_M: f64 = 20_200.0E3;

/// Satellite clock bias (s)
const SV_CLOCK_BIAS_S: f64 = 1.0E-5;

/// Relativistic correction (s)
const SV_RELATIVISTIC_S: f64 = -2.0E-8;

/// Synthetic observation scenario: satellites are placed on the sky of a
/// receiver of known position and clock offsets, pseudo ranges are
/// consistent with the solver's own measurement model.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub t: Epoch,
    pub rx_geodetic: (f64, f64, f64),
    pub rx_ecef_m: Vector3<f64>,
    pub earth_rotation: bool,
    pub tropo: Option<TroposphereModel>,
    clocks_m: Vec<(Constellation, f64)>,
    sky: Vec<(SV, f64, f64)>,
    biases_m: Vec<(SV, f64)>,
}

impl Scenario {
    /// Receiver at latitude, longitude (°) and height (m)
    pub fn new(lat_deg: f64, lon_deg: f64, h_m: f64) -> Self {
        let (lat_rad, lon_rad) = (map_3d::deg2rad(lat_deg), map_3d::deg2rad(lon_deg));
        let (x, y, z) = map_3d::geodetic2ecef(lat_rad, lon_rad, h_m, map_3d::Ellipsoid::WGS84);
        Self {
            t: Epoch::from_time_of_week(2100, 345_600_000_000_000, TimeScale::GPST),
            rx_geodetic: (lat_rad, lon_rad, h_m),
            rx_ecef_m: Vector3::new(x, y, z),
            earth_rotation: true,
            tropo: None,
            clocks_m: Vec::new(),
            sky: Vec::new(),
            biases_m: Vec::new(),
        }
    }

    /// Default receiver location
    pub fn default_location() -> Self {
        Self::new(45.0, 5.0, 100.0)
    }

    /// Places these [SV]s on the sky, in order.
    pub fn with_satellites(&self, svs: &[SV]) -> Self {
        let mut s = self.clone();
        for sv in svs {
            let (azim, elev) = SKY[s.sky.len() % SKY.len()];
            s.sky.push((*sv, azim, elev));
        }
        s
    }

    /// Places `n` GPS satellites (G01 ...) on the sky.
    pub fn with_gps(&self, n: usize) -> Self {
        let svs = (1..=n)
            .map(|prn| SV::new(Constellation::GPS, prn as u8))
            .collect::<Vec<_>>();
        self.with_satellites(&svs)
    }

    /// Places one satellite at given azimuth and elevation (°)
    pub fn with_satellite_at(&self, sv: SV, azim_deg: f64, elev_deg: f64) -> Self {
        let mut s = self.clone();
        s.sky.push((sv, azim_deg, elev_deg));
        s
    }

    /// Receiver clock offset (m) to this [Constellation]
    pub fn with_clock(&self, constellation: Constellation, offset_m: f64) -> Self {
        let mut s = self.clone();
        s.clocks_m.retain(|(c, _)| *c != constellation);
        s.clocks_m.push((constellation, offset_m));
        s
    }

    /// Adds a fault (m) to this [SV] pseudo range
    pub fn with_bias(&self, sv: SV, bias_m: f64) -> Self {
        let mut s = self.clone();
        s.biases_m.push((sv, bias_m));
        s
    }

    pub fn without_earth_rotation(&self) -> Self {
        let mut s = self.clone();
        s.earth_rotation = false;
        s
    }

    /// Troposphere delay included in the pseudo ranges
    pub fn with_troposphere(&self, model: TroposphereModel) -> Self {
        let mut s = self.clone();
        s.tropo = Some(model);
        s
    }

    pub fn clock_m(&self, constellation: Constellation) -> f64 {
        self.clocks_m
            .iter()
            .find(|(c, _)| *c == constellation)
            .map(|(_, offset)| *offset)
            .unwrap_or_default()
    }

    pub fn svs(&self) -> Vec<SV> {
        self.sky.iter().map(|(sv, _, _)| *sv).collect()
    }

    pub fn satellites(&self) -> Vec<Satellite> {
        self.sky.iter().map(|(sv, _, _)| Satellite::new(*sv)).collect()
    }

    /// Satellite ECEF position (m) at transmission time
    pub fn sv_position_m(&self, sv: SV) -> Vector3<f64> {
        let (_, azim, elev) = self
            .sky
            .iter()
            .find(|(k, _, _)| *k == sv)
            .copied()
            .unwrap();

        let (azim, elev) = (azim.to_radians(), elev.to_radians());

        let (x, y, z) = map_3d::enu2ecef(
            RANGE_M * elev.cos() * azim.sin(),
            RANGE_M * elev.cos() * azim.cos(),
            RANGE_M * elev.sin(),
            self.rx_geodetic.0,
            self.rx_geodetic.1,
            self.rx_geodetic.2,
            map_3d::Ellipsoid::WGS84,
        );

        Vector3::new(x, y, z)
    }

    pub fn ephemeris(&self) -> StaticEphemeris {
        let mut ephemeris = StaticEphemeris::default();
        for sv in self.svs() {
            let state = SatelliteState::from_position(self.sv_position_m(sv), SV_CLOCK_BIAS_S)
                .with_relativistic_correction(SV_RELATIVISTIC_S);
            ephemeris.insert(sv, state);
        }
        ephemeris
    }

    /// Satellite position rotated during signal propagation
    fn rotated_position_m(&self, sv: SV) -> Vector3<f64> {
        let sv_m = self.sv_position_m(sv);
        if !self.earth_rotation {
            return sv_m;
        }
        let transit_s = (sv_m - self.rx_ecef_m).norm() / SPEED_OF_LIGHT_M_S;
        let (sin, cos) = (EARTH_ANGULAR_VEL_RAD * transit_s).sin_cos();
        Vector3::new(
            cos * sv_m[0] + sin * sv_m[1],
            -sin * sv_m[0] + cos * sv_m[1],
            sv_m[2],
        )
    }

    pub fn pseudo_range_m(&self, sv: SV) -> f64 {
        let sv_m = self.rotated_position_m(sv);
        let mut pr = (sv_m - self.rx_ecef_m).norm();

        pr += self.clock_m(sv.constellation);
        pr -= SPEED_OF_LIGHT_M_S * (SV_CLOCK_BIAS_S + SV_RELATIVISTIC_S);

        if let Some(model) = &self.tropo {
            let rtm = BiasRuntime::new(self.t, self.rx_ecef_m, sv_m);
            pr += model.troposphere_bias_m(&rtm);
        }

        for (k, bias) in self.biases_m.iter() {
            if *k == sv {
                pr += bias;
            }
        }

        pr
    }

    pub fn pseudo_ranges_m(&self) -> Vec<f64> {
        self.svs().iter().map(|sv| self.pseudo_range_m(*sv)).collect()
    }

    /// Position error (m) of this ECEF estimate
    pub fn position_error_m(&self, position_m: Vector3<f64>) -> f64 {
        (position_m - self.rx_ecef_m).norm()
    }
}
