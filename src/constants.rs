/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Earth angular velocity, in WGS84 frame rad/s
pub const EARTH_ANGULAR_VEL_RAD: f64 = 7.2921151467E-5;

/// Signal time of flight assumed on the first iteration, in seconds.
pub const INITIAL_TRANSIT_TIME_S: f64 = 0.070;

/// Lowest receiver height (m) we accept to model the troposphere.
pub const MIN_TROPO_HEIGHT_M: f64 = -1000.0;

/// Update step norm (m) beyond which the solver is considered diverging.
pub const DIVERGENCE_LIMIT_M: f64 = 1.0E10;

/// Tolerance on the diagonal of the projection matrix, below which
/// a satellite is said to solely determine its clock term.
pub const SLOPE_PROJECTION_TOLERANCE: f64 = 1.0E-8;

/// Relative singular value threshold used to declare the
/// normal equations rank deficient.
pub const SINGULAR_VALUE_TOLERANCE: f64 = 1.0E-12;
