mod ephemeris;
mod scenario;

pub use ephemeris::{NullEph, StaticEphemeris};
pub use scenario::Scenario;

use log::LevelFilter;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .init();
    });
}

/// Asserts |a - b| < tolerance
pub fn assert_close(a: f64, b: f64, tolerance: f64, what: &str) {
    assert!(
        (a - b).abs() < tolerance,
        "{}: |{} - {}| exceeds {:.3E}",
        what,
        a,
        b,
        tolerance
    );
}
