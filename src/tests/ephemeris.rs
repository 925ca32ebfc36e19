use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use crate::prelude::{
    EphemerisSource, Epoch, HealthFilter, SatelliteState, SearchOrder, ValidityFilter, SV,
};

pub struct NullEph {}

impl EphemerisSource for NullEph {
    fn evaluate(
        &self,
        _: SV,
        _: Epoch,
        _: HealthFilter,
        _: ValidityFilter,
        _: SearchOrder,
    ) -> Option<SatelliteState> {
        None
    }
}

/// Frozen satellite states, whatever the requested [Epoch].
/// Keeps track of every request.
#[derive(Default)]
pub struct StaticEphemeris {
    states: HashMap<SV, SatelliteState>,
    calls: Cell<usize>,
    requests: RefCell<Vec<(SV, Epoch)>>,
}

impl StaticEphemeris {
    pub fn insert(&mut self, sv: SV, state: SatelliteState) {
        self.states.insert(sv, state);
    }

    pub fn remove(&mut self, sv: SV) {
        self.states.remove(&sv);
    }

    /// Number of requests so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Requested epochs, for this [SV]
    pub fn requests(&self, sv: SV) -> Vec<Epoch> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|(k, t)| if *k == sv { Some(*t) } else { None })
            .collect()
    }
}

impl EphemerisSource for StaticEphemeris {
    fn evaluate(
        &self,
        sv: SV,
        t: Epoch,
        health: HealthFilter,
        validity: ValidityFilter,
        _: SearchOrder,
    ) -> Option<SatelliteState> {
        assert_eq!(health, HealthFilter::Healthy);
        assert_eq!(validity, ValidityFilter::ValidOnly);
        self.calls.set(self.calls.get() + 1);
        self.requests.borrow_mut().push((sv, t));
        self.states.get(&sv).copied()
    }
}
