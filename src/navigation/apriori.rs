use log::debug;
use nalgebra::{DMatrix, DVector, Vector3};

use crate::{averager::WeightedAverager, cfg::MemoryUpdate, prelude::Constellation};

/// [AprioriMemory] stores past solutions, to initialize the next epoch.
/// Its state is laid out as x, y, z (m) then one clock term (m)
/// per constellation, in the allowed constellations order.
#[derive(Debug, Clone, PartialEq)]
pub struct AprioriMemory {
    /// Constellations, defining the clock terms layout
    constellations: Vec<Constellation>,
    /// a-priori state
    state: DVector<f64>,
    /// Weighted average of all folded solutions
    averager: WeightedAverager,
    /// Set once a position has been fixed or a solution folded
    initialized: bool,
    /// Pre-fit residuals of the latest folded solution
    prefit_residuals: Option<DVector<f64>>,
}

impl AprioriMemory {
    /// Builds an empty [AprioriMemory] for these constellations.
    pub fn new(constellations: &[Constellation]) -> Self {
        let size = 3 + constellations.len();
        Self {
            initialized: false,
            prefit_residuals: None,
            state: DVector::zeros(size),
            averager: WeightedAverager::new(size),
            constellations: constellations.to_vec(),
        }
    }

    /// Fixes the a-priori position to these ECEF coordinates (m).
    /// Clock terms are left untouched.
    pub fn fix_position(&mut self, x_m: f64, y_m: f64, z_m: f64) {
        self.state[0] = x_m;
        self.state[1] = y_m;
        self.state[2] = z_m;
        self.initialized = true;
    }

    /// True once the memory may seed the solver.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// a-priori ECEF position (m)
    pub fn position_m(&self) -> Vector3<f64> {
        Vector3::new(self.state[0], self.state[1], self.state[2])
    }

    /// Full a-priori state
    pub fn state(&self) -> &DVector<f64> {
        &self.state
    }

    /// Number of folded solutions
    pub fn epochs(&self) -> u64 {
        self.averager.count
    }

    /// Inverse variance weighted average of all folded solutions,
    /// laid out like [Self::state].
    pub fn average(&self) -> DVector<f64> {
        self.averager.mean()
    }

    /// Pre-fit residuals (m) of the latest folded solution.
    pub fn prefit_residuals(&self) -> Option<&DVector<f64>> {
        self.prefit_residuals.as_ref()
    }

    fn clock_index(&self, constellation: Constellation) -> Option<usize> {
        self.constellations
            .iter()
            .position(|c| *c == constellation)
            .map(|i| 3 + i)
    }

    /// Re-slices the a-priori state to this constellation set:
    /// 3 coordinates then one clock term per constellation.
    /// Unknown clock terms are null.
    pub fn seed(&self, constellations: &[Constellation]) -> DVector<f64> {
        let mut x = DVector::<f64>::zeros(3 + constellations.len());
        for i in 0..3 {
            x[i] = self.state[i];
        }
        for (j, c) in constellations.iter().enumerate() {
            if let Some(index) = self.clock_index(*c) {
                x[3 + j] = self.state[index];
            }
        }
        x
    }

    /// Folds a new solution (state laid out on `constellations`)
    /// into the memory. Clock terms of absent constellations are kept.
    pub(crate) fn update(
        &mut self,
        policy: MemoryUpdate,
        constellations: &[Constellation],
        state: &DVector<f64>,
        covariance: &DMatrix<f64>,
        prefit_residuals: Option<&DVector<f64>>,
    ) {
        let alpha = match policy {
            MemoryUpdate::Replace => 1.0,
            MemoryUpdate::Exponential(_) if !self.initialized => 1.0,
            MemoryUpdate::Exponential(alpha) => alpha.clamp(0.0, 1.0),
        };

        let size = self.state.len();
        let mut x = DVector::<f64>::zeros(size);
        let mut variances = DVector::<f64>::zeros(size);

        // (memory index, solution index)
        let mut indexes = vec![(0, 0), (1, 1), (2, 2)];
        for (j, c) in constellations.iter().enumerate() {
            if let Some(index) = self.clock_index(*c) {
                indexes.push((index, 3 + j));
            }
        }

        for (mem, sol) in indexes {
            if sol >= state.len() {
                continue;
            }
            self.state[mem] = alpha * state[sol] + (1.0 - alpha) * self.state[mem];
            x[mem] = state[sol];
            if sol < covariance.nrows() && sol < covariance.ncols() {
                variances[mem] = covariance[(sol, sol)];
            }
        }

        self.averager.add(&x, &variances);
        self.prefit_residuals = prefit_residuals.cloned();
        self.initialized = true;

        debug!(
            "apriori memory update #{} - x={:.3} y={:.3} z={:.3}",
            self.averager.count, self.state[0], self.state[1], self.state[2]
        );
    }

    /// Forgets everything.
    pub fn reset(&mut self) {
        self.state.fill(0.0);
        self.averager.reset();
        self.initialized = false;
        self.prefit_residuals = None;
    }
}
