//! Run configuration.

use crate::error::{LineError,Result};

pub const DEFAULT_SEED: u64 = 314159265;

/// Default length of the negative sampling table.
pub const NEG_TABLE_SIZE: usize = 100_000_000;

/// Which proximity the embeddings capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Vertex embeddings are compared directly against each other
    First,

    /// Vertex embeddings are compared against a separate context space
    Second
}

impl TryFrom<usize> for Order {
    type Error = LineError;

    fn try_from(order: usize) -> Result<Self> {
        match order {
            1 => Ok(Order::First),
            2 => Ok(Order::Second),
            o => Err(LineError::InvalidOrder(o))
        }
    }
}

#[derive(Clone, Debug)]
pub struct LineConfig {
    /// Size of the embeddings
    pub dims: usize,

    /// Proximity order, 1 or 2
    pub order: usize,

    /// Negatives drawn per positive edge
    pub negatives: usize,

    /// Training budget, in millions of samples
    pub samples: usize,

    /// Initial learning rate.  Decays linearly down to 1e-4 of itself
    pub alpha: f32,

    /// Number of worker threads
    pub threads: usize,

    /// Random seed
    pub seed: u64,

    pub neg_table_size: usize,

    /// Most vertices the index will accept before failing
    pub max_vertices: usize,

    /// Whether to show a pretty indicator
    pub indicator: bool
}

impl Default for LineConfig {
    fn default() -> Self {
        LineConfig {
            dims: 100,
            order: 2,
            negatives: 5,
            samples: 1,
            alpha: 0.025,
            threads: 1,
            seed: DEFAULT_SEED,
            neg_table_size: NEG_TABLE_SIZE,
            max_vertices: u32::MAX as usize,
            indicator: true
        }
    }
}

impl LineConfig {

    /// Checks every option, returning the parsed proximity order.
    pub fn validate(&self) -> Result<Order> {
        let order = Order::try_from(self.order)?;
        if self.dims == 0 {
            return Err(LineError::Config("dims must be greater than 0".into()))
        }
        if self.threads == 0 {
            return Err(LineError::Config("threads must be at least 1".into()))
        }
        if !(self.alpha > 0.) || !self.alpha.is_finite() {
            return Err(LineError::Config(format!("alpha must be positive, got {}", self.alpha)))
        }
        if self.neg_table_size == 0 {
            return Err(LineError::Config("neg_table_size must be at least 1".into()))
        }
        // Negative table stores ids as u32
        if self.max_vertices == 0 || self.max_vertices > u32::MAX as usize {
            return Err(LineError::Config(
                format!("max_vertices must be within [1, {}]", u32::MAX)))
        }
        Ok(order)
    }

    /// Raw number of samples the run draws across all threads.
    pub fn total_samples(&self) -> u64 {
        self.samples as u64 * 1_000_000
    }
}
