/// Inputs beyond +/- this bound saturate to 1 or 0.
pub const SIGMOID_BOUND: f32 = 6.;

pub const SIGMOID_TABLE_SIZE: usize = 1000;

/// Piecewise constant approximation of the logistic function, accurate to one bucket
/// (2 * SIGMOID_BOUND / SIGMOID_TABLE_SIZE) within the bound.
#[derive(Debug)]
pub struct SigmoidLookup {
    table: Vec<f32>
}

impl SigmoidLookup {
    pub fn new() -> Self {
        let table = (0..SIGMOID_TABLE_SIZE).map(|k| {
            let x = 2. * SIGMOID_BOUND * k as f32 / SIGMOID_TABLE_SIZE as f32 - SIGMOID_BOUND;
            1. / (1. + (-x).exp())
        }).collect();
        SigmoidLookup { table }
    }

    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        if x > SIGMOID_BOUND {
            1.
        } else if x < -SIGMOID_BOUND {
            0.
        } else {
            let k = ((x + SIGMOID_BOUND) * SIGMOID_TABLE_SIZE as f32 / SIGMOID_BOUND / 2.) as usize;
            self.table[k.min(SIGMOID_TABLE_SIZE - 1)]
        }
    }
}

impl Default for SigmoidLookup {
    fn default() -> Self {
        SigmoidLookup::new()
    }
}
