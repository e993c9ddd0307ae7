//! Samplers used by the trainer: an alias table for drawing edges proportional to their weight,
//! and a discretized unigram table for drawing negatives.
use rand::prelude::*;
use rand_distr::{Distribution,Uniform};

use crate::graph::NodeID;
use crate::error::{LineError,Result};

/// Negatives are drawn proportional to degree raised to this power, flattening hubs.
pub const NEG_SAMPLING_POWER: f64 = 0.75;

fn alloc_vec<T: Clone>(what: &str, len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| LineError::alloc(what, len))?;
    v.resize(len, value);
    Ok(v)
}

/// Walker's alias method.  O(n) construction, O(1) per draw.
#[derive(Debug)]
pub struct AliasSampler {
    prob: Vec<f64>,
    alias: Vec<usize>
}

impl AliasSampler {
    pub fn new(weights: &[f64]) -> Result<Self> {
        if weights.is_empty() {
            return Err(LineError::Config("alias table needs at least one weight".into()))
        }

        let n = weights.len();
        let mut prob = alloc_vec("alias table", n, 0f64)?;
        let mut alias = alloc_vec("alias table", n, 0usize)?;
        let mut norm_prob = alloc_vec("alias table", n, 0f64)?;
        let mut small: Vec<usize> = Vec::new();
        let mut large: Vec<usize> = Vec::new();
        small.try_reserve_exact(n).map_err(|_| LineError::alloc("alias table", n))?;
        large.try_reserve_exact(n).map_err(|_| LineError::alloc("alias table", n))?;

        // Scale to mean 1
        let sum = weights.iter().sum::<f64>();
        norm_prob.iter_mut().zip(weights.iter()).for_each(|(p, w)| {
            *p = w * n as f64 / sum;
        });

        for k in (0..n).rev() {
            if norm_prob[k] < 1. {
                small.push(k);
            } else {
                large.push(k);
            }
        }

        while let (Some(&s), Some(&l)) = (small.last(), large.last()) {
            small.pop();
            large.pop();
            prob[s] = norm_prob[s];
            alias[s] = l;
            norm_prob[l] = norm_prob[l] + norm_prob[s] - 1.;
            if norm_prob[l] < 1. {
                small.push(l);
            } else {
                large.push(l);
            }
        }

        // Leftovers only differ from 1 by rounding error
        large.into_iter().chain(small.into_iter()).for_each(|k| prob[k] = 1.);

        Ok(AliasSampler { prob, alias })
    }

    /// Picks a slot with `r1` and decides between it and its alias with `r2`.  Both are expected
    /// to be uniform in [0, 1).
    #[inline]
    pub fn sample(&self, r1: f64, r2: f64) -> usize {
        let n = self.prob.len();
        let k = ((n as f64 * r1) as usize).min(n - 1);
        if r2 < self.prob[k] {
            k
        } else {
            self.alias[k]
        }
    }

    #[inline]
    pub fn sample_rng<R: Rng>(&self, rng: &mut R) -> usize {
        let r1: f64 = rng.gen();
        let r2: f64 = rng.gen();
        self.sample(r1, r2)
    }

    pub fn len(&self) -> usize {
        self.prob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prob.is_empty()
    }
}

/// Table of vertex ids where each vertex occupies a share of slots proportional to
/// degree^0.75.  Slot k holds the first vertex whose cumulative share reaches (k + 1) / size, so
/// with more vertices than slots the low-degree ones are skipped.  Drawing a uniform slot draws a
/// negative.
#[derive(Debug)]
pub struct NegativeSampler {
    table: Vec<u32>,
    dist: Uniform<usize>
}

impl NegativeSampler {
    pub fn new(degrees: &[f64], table_size: usize) -> Result<Self> {
        if degrees.is_empty() || table_size == 0 {
            return Err(LineError::Config("negative table needs vertices and slots".into()))
        }

        let mut table = alloc_vec("negative table", table_size, 0u32)?;
        let sum = degrees.iter().map(|d| d.powf(NEG_SAMPLING_POWER)).sum::<f64>();
        let last = degrees.len() - 1;

        let mut cur_sum = 0f64;
        let mut por = 0f64;
        let mut vid = 0usize;
        for (k, slot) in table.iter_mut().enumerate() {
            let threshold = (k + 1) as f64 / table_size as f64;
            while por < threshold && vid <= last {
                cur_sum += degrees[vid].powf(NEG_SAMPLING_POWER);
                por = cur_sum / sum;
                vid += 1;
            }
            *slot = (vid - 1) as u32;
        }

        Ok(NegativeSampler { table, dist: Uniform::new(0, table_size) })
    }

    #[inline]
    pub fn sample(&self, table_index: usize) -> NodeID {
        self.table[table_index] as NodeID
    }

    #[inline]
    pub fn sample_rng<R: Rng>(&self, rng: &mut R) -> NodeID {
        self.sample(self.dist.sample(rng))
    }

    pub fn table_size(&self) -> usize {
        self.table.len()
    }
}
