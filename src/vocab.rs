use std::sync::Arc;

use hashbrown::HashMap;

use crate::graph::NodeID;
use crate::error::{LineError,Result};

/// Maps vertex names to sequential ids in first-seen order, tracking the weighted degree of each
/// vertex alongside.  Ids index into `idx_to_vocab` so they survive the map growing.
#[derive(Debug)]
pub struct VertexIndex {
    vocab_to_idx: HashMap<Arc<str>, NodeID>,
    idx_to_vocab: Vec<Arc<str>>,
    degrees: Vec<f64>,
    max_vertices: usize
}

impl VertexIndex {
    pub fn new(max_vertices: usize) -> Self {
        VertexIndex {
            vocab_to_idx: HashMap::new(),
            idx_to_vocab: Vec::new(),
            degrees: Vec::new(),
            max_vertices
        }
    }

    pub fn lookup(&self, name: &str) -> Option<NodeID> {
        self.vocab_to_idx.get(name).copied()
    }

    pub fn insert(&mut self, name: &str) -> Result<NodeID> {
        if let Some(node_id) = self.vocab_to_idx.get(name) {
            return Ok(*node_id)
        }

        let new_idx = self.idx_to_vocab.len();
        if new_idx >= self.max_vertices {
            return Err(LineError::CapacityExceeded { limit: self.max_vertices })
        }

        self.vocab_to_idx.try_reserve(1)
            .map_err(|_| LineError::alloc("vertex hash table", new_idx + 1))?;
        self.idx_to_vocab.try_reserve(1)
            .map_err(|_| LineError::alloc("vertex names", new_idx + 1))?;
        self.degrees.try_reserve(1)
            .map_err(|_| LineError::alloc("vertex degrees", new_idx + 1))?;

        let node: Arc<str> = Arc::from(name);
        self.vocab_to_idx.insert(node.clone(), new_idx);
        self.idx_to_vocab.push(node);
        self.degrees.push(0.);
        Ok(new_idx)
    }

    pub fn add_degree(&mut self, node: NodeID, weight: f64) {
        self.degrees[node] += weight;
    }

    pub fn name(&self, node: NodeID) -> Option<&str> {
        self.idx_to_vocab.get(node).map(|n| n.as_ref())
    }

    pub fn degree(&self, node: NodeID) -> f64 {
        self.degrees[node]
    }

    pub fn degrees(&self) -> &[f64] {
        &self.degrees
    }

    /// Names in id order
    pub fn names(&self) -> impl Iterator<Item=&str> {
        self.idx_to_vocab.iter().map(|n| n.as_ref())
    }

    pub fn len(&self) -> usize {
        self.idx_to_vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx_to_vocab.is_empty()
    }
}
