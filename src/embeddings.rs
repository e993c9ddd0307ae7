use rand::prelude::*;

use crate::graph::NodeID;
use crate::hogwild::Hogwild;
use crate::error::{LineError,Result};

/// Vertex and context matrices, each one contiguous row-major buffer.  Rows are handed out
/// without locking so that trainer threads can update them concurrently.
pub struct EmbeddingStore {
    nodes: usize,
    dims: usize,
    vertex: Hogwild<Vec<f32>>,
    context: Hogwild<Vec<f32>>
}

fn alloc_matrix(what: &str, len: usize) -> Result<Vec<f32>> {
    let mut m = Vec::new();
    m.try_reserve_exact(len).map_err(|_| LineError::alloc(what, len))?;
    m.resize(len, 0.);
    Ok(m)
}

impl EmbeddingStore {
    /// Allocates both matrices zeroed.
    pub fn new(nodes: usize, dims: usize) -> Result<Self> {
        let len = nodes.checked_mul(dims)
            .ok_or_else(|| LineError::Resource(format!("{} x {} embeddings overflow", nodes, dims)))?;

        Ok(EmbeddingStore {
            nodes,
            dims,
            vertex: Hogwild::new(alloc_matrix("vertex embeddings", len)?),
            context: Hogwild::new(alloc_matrix("context embeddings", len)?)
        })
    }

    /// Fills the vertex matrix with uniform noise in [-0.5 / dims, 0.5 / dims).  Context stays
    /// zeroed.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        let dims = self.dims as f32;
        self.vertex.get().iter_mut().for_each(|ei| {
            *ei = (rng.gen::<f32>() - 0.5) / dims;
        });
    }

    pub fn len(&self) -> usize {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    #[inline]
    fn range(&self, node_id: NodeID) -> std::ops::Range<usize> {
        let start = node_id * self.dims;
        start..start + self.dims
    }

    pub fn vertex(&self, node_id: NodeID) -> &[f32] {
        &self.vertex[self.range(node_id)]
    }

    pub fn context(&self, node_id: NodeID) -> &[f32] {
        &self.context[self.range(node_id)]
    }

    /// Mutable row without synchronization.  Other threads may be reading or writing the same row.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub fn vertex_mut_hogwild(&self, node_id: NodeID) -> &mut [f32] {
        let r = self.range(node_id);
        &mut self.vertex.get()[r]
    }

    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub fn context_mut_hogwild(&self, node_id: NodeID) -> &mut [f32] {
        let r = self.range(node_id);
        &mut self.context.get()[r]
    }
}
