use log::info;

use crate::vocab::VertexIndex;
use crate::error::{LineError,Result};

pub type NodeID = usize;

/// Flat directed edge arrays.  Duplicate edges are kept as separate instances, so sampling
/// treats them independently.
#[derive(Debug, Default)]
pub struct EdgeList {
    sources: Vec<NodeID>,
    targets: Vec<NodeID>,
    weights: Vec<f64>
}

impl EdgeList {

    fn with_capacity(n: usize) -> Result<Self> {
        let mut el = EdgeList::default();
        el.reserve(n)?;
        Ok(el)
    }

    fn reserve(&mut self, n: usize) -> Result<()> {
        let err = |_| LineError::alloc("edge arrays", n);
        self.sources.try_reserve(n).map_err(err)?;
        self.targets.try_reserve(n).map_err(err)?;
        self.weights.try_reserve(n).map_err(err)?;
        Ok(())
    }

    fn push(&mut self, source: NodeID, target: NodeID, weight: f64) -> Result<()> {
        if self.sources.len() == self.sources.capacity() {
            self.reserve(self.sources.len().max(16))?;
        }
        self.sources.push(source);
        self.targets.push(target);
        self.weights.push(weight);
        Ok(())
    }

    /// Get number of edges
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn sources(&self) -> &[NodeID] {
        &self.sources
    }

    pub fn targets(&self) -> &[NodeID] {
        &self.targets
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Get source, target and weight of the kth edge
    pub fn edge(&self, k: usize) -> (NodeID, NodeID, f64) {
        (self.sources[k], self.targets[k], self.weights[k])
    }
}

pub struct GraphLoader;

impl GraphLoader {

    /// Streams (source, target, weight) triples into a vertex index and edge arrays in a single
    /// pass.  Both endpoints accumulate the edge weight in their degree.
    pub fn load<S, T, I>(edges: I, max_vertices: usize) -> Result<(VertexIndex, EdgeList)>
    where
        S: AsRef<str>,
        T: AsRef<str>,
        I: IntoIterator<Item=(S, T, f64)>
    {
        let it = edges.into_iter();
        let mut vocab = VertexIndex::new(max_vertices);
        let mut edge_list = EdgeList::with_capacity(it.size_hint().0)?;

        info!("Constructing vocab...");
        for (k, (from_node, to_node, weight)) in it.enumerate() {
            if !(weight > 0.) || !weight.is_finite() {
                return Err(LineError::InvalidWeight { edge: k, weight })
            }

            let f_id = vocab.insert(from_node.as_ref())?;
            vocab.add_degree(f_id, weight);

            let t_id = vocab.insert(to_node.as_ref())?;
            vocab.add_degree(t_id, weight);

            edge_list.push(f_id, t_id, weight)?;
        }
        info!("Number of edges: {}", edge_list.len());
        info!("Number of vertices: {}", vocab.len());

        Ok((vocab, edge_list))
    }
}
