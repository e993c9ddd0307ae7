//! Python bindings.  Built with `--features python`.
use pyo3::prelude::*;
use pyo3::exceptions::{PyValueError,PyMemoryError,PyIOError,PyKeyError};

use crate::algos::line::{Line,Embeddings};
use crate::config::{LineConfig,DEFAULT_SEED};
use crate::error::LineError;
use crate::io::{EdgeReader,EmbeddingWriter,OutputFormat};

impl From<LineError> for PyErr {
    fn from(e: LineError) -> PyErr {
        match e {
            LineError::Resource(_) => PyMemoryError::new_err(e.to_string()),
            LineError::Io(_) => PyIOError::new_err(e.to_string()),
            _ => PyValueError::new_err(e.to_string())
        }
    }
}

#[pyclass]
struct LineEmbedder {
    config: LineConfig
}

#[pymethods]
impl LineEmbedder {
    #[new]
    fn new(
        dims: Option<usize>,
        order: Option<usize>,
        negatives: Option<usize>,
        samples: Option<usize>,
        alpha: Option<f32>,
        threads: Option<usize>,
        seed: Option<u64>,
        neg_table_size: Option<usize>,
        indicator: Option<bool>
    ) -> PyResult<Self> {
        let default = LineConfig::default();
        let config = LineConfig {
            dims: dims.unwrap_or(default.dims),
            order: order.unwrap_or(default.order),
            negatives: negatives.unwrap_or(default.negatives),
            samples: samples.unwrap_or(default.samples),
            alpha: alpha.unwrap_or(default.alpha),
            threads: threads.unwrap_or(default.threads),
            seed: seed.unwrap_or(DEFAULT_SEED),
            neg_table_size: neg_table_size.unwrap_or(default.neg_table_size),
            indicator: indicator.unwrap_or(true),
            ..default
        };

        // Fail on construction rather than on learn
        config.validate()?;
        Ok(LineEmbedder { config })
    }

    pub fn learn(&self, py: Python<'_>, edges: Vec<(String,String,f64)>) -> PyResult<NodeEmbeddings> {
        let line = Line::new(self.config.clone());
        let embeddings = py.allow_threads(move || line.learn(edges))?;
        Ok(NodeEmbeddings { embeddings })
    }

    pub fn learn_file(&self, py: Python<'_>, path: String, chunk_size: Option<usize>) -> PyResult<NodeEmbeddings> {
        let line = Line::new(self.config.clone());
        let embeddings = py.allow_threads(move || {
            let edges = EdgeReader::new(chunk_size.unwrap_or(10_000)).load(&path)?;
            line.learn(edges)
        })?;
        Ok(NodeEmbeddings { embeddings })
    }
}

#[pyclass]
struct NodeEmbeddings {
    embeddings: Embeddings
}

#[pymethods]
impl NodeEmbeddings {

    pub fn get_embedding(&self, name: String) -> PyResult<Vec<f32>> {
        self.embeddings.get(&name)
            .map(|e| e.to_vec())
            .ok_or_else(|| PyKeyError::new_err(format!(" Node '{}' does not exist!", name)))
    }

    pub fn contains_node(&self, name: String) -> bool {
        self.embeddings.get(&name).is_some()
    }

    pub fn vocab(&self) -> Vec<String> {
        self.embeddings.vocab().names().map(|n| n.to_string()).collect()
    }

    pub fn dims(&self) -> usize {
        self.embeddings.dims()
    }

    pub fn __len__(&self) -> usize {
        self.embeddings.len()
    }

    pub fn save(&self, path: String, binary: Option<bool>, comp_level: Option<u32>) -> PyResult<()> {
        let format = OutputFormat::from_binary_flag(binary.unwrap_or(false));
        let mut writer = EmbeddingWriter::create(&path, format, comp_level)?;
        writer.write(&self.embeddings)?;
        Ok(())
    }
}

/// Vector in, vector out: parallel lists of sources, targets and weights produce vertex names and
/// their embeddings in first-seen order.
#[pyfunction]
fn train_line(
    py: Python<'_>,
    sources: Vec<String>,
    targets: Vec<String>,
    weights: Vec<f64>,
    dims: usize,
    order: usize,
    negatives: usize,
    samples: usize,
    alpha: f32,
    threads: usize,
    seed: Option<u64>
) -> PyResult<(Vec<String>, Vec<Vec<f32>>)> {
    if sources.len() != targets.len() || sources.len() != weights.len() {
        return Err(PyValueError::new_err("sources, targets and weights must have the same length"))
    }

    let config = LineConfig {
        dims, order, negatives, samples, alpha, threads,
        seed: seed.unwrap_or(DEFAULT_SEED),
        indicator: false,
        ..LineConfig::default()
    };

    let embeddings = py.allow_threads(move || {
        let edges = sources.into_iter().zip(targets.into_iter()).zip(weights.into_iter())
            .map(|((s, t), w)| (s, t, w));
        Line::new(config).learn(edges)
    })?;

    Ok(embeddings.into_pairs().into_iter().unzip())
}

#[pymodule]
fn line_embedding(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_class::<LineEmbedder>()?;
    m.add_class::<NodeEmbeddings>()?;
    m.add_function(wrap_pyfunction!(train_line, m)?)?;
    Ok(())
}
