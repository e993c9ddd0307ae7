//! LINE graph embeddings: first and second order proximity embeddings for weighted directed
//! graphs, trained with lock-free multi-threaded SGD.
//!
//! ```no_run
//! use line_embedding::{Line,LineConfig};
//!
//! let edges = vec![("a", "b", 1.), ("b", "c", 1.), ("c", "a", 1.)];
//! let config = LineConfig { dims: 16, order: 1, threads: 4, ..LineConfig::default() };
//! let embeddings = Line::new(config).learn(edges).unwrap();
//! for (name, emb) in embeddings.iter() {
//!     println!("{}: {:?}", name, emb);
//! }
//! ```

pub mod graph;
pub mod algos;
pub mod sampler;
pub mod sigmoid;
pub mod vocab;
pub mod embeddings;
pub mod config;
pub mod error;
pub mod io;
mod hogwild;
mod progress;

#[cfg(feature = "python")]
mod python;

pub use crate::algos::line::{Line,Embeddings};
pub use crate::config::{LineConfig,Order};
pub use crate::error::{LineError,Result};
pub use crate::graph::NodeID;
