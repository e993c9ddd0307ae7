//! LINE: Large-scale Information Network Embedding.  Learns first or second order proximity
//! embeddings with asynchronous SGD over edges drawn proportional to their weight, using negative
//! sampling in place of the full softmax.
use std::sync::atomic::{AtomicU64, Ordering};

use atomic_float::AtomicF32;
use log::{debug,info};
use rand::prelude::*;
use rand_xorshift::XorShiftRng;
use rayon::{ThreadPool,ThreadPoolBuilder};

use crate::config::{LineConfig,Order};
use crate::embeddings::EmbeddingStore;
use crate::error::{LineError,Result};
use crate::graph::{EdgeList,GraphLoader,NodeID};
use crate::progress::TrainingProgress;
use crate::sampler::{AliasSampler,NegativeSampler};
use crate::sigmoid::SigmoidLookup;
use crate::vocab::VertexIndex;

/// Threads fold their local sample count into the shared progress this often.
const REPORT_EVERY: u64 = 10_000;

/// The learning rate never decays below this fraction of its initial value.
const MIN_ALPHA_RATIO: f32 = 1e-4;

/// Finished embeddings, in the order vertices were first seen.
pub struct Embeddings {
    vocab: VertexIndex,
    store: EmbeddingStore
}

impl Embeddings {
    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.store.dims()
    }

    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.vocab.lookup(name).map(|node_id| self.store.vertex(node_id))
    }

    pub fn iter(&self) -> impl Iterator<Item=(&str, &[f32])> {
        self.vocab.names().enumerate()
            .map(move |(node_id, name)| (name, self.store.vertex(node_id)))
    }

    pub fn into_pairs(self) -> Vec<(String, Vec<f32>)> {
        self.iter().map(|(name, emb)| (name.to_string(), emb.to_vec())).collect()
    }

    pub fn vocab(&self) -> &VertexIndex {
        &self.vocab
    }
}

pub struct Line {
    pub config: LineConfig
}

impl Line {

    pub fn new(config: LineConfig) -> Self {
        Line { config }
    }

    /// Loads the edges, builds the samplers and trains.  Every allocation happens before the
    /// first worker starts, so errors never leave partial results behind.
    pub fn learn<S, T, I>(&self, edges: I) -> Result<Embeddings>
    where
        S: AsRef<str>,
        T: AsRef<str>,
        I: IntoIterator<Item=(S, T, f64)>
    {
        let order = self.config.validate()?;
        let (vocab, edges) = GraphLoader::load(edges, self.config.max_vertices)?;
        if edges.is_empty() {
            return Err(LineError::EmptyGraph)
        }

        info!("Building alias table...");
        let alias = AliasSampler::new(edges.weights())?;
        info!("Building negative table...");
        let negatives = NegativeSampler::new(vocab.degrees(), self.config.neg_table_size)?;
        let sigmoid = SigmoidLookup::new();

        let mut rng = XorShiftRng::seed_from_u64(self.config.seed);
        let mut store = EmbeddingStore::new(vocab.len(), self.config.dims)?;
        store.randomize(&mut rng);

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| LineError::Resource(format!("unable to start worker threads: {}", e)))?;

        let trainer = Trainer {
            config: &self.config,
            order,
            total_samples: self.config.total_samples(),
            edges: &edges,
            alias: &alias,
            negatives: &negatives,
            sigmoid: &sigmoid,
            store: &store,
            progress: AtomicU64::new(0),
            alpha: AtomicF32::new(self.config.alpha),
            pb: TrainingProgress::new(self.config.total_samples(), self.config.indicator)
        };

        info!("Training with {} threads, order {:?}, {} samples",
              self.config.threads, order, trainer.total_samples);
        let counts = trainer.train(&pool);
        trainer.pb.finish();
        info!("Finished training after {} samples", counts.iter().sum::<u64>());

        Ok(Embeddings { vocab, store })
    }
}

/// State shared by every worker for the duration of a run.
struct Trainer<'a> {
    config: &'a LineConfig,
    order: Order,
    total_samples: u64,
    edges: &'a EdgeList,
    alias: &'a AliasSampler,
    negatives: &'a NegativeSampler,
    sigmoid: &'a SigmoidLookup,
    store: &'a EmbeddingStore,

    /// Samples processed across threads.  Updated in chunks, so may lag behind
    progress: AtomicU64,

    /// Current learning rate
    alpha: AtomicF32,
    pb: TrainingProgress
}

impl <'a> Trainer<'a> {

    fn seeds(&self, thread_id: usize) -> (u64, u64) {
        let base = self.config.seed.wrapping_add(2 * thread_id as u64 + 1);
        (base, base.wrapping_add(1))
    }

    /// Runs one worker on every thread of the pool, returning the samples each one processed.
    fn train(&self, pool: &ThreadPool) -> Vec<u64> {
        pool.broadcast(|ctx| self.run(ctx.index()))
    }

    fn run(&self, thread_id: usize) -> u64 {
        let (edge_seed, neg_seed) = self.seeds(thread_id);
        let mut edge_rng = XorShiftRng::seed_from_u64(edge_seed);
        let mut neg_rng = XorShiftRng::seed_from_u64(neg_seed);

        let dims = self.config.dims;
        let mut error = vec![0f32; dims];
        let mut scratch = vec![0f32; dims];

        let budget = self.total_samples / self.config.threads as u64 + 2;
        let mut count = 0u64;
        let mut last_count = 0u64;
        debug!("Thread {} starting with budget {}", thread_id, budget);

        while count <= budget {
            if count - last_count > REPORT_EVERY {
                self.report(count - last_count);
                last_count = count;
            }
            // Other threads decay it too
            let alpha = self.alpha.load(Ordering::Relaxed);

            let (u, v, _) = self.edges.edge(self.alias.sample_rng(&mut edge_rng));
            self.train_edge(u, v, &mut neg_rng, &mut error, &mut scratch, alpha);
            count += 1;
        }
        debug!("Thread {} finished after {} samples", thread_id, count);
        count
    }

    /// Scores `u -> v` as a positive pair followed by `negatives` sampled pairs.  Each target row
    /// moves as soon as it is scored; the source row only takes the summed gradient at the end.
    fn train_edge<R: Rng>(
        &self,
        u: NodeID,
        v: NodeID,
        neg_rng: &mut R,
        error: &mut [f32],
        scratch: &mut [f32],
        alpha: f32
    ) {
        error.iter_mut().for_each(|ei| *ei = 0.);

        for d in 0..=self.config.negatives {
            let (target, label) = if d == 0 {
                (v, 1.)
            } else {
                (self.negatives.sample_rng(neg_rng), 0.)
            };

            match self.order {
                Order::First if target == u => {
                    // Source and target share a row
                    scratch.copy_from_slice(self.store.vertex(u));
                    self.update(scratch, self.store.vertex_mut_hogwild(target),
                                error, label, alpha);
                },
                Order::First => {
                    self.update(self.store.vertex(u), self.store.vertex_mut_hogwild(target),
                                error, label, alpha);
                },
                Order::Second => {
                    self.update(self.store.vertex(u), self.store.context_mut_hogwild(target),
                                error, label, alpha);
                }
            }
        }

        self.store.vertex_mut_hogwild(u).iter_mut().zip(error.iter())
            .for_each(|(si, ei)| *si += *ei);
    }

    /// Folds new samples into the global progress and recomputes the learning rate.
    fn report(&self, delta: u64) -> f32 {
        let progress = self.progress.fetch_add(delta, Ordering::Relaxed) + delta;
        let init_alpha = self.config.alpha;
        let alpha = (init_alpha * (1. - progress as f32 / (self.total_samples + 1) as f32))
            .max(init_alpha * MIN_ALPHA_RATIO);
        self.alpha.store(alpha, Ordering::Relaxed);

        self.pb.advance(delta, progress, alpha);
        alpha
    }

    /// One logistic regression step between source and target.  The target moves immediately;
    /// the source's gradient is accumulated into `error`.
    #[inline]
    fn update(&self, source: &[f32], target: &mut [f32], error: &mut [f32], label: f32, alpha: f32) {
        let x = source.iter().zip(target.iter()).map(|(s, t)| s * t).sum::<f32>();
        let g = (label - self.sigmoid.eval(x)) * alpha;
        error.iter_mut().zip(target.iter()).for_each(|(ei, ti)| *ei += g * ti);
        target.iter_mut().zip(source.iter()).for_each(|(ti, si)| *ti += g * si);
    }
}

#[cfg(test)]
mod line_tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn triangle() -> Vec<(&'static str, &'static str, f64)> {
        vec![("A", "B", 1.), ("B", "C", 1.), ("C", "A", 1.)]
    }

    fn small_config() -> LineConfig {
        LineConfig {
            dims: 2,
            order: 1,
            negatives: 1,
            samples: 1,
            alpha: 0.025,
            threads: 1,
            neg_table_size: 1_000_000,
            indicator: false,
            ..LineConfig::default()
        }
    }

    fn build_cliques(size: usize) -> Vec<(String, String, f64)> {
        let mut edges = Vec::new();
        for clique in ["left", "right"].iter() {
            for i in 0..size {
                for j in 0..size {
                    if i != j {
                        edges.push((format!("{}_{}", clique, i), format!("{}_{}", clique, j), 1.));
                    }
                }
            }
        }
        edges
    }

    fn cosine(e1: &[f32], e2: &[f32]) -> f32 {
        let dot = e1.iter().zip(e2.iter()).map(|(a, b)| a * b).sum::<f32>();
        let n1 = e1.iter().map(|a| a * a).sum::<f32>().sqrt();
        let n2 = e2.iter().map(|b| b * b).sum::<f32>().sqrt();
        dot / (n1 * n2)
    }

    #[allow(clippy::too_many_arguments)]
    fn trainer<'a>(
        config: &'a LineConfig,
        order: Order,
        edges: &'a EdgeList,
        alias: &'a AliasSampler,
        negatives: &'a NegativeSampler,
        sigmoid: &'a SigmoidLookup,
        store: &'a EmbeddingStore,
        total_samples: u64
    ) -> Trainer<'a> {
        Trainer {
            config,
            order,
            total_samples,
            edges,
            alias,
            negatives,
            sigmoid,
            store,
            progress: AtomicU64::new(0),
            alpha: AtomicF32::new(config.alpha),
            pb: TrainingProgress::new(total_samples, false)
        }
    }

    // Plain logistic step on fixed size rows
    fn sgd_step(sigmoid: &SigmoidLookup, source: [f32; 2], target: &mut [f32; 2],
                error: &mut [f32; 2], label: f32, alpha: f32) {
        let g = (label - sigmoid.eval(source[0] * target[0] + source[1] * target[1])) * alpha;
        for i in 0..2 {
            error[i] += g * target[i];
            target[i] += g * source[i];
        }
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-6, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_triangle() {
        init_logging();
        let embeddings = Line::new(small_config()).learn(triangle()).unwrap();
        assert_eq!(embeddings.len(), 3);
        assert_eq!(embeddings.dims(), 2);

        let pairs = embeddings.into_pairs();
        let names: Vec<_> = pairs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        for (_, emb) in pairs.iter() {
            assert_eq!(emb.len(), 2);
            assert!(emb.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_deterministic() {
        let mut config = small_config();
        config.dims = 8;
        config.negatives = 3;
        let line = Line::new(config);
        let e1 = line.learn(triangle()).unwrap().into_pairs();
        let e2 = line.learn(triangle()).unwrap().into_pairs();
        assert_eq!(e1, e2);

        // Different seed, different embeddings
        let mut config = line.config.clone();
        config.seed += 1;
        let e3 = Line::new(config).learn(triangle()).unwrap().into_pairs();
        assert_ne!(e1, e3);
    }

    #[test]
    fn test_second_order() {
        let mut config = small_config();
        config.order = 2;
        config.dims = 4;
        let embeddings = Line::new(config).learn(triangle()).unwrap();

        // Context vectors start at zero and only move under second order
        let store = &embeddings.store;
        assert!((0..3).any(|n| store.context(n).iter().any(|v| *v != 0.)));
        for (_, emb) in embeddings.iter() {
            assert!(emb.iter().all(|v| v.is_finite()));
        }
        assert_eq!(embeddings.get("B").map(|e| e.len()), Some(4));
        assert!(embeddings.get("D").is_none());
    }

    #[test]
    fn test_invalid_order() {
        let mut config = small_config();
        config.order = 3;
        let res = Line::new(config).learn(triangle());
        match res {
            Err(e) => {
                assert!(e.is_configuration());
                assert!(matches!(e, LineError::InvalidOrder(3)));
            },
            Ok(_) => panic!("Should not train with order 3")
        }
    }

    #[test]
    fn test_empty_graph() {
        let edges: Vec<(String, String, f64)> = Vec::new();
        let res = Line::new(small_config()).learn(edges);
        assert!(matches!(res, Err(LineError::EmptyGraph)));
    }

    #[test]
    fn test_self_loop() {
        let mut config = small_config();
        config.negatives = 2;
        let edges = vec![("A", "A", 1.), ("A", "B", 1.)];
        let embeddings = Line::new(config).learn(edges).unwrap();
        for (_, emb) in embeddings.iter() {
            assert!(emb.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_update() {
        let sigmoid = SigmoidLookup::new();
        let config = small_config();
        let edges = EdgeList::default();
        let alias = AliasSampler::new(&[1.]).unwrap();
        let negatives = NegativeSampler::new(&[1.], 1).unwrap();
        let store = EmbeddingStore::new(1, 2).unwrap();
        let trainer = trainer(&config, Order::First, &edges, &alias, &negatives, &sigmoid, &store, 1);

        // x = 0, sigmoid ~ 0.5
        let source = [1., 0.];
        let mut target = [0., 1.];
        let mut error = [0., 0.];
        trainer.update(&source, &mut target, &mut error, 1., 1.);
        let g = 1. - sigmoid.eval(0.);
        assert_eq!(error, [0., g]);
        assert_eq!(target, [g, 1.]);
    }

    #[test]
    fn test_train_edge_batches_source() {
        let sigmoid = SigmoidLookup::new();
        let mut config = small_config();
        config.negatives = 2;
        let edges = EdgeList::default();
        let alias = AliasSampler::new(&[1.]).unwrap();
        // One slot: every negative is the last vertex
        let negatives = NegativeSampler::new(&[1., 1., 1.], 1).unwrap();
        let store = EmbeddingStore::new(3, 2).unwrap();
        store.vertex_mut_hogwild(0).copy_from_slice(&[0.5, -0.25]);
        store.vertex_mut_hogwild(1).copy_from_slice(&[0.1, 0.2]);
        store.vertex_mut_hogwild(2).copy_from_slice(&[-0.3, 0.7]);
        store.context_mut_hogwild(1).copy_from_slice(&[0.3, 0.8]);
        store.context_mut_hogwild(2).copy_from_slice(&[-0.6, 0.4]);

        let trainer = trainer(&config, Order::Second, &edges, &alias, &negatives, &sigmoid, &store, 1);
        let mut rng = XorShiftRng::seed_from_u64(7);
        let mut error = vec![0f32; 2];
        let mut scratch = vec![0f32; 2];
        let alpha = 0.5;
        trainer.train_edge(0, 1, &mut rng, &mut error, &mut scratch, alpha);

        // Every pair is scored against the source as it was before the edge
        let source = [0.5, -0.25];
        let mut context = [[0f32; 2], [0.3, 0.8], [-0.6, 0.4]];
        let mut expected_error = [0f32; 2];
        for (t, label) in [(1usize, 1f32), (2, 0.), (2, 0.)].iter() {
            sgd_step(&sigmoid, source, &mut context[*t], &mut expected_error, *label, alpha);
        }

        assert_close(store.context(1), &context[1]);
        assert_close(store.context(2), &context[2]);
        assert_close(&error, &expected_error);
        assert_close(store.vertex(0),
                     &[source[0] + expected_error[0], source[1] + expected_error[1]]);

        // Nothing else moves
        assert_eq!(store.context(0), &[0., 0.]);
        assert_eq!(store.vertex(1), &[0.1, 0.2]);
        assert_eq!(store.vertex(2), &[-0.3, 0.7]);
    }

    #[test]
    fn test_train_edge_self_pair() {
        let sigmoid = SigmoidLookup::new();
        let config = small_config();
        let edges = EdgeList::default();
        let alias = AliasSampler::new(&[1.]).unwrap();
        let negatives = NegativeSampler::new(&[1., 1.], 1).unwrap();
        let store = EmbeddingStore::new(2, 2).unwrap();
        store.vertex_mut_hogwild(0).copy_from_slice(&[0.5, -0.25]);
        store.vertex_mut_hogwild(1).copy_from_slice(&[0.3, 0.8]);

        let trainer = trainer(&config, Order::First, &edges, &alias, &negatives, &sigmoid, &store, 1);
        let mut rng = XorShiftRng::seed_from_u64(7);
        let mut error = vec![0f32; 2];
        let mut scratch = vec![0f32; 2];
        let alpha = 0.5;
        trainer.train_edge(0, 0, &mut rng, &mut error, &mut scratch, alpha);

        // The positive pair updates the shared row against a copy of itself, and the negative
        // then reads the row as that update left it
        let mut rows = [[0.5f32, -0.25], [0.3, 0.8]];
        let mut expected_error = [0f32; 2];
        let source = rows[0];
        sgd_step(&sigmoid, source, &mut rows[0], &mut expected_error, 1., alpha);
        let source = rows[0];
        sgd_step(&sigmoid, source, &mut rows[1], &mut expected_error, 0., alpha);
        rows[0][0] += expected_error[0];
        rows[0][1] += expected_error[1];

        assert_close(store.vertex(0), &rows[0]);
        assert_close(store.vertex(1), &rows[1]);
        assert_close(&error, &expected_error);
        assert_eq!(store.context(0), &[0., 0.]);
    }

    #[test]
    fn test_every_worker_runs() {
        let mut config = small_config();
        config.threads = 3;
        let (vocab, edges) = GraphLoader::load(triangle(), config.max_vertices).unwrap();
        let sigmoid = SigmoidLookup::new();
        let alias = AliasSampler::new(edges.weights()).unwrap();
        let negatives = NegativeSampler::new(vocab.degrees(), 1000).unwrap();
        let mut store = EmbeddingStore::new(vocab.len(), config.dims).unwrap();
        store.randomize(&mut XorShiftRng::seed_from_u64(config.seed));

        let trainer = trainer(&config, Order::First, &edges, &alias, &negatives, &sigmoid, &store,
                              30_000);
        let pool = ThreadPoolBuilder::new().num_threads(config.threads).build().unwrap();
        let counts = trainer.train(&pool);

        // Each thread works through its own share of the budget exactly once
        assert_eq!(counts, vec![10_003; 3]);
        assert!(trainer.progress.load(Ordering::Relaxed) <= 30_009);
    }

    #[test]
    fn test_alpha_decay() {
        let sigmoid = SigmoidLookup::new();
        let config = small_config();
        let edges = EdgeList::default();
        let alias = AliasSampler::new(&[1.]).unwrap();
        let negatives = NegativeSampler::new(&[1.], 1).unwrap();
        let store = EmbeddingStore::new(1, 2).unwrap();
        let trainer = trainer(&config, Order::First, &edges, &alias, &negatives, &sigmoid, &store,
                              999_999);

        let a1 = trainer.report(500_000);
        assert!((a1 - config.alpha * 0.5).abs() < 1e-6);
        assert_eq!(trainer.alpha.load(Ordering::Relaxed), a1);

        // Past the budget it bottoms out
        let a2 = trainer.report(2_000_000);
        assert_eq!(a2, config.alpha * MIN_ALPHA_RATIO);
    }

    #[test]
    fn test_hogwild_convergence() {
        init_logging();
        let mut config = small_config();
        config.dims = 16;
        config.negatives = 5;
        config.threads = 4;
        config.alpha = 0.025;
        let embeddings = Line::new(config).learn(build_cliques(6)).unwrap();
        assert_eq!(embeddings.len(), 12);

        let mut intra = Vec::new();
        let mut inter = Vec::new();
        let names: Vec<_> = embeddings.vocab().names().map(|n| n.to_string()).collect();
        for (i, n1) in names.iter().enumerate() {
            for n2 in names.iter().skip(i + 1) {
                let e1 = embeddings.get(n1).unwrap();
                let e2 = embeddings.get(n2).unwrap();
                assert!(e1.iter().chain(e2.iter()).all(|v| v.is_finite()));
                let same = n1.split('_').next() == n2.split('_').next();
                if same {
                    intra.push(cosine(e1, e2));
                } else {
                    inter.push(cosine(e1, e2));
                }
            }
        }
        let mean = |v: &[f32]| v.iter().sum::<f32>() / v.len() as f32;
        assert!(mean(&intra) > mean(&inter), "intra: {}, inter: {}", mean(&intra), mean(&inter));
    }
}
