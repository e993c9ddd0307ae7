use std::time::Duration;

use indicatif::{ProgressBar,ProgressStyle};

/// Terminal progress for a training run, shared by all trainer threads.  Disabled runs skip all
/// drawing.
pub struct TrainingProgress {
    pb: Option<ProgressBar>,
    total: u64
}

impl TrainingProgress {
    pub fn new(total: u64, enabled: bool) -> Self {
        let pb = if enabled {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template("[{msg}] {wide_bar} ({per_sec}) {pos:>7}/{len:7} - Elapsed: {elapsed_precise}, Remaining: {eta_precise}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());

            pb.set_style(style);

            // Update in separate thread
            pb.enable_steady_tick(Duration::from_millis(200));
            Some(pb)
        } else {
            None
        };

        TrainingProgress { pb, total }
    }

    /// Records `delta` more samples and shows the learning rate they were trained at.  `done` is
    /// the global sample count after the update.
    pub fn advance(&self, delta: u64, done: u64, alpha: f32) {
        if let Some(pb) = &self.pb {
            pb.inc(delta);
            pb.set_message(format!("Rho: {:.6}  Progress: {:.3}%", alpha, self.percent(done)));
        }
    }

    pub fn percent(&self, done: u64) -> f32 {
        done as f32 / (self.total + 1) as f32 * 100.
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish();
        }
    }
}
