use indicatif::{ProgressBar, ProgressStyle};
use metallum_harvest::ProgressSink;
use std::time::Duration;

/// Terminal progress bar, one tick per candidate album.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} albums ({elapsed}) {msg}")
        {
            bar.set_style(style.progress_chars("█▓░"));
        }
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn advance(&self, by: u64) {
        self.bar.inc(by);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
