// Terminal progress bar

use fanout_core::port::{Progress, ProgressObserver};
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} targets ({msg})";

pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        // Falls back to the default style if the template is rejected
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl ProgressObserver for BarProgress {
    fn on_progress(&self, progress: Progress) {
        self.bar.set_length(progress.submitted as u64);
        self.bar.set_position(progress.finalized as u64);
        self.bar.set_message(format!("{:.0}%", progress.percent));
    }

    fn on_finish(&self, progress: Progress) {
        self.on_progress(progress);
        self.bar.finish_and_clear();
    }
}
