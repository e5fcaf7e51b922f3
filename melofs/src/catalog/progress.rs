#[cfg(feature = "progress")]
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

// Progress trait abstraction
pub trait ProgressTracker: Send + Sync {
    fn start_download(&self, track_id: u64, title: &str, total_bytes: u64);
    fn update(&self, track_id: u64, bytes: u64);
    fn finish(&self, track_id: u64);
}

// No-op implementation
pub struct NoopProgress;

impl ProgressTracker for NoopProgress {
    fn start_download(&self, _track_id: u64, _title: &str, _total_bytes: u64) {}
    fn update(&self, _track_id: u64, _bytes: u64) {}
    fn finish(&self, _track_id: u64) {}
}

// Indicatif implementation (only when feature enabled)
#[cfg(feature = "progress")]
pub struct IndicatifProgress {
    multi: MultiProgress,
    bars: std::sync::Mutex<std::collections::HashMap<u64, ProgressBar>>,
}

#[cfg(feature = "progress")]
impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[cfg(feature = "progress")]
impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "progress")]
impl ProgressTracker for IndicatifProgress {
    fn start_download(&self, track_id: u64, title: &str, total_bytes: u64) {
        let pb = self.multi.add(ProgressBar::new(total_bytes));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(title.to_string());
        self.bars.lock().unwrap().insert(track_id, pb);
    }

    fn update(&self, track_id: u64, bytes: u64) {
        if let Some(pb) = self.bars.lock().unwrap().get(&track_id) {
            pb.inc(bytes);
        }
    }

    fn finish(&self, track_id: u64) {
        if let Some(pb) = self.bars.lock().unwrap().remove(&track_id) {
            pb.finish_with_message("Done");
        }
    }
}
