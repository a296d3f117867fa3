/// Trait for receiving progress updates while sectors are processed.
///
/// All methods take `&self` so one reporter can be shared by the rayon
/// workers of a parallel verify.
pub trait SectorProgress: Send + Sync {
    /// Called once before any sector is processed.
    fn start(&self, _label: &str, _total_sectors: u64) {}

    /// Called after each batch of sectors.
    fn advance(&self, _sectors: u64) {}

    /// Called when every sector has been processed.
    fn finish(&self) {}
}

/// A no-op progress implementation that discards all updates.
pub struct SilentProgress;

impl SectorProgress for SilentProgress {}

/// Console progress reporter using an indicatif progress bar on stderr.
#[cfg(feature = "cli")]
pub struct ConsoleProgress {
    bar: indicatif::ProgressBar,
}

#[cfg(feature = "cli")]
impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            bar: indicatif::ProgressBar::hidden(),
        }
    }
}

#[cfg(feature = "cli")]
impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl SectorProgress for ConsoleProgress {
    fn start(&self, label: &str, total_sectors: u64) {
        self.bar
            .set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_length(total_sectors);
        self.bar.set_position(0);
        self.bar.set_message(label.to_owned());

        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{msg} {bar:40.cyan/blue} {pos}/{len} sectors [{elapsed_precise}]")
        {
            self.bar.set_style(style.progress_chars("━╸─"));
        }

        self.bar.reset();
    }

    fn advance(&self, sectors: u64) {
        self.bar.inc(sectors);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
