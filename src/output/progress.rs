use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_red, bright_yellow};

/// Progress tracking for the three phases of a push analysis
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1(revision: &str) -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(
            bright_yellow(format!("Phase 1/3: Fetching tasks for {revision}")).to_string(),
        );
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self, task_count: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 1/3: Fetched {task_count} tasks ✓")).to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 2/3: Walking ancestor pushes").to_string());
        Self { pb }
    }

    pub fn finish_phase_2_start_phase_3(self, regression_count: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!(
                "Phase 2/3: Found {regression_count} regressions ✓"
            ))
            .to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 3/3: Building report").to_string());
        Self { pb }
    }

    /// Passes `result` through, stopping the spinner if it is an error.
    pub fn check<T, E>(&self, result: Result<T, E>) -> Result<T, E> {
        abandon_on_error(&self.pb, result)
    }

    pub fn finish_phase_3(self) {
        self.pb
            .finish_with_message(bright_green("Phase 3/3: Report built ✓").to_string());
        eprintln!();
    }
}

/// Progress bar over the pushes of a range
pub struct RangeProgress {
    pb: ProgressBar,
}

impl RangeProgress {
    pub fn start(total: usize) -> Self {
        let pb = ProgressBar::new(total as u64);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) =
            ProgressStyle::default_bar().template("  {msg} [{bar:30.yellow}] {pos}/{len}")
        {
            pb.set_style(style);
        }
        pb.set_message(bright_yellow("Analyzing pushes").to_string());
        Self { pb }
    }

    pub fn advance(&self, revision: &str) {
        self.pb.set_message(bright_yellow(format!("Analyzing {revision}")).to_string());
        self.pb.inc(1);
    }

    pub fn check<T, E>(&self, result: Result<T, E>) -> Result<T, E> {
        abandon_on_error(&self.pb, result)
    }

    pub fn finish(self) {
        self.pb
            .finish_with_message(bright_green("Pushes analyzed ✓").to_string());
        eprintln!();
    }
}

fn abandon_on_error<T, E>(pb: &ProgressBar, result: Result<T, E>) -> Result<T, E> {
    if result.is_err() {
        pb.abandon_with_message(bright_red("Failed ✗").to_string());
    }
    result
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_check_stops_spinner_on_error() {
        let progress = PhaseProgress::start_phase_1("abc123");

        assert_eq!(progress.check::<_, &str>(Ok(3)), Ok(3));
        assert!(!progress.pb.is_finished());

        assert_eq!(progress.check::<u32, _>(Err("network down")), Err("network down"));
        assert!(progress.pb.is_finished());
    }

    #[test]
    fn test_range_check_stops_bar_on_error() {
        let progress = RangeProgress::start(2);
        progress.advance("abc123");

        assert!(progress.check::<(), _>(Err("boom")).is_err());
        assert!(progress.pb.is_finished());
    }
}
