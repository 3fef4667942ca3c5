mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_report;
pub use progress::{PhaseProgress, RangeProgress};
pub use styling::{dim, magenta_bold};

/// Prints the `pushlens` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔎 pushlens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI Regression Inference")
    );
}
