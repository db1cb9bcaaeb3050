//! Banner output

use colored::Colorize;
use tracing::info;

/// Emit a highlighted section title, when banners are enabled
pub fn banner(enabled: bool, title: &str) {
    if enabled {
        info!("{}", format_banner(title));
    }
}

fn format_banner(title: &str) -> String {
    format!("{} {}", "====".magenta(), title.bold().magenta())
}
