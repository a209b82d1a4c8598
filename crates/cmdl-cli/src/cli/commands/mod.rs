//! CLI command handlers, one file per subcommand.

mod completions;
mod download;
mod info;

pub use completions::run_completions;
pub use download::{plan_download, run_download, PreparedDownload};
pub use info::{describe, run_info};
