use std::path::PathBuf;

use clap::Parser;

/// git invokes this as `git-remote-zkgit <remote> <url>` and speaks the
/// remote-helper protocol on stdin/stdout.
#[derive(Parser, Debug)]
#[command(
    name = "git-remote-zkgit",
    about = "git remote helper for repositories kept by a zkgit companion process",
    version
)]
pub struct Cli {
    /// Remote name as configured in git (or the URL itself).
    pub remote: String,

    /// Remote URL. The companion port is its last `:<port>/` segment.
    pub url: String,

    /// Local repository directory. Defaults to `GIT_DIR`, then discovery
    /// from the current directory.
    pub dir: Option<PathBuf>,

    /// Log progress to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// TOML configuration file.
    #[arg(long, env = "ZKGIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Concurrent object copies.
    #[arg(long, env = "ZKGIT_WORKERS")]
    pub workers: Option<usize>,

    #[arg(long, env = "ZKGIT_CONNECT_TIMEOUT_SECS")]
    pub connect_timeout_secs: Option<u64>,

    /// Time allowed for one control exchange, including the companion's
    /// upload or download.
    #[arg(long, env = "ZKGIT_IO_TIMEOUT_SECS")]
    pub io_timeout_secs: Option<u64>,

    /// Where staging repositories and snapshot archives live.
    #[arg(long, env = "ZKGIT_TEMP_ROOT")]
    pub temp_root: Option<PathBuf>,

    /// Ask the companion to clean its temporary files when git is done.
    #[arg(long)]
    pub clean_on_exit: bool,
}
