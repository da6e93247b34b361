use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Page to resolve, optionally prefixed with resolve://
    pub url: String,

    /// Comma separated hosts that are never followed
    #[arg(long, value_name = "HOSTS")]
    pub blacklist_netloc: Option<String>,

    /// Comma separated host/path prefixes that are never followed
    #[arg(long, value_name = "PATHS")]
    pub blacklist_path: Option<String>,

    /// Comma separated hosts, only iframes on them are followed
    #[arg(long, value_name = "HOSTS")]
    pub whitelist_netloc: Option<String>,

    /// Comma separated host/path prefixes, only iframes under them are followed
    #[arg(long, value_name = "PATHS")]
    pub whitelist_path: Option<String>,

    /// Maximum playlists built per format (1-25, default 5)
    #[arg(long, value_name = "N")]
    pub playlist_max: Option<usize>,

    /// Referer sent when fetching playlists
    #[arg(long, value_name = "URL")]
    pub playlist_referer: Option<String>,

    /// Overrides the default User-Agent
    #[arg(long, env = "RESOLVE_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Configuration file, defaults to <config dir>/stream-resolver/config.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
    JsonCompact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "resolve",
            "resolve://example.com/live",
            "--whitelist-netloc",
            "example.com,cdn.example.com",
            "--playlist-max",
            "3",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(args.url, "resolve://example.com/live");
        assert_eq!(args.whitelist_netloc.as_deref(), Some("example.com,cdn.example.com"));
        assert_eq!(args.playlist_max, Some(3));
        assert_eq!(args.output, OutputFormat::Json);
        assert!(!args.verbose);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["resolve", "x", "-v", "-q"]).is_err());
    }
}
