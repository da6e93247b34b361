use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stream_resolver::{ResolveOptions, parse_comma_list};
use tracing::debug;

use crate::cli::Args;

const CONFIG_DIR: &str = "stream-resolver";
const CONFIG_FILE: &str = "config.toml";

/// Contents of `config.toml`. Every table and key is optional.
///
/// ```toml
/// [resolve]
/// blacklist_netloc = ["example.com"]
/// playlist_max = 3
///
/// [output]
/// colored = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub resolve: ResolveOptions,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub colored: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { colored: true }
    }
}

impl AppConfig {
    /// Loads `path`, or the default config file when `path` is `None`.
    ///
    /// A missing default file yields the defaults, a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Command line values, falling back to the config file for anything unset.
pub fn resolve_options(args: &Args, config: &AppConfig) -> ResolveOptions {
    let list = |value: &Option<String>| value.as_deref().map(parse_comma_list).unwrap_or_default();

    ResolveOptions {
        blacklist_netloc: list(&args.blacklist_netloc),
        blacklist_path: list(&args.blacklist_path),
        whitelist_netloc: list(&args.whitelist_netloc),
        whitelist_path: list(&args.whitelist_path),
        playlist_max: args.playlist_max,
        playlist_referer: args.playlist_referer.clone(),
        user_agent: args.user_agent.clone(),
    }
    .merge(&config.resolve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    const CONFIG: &str = r#"
[resolve]
blacklist_netloc = ["ads.example.com"]
whitelist_netloc = ["player.example.com"]
playlist_max = 10

[output]
colored = false
"#;

    #[test]
    fn test_parse_config() {
        let config = AppConfig::parse(CONFIG).unwrap();
        assert_eq!(config.resolve.blacklist_netloc, vec!["ads.example.com".to_string()]);
        assert_eq!(config.resolve.playlist_max, Some(10));
        assert!(!config.output.colored);
    }

    #[test]
    fn test_empty_config() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.output.colored);
    }

    #[test]
    fn test_flags_override_file() {
        let config = AppConfig::parse(CONFIG).unwrap();
        let args = Args::try_parse_from([
            "resolve",
            "example.com",
            "--blacklist-netloc",
            "a.com, b.com",
            "--playlist-max",
            "2",
        ])
        .unwrap();

        let options = resolve_options(&args, &config);
        assert_eq!(options.blacklist_netloc, vec!["a.com".to_string(), "b.com".to_string()]);
        assert_eq!(options.whitelist_netloc, vec!["player.example.com".to_string()]);
        assert_eq!(options.playlist_max, Some(2));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.resolve.playlist_max, Some(10));

        let missing = file.path().with_extension("missing");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }
}
