use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Playlists built per format when `playlist_max` is unset or `0`.
pub const DEFAULT_PLAYLIST_MAX: usize = 5;
/// Largest accepted `playlist_max`.
pub const MAX_PLAYLIST_MAX: usize = 25;

/// User options for one resolution.
///
/// Deserializable so it can be read from a `[resolve]` config table; every
/// field is optional there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Hosts whose iframes and playlists are never followed.
    pub blacklist_netloc: Vec<String>,
    /// `host/path` prefixes that are never followed.
    pub blacklist_path: Vec<String>,
    /// When set, only iframes on these hosts are followed.
    pub whitelist_netloc: Vec<String>,
    /// When set, only iframes under these `host/path` prefixes are followed.
    pub whitelist_path: Vec<String>,
    /// Maximum playlists built per format, `1..=25`.
    pub playlist_max: Option<usize>,
    /// Referer sent when building streams, instead of the page URL.
    pub playlist_referer: Option<String>,
    /// Overrides the automatic User-Agent choice.
    pub user_agent: Option<String>,
}

impl ResolveOptions {
    pub fn validate(&self) -> Result<(), ResolveError> {
        if let Some(max) = self.playlist_max
            && max > MAX_PLAYLIST_MAX
        {
            return Err(ResolveError::InvalidOption(format!(
                "playlist_max must be between 1 and {MAX_PLAYLIST_MAX}, got {max}"
            )));
        }
        if let Some(referer) = &self.playlist_referer
            && referer.trim().is_empty()
        {
            return Err(ResolveError::InvalidOption(
                "playlist_referer must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn effective_playlist_max(&self) -> usize {
        match self.playlist_max {
            None | Some(0) => DEFAULT_PLAYLIST_MAX,
            Some(max) => max.min(MAX_PLAYLIST_MAX),
        }
    }

    /// Fills unset fields from `other`. Lists are only taken when empty here.
    pub fn merge(mut self, other: &ResolveOptions) -> Self {
        fill_list(&mut self.blacklist_netloc, &other.blacklist_netloc);
        fill_list(&mut self.blacklist_path, &other.blacklist_path);
        fill_list(&mut self.whitelist_netloc, &other.whitelist_netloc);
        fill_list(&mut self.whitelist_path, &other.whitelist_path);
        self.playlist_max = self.playlist_max.or(other.playlist_max);
        self.playlist_referer = self
            .playlist_referer
            .or_else(|| other.playlist_referer.clone());
        self.user_agent = self.user_agent.or_else(|| other.user_agent.clone());
        self
    }
}

fn fill_list(target: &mut Vec<String>, fallback: &[String]) {
    if target.is_empty() {
        target.extend_from_slice(fallback);
    }
}

/// Splits a comma separated option value, dropping blank entries.
pub fn parse_comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
