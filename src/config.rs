use std::time::Duration;

use tracing::Level;
use url::Url;

use crate::logging::parse_log_level;

const DEFAULT_GITHUB_USER: &str = "paulofilip3";
const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com/";
const DEFAULT_CONTRIBUTIONS_API_BASE: &str = "https://github-contributions-api.jogruber.de/";
const DEFAULT_SLIDE_INTERVAL_MS: u64 = 5_000;
const DEFAULT_SIDEBAR_BREAKPOINT_PX: u32 = 960;
const DEFAULT_LOG_LEVEL: Level = Level::INFO;

const SLIDE_INTERVAL_MS_BOUNDS: (u64, u64) = (500, 60_000);
const SIDEBAR_BREAKPOINT_PX_BOUNDS: (u32, u32) = (320, 4_096);

/// Page-level settings. Every field can be overridden from a `data-*`
/// attribute on the root element; anything missing or out of bounds keeps
/// its default.
#[derive(Clone, Debug, PartialEq)]
pub struct SiteConfig {
    pub github_user: String,
    pub github_api_base: String,
    pub contributions_api_base: String,
    pub slide_interval: Duration,
    pub sidebar_breakpoint_px: u32,
    pub log_level: Level,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            github_user: DEFAULT_GITHUB_USER.to_string(),
            github_api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            contributions_api_base: DEFAULT_CONTRIBUTIONS_API_BASE.to_string(),
            slide_interval: Duration::from_millis(DEFAULT_SLIDE_INTERVAL_MS),
            sidebar_breakpoint_px: DEFAULT_SIDEBAR_BREAKPOINT_PX,
            log_level: DEFAULT_LOG_LEVEL,
        }
    }
}

impl SiteConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let github_user = parse_non_empty_string(lookup("data-github-user"))
            .unwrap_or_else(|| DEFAULT_GITHUB_USER.to_string());
        let github_api_base = parse_http_base(lookup("data-github-api"))
            .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string());
        let contributions_api_base = parse_http_base(lookup("data-contributions-api"))
            .unwrap_or_else(|| DEFAULT_CONTRIBUTIONS_API_BASE.to_string());
        let slide_interval_ms = parse_u64_with_bounds(
            lookup("data-slide-interval-ms"),
            DEFAULT_SLIDE_INTERVAL_MS,
            SLIDE_INTERVAL_MS_BOUNDS,
        );
        let sidebar_breakpoint_px = parse_u32_with_bounds(
            lookup("data-sidebar-breakpoint"),
            DEFAULT_SIDEBAR_BREAKPOINT_PX,
            SIDEBAR_BREAKPOINT_PX_BOUNDS,
        );
        let log_level = parse_log_level(lookup("data-log-level").as_deref(), DEFAULT_LOG_LEVEL);

        Self {
            github_user,
            github_api_base,
            contributions_api_base,
            slide_interval: Duration::from_millis(slide_interval_ms),
            sidebar_breakpoint_px,
            log_level,
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn from_root(root: &web_sys::Element) -> Self {
        Self::from_lookup(|name| root.get_attribute(name))
    }

    pub fn profile_url(&self) -> Result<Url, url::ParseError> {
        endpoint(&self.github_api_base, &["users", &self.github_user], &[])
    }

    pub fn repos_url(&self) -> Result<Url, url::ParseError> {
        endpoint(
            &self.github_api_base,
            &["users", &self.github_user, "repos"],
            &[("per_page", "100")],
        )
    }

    pub fn contributions_url(&self) -> Result<Url, url::ParseError> {
        endpoint(
            &self.contributions_api_base,
            &["v4", &self.github_user],
            &[("y", "last")],
        )
    }

    pub fn sidebar_media_query(&self) -> String {
        format!("(min-width: {}px)", self.sidebar_breakpoint_px)
    }
}

fn parse_non_empty_string(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Accepts only absolute `http`/`https` URLs and keeps them in the
/// serialized form `Url` produces.
fn parse_http_base(value: Option<String>) -> Option<String> {
    let value = parse_non_empty_string(value)?;
    let parsed = Url::parse(&value).ok()?;

    if parsed.scheme() == "http" || parsed.scheme() == "https" {
        Some(parsed.into())
    } else {
        None
    }
}

/// Appends percent-encoded path segments and query pairs to `base`, so a
/// base with its own path prefix keeps it.
fn endpoint(base: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }

    Ok(url)
}

fn parse_u64_with_bounds(value: Option<String>, default: u64, bounds: (u64, u64)) -> u64 {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| (bounds.0..=bounds.1).contains(value))
        .unwrap_or(default)
}

fn parse_u32_with_bounds(value: Option<String>, default: u32, bounds: (u32, u32)) -> u32 {
    value
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| (bounds.0..=bounds.1).contains(value))
        .unwrap_or(default)
}
