use futures_util::future::join;
use serde::Deserialize;

use crate::error::FetchError;
use crate::http::{get_json, HttpClient};

pub const REPOS_ELEMENT_ID: &str = "gh-repos";
pub const LANGUAGES_ELEMENT_ID: &str = "gh-langs";
pub const LOADING_CLASS: &str = "skeleton";

const TOP_LANGUAGE_COUNT: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GitHubStats {
    pub repos: String,
    pub languages: String,
}

impl GitHubStats {
    pub fn fallback() -> Self {
        Self {
            repos: "20+".to_string(),
            languages: "Python, Go, JS".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Profile {
    public_repos: u64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Repository {
    #[serde(default)]
    pub language: Option<String>,
}

/// Counts primary languages and keeps the `limit` most common. Equal counts
/// keep the order in which the languages first appeared.
pub fn top_languages(repos: &[Repository], limit: usize) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for language in repos.iter().filter_map(|repo| repo.language.as_deref()) {
        match counts.iter_mut().find(|(name, _)| *name == language) {
            Some((_, count)) => *count += 1,
            None => counts.push((language, 1)),
        }
    }

    counts.sort_by(|left, right| right.1.cmp(&left.1));
    counts
        .into_iter()
        .take(limit)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Requests the profile and the repository list concurrently. Either
/// failing fails the whole fetch.
pub async fn fetch_stats<C: HttpClient>(
    client: &C,
    profile_url: &str,
    repos_url: &str,
    fallback: &GitHubStats,
) -> Result<GitHubStats, FetchError> {
    let (profile, repos) = join(
        get_json::<C, Profile>(client, profile_url),
        get_json::<C, Vec<Repository>>(client, repos_url),
    )
    .await;
    let profile = profile?;
    let repos = repos?;

    let languages = top_languages(&repos, TOP_LANGUAGE_COUNT);
    let languages = if languages.is_empty() {
        fallback.languages.clone()
    } else {
        languages.join(", ")
    };

    Ok(GitHubStats {
        repos: profile.public_repos.to_string(),
        languages,
    })
}

pub fn stats_or_fallback(result: Result<GitHubStats, FetchError>, fallback: GitHubStats) -> GitHubStats {
    match result {
        Ok(stats) => stats,
        Err(error) => {
            tracing::debug!(%error, "github stats: using fallback");
            fallback
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub fn install(document: &web_sys::Document, config: &crate::config::SiteConfig) {
    use crate::dom::remove_class;
    use crate::http::BrowserHttp;

    let document = document.clone();
    let endpoints = config
        .profile_url()
        .and_then(|profile| Ok((profile, config.repos_url()?)));

    wasm_bindgen_futures::spawn_local(async move {
        let fallback = GitHubStats::fallback();
        let result = match endpoints {
            Ok((profile, repos)) => {
                fetch_stats(&BrowserHttp, profile.as_str(), repos.as_str(), &fallback).await
            }
            Err(error) => Err(FetchError::from(error)),
        };
        let stats = stats_or_fallback(result, fallback);

        for (id, value) in [
            (REPOS_ELEMENT_ID, &stats.repos),
            (LANGUAGES_ELEMENT_ID, &stats.languages),
        ] {
            if let Some(element) = document.get_element_by_id(id) {
                element.set_text_content(Some(value));
                remove_class(&element, LOADING_CLASS);
            }
        }
    });
}
