//! Canonicalization of user-supplied Git repository references.
//!
//! Everything is reduced to an HTTPS clone URL ending in `.git`:
//! - `git@github.com:org/repo` -> `https://github.com/org/repo.git`
//! - `http://github.com/org/repo` -> `https://github.com/org/repo.git`
//! - `github.com/org/repo` -> `https://github.com/org/repo.git`
//! - `repo-name` -> `https://repo-name.git`

use thiserror::Error;
use url::Url;

const GIT_SUFFIX: &str = ".git";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitUrlError {
    #[error("invalid SSH URL format: {0}")]
    MalformedSsh(String),

    #[error("failed to parse URL: {0}")]
    Parse(String),
}

/// Normalize `raw` into the HTTPS form handed to the fetch collaborator.
pub fn normalize_git_url(raw: &str) -> Result<String, GitUrlError> {
    let raw = raw.trim();

    if raw.starts_with("git@") {
        return normalize_ssh_shorthand(raw);
    }

    let (scheme, rest) = match raw.split_once("://") {
        Some((scheme, rest)) if is_scheme(scheme) => (scheme.to_ascii_lowercase(), rest),
        _ => ("https".to_string(), raw),
    };
    let scheme = if scheme == "http" { "https" } else { scheme.as_str() };

    let mut url = Url::parse(&format!("{}://{}", scheme, rest))
        .map_err(|e| GitUrlError::Parse(format!("{}: {}", raw, e)))?;

    // Host-only reference: the suffix goes on the authority, not on an empty path
    if matches!(url.path(), "" | "/") && url.query().is_none() && url.fragment().is_none() {
        let base = url.as_str().trim_end_matches('/');
        return Ok(with_git_suffix(base));
    }

    let path = url.path().trim_end_matches('/').to_string();
    if !path.ends_with(GIT_SUFFIX) {
        url.set_path(&format!("{}{}", path, GIT_SUFFIX));
    }

    Ok(url.to_string())
}

/// `git@host:path` with exactly one colon.
fn normalize_ssh_shorthand(raw: &str) -> Result<String, GitUrlError> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [host, path] = parts.as_slice() else {
        return Err(GitUrlError::MalformedSsh(raw.to_string()));
    };

    let host = host.trim_start_matches("git@");
    let path = path.trim_start_matches('/');
    if host.is_empty() || path.is_empty() {
        return Err(GitUrlError::MalformedSsh(raw.to_string()));
    }

    Ok(format!("https://{}/{}", host, with_git_suffix(path)))
}

fn with_git_suffix(value: &str) -> String {
    if value.ends_with(GIT_SUFFIX) {
        value.to_string()
    } else {
        format!("{}{}", value, GIT_SUFFIX)
    }
}

/// RFC 3986 scheme: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
