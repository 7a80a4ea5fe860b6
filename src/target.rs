// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Build the effective database URL (credential injection) and classify it as a remote or local store
// role: configuration/target
// inputs: raw target string from the CLI; optional username/password
// outputs: effective URL string; StoreTarget; credential split and redaction helpers for the HTTP client
// invariants:
// - username and password are both present or both absent (empty counts as absent)
// - injected credentials are percent-encoded like encodeURIComponent
// - http(s) targets are remote; schemeless targets are local unless credentials promote a host-like target to http
// errors: DumpError::Configuration for every rejected combination
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DumpError, Result};
use crate::util::{decode_component, encode_component};

static RE_SCHEME: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)://(.*)$").expect("scheme regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
  Remote(String),
  Local(PathBuf),
}

impl StoreTarget {
  pub fn classify(url: &str) -> Result<Self> {
    if url.trim().is_empty() {
      return Err(DumpError::config("the database target is empty"));
    }

    match split_scheme(url) {
      Some((scheme, _)) if is_http(scheme) => Ok(StoreTarget::Remote(url.to_string())),
      Some((scheme, _)) => Err(DumpError::config(format!(
        "unsupported scheme '{}'; use http(s):// for remote databases or a directory path",
        scheme
      ))),
      None => Ok(StoreTarget::Local(PathBuf::from(url))),
    }
  }
}

fn split_scheme(url: &str) -> Option<(&str, &str)> {
  let caps = RE_SCHEME.captures(url)?;
  Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

fn is_http(scheme: &str) -> bool {
  scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

/// The authority part of `rest` (everything after `scheme://` up to the path).
fn authority_of(rest: &str) -> &str {
  let end = rest.find(|c: char| matches!(c, '/' | '?' | '#')).unwrap_or(rest.len());
  &rest[..end]
}

fn looks_like_path(target: &str) -> bool {
  target.starts_with('/')
    || target.starts_with('.')
    || target.starts_with('~')
    || target.starts_with('\\')
    || Path::new(target).exists()
}

/// Embed `username`/`password` into the authority of `url`.
///
/// Without credentials the URL is returned unchanged. Schemeless host-like
/// targets (`localhost:5984/db`) are promoted to `http://` when credentials are
/// given; filesystem paths and URLs that already carry userinfo are rejected.
pub fn build_url(url: &str, username: Option<&str>, password: Option<&str>) -> Result<String> {
  let username = username.filter(|u| !u.is_empty());
  let password = password.filter(|p| !p.is_empty());

  let (user, pass) = match (username, password) {
    (None, None) => return Ok(url.to_string()),
    (Some(u), Some(p)) => (u, p),
    _ => {
      return Err(DumpError::config(
        "both username and password must be defined; you can't provide only one of them",
      ))
    }
  };

  let userinfo = format!("{}:{}", encode_component(user), encode_component(pass));

  match split_scheme(url) {
    Some((scheme, rest)) if is_http(scheme) => {
      if rest.is_empty() {
        return Err(DumpError::config(format!("'{}' has no host", url)));
      }
      if authority_of(rest).contains('@') {
        return Err(DumpError::config("the target URL already carries credentials"));
      }
      Ok(format!("{}://{}@{}", scheme, userinfo, rest))
    }
    Some((scheme, _)) => Err(DumpError::config(format!(
      "username/password are only for remote http(s) databases, not '{}://'",
      scheme
    ))),
    None => {
      if url.is_empty() || looks_like_path(url) {
        return Err(DumpError::config(
          "username/password are only for remote databases, not local paths",
        ));
      }
      Ok(format!("http://{}@{}", userinfo, url))
    }
  }
}

/// Split userinfo out of an http(s) URL, returning the bare URL and the decoded credentials.
pub fn split_credentials(url: &str) -> (String, Option<(String, String)>) {
  let Some((scheme, rest)) = split_scheme(url) else {
    return (url.to_string(), None);
  };

  let authority = authority_of(rest);
  let Some(at) = authority.rfind('@') else {
    return (url.to_string(), None);
  };

  let userinfo = &authority[..at];
  let (user, pass) = match userinfo.split_once(':') {
    Some((u, p)) => (decode_component(u), decode_component(p)),
    None => (decode_component(userinfo), String::new()),
  };

  (format!("{}://{}", scheme, &rest[at + 1..]), Some((user, pass)))
}

/// Replace any password in `url` with `***` for logging.
pub fn redact(url: &str) -> String {
  let Some((scheme, rest)) = split_scheme(url) else {
    return url.to_string();
  };

  let authority = authority_of(rest);
  let Some(at) = authority.rfind('@') else {
    return url.to_string();
  };

  let user = authority[..at].split(':').next().unwrap_or_default();
  format!("{}://{}:***@{}", scheme, user, &rest[at + 1..])
}
