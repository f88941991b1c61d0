//! Path and query predicates used by the pipeline stages.

use url::{form_urlencoded, Url};

/// File extensions that mark a request as static; such requests skip
/// token acquisition.
const STATIC_EXTENSIONS: &[&str] = &["html", "css", "js", "png", "jpg", "svg", "ico"];

/// Exact paths served by the rendering backend's editor/admin surfaces.
const EDITOR_PATHS: &[&str] = &["/write", "/admin"];
/// Path prefixes served by the rendering backend's editor/admin surfaces.
const EDITOR_PREFIXES: &[&str] = &["/admin/", "/write/", "/edit-"];

/// Query key opting a request out of the app shell.
pub const NO_PWA_MARKER: &str = "no-pwa";

pub fn is_static_request(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => STATIC_EXTENSIONS
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed)),
        _ => false,
    }
}

/// `/robots.txt` and the sitemap documents: `/sitemap`, `/sitemap.xml`
/// and `/sitemap-<name>.xml`.
pub fn is_crawler_index(path: &str) -> bool {
    if matches!(path, "/robots.txt" | "/sitemap" | "/sitemap.xml") {
        return true;
    }
    path.strip_prefix("/sitemap-")
        .and_then(|rest| rest.strip_suffix(".xml"))
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

/// Path with trailing slashes removed, or `None` when it needs no change.
/// The result never ends in `/` unless it is the root.
pub fn strip_trailing_slash(path: &str) -> Option<String> {
    if path == "/" || !path.ends_with('/') {
        return None;
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        Some("/".to_string())
    } else {
        Some(trimmed.to_string())
    }
}

pub fn is_editor_path(path: &str) -> bool {
    EDITOR_PATHS.contains(&path) || EDITOR_PREFIXES.iter().any(|p| path.starts_with(p))
}

pub fn has_no_pwa_marker(query: Option<&str>) -> bool {
    query
        .map(|q| form_urlencoded::parse(q.as_bytes()).any(|(k, _)| k == NO_PWA_MARKER))
        .unwrap_or(false)
}

/// Whether the page that linked here was an editor page or carried the
/// no-PWA marker.
pub fn referer_wants_rendering(referer: Option<&str>) -> bool {
    let Some(referer) = referer else {
        return false;
    };
    match Url::parse(referer) {
        Ok(url) => is_editor_path(url.path()) || has_no_pwa_marker(url.query()),
        Err(_) => false,
    }
}
