//! Public URL helpers: CDN origin rewrite and container base URL.

use super::error::{StorageError, StorageResult};

/// Replace the storage origin in `raw` with the CDN origin.
///
/// Plain substring replacement; the URL is never parsed. Nothing changes
/// unless both origins are set and the storage origin is non-empty.
#[must_use]
pub fn rewrite_origin(raw: &str, storage_origin: Option<&str>, cdn_origin: Option<&str>) -> String {
    match (storage_origin, cdn_origin) {
        (Some(storage), Some(cdn)) if !storage.is_empty() => raw.replace(storage, cdn),
        _ => raw.to_string(),
    }
}

/// Base URL of the whole container.
///
/// Prefers the CDN origin, then the storage origin. The scheme mirrors the
/// caller's inbound request: `https` when `is_secure`, else `http`. Any
/// scheme already present in the configured value is replaced.
///
/// # Errors
///
/// Returns a configuration error when neither origin is configured.
pub fn container_base_url(
    cdn_origin: Option<&str>,
    storage_origin: Option<&str>,
    is_secure: bool,
) -> StorageResult<String> {
    let configured = cdn_origin
        .filter(|url| !url.trim().is_empty())
        .or_else(|| storage_origin.filter(|url| !url.trim().is_empty()))
        .ok_or_else(|| {
            StorageError::configuration(
                "CDN container URL not set. Set config variable \"container_url\"",
            )
        })?;

    let scheme = if is_secure { "https" } else { "http" };
    let rest = strip_scheme(configured.trim());
    if rest.starts_with("//") {
        Ok(format!("{scheme}:{rest}"))
    } else {
        Ok(format!("{scheme}://{rest}"))
    }
}

fn strip_scheme(url: &str) -> &str {
    for scheme in ["https:", "http:"] {
        if url
            .get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
        {
            return &url[scheme.len()..];
        }
    }
    url
}
