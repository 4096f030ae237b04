//! # Route Metadata
//!
//! Single-responsibility module for route information and path canonicalization.
//!
//! ## Design Principles
//!
//! - **S**: RouteInfo only holds route metadata
//! - **D**: Decoupled from Router implementation details

/// Route metadata: the template and what it routes to
#[derive(Debug, Clone)]
pub struct RouteInfo<T> {
    /// Path template (e.g., "/grid/{x}/{y}")
    pub path_pattern: String,
    /// Route target
    pub target: T,
}

impl<T> RouteInfo<T> {
    /// Create a new RouteInfo from a path template
    #[must_use]
    pub fn new(path: &str, target: T) -> Self {
        Self {
            path_pattern: path.to_string(),
            target,
        }
    }
}

/// Extract `{name}` capture names from a path template
#[must_use]
pub fn capture_names(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| {
            segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .map(|s| s.trim_start_matches('*').to_string())
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Canonicalize an endpoint path
///
/// Trims whitespace and slashes from both ends and prefixes a single `/`.
/// Returns `None` when nothing is left (`""`, `"/"`, `" // "`).
#[must_use]
pub fn normalize_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{trimmed}"))
    }
}

/// Strip trailing slashes from a request path, keeping the root
#[must_use]
pub fn strip_trailing_slashes(path: &str) -> &str {
    let stripped = path.trim_end_matches('/');
    if stripped.is_empty() {
        "/"
    } else {
        stripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_names() {
        assert!(capture_names("/grid").is_empty());
        assert_eq!(capture_names("/grid/{x}/cell/{y}"), vec!["x", "y"]);
        assert_eq!(capture_names("/files/{*rest}"), vec!["rest"]);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("grid").as_deref(), Some("/grid"));
        assert_eq!(normalize_path("/grid/").as_deref(), Some("/grid"));
        assert_eq!(normalize_path("  //grid/{x}// ").as_deref(), Some("/grid/{x}"));
        assert_eq!(normalize_path(""), None);
        assert_eq!(normalize_path("/"), None);
        assert_eq!(normalize_path(" // "), None);
    }

    #[test]
    fn test_strip_trailing_slashes() {
        assert_eq!(strip_trailing_slashes("/grid/"), "/grid");
        assert_eq!(strip_trailing_slashes("/grid"), "/grid");
        assert_eq!(strip_trailing_slashes("/"), "/");
        assert_eq!(strip_trailing_slashes("//"), "/");
    }
}
