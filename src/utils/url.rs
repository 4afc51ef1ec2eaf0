//! URL utilities for consistent URL handling
//!
//! Server addresses are normalized once so that endpoint paths can be
//! appended without producing double slashes.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use ollachat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:11434"), "http://localhost:11434");
/// assert_eq!(normalize_base_url("http://localhost:11434/"), "http://localhost:11434");
/// assert_eq!(normalize_base_url("http://localhost:11434///"), "http://localhost:11434");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete API endpoint URL from a base URL and endpoint path
///
/// # Examples
///
/// ```
/// use ollachat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:11434", "api/chat"),
///     "http://localhost:11434/api/chat"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:11434/", "/api/tags"),
///     "http://localhost:11434/api/tags"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Trim and normalize `input`, accepting only `http://` and `https://` URLs
/// that name a host.
///
/// ```
/// use ollachat::utils::url::validate_base_url;
///
/// assert_eq!(
///     validate_base_url(" https://ollama.example.com/ ").as_deref(),
///     Some("https://ollama.example.com")
/// );
/// assert_eq!(validate_base_url("localhost:11434"), None);
/// ```
pub fn validate_base_url(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let lower = trimmed.to_ascii_lowercase();
    let rest = ["http://", "https://"]
        .iter()
        .find_map(|scheme| lower.strip_prefix(scheme))?;
    if rest.trim_matches('/').is_empty() || rest.contains(char::is_whitespace) {
        return None;
    }
    Some(normalize_base_url(trimmed))
}
