use std::path::Path;

/// Content type of generated status pages.
pub const HTML: &str = "text/html";

/// Returns the Content-Type for a file, based on its extension.
///
/// Unknown extensions are served as `application/octet-stream`.
pub fn content_type_for(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
}
