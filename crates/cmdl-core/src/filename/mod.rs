//! Local filename for a download.
//!
//! Candidates, in order: the server's `Content-Disposition` filename, a name
//! supplied by the catalog, the last URL path segment. Whatever wins is
//! sanitized into a single path component.

mod disposition;

pub use disposition::disposition_filename;

/// Used when no candidate survives sanitizing.
pub const FALLBACK_FILENAME: &str = "download.bin";

/// Linux NAME_MAX, in bytes.
const NAME_MAX: usize = 255;

/// Pick and sanitize the filename for a download of `url`.
pub fn derive_filename(url: &str, content_disposition: Option<&str>, catalog_name: Option<&str>) -> String {
    let candidates = [
        content_disposition.and_then(disposition_filename),
        catalog_name.map(str::to_string),
        url_filename(url),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(|c| sanitize(&c))
        .find(|c| !c.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Last non-empty path segment of `url`, percent-decoded.
pub fn url_filename(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(disposition::percent_decode(last))
}

/// Reduce `name` to one safe path component (empty if nothing usable is left).
///
/// Separators, NUL and control characters become `_`, runs of `_` collapse,
/// leading/trailing dots, spaces and underscores are trimmed, and the result
/// is cut to NAME_MAX bytes on a char boundary.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if matches!(c, '/' | '\\' | '\0') || c.is_control() {
            '_'
        } else {
            c
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches(|c: char| c == '.' || c == '_' || c.is_whitespace());
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_beats_catalog_and_url() {
        assert_eq!(
            derive_filename(
                "https://civitai.com/api/download/models/128713",
                Some("attachment; filename=\"dreamshaper_8.safetensors\""),
                Some("DreamShaper 8.safetensors"),
            ),
            "dreamshaper_8.safetensors"
        );
    }

    #[test]
    fn catalog_name_beats_url_segment() {
        assert_eq!(
            derive_filename(
                "https://civitai.com/api/download/models/128713",
                None,
                Some("dreamshaper_8.safetensors"),
            ),
            "dreamshaper_8.safetensors"
        );
    }

    #[test]
    fn url_segment_is_decoded() {
        assert_eq!(
            derive_filename("https://cdn.example.com/files/my%20model.ckpt?sig=abc", None, None),
            "my model.ckpt"
        );
    }

    #[test]
    fn fallback_when_nothing_usable() {
        assert_eq!(derive_filename("https://example.com/", None, None), FALLBACK_FILENAME);
        assert_eq!(derive_filename("https://example.com/..", None, Some("..")), FALLBACK_FILENAME);
        assert_eq!(derive_filename("not a url", None, None), FALLBACK_FILENAME);
    }

    #[test]
    fn sanitize_cannot_escape_directory() {
        assert_eq!(sanitize("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize("a\\b\u{7}c"), "a_b_c");
        assert_eq!(sanitize("  .hidden.  "), "hidden");
        assert_eq!(sanitize("x__y"), "x_y");
    }

    #[test]
    fn sanitize_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let s = sanitize(&long);
        assert!(s.len() <= NAME_MAX);
        assert!(s.chars().all(|c| c == 'é'));
    }
}
