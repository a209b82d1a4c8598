//! Parse HTTP response header lines.

use super::HeadInfo;

/// Status code from the response's `HTTP/x y reason` line.
pub fn status_code(lines: &[String]) -> Option<u32> {
    lines
        .iter()
        .find(|l| l.starts_with("HTTP/"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
}

/// Collect size, range support and filename hint from header lines.
pub fn parse_head_info(lines: &[String]) -> HeadInfo {
    let mut info = HeadInfo::default();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            info.content_length = value.parse().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            info.accept_ranges = value.eq_ignore_ascii_case("bytes");
        } else if name.eq_ignore_ascii_case("content-disposition") {
            info.content_disposition = Some(value.to_string());
        }
    }
    info
}

/// Complete length from `Content-Range: bytes a-b/total` (None for `*`).
pub fn content_range_total(lines: &[String]) -> Option<u64> {
    lines.iter().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if !name.trim().eq_ignore_ascii_case("content-range") {
            return None;
        }
        value.trim().rsplit_once('/')?.1.trim().parse().ok()
    })
}
