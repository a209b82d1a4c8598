//! Byte-size arguments: plain integers or a number with a binary/decimal suffix.

/// Parse `1073741824`, `512MiB`, `1GiB`, `64k`, `1.5G` and the like.
///
/// `K`/`M`/`G`/`T` and their `iB` forms are powers of 1024; `KB`/`MB`/`GB`/`TB`
/// are powers of 1000. Zero is rejected.
pub fn parse_size(raw: &str) -> Result<u64, String> {
    let s = raw.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    if number.is_empty() {
        return Err(format!("invalid size {raw:?}: missing number"));
    }

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kib" => 1 << 10,
        "m" | "mib" => 1 << 20,
        "g" | "gib" => 1 << 30,
        "t" | "tib" => 1 << 40,
        "kb" => 1_000,
        "mb" => 1_000_000,
        "gb" => 1_000_000_000,
        "tb" => 1_000_000_000_000,
        other => return Err(format!("invalid size {raw:?}: unknown unit {other:?}")),
    };

    let bytes = if number.contains('.') {
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid size {raw:?}"))?;
        let bytes = value * multiplier as f64;
        if !bytes.is_finite() || bytes > u64::MAX as f64 {
            return Err(format!("size {raw:?} is too large"));
        }
        bytes.round() as u64
    } else {
        let value: u64 = number
            .parse()
            .map_err(|_| format!("invalid size {raw:?}"))?;
        value
            .checked_mul(multiplier)
            .ok_or_else(|| format!("size {raw:?} is too large"))?
    };

    if bytes == 0 {
        return Err("size must be greater than zero".to_string());
    }
    Ok(bytes)
}
