//! Lenient numeric parsing for scraped listing fields.
//!
//! Scraped sources disagree on how they encode prices, areas and bedroom
//! counts ("1 200 €", "85 m²", "T2", "Studio", plain numbers). Everything in
//! here degrades to `0` instead of failing, so filtering and sorting never
//! have to deal with a parse error.

/// Parse a decorated decimal such as `"1 200 €"` or `"85.5 m²"`.
///
/// Every character other than an ASCII digit or `.` is dropped, then the
/// longest leading valid decimal is read (`"1.200.50"` reads as `1.2`).
/// Returns `0.0` when nothing numeric is left.
pub fn parse_decimal(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut end = 0;
    let mut seen_dot = false;
    for (idx, c) in cleaned.char_indices() {
        if c == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        }
        end = idx + 1;
    }

    let prefix = cleaned[..end].trim_end_matches('.');
    match prefix.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Normalize a bedroom field to a count, where `0` means studio.
///
/// Accepts "studio" in any case, Portuguese typologies (`T0`, `T2`, `t3+`)
/// and anything with a leading integer (`"2 quartos"`).
pub fn parse_bedrooms(raw: &str) -> u32 {
    let trimmed = raw.trim();
    if trimmed.to_lowercase().contains("studio") {
        return 0;
    }

    let digits_from = match trimmed.chars().next() {
        Some('T') | Some('t') => &trimmed[1..],
        _ => trimmed,
    };

    let digits: String = digits_from
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().unwrap_or(0)
}

/// Convert an already-numeric bedroom value, clamping junk to `0`.
pub fn bedrooms_from_f64(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.trunc().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Convert an already-numeric price or area, clamping non-finite values.
pub fn decimal_from_f64(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
