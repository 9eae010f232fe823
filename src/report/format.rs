//! Cell formatting for human-readable reports

/// Render a float the way a plain `str()` would: always with a fractional
/// part (`20.0`, `33.33`, `-100.0`)
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Render a percentage cell (`20.0%`)
pub fn format_pct(v: f64) -> String {
    format!("{}%", format_float(v))
}

/// Render microseconds in adaptive units: us, ms above 1,000, s above 1,000,000
pub fn format_time(usec: i64) -> String {
    let v = usec as f64;
    if usec.abs() > 1_000_000 {
        format!("{:.1}s", v / 1_000_000.0)
    } else if usec.abs() > 1_000 {
        format!("{:.1}ms", v / 1_000.0)
    } else {
        format!("{:.1}us", v)
    }
}

/// Render an integer with thousands separators (`1,234,567`)
pub fn format_thousands(v: i64) -> String {
    let digits = v.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if v < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
