//! Numeric text formats of the CSV log.

/// Sign-prefixed scientific notation with 16 fractional digits and a signed,
/// at least two-digit exponent: `+1.2500000000000000e-03`.
///
/// Downstream tooling parses these columns byte-for-byte, so the layout must
/// not change.
pub fn sci(value: f64) -> String {
    if value.is_nan() {
        return String::from("+nan");
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 { "+inf" } else { "-inf" });
    }
    let raw = format!("{value:+.16e}");
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
        }
        None => raw,
    }
}

/// Shortest round-trip text of a float in the layout of Python's `repr`:
/// positional for decimal exponents in `-4..16` (always with a fractional
/// part), otherwise scientific with a signed two-digit exponent (`1e+16`,
/// `1.5e-05`).
pub fn py_repr(value: f64) -> String {
    if value.is_nan() {
        return String::from("nan");
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 { "inf" } else { "-inf" });
    }
    let shortest = format!("{value:e}");
    let (mantissa, exponent) = match shortest.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (shortest.as_str(), 0),
    };
    if (-4..16).contains(&exponent) {
        let positional = format!("{value}");
        if positional.contains('.') {
            positional
        } else {
            format!("{positional}.0")
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

/// Python dict literal of float values, e.g. `{'Blue': 1.0, 'Red': 1e+16}`.
pub fn py_dict<'a>(entries: impl IntoIterator<Item = (&'a str, &'a f64)>) -> String {
    let body: Vec<String> = entries
        .into_iter()
        .map(|(key, value)| format!("'{key}': {}", py_repr(*value)))
        .collect();
    format!("{{{}}}", body.join(", "))
}

/// Percentage of wins in a window of 0.0/1.0 outcomes.
pub fn win_rate_percent(outcomes: &[f64]) -> f64 {
    if outcomes.is_empty() {
        return 0.0;
    }
    100.0 * outcomes.iter().sum::<f64>() / outcomes.len() as f64
}
