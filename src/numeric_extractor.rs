//! Best-effort numbers out of model free text.
//!
//! Model answers come back as prose ("약 250 kcal", "2.5L입니다.") even when
//! asked for a bare number. Everything that is not a digit (or, for the
//! decimal variant, a decimal point) is thrown away before parsing. `None`
//! means "no usable value" and must never be folded into an aggregate.

/// Digits only. `"173kcal"` gives `Some(173)`, `"죄송합니다"` gives `None`.
///
/// Digits are concatenated across gaps, so `"150-200"` reads as `150200`.
/// That is the accepted price of tolerating arbitrary surrounding text.
pub fn extract_integer(text: &str) -> Option<u64> {
    let digits: String = text.trim().chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Digits and `.` only, then the longest prefix that reads as a number.
/// `"2.5L"` gives `Some(2.5)`, a sentence-final `"2.5."` still gives
/// `Some(2.5)`, and `"1.2.3"` gives `Some(1.2)`. No digit before the second
/// point means `None`.
pub fn extract_decimal(text: &str) -> Option<f64> {
    let kept: String = text
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut end = 0;
    let mut seen_point = false;
    let mut seen_digit = false;
    for c in kept.chars() {
        if c == '.' {
            if seen_point {
                break;
            }
            seen_point = true;
        } else {
            seen_digit = true;
        }
        end += c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    kept[..end].parse::<f64>().ok().filter(|value| value.is_finite())
}
