use std::sync::LazyLock;

use regex::Regex;

const CRORE: f64 = 10_000_000.0;
const LAKH: f64 = 100_000.0;

/// Parse a free-text listing price such as `"2.25 Crore"`, `"70 Lac"` or
/// `"70 Lakh"` into rupees.
///
/// The first number in the text is scaled by the unit word, if any. Text
/// without a number gives `None`.
pub fn parse_price(text: &str) -> Option<f64> {
    static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\d[\d,]*(?:\.\d+)?|\.\d+").unwrap()
    });

    let text = text.trim().to_lowercase();
    let value: f64 = NUMBER.find(&text)?.as_str().replace(',', "").parse().ok()?;

    let scale = if text.contains("crore") {
        CRORE
    } else if text.contains("lac") || text.contains("lakh") {
        LAKH
    } else {
        1.0
    };
    Some(value * scale)
}
