//! Presentation rules layered on top of the table store.
//!
//! Nothing in here mutates stored cell text. Numeric-column detection and
//! currency formatting only change what a cell *displays*; the uncertainty
//! marker helpers are shared with the exporters, which strip the marker before
//! writing files.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

/// Suffix the extraction step appends to low-confidence values.
pub const UNCERTAINTY_MARKER: &str = "[?]";

/// Header substrings that mark a column as numeric (matched case-insensitively).
pub const NUMERIC_KEYWORDS: [&str; 24] = [
    "price", "amount", "qty", "quantity", "total", "cost", "tax", "rate", "sum", "subtotal",
    "discount", "fee", "charge", "balance", "payment", "number", "no", "#", "count", "unit",
    "weight", "size", "percent", "%",
];

lazy_static! {
    static ref MARKER_REGEX: Regex = Regex::new(r"\s*\[\?\]\s*").unwrap();
    static ref CURRENCY_NOISE_REGEX: Regex = Regex::new(r"[$,\s]").unwrap();
    static ref LEADING_NUMBER_REGEX: Regex =
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap();
}

/// Horizontal alignment of a rendered cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Everything a front end needs to draw one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellView {
    pub text: String,
    pub align: Align,
    pub uncertain: bool,
    pub focused: bool,
}

pub fn has_uncertainty(value: &str) -> bool {
    value.contains(UNCERTAINTY_MARKER)
}

/// Removes every marker occurrence together with the whitespace around it.
pub fn strip_uncertainty(value: &str) -> Cow<'_, str> {
    if !has_uncertainty(value) {
        return Cow::Borrowed(value);
    }
    MARKER_REGEX.replace_all(value, "")
}

pub fn is_numeric_column(header: &str) -> bool {
    let lower = header.to_lowercase();
    NUMERIC_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

pub fn column_align(header: &str) -> Align {
    if is_numeric_column(header) {
        Align::Right
    } else {
        Align::Left
    }
}

/// Parses the leading number out of a cell after dropping `$`, thousands
/// separators, whitespace and the uncertainty marker.
///
/// Like a browser's `parseFloat`, trailing text after the number is ignored,
/// so `"12 pcs"` parses as `12.0`.
pub fn parse_amount(value: &str) -> Option<f64> {
    let without_marker = value.replace(UNCERTAINTY_MARKER, "");
    let cleaned = CURRENCY_NOISE_REGEX.replace_all(&without_marker, "");
    let number = LEADING_NUMBER_REGEX.find(&cleaned)?;
    number.as_str().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Renders an amount as US dollars, e.g. `-1234.5` -> `-$1,234.50`.
///
/// Rounds half away from zero on the shortest decimal form of the number, so
/// `1.005` shows as `$1.01` the way a browser's currency formatter does.
pub fn format_usd(amount: f64) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }
    let (whole, fraction) = round_to_cents(amount.abs());

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let is_zero = whole.bytes().chain(fraction.bytes()).all(|d| d == b'0');
    let sign = if amount < 0.0 && !is_zero { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, fraction)
}

/// Splits a non-negative amount into whole dollars and two cent digits.
fn round_to_cents(amount: f64) -> (String, String) {
    let text = amount.to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut digits: Vec<u8> = whole
        .bytes()
        .chain(fraction.bytes().chain(std::iter::repeat(b'0')).take(2))
        .collect();

    if fraction.as_bytes().get(2).is_some_and(|d| *d >= b'5') {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let cents = digits.split_off(digits.len() - 2);
    (
        String::from_utf8_lossy(&digits).into_owned(),
        String::from_utf8_lossy(&cents).into_owned(),
    )
}

/// The text shown for an unfocused cell.
///
/// Currency formatting only applies when the toggle is on, the column is
/// numeric and the value is non-empty; unparseable values are shown raw.
pub fn display_value<'a>(value: &'a str, header: &str, format_currency: bool) -> Cow<'a, str> {
    if !format_currency || value.is_empty() || !is_numeric_column(header) {
        return Cow::Borrowed(value);
    }
    match parse_amount(value) {
        Some(amount) => Cow::Owned(format_usd(amount)),
        None => Cow::Borrowed(value),
    }
}

/// Builds the render model for one cell. A focused cell shows its raw text so
/// editing starts from the stored string.
pub fn cell_view(value: &str, header: &str, format_currency: bool, focused: bool) -> CellView {
    let text = if focused {
        value.to_string()
    } else {
        display_value(value, header, format_currency).into_owned()
    };
    CellView {
        text,
        align: column_align(header),
        uncertain: has_uncertainty(value),
        focused,
    }
}
