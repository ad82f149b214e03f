use std::sync::LazyLock;

use mapscout_core::ServiceFlags;
use regex::Regex;

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d(?:[\d.,\u{a0}\u{202f}]| \d)*").expect("valid regex"));

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("valid regex"));

/// Separators Google Maps puts between service attributes.
const SERVICE_SEPARATORS: &[char] = &['·', '⋅', '•', '|', '\n'];

const NEGATION_PREFIXES: &[&str] = &["no ", "sin ", "not "];

const SHOPPING_KEYWORDS: &[&str] = &["shopping", "compra"];
const PICKUP_KEYWORDS: &[&str] = &[
    "pickup",
    "pick-up",
    "takeout",
    "take-out",
    "retiro",
    "para llevar",
    "recogida",
];
const DELIVERY_KEYWORDS: &[&str] = &["delivery", "entrega", "envío", "envio", "a domicilio"];

/// Parse a review count such as `"(1,234)"`, `"1.234 reseñas"` or
/// `"1 234"`. Grouping punctuation is dropped. Returns `None` when the text
/// holds no digits or the value overflows.
#[must_use]
pub fn parse_count(text: &str) -> Option<u64> {
    let matched = INTEGER_RE.find(text)?.as_str();
    let digits: String = matched.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Parse a rating such as `"4.5"` or `"4,5"`. A comma is read as the decimal
/// separator.
#[must_use]
pub fn parse_average(text: &str) -> Option<f64> {
    let matched = DECIMAL_RE.find(text)?.as_str();
    matched.replace(',', ".").parse().ok()
}

/// Classify service attribute text into flags.
///
/// Each input is split on bullet separators; a token sets a flag when it
/// contains one of the flag's keywords and does not start with a negation
/// (`"No delivery"`, `"Sin entrega a domicilio"`).
#[must_use]
pub fn classify_services<S: AsRef<str>>(texts: &[S]) -> ServiceFlags {
    let mut flags = ServiceFlags::default();
    let tokens = texts
        .iter()
        .flat_map(|text| text.as_ref().split(SERVICE_SEPARATORS))
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty());

    for token in tokens {
        if NEGATION_PREFIXES.iter().any(|p| token.starts_with(p)) {
            continue;
        }
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| token.contains(k));
        flags.shopping |= mentions(SHOPPING_KEYWORDS);
        flags.pickup |= mentions(PICKUP_KEYWORDS);
        flags.delivery |= mentions(DELIVERY_KEYWORDS);
    }
    flags
}

/// Normalize the text of one element. Multi-cell rows (tab or newline
/// separated, as an hours-table row renders) become `"first: rest, rest"`;
/// anything else is trimmed with internal whitespace collapsed.
#[must_use]
pub fn normalize_cells(text: &str) -> String {
    let mut cells = text
        .split(['\t', '\n'])
        .map(collapse_whitespace)
        .filter(|cell| !cell.is_empty());

    let Some(head) = cells.next() else {
        return String::new();
    };
    let rest: Vec<String> = cells.collect();
    if rest.is_empty() {
        head
    } else {
        format!("{head}: {}", rest.join(", "))
    }
}

/// Normalize every text, drop blanks, and join with `separator`.
#[must_use]
pub fn join_texts<S: AsRef<str>>(texts: &[S], separator: &str) -> String {
    texts
        .iter()
        .map(|text| normalize_cells(text.as_ref()))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Trim and fold every whitespace run, newlines included, to one space.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
