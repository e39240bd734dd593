//! Ticker symbol normalization.
//!
//! A ticker has two representations: the canonical display form used as a
//! column label and failure key (`BRK-B`), and the Stooq-encoded form used in
//! request URLs (`brk-b.us`). Both conversions are pure and total.

use std::collections::HashSet;

/// Market suffix Stooq expects for US listings.
pub const DEFAULT_MARKET_SUFFIX: &str = ".us";

/// Name of the index column in the exported price table. No ticker may use it.
pub const DATE_COLUMN: &str = "date";

/// Characters that separate share classes in some listings (`BRK.B`, `BF/B`).
const CLASS_SEPARATORS: [char; 2] = ['.', '/'];

/// Canonical display form: trimmed, class-share separators replaced with `-`.
///
/// `" BRK.B "` becomes `"BRK-B"`. Empty input yields an empty string.
pub fn canonical_symbol(raw: &str) -> String {
    raw.trim().replace(&CLASS_SEPARATORS[..], "-")
}

/// Source-encoded form: trimmed, lower-cased, with `suffix` appended.
pub fn encode_symbol(raw: &str, suffix: &str) -> String {
    let mut encoded = raw.trim().to_lowercase();
    encoded.push_str(suffix);
    encoded
}

/// Stooq encoding for a US ticker: `AAPL` -> `aapl.us`.
pub fn stooq_symbol(raw: &str) -> String {
    encode_symbol(raw, DEFAULT_MARKET_SUFFIX)
}

/// Whether `symbol` collides with a column name the price table reserves.
pub fn is_reserved(symbol: &str) -> bool {
    symbol == DATE_COLUMN
}

/// Stable de-duplication: keeps the first occurrence of each symbol.
pub fn dedupe_stable<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .map(Into::into)
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
