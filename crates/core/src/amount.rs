use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Characters stripped before numeric parsing: currency symbols, spaces and
/// thousands separators. The decimal point is handled separately.
const SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₩', '₽', ' ', '\u{a0}', '+'];

/// Parse a monetary string into a finite `f64`.
///
/// Handles accounting negatives `(123.45)`, leading/trailing currency symbols
/// and codes (`$1,234.00`, `EUR 12.50`, `12.50 kr`), thousands separators and
/// the decimal-comma convention (`1.234,56`). Returns `None` for anything that
/// does not lex as a number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, s),
    };

    // Drop alphabetic currency codes ("EUR 12.50", "12.50 USD") and symbols.
    let mut cleaned: String = s
        .chars()
        .filter(|c| !c.is_alphabetic() && !SYMBOLS.contains(c))
        .collect();

    // Separator conventions. With both '.' and ',' present, whichever comes
    // last is the decimal separator ("1,234.56" vs "1.234,56"). A lone comma
    // with 1–2 trailing digits reads as a decimal comma ("12,50").
    match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => cleaned = cleaned.replace(',', ""),
        (Some(_), Some(_)) => cleaned = cleaned.replace('.', "").replace(',', "."),
        (None, Some(pos)) => {
            let tail = cleaned.len() - pos - 1;
            if cleaned.matches(',').count() == 1 && (1..=2).contains(&tail) {
                cleaned.replace_range(pos..=pos, ".");
            } else {
                cleaned = cleaned.replace(',', "");
            }
        }
        _ => {}
    }

    let mut dec = Decimal::from_str(cleaned.trim()).ok()?;
    if negative {
        dec = -dec;
    }
    dec.to_f64().filter(|f| f.is_finite())
}

// ── Currency recovery ─────────────────────────────────────────────────────────

const SYMBOL_CODES: &[(&str, &str)] = &[
    ("US$", "USD"),
    ("CA$", "CAD"),
    ("A$", "AUD"),
    ("R$", "BRL"),
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("₹", "INR"),
    ("₩", "KRW"),
    ("₽", "RUB"),
    ("kr", "SEK"),
    ("zł", "PLN"),
];

const ISO_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "INR", "CAD", "AUD", "CHF", "CNY", "SEK", "NOK", "DKK", "PLN",
    "BRL", "MXN", "ZAR", "SGD", "HKD", "NZD", "AED", "KRW", "RUB", "TRY",
];

/// Recover a currency code from symbols or ISO-like codes embedded in an
/// amount cell's own text. Returns an upper-cased code, or `None`.
pub fn infer_currency(raw: &str) -> Option<String> {
    let upper = raw.to_uppercase();
    for code in ISO_CODES {
        if upper.contains(code) {
            return Some((*code).to_string());
        }
    }
    for (symbol, code) in SYMBOL_CODES {
        if raw.contains(symbol) {
            return Some((*code).to_string());
        }
    }
    None
}
