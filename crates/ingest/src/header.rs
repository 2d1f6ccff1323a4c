use tracing::debug;

use tabula_core::{Cell, RawGrid};

/// Semantic-field → column-index mapping derived from the located header row.
/// Every field is optional; the parser adapts to what is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    pub header_row: usize,
    pub date: Option<usize>,
    pub amount: Option<usize>,
    pub debit: Option<usize>,
    pub credit: Option<usize>,
    pub currency: Option<usize>,
    pub description: Option<usize>,
    pub category: Option<usize>,
    pub payment_method: Option<usize>,
}

impl HeaderMap {
    pub fn has_amount_source(&self) -> bool {
        self.amount.is_some() || self.debit.is_some() || self.credit.is_some()
    }
}

// ── Alias dictionary ──────────────────────────────────────────────────────────

const DATE_ALIASES: &[&str] = &[
    "date", "transaction date", "txn date", "posting date", "posted date", "value date",
    "booking date", "fecha", "datum",
];
const DEBIT_ALIASES: &[&str] =
    &["debit", "withdrawal", "withdrawals", "money out", "paid out", "outflow"];
const CREDIT_ALIASES: &[&str] =
    &["credit", "deposit", "deposits", "money in", "paid in", "inflow"];
const AMOUNT_ALIASES: &[&str] =
    &["amount", "transaction amount", "amt", "importe", "betrag", "montant"];
const CURRENCY_ALIASES: &[&str] = &["currency", "ccy", "curr", "divisa"];
const DESCRIPTION_ALIASES: &[&str] = &[
    "description", "details", "narrative", "merchant", "payee", "memo", "particulars", "name",
    "concepto", "reference",
];
const CATEGORY_ALIASES: &[&str] = &["category", "transaction type", "type"];
const PAYMENT_METHOD_ALIASES: &[&str] =
    &["payment method", "payment type", "method", "channel", "card type"];

/// Claiming order matters: debit/credit before amount so "Debit Amount" lands
/// on debit, and payment_method before category so "Payment Type" does not
/// land on category.
const FIELD_ALIASES: &[&[&str]] = &[
    DATE_ALIASES,
    DEBIT_ALIASES,
    CREDIT_ALIASES,
    AMOUNT_ALIASES,
    CURRENCY_ALIASES,
    DESCRIPTION_ALIASES,
    PAYMENT_METHOD_ALIASES,
    CATEGORY_ALIASES,
];

const MAX_HEADER_SCAN_ROWS: usize = 10;

// ── Locator ───────────────────────────────────────────────────────────────────

/// Find the header row and build the column map.
///
/// Scores the first 10 rows by total alias hits; the highest-scoring row wins,
/// ties go to the earliest row, and an all-zero scan degrades to row 0 (a log
/// line, never an error).
pub fn locate_header(grid: &RawGrid) -> HeaderMap {
    let mut best_row = 0usize;
    let mut best_score = 0usize;

    for (idx, row) in grid.rows.iter().take(MAX_HEADER_SCAN_ROWS).enumerate() {
        let score = score_row(row);
        if score > best_score {
            best_score = score;
            best_row = idx;
        }
    }

    if best_score == 0 {
        debug!("no row scored any header aliases; assuming row 0");
    }

    build_map(grid, best_row)
}

fn score_row(row: &[Cell]) -> usize {
    let mut score = 0;
    for cell in row {
        let text = normalize(&cell.display_text());
        if text.is_empty() {
            continue;
        }
        for aliases in FIELD_ALIASES {
            if aliases.iter().any(|a| text.contains(a)) {
                score += 1;
            }
        }
    }
    score
}

fn build_map(grid: &RawGrid, header_row: usize) -> HeaderMap {
    let mut map = HeaderMap { header_row, ..HeaderMap::default() };
    let Some(row) = grid.row(header_row) else {
        return map;
    };

    let normalized: Vec<String> = row.iter().map(|c| normalize(&c.display_text())).collect();
    let mut claimed = vec![false; normalized.len()];

    for (field_idx, aliases) in FIELD_ALIASES.iter().enumerate() {
        let hit = normalized.iter().enumerate().find(|(col, text)| {
            !claimed[*col] && !text.is_empty() && aliases.iter().any(|a| text.contains(a))
        });
        if let Some((col, _)) = hit {
            claimed[col] = true;
            let slot = match field_idx {
                0 => &mut map.date,
                1 => &mut map.debit,
                2 => &mut map.credit,
                3 => &mut map.amount,
                4 => &mut map.currency,
                5 => &mut map.description,
                6 => &mut map.payment_method,
                _ => &mut map.category,
            };
            *slot = Some(col);
        }
    }

    map
}

/// Casefold, split camelCase boundaries, collapse non-alphanumeric runs to
/// single spaces.
fn normalize(text: &str) -> String {
    let mut spaced = String::with_capacity(text.len() + 4);
    let mut prev_lower = false;
    for c in text.chars() {
        if c.is_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        spaced.push(c);
    }

    let mut out = String::with_capacity(spaced.len());
    let mut pending_space = false;
    for c in spaced.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}
