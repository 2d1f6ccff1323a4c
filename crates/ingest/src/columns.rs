use tracing::debug;

use tabula_core::{
    infer_currency, is_card_payment_text, parse_amount, resolve_date, Cell, PipelineConfig,
    RawGrid, Transaction,
};

use crate::header::HeaderMap;

/// Map mapped columns straight into transactions — the AI-free baseline.
///
/// Pure and total: no network, no errors. Rows that cannot be parsed are
/// skipped, not surfaced.
pub fn parse_rows(grid: &RawGrid, header: &HeaderMap, config: &PipelineConfig) -> Vec<Transaction> {
    let mut out = Vec::new();

    for (row_idx, row) in grid.rows.iter().enumerate().skip(header.header_row + 1) {
        let line_index = row_idx - header.header_row;

        let Some(occurred_on) = header.date.and_then(|col| row.get(col)).and_then(resolve_date)
        else {
            debug!(line_index, "skipping row without a resolvable date");
            continue;
        };

        let Some(amount) = row_amount(row, header) else {
            debug!(line_index, "skipping row without a usable amount");
            continue;
        };
        if !amount.is_finite() {
            continue;
        }

        let merchant = column_text(row, header.description);
        let category = column_text(row, header.category);
        let payment_method = column_text(row, header.payment_method);
        let currency = row_currency(row, header, config);

        // Receipts of paying off the card are not economic transactions.
        if amount < 0.0 {
            if let Some(m) = merchant.as_deref() {
                if is_card_payment_text(m) {
                    debug!(line_index, "dropping card-bill payment row");
                    continue;
                }
            }
        }

        out.push(Transaction {
            amount,
            currency,
            occurred_on,
            merchant,
            payment_method,
            note: None,
            category,
            line_index: Some(line_index),
        });
    }

    out
}

// ── Amount resolution ─────────────────────────────────────────────────────────

fn row_amount(row: &[Cell], header: &HeaderMap) -> Option<f64> {
    if let Some(col) = header.amount {
        return row.get(col).and_then(cell_amount);
    }

    // Debit and credit are mutually exclusive per row; a populated debit is
    // money out, a populated credit is money in, both populated → debit − credit.
    let debit = header.debit.and_then(|col| row.get(col)).and_then(cell_amount);
    let credit = header.credit.and_then(|col| row.get(col)).and_then(cell_amount);
    match (debit, credit) {
        (Some(d), None) => Some(d.abs()),
        (None, Some(c)) => Some(-c.abs()),
        (Some(d), Some(c)) => Some(d.abs() - c.abs()),
        (None, None) => None,
    }
}

fn cell_amount(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => parse_amount(s),
        _ => None,
    }
}

// ── Currency resolution ───────────────────────────────────────────────────────

fn row_currency(row: &[Cell], header: &HeaderMap, config: &PipelineConfig) -> String {
    if let Some(text) = column_text(row, header.currency) {
        return text.to_uppercase();
    }

    // No currency column: look for a symbol or code inside the amount cell text.
    for col in [header.amount, header.debit, header.credit].into_iter().flatten() {
        if let Some(code) = row.get(col).and_then(Cell::as_text).and_then(infer_currency) {
            return code;
        }
    }

    config.default_currency.clone()
}

fn column_text(row: &[Cell], col: Option<usize>) -> Option<String> {
    let cell = col.and_then(|c| row.get(c))?;
    let text = cell.display_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
