use chrono::NaiveDate;
use tracing::{debug, warn};

use tabula_core::{
    is_card_payment_text, resolve_date, resolve_date_str, Direction, PipelineConfig, RawGrid,
    Transaction,
};
use tabula_ingest::HeaderMap;

use crate::types::ExtractedRecord;

/// Text markers for money coming back in. A positive amount alongside one of
/// these flips negative when the model supplied no direction.
const REFUND_KEYWORDS: &[&str] = &[
    "refund", "reversal", "reversed", "cashback", "cash back", "chargeback", "rebate",
    "money back", "reimbursement",
];

/// Ratio over the median positive amount beyond which a value smells like a
/// running balance. Warn-only: large one-off transactions are legitimate.
const BALANCE_RATIO: f64 = 10.0;

/// Normalize a batch of extracted records into valid transactions.
///
/// Applies sign normalization, date recovery through `line_index`, the
/// card-payment noise filter and the final validity filter; flags (but keeps)
/// balance-like outliers.
pub fn postprocess_records(
    records: Vec<ExtractedRecord>,
    grid: &RawGrid,
    header: &HeaderMap,
    config: &PipelineConfig,
) -> Vec<Transaction> {
    let mut txs: Vec<Transaction> = Vec::with_capacity(records.len());

    for record in records {
        if !record.amount.is_finite() {
            debug!("dropping record with non-finite amount");
            continue;
        }

        let Some(occurred_on) = resolve_record_date(&record, grid, header) else {
            debug!(line_index = record.line_index, "dropping record with unrecoverable date");
            continue;
        };

        let amount = normalize_sign(&record);

        let currency = record
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| config.default_currency.clone());

        txs.push(Transaction {
            amount,
            currency,
            occurred_on,
            merchant: clean_opt(record.merchant),
            payment_method: clean_opt(record.payment_method),
            note: clean_opt(record.note),
            category: clean_opt(record.category),
            line_index: record.line_index,
        });
    }

    let txs = filter_noise(txs);
    flag_balance_outliers(&txs);
    txs
}

fn clean_opt(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ── Sign normalization ────────────────────────────────────────────────────────

fn normalize_sign(record: &ExtractedRecord) -> f64 {
    match record.direction {
        Some(Direction::Debit) => record.amount.abs(),
        Some(Direction::Credit) => -record.amount.abs(),
        None => {
            let text = [record.merchant.as_deref(), record.note.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();
            if record.amount > 0.0 && REFUND_KEYWORDS.iter().any(|k| text.contains(k)) {
                -record.amount
            } else {
                record.amount
            }
        }
    }
}

// ── Date recovery ─────────────────────────────────────────────────────────────

fn resolve_record_date(
    record: &ExtractedRecord,
    grid: &RawGrid,
    header: &HeaderMap,
) -> Option<NaiveDate> {
    // Strict ISO first — the prompt demands it, so this is the hot path.
    if let Some(s) = record.date.as_deref() {
        if let Ok(d) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
            return Some(d);
        }
    }

    // Malformed or masked: re-derive from the original grid row.
    if let Some(line_index) = record.line_index {
        if let Some(d) = recover_from_grid(line_index, grid, header) {
            debug!(line_index, "recovered date from source row");
            return Some(d);
        }
    }

    // No provenance pointer: a loose parse of the returned string is the only
    // remaining option.
    record.date.as_deref().and_then(resolve_date_str)
}

fn recover_from_grid(line_index: usize, grid: &RawGrid, header: &HeaderMap) -> Option<NaiveDate> {
    if line_index == 0 {
        return None;
    }
    let row = grid.row(header.header_row + line_index)?;

    if let Some(col) = header.date {
        if let Some(d) = row.get(col).and_then(resolve_date) {
            return Some(d);
        }
    }
    // No mapped date column: first resolvable cell in the row wins.
    row.iter().find_map(resolve_date)
}

// ── Filters & flags ───────────────────────────────────────────────────────────

/// Drop negative transactions that are card-bill payment receipts.
pub fn filter_noise(txs: Vec<Transaction>) -> Vec<Transaction> {
    txs.into_iter()
        .filter(|tx| {
            let noise = tx.amount < 0.0 && is_card_payment_text(&tx.search_text());
            if noise {
                debug!(line_index = tx.line_index, "dropping card-bill payment transaction");
            }
            !noise
        })
        .collect()
}

/// Log any amount whose magnitude dwarfs the statement's typical transaction —
/// a probable running-balance misclassification. Diagnostic only; the value
/// stays in the output.
pub fn flag_balance_outliers(txs: &[Transaction]) {
    let mut positives: Vec<f64> = txs.iter().map(|t| t.amount).filter(|a| *a > 0.0).collect();
    if positives.len() < 2 {
        return;
    }
    positives.sort_by(|a, b| a.total_cmp(b));
    let median = positives[positives.len() / 2];
    if median <= 0.0 {
        return;
    }

    for tx in txs {
        if tx.amount.abs() > median * BALANCE_RATIO {
            warn!(
                amount = tx.amount,
                median,
                line_index = tx.line_index,
                "amount is more than 10x the median; possible running balance"
            );
        }
    }
}
