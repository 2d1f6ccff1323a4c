use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Advisory debit/credit tag attached to extracted records. It exists only to
/// resolve the amount sign during post-processing and is not part of the
/// final output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

/// One normalized statement entry.
///
/// Sign convention: positive = money out (expense), negative = money in
/// (refund / income / credit). `occurred_on` serializes as ISO `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: f64,
    pub currency: String,
    pub occurred_on: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// 1-based pointer back to the source data row, kept for debugging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_index: Option<usize>,
}

impl Transaction {
    /// Combined free text used by keyword filters.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(m) = self.merchant.as_deref() {
            parts.push(m);
        }
        if let Some(n) = self.note.as_deref() {
            parts.push(n);
        }
        parts.join(" ").to_lowercase()
    }
}

// ── Card-bill-payment noise ───────────────────────────────────────────────────

/// Phrases that mark a row as a receipt of paying off a card rather than an
/// economic transaction. Matched case-insensitively as substrings.
const CARD_PAYMENT_PHRASES: &[&str] = &[
    "payment received",
    "payment - thank you",
    "payment thank you",
    "thank you for your payment",
    "card payment",
    "credit card payment",
    "autopay",
    "auto pay",
    "automatic payment",
    "online payment received",
    "direct debit payment",
];

/// True when the text reads like a card-bill payment receipt.
pub fn is_card_payment_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    CARD_PAYMENT_PHRASES.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: f64, merchant: &str) -> Transaction {
        Transaction {
            amount,
            currency: "USD".into(),
            occurred_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            merchant: Some(merchant.into()),
            payment_method: None,
            note: None,
            category: None,
            line_index: None,
        }
    }

    #[test]
    fn serializes_date_as_iso() {
        let json = serde_json::to_string(&tx(50.0, "Coffee Shop")).unwrap();
        assert!(json.contains("\"occurred_on\":\"2024-01-15\""), "{json}");
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let json = serde_json::to_string(&tx(50.0, "Coffee Shop")).unwrap();
        assert!(!json.contains("note"));
        assert!(!json.contains("line_index"));
    }

    #[test]
    fn search_text_merges_merchant_and_note() {
        let mut t = tx(1.0, "AMAZON");
        t.note = Some("Refund".into());
        assert_eq!(t.search_text(), "amazon refund");
    }

    #[test]
    fn card_payment_phrases_match_case_insensitively() {
        assert!(is_card_payment_text("CREDIT CARD PAYMENT THANK YOU"));
        assert!(is_card_payment_text("AutoPay posted"));
        assert!(!is_card_payment_text("STARBUCKS COFFEE"));
    }

    #[test]
    fn direction_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Credit).unwrap(), "\"credit\"");
        let d: Direction = serde_json::from_str("\"debit\"").unwrap();
        assert_eq!(d, Direction::Debit);
    }
}
