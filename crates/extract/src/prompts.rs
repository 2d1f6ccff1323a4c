use serde_json::{json, Value};

/// System prompt shared by every provider/model attempt. The rules here are
/// the ones statement tables most often get wrong: posting vs. transaction
/// dates, running balances masquerading as amounts, and split debit/credit
/// columns.
pub const SYSTEM_PROMPT: &str = "\
You convert bank and credit-card statement tables into structured transactions.

The input is a statement rendered as text: a header line prefixed with `HDR:` \
describing the columns, followed by numbered data lines (`3: ...`) where the \
number is the line_index of that row.

Rules:
1. Extract one transaction per data line that represents a real transaction. \
Skip subtotal, opening/closing balance and page-footer lines.
2. If the table carries both a transaction date and a posting/settlement \
date, use the later posting date.
3. Never use a running-balance column as the amount. Balances grow or shrink \
cumulatively down the table; amounts do not.
4. If the table has separate debit and credit columns, exactly one of them is \
populated per row: a debit is money out, a credit is money in. Set `direction` \
accordingly.
5. `amount` is always a positive magnitude; the `direction` field carries the \
sign (`debit` = money out, `credit` = money in).
6. Dates must be returned as ISO `YYYY-MM-DD`.
7. Set `line_index` to the number prefixing the source line.
8. Respond with JSON only, matching the provided schema. No prose.";

/// Per-chunk user message.
pub fn user_prompt(statement_text: &str) -> String {
    format!(
        "Extract every transaction from this statement segment.\n\n{statement_text}"
    )
}

/// JSON schema for the structured response; sent with every request so the
/// provider constrains its output shape.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "transactions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "amount": { "type": "number" },
                        "currency": { "type": ["string", "null"] },
                        "date": { "type": ["string", "null"] },
                        "merchant": { "type": ["string", "null"] },
                        "payment_method": { "type": ["string", "null"] },
                        "note": { "type": ["string", "null"] },
                        "category": { "type": ["string", "null"] },
                        "direction": { "type": ["string", "null"], "enum": ["debit", "credit", null] },
                        "line_index": { "type": ["integer", "null"] }
                    },
                    "required": ["amount"]
                }
            }
        },
        "required": ["transactions"]
    })
}
