use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use tabula_core::{PipelineConfig, RawGrid};

use crate::header::HeaderMap;

const MASK: &str = "[redacted]";

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_email, r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}");
re!(re_phone_us, r"\(?\d{3}\)?[\s\-.]\d{3}[\s\-.]\d{4}");
re!(re_phone_intl, r"\+\d{7,15}\b");
re!(re_label_line, r"(?i)^\s*(address|name|account holder|customer|attn)\s*:");
re!(re_account_kw, r"(?i)\b(account|acct|card|iban|routing|sort code)\b");
re!(re_gov_id_kw,
    r"(?i)\b(ssn|social security|passport|tax id|taxpayer|national id|driver'?s licen|aadhaar|itin|nino)\b");
re!(re_iso_date, r"^\d{4}-\d{2}-\d{2}$");
re!(re_date_like, r"^(\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}|\d{8})$");

// ── Prepared text ─────────────────────────────────────────────────────────────

/// One numbered, redacted text line derived from one data row.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedLine {
    /// 1-based offset from the header row; `grid[header_row + line_index]`
    /// is the originating row.
    pub line_index: usize,
    pub text: String,
}

/// The serialized, redacted statement: the header line plus numbered data
/// lines, ready to be chunked and shipped to an extraction provider.
#[derive(Debug, Clone, Default)]
pub struct PreparedStatement {
    pub header_line: Option<String>,
    pub lines: Vec<PreparedLine>,
}

impl PreparedStatement {
    pub fn total_chars(&self) -> usize {
        let header = self.header_line.as_ref().map_or(0, |h| h.len() + 1);
        header + self.lines.iter().map(|l| l.text.len() + 1).sum::<usize>()
    }

    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.total_chars());
        if let Some(h) = &self.header_line {
            out.push_str(h);
            out.push('\n');
        }
        for line in &self.lines {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }
}

/// Serialize the grid to redacted text. Runs strictly before any network call.
pub fn prepare(grid: &RawGrid, header: &HeaderMap, redactor: &Redactor) -> PreparedStatement {
    let header_line = grid.row(header.header_row).map(|row| {
        let joined = join_cells(row);
        format!("HDR: {}", redactor.redact_line(&joined))
    });

    let mut lines = Vec::new();
    for (row_idx, row) in grid.rows.iter().enumerate().skip(header.header_row + 1) {
        let line_index = row_idx - header.header_row;
        let joined = join_cells(row);
        if joined.trim_matches([' ', '|']).is_empty() {
            continue;
        }
        let text = format!("{line_index}: {}", redactor.redact_line(&joined));
        lines.push(PreparedLine { line_index, text });
    }

    debug!(lines = lines.len(), "prepared statement text");
    PreparedStatement { header_line, lines }
}

fn join_cells(row: &[tabula_core::Cell]) -> String {
    row.iter()
        .map(|c| collapse_whitespace(&c.display_text()))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Redactor ──────────────────────────────────────────────────────────────────

/// Irreversibly masks personally identifiable fragments. Layered: the always-on
/// rules, a strict-privacy tier, and an operator-supplied custom word list.
///
/// Guard rail: tokens that parse as a decimal number or an ISO date are exempt
/// from blanket digit-masking — amounts and dates are the signal the
/// extraction step needs.
pub struct Redactor {
    strict: bool,
    custom: Option<Regex>,
}

impl Redactor {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.strict_privacy, &config.custom_redact_words)
    }

    pub fn new(strict: bool, custom_words: &[String]) -> Self {
        let custom = build_custom_pattern(custom_words);
        Self { strict, custom }
    }

    pub fn redact_line(&self, line: &str) -> String {
        if self.strict && re_gov_id_kw().is_match(line) {
            return MASK.to_string();
        }
        if let Some(m) = re_label_line().captures(line) {
            return format!("{}: {MASK}", &m[1]);
        }

        let mut out = line.to_string();
        if let Some(re) = &self.custom {
            out = re.replace_all(&out, MASK).into_owned();
        }
        out = re_email().replace_all(&out, "[email]").into_owned();
        out = re_phone_us().replace_all(&out, "[phone]").into_owned();
        out = re_phone_intl().replace_all(&out, "[phone]").into_owned();

        let near_account_kw = re_account_kw().is_match(&out);
        out.split(' ')
            .map(|tok| self.mask_token(tok, near_account_kw))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn mask_token(&self, token: &str, near_account_kw: bool) -> String {
        let core = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
        if core.is_empty() {
            return token.to_string();
        }

        // Exemptions: monetary amounts and ISO dates pass through untouched.
        if looks_like_decimal_amount(core) || re_iso_date().is_match(core) {
            return token.to_string();
        }

        let all_digits = core.chars().all(|c| c.is_ascii_digit());

        // PAN-like runs; the no-decimal-point condition is satisfied by the
        // all-digits check.
        if all_digits && (13..=19).contains(&core.len()) {
            return "[card]".to_string();
        }
        if near_account_kw && all_digits && core.len() >= 6 {
            return "[number]".to_string();
        }

        if self.strict {
            if all_digits && core.len() >= 9 {
                return "[id]".to_string();
            }
            if re_date_like().is_match(core) {
                return "[date]".to_string();
            }
        }

        token.to_string()
    }
}

fn build_custom_pattern(words: &[String]) -> Option<Regex> {
    let escaped: Vec<String> =
        words.iter().filter(|w| !w.trim().is_empty()).map(|w| regex::escape(w.trim())).collect();
    if escaped.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i){}", escaped.join("|"))).ok()
}

fn looks_like_decimal_amount(s: &str) -> bool {
    if !s.contains('.') {
        return false;
    }
    s.replace(',', "").parse::<f64>().is_ok()
}
