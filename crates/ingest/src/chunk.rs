use tracing::debug;

use crate::prepare::PreparedStatement;

/// Split prepared text into provider-context-bounded segments.
///
/// The header line is repeated verbatim at the top of every segment so each is
/// independently interpretable. Lines keep their original order, no data line
/// is duplicated or dropped, and a single line longer than the budget becomes
/// its own oversized segment rather than being split mid-line.
pub fn chunk_prepared(prepared: &PreparedStatement, max_chars: usize) -> Vec<String> {
    let header = prepared.header_line.as_deref();
    let header_len = header.map_or(0, |h| h.len() + 1);

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    let flush = |chunks: &mut Vec<String>, current: &mut String| {
        if !current.is_empty() {
            chunks.push(std::mem::take(current));
        }
    };

    for line in &prepared.lines {
        let line_len = line.text.len() + 1;
        if !current.is_empty() && current.len() + line_len > max_chars {
            flush(&mut chunks, &mut current);
        }
        if current.is_empty() {
            if let Some(h) = header {
                current.push_str(h);
                current.push('\n');
            }
            // An oversized line still lands here whole; the segment simply
            // exceeds the budget.
            if header_len + line_len > max_chars {
                current.push_str(&line.text);
                current.push('\n');
                flush(&mut chunks, &mut current);
                continue;
            }
        }
        current.push_str(&line.text);
        current.push('\n');
    }
    flush(&mut chunks, &mut current);

    debug!(chunks = chunks.len(), max_chars, "chunked prepared statement");
    chunks
}
