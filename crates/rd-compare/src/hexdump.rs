//! Hex + ASCII rendering around a differing offset.

use std::fmt::Write;
use std::ops::Range;

/// Bytes shown per row.
pub const ROW_WIDTH: usize = 16;

/// Bytes shown on each side of the differing offset.
pub const DEFAULT_CONTEXT_BYTES: usize = 64;

/// Window `[offset - context, offset + context)`, clipped to `[0, len)`.
///
/// The byte at `offset` itself is always inside the window when it exists,
/// even with a zero context.
pub fn context_window(offset: usize, context: usize, len: usize) -> Range<usize> {
    let start = offset.saturating_sub(context).min(len);
    let end = offset.saturating_add(context.max(1)).min(len);
    start..end
}

/// Dump `data[window]` with absolute offsets, flagging `highlight` as `[hh]`.
///
/// The brackets replace the separating spaces, so flagged and unflagged rows
/// keep the same column layout.
pub fn hex_dump(data: &[u8], window: Range<usize>, highlight: Option<usize>) -> String {
    let end = window.end.min(data.len());
    let start = window.start.min(end);
    if start == end {
        return "(no bytes in window)".to_string();
    }

    let flagged = |pos: usize| highlight == Some(pos) && pos < end;
    let mut out = String::new();

    for row in (start..end).step_by(ROW_WIDTH) {
        let _ = write!(out, "{:08x}:", row);
        let mut ascii = String::with_capacity(ROW_WIDTH);

        for j in 0..ROW_WIDTH {
            let pos = row + j;
            let prev_flagged = j > 0 && flagged(pos - 1);
            if j == ROW_WIDTH / 2 {
                out.push_str(if prev_flagged { "] " } else { "  " });
                if flagged(pos) {
                    out.pop();
                    out.push('[');
                }
            } else if flagged(pos) {
                out.push('[');
            } else if prev_flagged {
                out.push(']');
            } else {
                out.push(' ');
            }

            if pos < end {
                let byte = data[pos];
                let _ = write!(out, "{:02x}", byte);
                ascii.push(if (0x20..0x7f).contains(&byte) { byte as char } else { '.' });
            } else {
                out.push_str("  ");
                ascii.push(' ');
            }
        }

        let last = row + ROW_WIDTH - 1;
        out.push(if flagged(last) { ']' } else { ' ' });
        let _ = writeln!(out, " |{}|", ascii);
    }

    out.pop();
    out
}

/// Side-by-side context for a content difference at `offset`.
pub fn hex_context(reference: &[u8], candidate: &[u8], offset: usize, context: usize) -> String {
    let longest = reference.len().max(candidate.len());
    let window = context_window(offset, context, longest);

    let mut out = String::new();
    let _ = writeln!(out, "Difference at offset 0x{:08x} ({} decimal)", offset, offset);
    let _ = writeln!(
        out,
        "Context: {} to {} (showing {} bytes)",
        window.start,
        window.end,
        window.len()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Reference:");
    let _ = writeln!(out, "{}", hex_dump(reference, window.clone(), Some(offset)));
    let _ = writeln!(out);
    let _ = writeln!(out, "Candidate:");
    let _ = write!(out, "{}", hex_dump(candidate, window, Some(offset)));
    out
}
