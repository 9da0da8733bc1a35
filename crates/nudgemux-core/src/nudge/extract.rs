//! Client-agnostic input extraction.
//!
//! Reconstructs what the user was typing from the diff between an
//! untouched capture and a post-clear capture. The algorithm works with
//! any TUI client: no prompt strings, no separator patterns, no client
//! state. The continuation prefix is detected dynamically from the diff
//! output itself.

use tracing::debug;

use crate::diff::{group_hunks, myers_diff, Hunk};

use super::DIFF_MARGIN_LINES;

/// Detect the TUI's continuation prefix from the deleted content of a
/// hunk, interpreted as logical lines.
///
/// Line 0 never carries a prefix: the TUI's leading prompt glyph sits in
/// the Equal region before the hunk. With 2+ non-empty continuation
/// lines, the longest common byte prefix (trimmed to non-content
/// characters) is the TUI prefix - this covers `... ` REPL continuations,
/// `> ` shell continuations, and arbitrary indentation without naming any
/// of them. With exactly 1 continuation line, its leading whitespace run
/// is the prefix.
pub fn detect_continuation_prefix(deleted: &[u8]) -> &[u8] {
    let mut lines = deleted.split(|&b| b == b'\n');
    if lines.next().is_none() {
        return &[];
    }

    let cont: Vec<&[u8]> = lines.filter(|l| !l.is_empty()).collect();
    match cont.len() {
        0 => &[],
        1 => {
            // Single continuation line: leading whitespace run.
            let line = cont[0];
            let end = line
                .iter()
                .position(|&b| b != b' ' && b != b'\t')
                .unwrap_or(line.len());
            &line[..end]
        }
        _ => {
            let mut prefix = cont[0];
            for line in &cont[1..] {
                prefix = common_utf8_prefix(prefix, line);
            }
            // Trim to non-content so a shared content prefix across all
            // continuation lines is never stripped from the input.
            trim_to_noncontent(prefix)
        }
    }
}

/// Longest common prefix of `a` and `b`, truncated to the last complete
/// UTF-8 code-point boundary so a multi-byte character is never split.
fn common_utf8_prefix<'a>(a: &'a [u8], b: &[u8]) -> &'a [u8] {
    let mut end = a.iter().zip(b).take_while(|(x, y)| x == y).count();

    // Walk back over continuation bytes (10xxxxxx).
    while end > 0 && end < a.len() && a[end - 1] & 0xC0 == 0x80 {
        end -= 1;
    }
    // If we stopped on a lead byte without its full sequence, drop it too.
    if end > 0 && a[end - 1] >= 0x80 {
        let mut r = end - 1;
        while r > 0 && a[r] & 0xC0 == 0x80 {
            r -= 1;
        }
        let lead = a[r];
        let rune_len = match lead {
            0x00..=0x7F => 1,
            l if l & 0xE0 == 0xC0 => 2,
            l if l & 0xF0 == 0xE0 => 3,
            l if l & 0xF8 == 0xF0 => 4,
            _ => 1, // invalid lead byte, treat as a single byte
        };
        if r + rune_len > end {
            end = r;
        }
    }

    &a[..end]
}

/// Trim a candidate prefix to non-content characters only.
///
/// Keeps ASCII whitespace and common TUI prompt punctuation; stops at the
/// first ASCII alphanumeric or any byte >= 0x80 (emoji, CJK, and other
/// multi-byte text are content, not prefix). This whitelist is the single
/// piece of domain knowledge in the extraction path.
fn trim_to_noncontent(prefix: &[u8]) -> &[u8] {
    for (i, &c) in prefix.iter().enumerate() {
        match c {
            b' ' | b'\t' | b'.' | b'>' | b'|' | b':' => continue,
            _ => return &prefix[..i],
        }
    }
    prefix
}

/// Last `n` logical lines of `s`. `n == 0` means no trimming; a string
/// with fewer than `n` lines is returned unchanged.
pub fn last_n_lines(s: &str, n: usize) -> &str {
    if n == 0 {
        return s;
    }
    let mut count = 0;
    for (i, b) in s.bytes().enumerate().rev() {
        if b == b'\n' {
            count += 1;
            if count == n {
                return &s[i + 1..];
            }
        }
    }
    s
}

/// Reconstruct the user's original input from the diff between the
/// untouched capture and the cleared capture.
///
/// Steps:
/// 1. Trim both captures to the last `capture_n + DIFF_MARGIN_LINES`
///    logical lines. The input always sits near the bottom; the rest of
///    the scrollback is identical on both sides and only inflates the
///    diff cost.
/// 2. Diff, group into hunks, and collect every hunk with deleted bytes
///    as a candidate - the input hunk and a status-bar hunk may both
///    qualify.
/// 3. Select the input hunk: the last candidate with a detectable
///    continuation prefix (multi-line input sits near the bottom);
///    otherwise the candidate with the smallest inserted side, since
///    clearing leaves an almost-empty inserted side while status swaps
///    insert comparable text. A fallback candidate whose inserted side is
///    at least as long as its deleted side is a symmetric swap, not
///    cleared input: return empty.
/// 4. Strip the detected continuation prefix once from lines 1.., rejoin,
///    and right-trim trailing newlines (absorbed separator newlines leave
///    a spurious one).
///
/// Known irreducible losses: a leading newline in the input lands in the
/// Equal region and cannot be recovered, and per-line trailing spaces are
/// already stripped by the capture join.
pub fn extract_original_input(original: &str, cleared: &str, capture_n: usize) -> String {
    let (mut original, mut cleared) = (original, cleared);
    if capture_n > 0 {
        let trim = capture_n + DIFF_MARGIN_LINES;
        original = last_n_lines(original, trim);
        cleared = last_n_lines(cleared, trim);
    }

    let diffs = myers_diff(original.as_bytes(), cleared.as_bytes());
    let hunks = group_hunks(&diffs);

    let candidates: Vec<&Hunk> = hunks.iter().filter(|h| !h.deleted.is_empty()).collect();
    if candidates.is_empty() {
        return String::new();
    }

    let selected = match candidates
        .iter()
        .rev()
        .find(|h| !detect_continuation_prefix(&h.deleted).is_empty())
    {
        Some(&hunk) => hunk,
        None => {
            let Some(&best) = candidates.iter().min_by_key(|h| h.inserted.len()) else {
                return String::new();
            };
            if best.inserted.len() >= best.deleted.len() {
                // Symmetric change (a status-bar text swap), not cleared
                // input. Cleared input always has a much smaller inserted
                // side.
                return String::new();
            }
            best
        }
    };

    let prefix = detect_continuation_prefix(&selected.deleted);
    debug!(
        candidates = candidates.len(),
        deleted_bytes = selected.deleted.len(),
        prefix_bytes = prefix.len(),
        "input hunk selected"
    );

    let mut out = Vec::with_capacity(selected.deleted.len());
    for (i, line) in selected.deleted.split(|&b| b == b'\n').enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        // Line 0 needs no stripping: the prompt glyph is in the Equal
        // region, not in the hunk.
        if i > 0 && !prefix.is_empty() && line.starts_with(prefix) {
            out.extend_from_slice(&line[prefix.len()..]);
        } else {
            out.extend_from_slice(line);
        }
    }
    while out.last() == Some(&b'\n') {
        out.pop();
    }

    // Half-emitted escape sequences at capture boundaries flow through the
    // diff as opaque bytes; they are replaced here if they survived.
    String::from_utf8_lossy(&out).into_owned()
}
