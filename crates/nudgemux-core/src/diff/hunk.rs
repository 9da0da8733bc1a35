//! Hunk grouping and post-delivery splice analysis.

use super::myers::DiffOp;

/// Minimum size of an Equal run required to end a hunk. Shorter Equal
/// runs are absorbed into the current hunk, appended to both sides.
///
/// Byte-level Myers finds spurious 1-2 byte matches between unrelated
/// phrases (letters like 's', 'n', 't' shared between them), which would
/// otherwise fragment one logical change into many tiny hunks. Real
/// content boundaries in a pane capture (separator lines, status chrome,
/// long untouched regions) produce Equal runs far above this threshold.
pub const MIN_EQUAL_TO_BREAK_HUNK: usize = 32;

/// A contiguous change region: bytes deleted from the source paired with
/// bytes inserted in the target. Sub-threshold Equal runs between edits
/// are present on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    /// What was in the source (before).
    pub deleted: Vec<u8>,
    /// What is in the target (after).
    pub inserted: Vec<u8>,
}

/// Group an edit script into hunks.
///
/// Equal runs of at least [`MIN_EQUAL_TO_BREAK_HUNK`] bytes end the
/// current hunk; shorter ones are absorbed into it.
pub fn group_hunks(diffs: &[DiffOp]) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut current = Hunk::default();
    let mut in_hunk = false;

    for d in diffs {
        match d {
            DiffOp::Equal(data) => {
                if data.len() >= MIN_EQUAL_TO_BREAK_HUNK {
                    if in_hunk {
                        hunks.push(std::mem::take(&mut current));
                        in_hunk = false;
                    }
                } else if in_hunk {
                    current.deleted.extend_from_slice(data);
                    current.inserted.extend_from_slice(data);
                }
            }
            DiffOp::Delete(data) => {
                current.deleted.extend_from_slice(data);
                in_hunk = true;
            }
            DiffOp::Insert(data) => {
                current.inserted.extend_from_slice(data);
                in_hunk = true;
            }
        }
    }
    if in_hunk {
        hunks.push(current);
    }

    hunks
}

/// How an injected message landed relative to concurrent typing, found by
/// diffing a capture taken before the injection against one taken after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NudgeSplice {
    /// Bytes from the before-capture that the change region replaced.
    pub original: Vec<u8>,
    /// Bytes in the after-capture that landed before the message
    /// (keystrokes the user got in between).
    pub before_nudge: Vec<u8>,
    /// Bytes in the after-capture that landed after the message.
    pub after_nudge: Vec<u8>,
}

impl NudgeSplice {
    /// True when no stray typing landed on either side of the message,
    /// ignoring whitespace.
    pub fn is_clean(&self) -> bool {
        let blank = |bytes: &[u8]| bytes.iter().all(|b| b.is_ascii_whitespace());
        blank(&self.before_nudge) && blank(&self.after_nudge)
    }

    /// The text a caller should re-insert into the input field: the
    /// replaced original plus any typing that raced the injection.
    pub fn text_to_restore(&self) -> Vec<u8> {
        let mut restore =
            Vec::with_capacity(self.original.len() + self.before_nudge.len() + self.after_nudge.len());
        restore.extend_from_slice(&self.original);
        restore.extend_from_slice(&self.before_nudge);
        restore.extend_from_slice(&self.after_nudge);
        restore
    }
}

/// Locate `nudge` in `after` and determine what it replaced in `before`.
///
/// Walks the edit script grouping edits into hunks (small Equal runs
/// absorbed, as in [`group_hunks`]) and returns the splice for the hunk
/// whose after-range contains the message. This copes with multiple
/// disjoint changes - scrolling, new TUI output, status swaps - without
/// assuming the message survived inside a single edit operation.
///
/// Returns `None` when the message does not appear in `after`.
pub fn find_nudge_in_diff(
    before: &[u8],
    after: &[u8],
    nudge: &[u8],
    diffs: &[DiffOp],
) -> Option<NudgeSplice> {
    if nudge.is_empty() {
        return None;
    }
    let nudge_pos = after.windows(nudge.len()).position(|w| w == nudge)?;
    let nudge_end = nudge_pos + nudge.len();

    let mut before_pos = 0usize;
    let mut after_pos = 0usize;
    let mut i = 0usize;

    while i < diffs.len() {
        if let DiffOp::Equal(data) = &diffs[i] {
            before_pos += data.len();
            after_pos += data.len();
            i += 1;
            continue;
        }

        // Start of a hunk: consume operations until a significant Equal.
        let hunk_before_start = before_pos;
        let hunk_after_start = after_pos;
        while i < diffs.len() {
            match &diffs[i] {
                DiffOp::Equal(data) => {
                    if data.len() >= MIN_EQUAL_TO_BREAK_HUNK {
                        break;
                    }
                    before_pos += data.len();
                    after_pos += data.len();
                }
                DiffOp::Delete(data) => before_pos += data.len(),
                DiffOp::Insert(data) => after_pos += data.len(),
            }
            i += 1;
        }

        if nudge_pos >= hunk_after_start && nudge_pos < after_pos {
            let changed = &after[hunk_after_start..after_pos];
            let local_pos = nudge_pos - hunk_after_start;
            let local_end = (nudge_end - hunk_after_start).min(changed.len());

            return Some(NudgeSplice {
                original: before[hunk_before_start..before_pos].to_vec(),
                before_nudge: changed[..local_pos].to_vec(),
                after_nudge: changed[local_end..].to_vec(),
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::myers_diff;

    #[test]
    fn test_group_basic() {
        let wide_equal = DiffOp::Equal(vec![b'='; MIN_EQUAL_TO_BREAK_HUNK]);
        let diffs = vec![
            DiffOp::Delete(b"old".to_vec()),
            DiffOp::Insert(b"new".to_vec()),
            wide_equal,
            DiffOp::Delete(b"gone".to_vec()),
        ];
        let hunks = group_hunks(&diffs);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].deleted, b"old");
        assert_eq!(hunks[0].inserted, b"new");
        assert_eq!(hunks[1].deleted, b"gone");
        assert!(hunks[1].inserted.is_empty());
    }

    #[test]
    fn test_equal_at_threshold_breaks_hunk() {
        let diffs = vec![
            DiffOp::Delete(b"xxxx".to_vec()),
            DiffOp::Equal(vec![b'e'; MIN_EQUAL_TO_BREAK_HUNK]),
            DiffOp::Delete(b"yyyy".to_vec()),
        ];
        let hunks = group_hunks(&diffs);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].deleted, b"xxxx");
        assert_eq!(hunks[1].deleted, b"yyyy");
    }

    #[test]
    fn test_equal_below_threshold_absorbed() {
        let small = vec![b'e'; MIN_EQUAL_TO_BREAK_HUNK - 1];
        let diffs = vec![
            DiffOp::Delete(b"xxxx".to_vec()),
            DiffOp::Equal(small.clone()),
            DiffOp::Delete(b"yyyy".to_vec()),
        ];
        let hunks = group_hunks(&diffs);
        assert_eq!(hunks.len(), 1);

        // The absorbed Equal appears on both sides.
        let mut deleted = b"xxxx".to_vec();
        deleted.extend_from_slice(&small);
        deleted.extend_from_slice(b"yyyy");
        assert_eq!(hunks[0].deleted, deleted);
        assert_eq!(hunks[0].inserted, small);
    }

    #[test]
    fn test_no_edits_no_hunks() {
        let diffs = vec![DiffOp::Equal(b"unchanged".to_vec())];
        assert!(group_hunks(&diffs).is_empty());
    }

    #[test]
    fn test_unrelated_phrases_stay_one_hunk() {
        // Shared letters between unrelated phrases produce tiny Equal runs
        // that must not fragment the change.
        let before = b"I'm starting to type some text";
        let after = b"completely different words here";
        let hunks = group_hunks(&myers_diff(before, after));
        assert_eq!(hunks.len(), 1);
    }

    #[test]
    fn test_separator_splits_changes() {
        let sep = "\u{2500}".repeat(40); // 120 bytes, well above threshold
        let before = format!("input text\n{sep}\nstatus old");
        let after = format!("other text\n{sep}\nstatus new");
        let hunks = group_hunks(&myers_diff(before.as_bytes(), after.as_bytes()));
        assert_eq!(hunks.len(), 2);
    }

    #[test]
    fn test_find_nudge_missing() {
        let before = b"some pane".as_slice();
        let after = b"some pane changed".as_slice();
        let diffs = myers_diff(before, after);
        assert!(find_nudge_in_diff(before, after, b"not present", &diffs).is_none());
        assert!(find_nudge_in_diff(before, after, b"", &diffs).is_none());
    }

    #[test]
    fn test_find_nudge_clean_delivery() {
        let sep = "\u{2500}".repeat(40);
        let before = format!("output above\n{sep}\n> ");
        let after = format!("output above\n{sep}\n> status update please");
        let diffs = myers_diff(before.as_bytes(), after.as_bytes());

        let splice =
            find_nudge_in_diff(before.as_bytes(), after.as_bytes(), b"status update please", &diffs)
                .expect("nudge should be found");
        assert!(splice.original.is_empty());
        assert!(splice.is_clean());
        assert_eq!(splice.text_to_restore(), b"");
    }

    #[test]
    fn test_find_nudge_with_concurrent_typing() {
        // Realistic before/after pair: the top line scrolled off, the TUI
        // added a spinner line, the status bar changed, and the user kept
        // typing while the injection raced the input field.
        let sep = "\u{2500}".repeat(100);
        let before = format!(
            "\u{25cf} Standing by for the next task.\n\
             \n\
             \u{276f} [relay] ping check 1\n\
             \u{276f} [relay] ping check 3\n\
             \n\
             \u{25cf} Received ping checks 1 and 3; check 2 never arrived.\n\
             \n\
             {sep}\n\
             \u{276f} I was in the middle of typing some not\n\
             {sep}\n\
             \u{2002} shift+tab to cycle modes"
        );
        let after = format!(
            "\u{276f} [relay] ping check 1\n\
             \u{276f} [relay] ping check 3\n\
             \n\
             \u{25cf} Received ping checks 1 and 3; check 2 never arrived.\n\
             \n\
             \u{2733} Pondering\u{2026}\n\
             \n\
             {sep}\n\
             \u{276f} es here t[relay] ping check 7\n\
             {sep}\n\
             \u{2002} shift+tab to cycle modes     build 2.1.3"
        );
        let nudge = b"[relay] ping check 7";

        let diffs = myers_diff(before.as_bytes(), after.as_bytes());
        let splice = find_nudge_in_diff(before.as_bytes(), after.as_bytes(), nudge, &diffs)
            .expect("nudge should be found");

        assert_eq!(splice.original, b"I was in the middle of typing some not");
        assert_eq!(splice.before_nudge, b"es here t");
        assert_eq!(splice.after_nudge, b"");
        assert!(!splice.is_clean());
        assert_eq!(
            splice.text_to_restore(),
            b"I was in the middle of typing some notes here t"
        );
    }
}
