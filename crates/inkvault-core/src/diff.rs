//! Line-level diffing between document versions
//!
//! [`EditScript::compute`] aligns two texts line by line via a
//! dynamic-programming longest-common-subsequence pass and backtracks into
//! an ordered op sequence. [`EditScript::apply`] replays a script against a
//! base text to reconstruct the derived text. Pure, no I/O.
//!
//! The wire format is a JSON array of `[tag, line]` pairs with tags `"="`,
//! `"+"` and `"-"`, which is what the store persists for diff payloads.

use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, HistoryResult};

/// A single line operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "(String, String)", try_from = "(String, String)")]
pub enum EditOp {
    /// Line unchanged; carries the derived-side text
    Keep(String),
    /// Line added on the derived side
    Insert(String),
    /// Line removed from the base side
    Delete(String),
}

impl From<EditOp> for (String, String) {
    fn from(op: EditOp) -> Self {
        match op {
            EditOp::Keep(line) => ("=".to_string(), line),
            EditOp::Insert(line) => ("+".to_string(), line),
            EditOp::Delete(line) => ("-".to_string(), line),
        }
    }
}

impl TryFrom<(String, String)> for EditOp {
    type Error = String;

    fn try_from((tag, line): (String, String)) -> Result<Self, Self::Error> {
        match tag.as_str() {
            "=" => Ok(Self::Keep(line)),
            "+" => Ok(Self::Insert(line)),
            "-" => Ok(Self::Delete(line)),
            other => Err(format!("unknown edit op tag: {:?}", other)),
        }
    }
}

/// An ordered edit script transforming one text into another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditScript {
    ops: Vec<EditOp>,
}

/// Line equality for alignment: trailing whitespace does not count
fn lines_match(a: &str, b: &str) -> bool {
    a.trim_end() == b.trim_end()
}

impl EditScript {
    /// Compute the edit script from `old` to `new`.
    ///
    /// Splitting is on `'\n'` with no special-casing, so the empty string is
    /// one empty line and a trailing newline yields a trailing empty line;
    /// this is what makes `apply` round-trip byte-exact. When several optimal
    /// alignments exist, inserts are preferred over deletes.
    pub fn compute(old: &str, new: &str) -> Self {
        let old_lines: Vec<&str> = old.split('\n').collect();
        let new_lines: Vec<&str> = new.split('\n').collect();

        let m = old_lines.len();
        let n = new_lines.len();

        let mut dp = vec![vec![0u32; n + 1]; m + 1];
        for i in 1..=m {
            for j in 1..=n {
                dp[i][j] = if lines_match(old_lines[i - 1], new_lines[j - 1]) {
                    dp[i - 1][j - 1] + 1
                } else {
                    dp[i - 1][j].max(dp[i][j - 1])
                };
            }
        }

        let mut ops = Vec::new();
        let mut i = m;
        let mut j = n;

        while i > 0 || j > 0 {
            if i > 0 && j > 0 && lines_match(old_lines[i - 1], new_lines[j - 1]) {
                ops.push(EditOp::Keep(new_lines[j - 1].to_string()));
                i -= 1;
                j -= 1;
            } else if j > 0 && (i == 0 || dp[i][j - 1] >= dp[i - 1][j]) {
                ops.push(EditOp::Insert(new_lines[j - 1].to_string()));
                j -= 1;
            } else {
                ops.push(EditOp::Delete(old_lines[i - 1].to_string()));
                i -= 1;
            }
        }

        ops.reverse();
        Self { ops }
    }

    /// Replay the script against `base`, reconstructing the derived text.
    ///
    /// A keep op whose line does not match the base line at the cursor, or
    /// any op that runs past the end of the base, means the script was
    /// computed against a different base than the one supplied; that is
    /// stored-data corruption and fails with
    /// [`HistoryError::BrokenChain`]. Base lines remaining after the script
    /// is exhausted are appended unchanged.
    pub fn apply(&self, base: &str) -> HistoryResult<String> {
        let base_lines: Vec<&str> = base.split('\n').collect();
        let mut output: Vec<&str> = Vec::new();
        let mut cursor = 0usize;

        for op in &self.ops {
            match op {
                EditOp::Keep(line) => match base_lines.get(cursor) {
                    Some(base_line) if lines_match(base_line, line) => {
                        output.push(line);
                        cursor += 1;
                    }
                    Some(base_line) => {
                        return Err(HistoryError::broken_chain(format!(
                            "keep op {:?} does not match base line {:?} at line {}",
                            line,
                            base_line,
                            cursor + 1
                        )));
                    }
                    None => {
                        return Err(HistoryError::broken_chain(format!(
                            "keep op {:?} runs past the end of the base text",
                            line
                        )));
                    }
                },
                EditOp::Insert(line) => output.push(line),
                EditOp::Delete(line) => {
                    if cursor >= base_lines.len() {
                        return Err(HistoryError::broken_chain(format!(
                            "delete op {:?} runs past the end of the base text",
                            line
                        )));
                    }
                    cursor += 1;
                }
            }
        }

        output.extend_from_slice(&base_lines[cursor..]);
        Ok(output.join("\n"))
    }

    /// The ordered ops, oldest edit first
    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    /// Check whether the script contains any insert or delete
    pub fn has_changes(&self) -> bool {
        self.ops
            .iter()
            .any(|op| matches!(op, EditOp::Insert(_) | EditOp::Delete(_)))
    }

    /// Serialize to the JSON wire format
    pub fn to_json(&self) -> HistoryResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON wire format. An undecodable script in storage is a
    /// corruption signal, not an infrastructure failure.
    pub fn from_json(wire: &str) -> HistoryResult<Self> {
        serde_json::from_str(wire)
            .map_err(|e| HistoryError::broken_chain(format!("invalid edit script: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(old: &str, new: &str) {
        let script = EditScript::compute(old, new);
        assert_eq!(script.apply(old).unwrap(), new, "old={:?} new={:?}", old, new);
    }

    #[test]
    fn test_round_trip_insert_line() {
        round_trip("line1\nline2", "line1\nlineX\nline2");
    }

    #[test]
    fn test_round_trip_delete_line() {
        round_trip("line1\nline2\nline3", "line1\nline3");
    }

    #[test]
    fn test_round_trip_replace_line() {
        round_trip("line1\nline2\nline3", "line1\nmodified\nline3");
    }

    #[test]
    fn test_round_trip_reorder() {
        round_trip("a\nb", "b\na");
    }

    #[test]
    fn test_round_trip_empty_sides() {
        round_trip("", "");
        round_trip("", "x");
        round_trip("x", "");
    }

    #[test]
    fn test_round_trip_trailing_newline() {
        round_trip("a\n", "a");
        round_trip("a", "a\n");
        round_trip("a\nb\n", "a\nc\n");
    }

    #[test]
    fn test_round_trip_trailing_whitespace_only_change() {
        // Alignment ignores trailing whitespace, the output must not
        round_trip("a \nb", "a\nb");
        round_trip("a\nb", "a\t\nb");
    }

    #[test]
    fn test_round_trip_identical() {
        let text = "one\ntwo\nthree";
        let script = EditScript::compute(text, text);
        assert!(!script.has_changes());
        assert_eq!(script.apply(text).unwrap(), text);
    }

    #[test]
    fn test_ties_prefer_insert_over_delete() {
        // Backtracking checks the insert neighbor first on ties, which after
        // reversal puts the delete ahead of the insert, deterministically.
        let script = EditScript::compute("a", "b");
        assert_eq!(
            script.ops(),
            &[
                EditOp::Delete("a".to_string()),
                EditOp::Insert("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_apply_mismatched_keep_is_broken_chain() {
        let script = EditScript::compute("a\nb", "a\nc");
        let err = script.apply("x\nb").unwrap_err();
        assert!(matches!(err, HistoryError::BrokenChain(_)), "got {:?}", err);
    }

    #[test]
    fn test_apply_past_end_is_broken_chain() {
        let script = EditScript::compute("a\nb\nc", "a\nb");
        let err = script.apply("a").unwrap_err();
        assert!(matches!(err, HistoryError::BrokenChain(_)), "got {:?}", err);
    }

    #[test]
    fn test_trailing_base_lines_appended() {
        // A script computed against a prefix still applies; the rest of the
        // base rides along untouched.
        let script = EditScript::compute("a", "b\na");
        assert_eq!(script.apply("a\nz\nz").unwrap(), "b\na\nz\nz");
    }

    #[test]
    fn test_wire_format() {
        let script = EditScript::compute("line1\nline2", "line1\nlineX\nline2");
        let wire = script.to_json().unwrap();
        assert_eq!(wire, r#"[["=","line1"],["+","lineX"],["=","line2"]]"#);

        let parsed = EditScript::from_json(&wire).unwrap();
        assert_eq!(parsed, script);
    }

    #[test]
    fn test_wire_format_rejects_unknown_tag() {
        let err = EditScript::from_json(r#"[["?","line"]]"#).unwrap_err();
        assert!(matches!(err, HistoryError::BrokenChain(_)), "got {:?}", err);
    }

    #[test]
    fn test_wire_format_rejects_garbage() {
        assert!(EditScript::from_json("not json").is_err());
    }

    #[test]
    fn test_round_trip_larger_document() {
        let old: String = (0..40).map(|i| format!("paragraph {}\n", i)).collect();
        let mut new = old.replace("paragraph 7", "PARAGRAPH SEVEN");
        new.push_str("appendix\n");
        round_trip(&old, &new);
    }
}
