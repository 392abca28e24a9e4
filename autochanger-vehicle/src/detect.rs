//! Script detection and display-label derivation.

use crate::document::{NodeId, VehicleDocument};

/// Label used when a script has no usable comment line.
const UNKNOWN_SCRIPT: &str = "Unknown Script";

/// An in-memory entry pairing a document node with derived display metadata.
///
/// Records are built in a batch by [`detect_scripts`] and replaced wholesale
/// by the next detection pass; the document, not the record, is the source of
/// truth for content.
#[derive(Debug, Clone)]
pub struct ScriptRecord {
    /// Handle into the owning document.
    pub node: NodeId,
    /// 1-based position among detected scripts in document order.
    pub index: usize,
    /// Current script text, mirroring the attribute value after edits.
    pub content: String,
    /// Display name derived once at detection time from the original
    /// content's leading comment lines; never recomputed after edits.
    pub label: String,
    /// True once the user overwrote `content` via the replace operation.
    pub was_edited: bool,
}

/// Case-insensitive prefix test that tolerates multi-byte text.
pub(crate) fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Scan a document for managed scripts.
///
/// Produces one record per element in document order whose `script` attribute
/// value, after trimming, is non-empty and starts with `prefix`
/// case-insensitively. Whitespace-only attributes never match, regardless of
/// the prefix.
pub fn detect_scripts(document: &VehicleDocument, prefix: &str) -> Vec<ScriptRecord> {
    let mut records = Vec::new();
    for (node, value) in document.script_nodes() {
        let trimmed = value.trim();
        if trimmed.is_empty() || !starts_with_ignore_case(trimmed, prefix) {
            continue;
        }
        records.push(ScriptRecord {
            node,
            index: records.len() + 1,
            content: value.to_string(),
            label: derive_label(value),
            was_edited: false,
        });
    }
    records
}

/// Derive the display label from a script's leading comment lines.
///
/// The script is split on newline characters, discarding empty lines. Line 1
/// minus its two-character comment marker (trimmed) is the base label; if
/// line 2 is also a comment, its stripped text is appended after a space.
pub fn derive_label(content: &str) -> String {
    let lines: Vec<&str> = content
        .split(['\n', '\r'])
        .filter(|l| !l.is_empty())
        .collect();

    let Some(first) = lines.first() else {
        return UNKNOWN_SCRIPT.to_string();
    };

    let mut label = strip_comment_marker(first).to_string();
    if let Some(second) = lines.get(1)
        && second.trim_start().starts_with("--")
    {
        label.push(' ');
        label.push_str(strip_comment_marker(second));
    }
    label
}

/// Drop the leading `--` marker (the first two characters of the trimmed
/// line) plus surrounding whitespace.
fn strip_comment_marker(line: &str) -> &str {
    let trimmed = line.trim();
    match trimmed.char_indices().nth(2) {
        Some((offset, _)) => trimmed[offset..].trim(),
        None => "",
    }
}
