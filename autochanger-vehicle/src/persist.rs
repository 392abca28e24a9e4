//! Vehicle file persistence: load, re-prefixing of edited scripts, and
//! atomic save.
//!
//! Saving is write-to-temp-then-rename so a failed write can leave a stray
//! temp file but never a truncated vehicle file. Whether to prompt before
//! re-prefixing is the caller's decision: the GUI shows the plan's labels in
//! a confirmation dialog, remote-triggered saves apply it silently.

use crate::detect::{ScriptRecord, starts_with_ignore_case};
use crate::document::VehicleDocument;
use crate::error::VehicleError;
use std::fs;
use std::path::Path;

/// One record a save would re-prefix, identified for the confirmation
/// dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReprefixEntry {
    /// Position in the record list.
    pub record: usize,
    /// Display label shown when asking for confirmation.
    pub label: String,
}

/// Load and parse a vehicle file.
///
/// A missing file or malformed XML surfaces as a [`VehicleError`] carrying
/// the underlying I/O or parser message.
pub fn load_document(path: &Path) -> Result<VehicleDocument, VehicleError> {
    let bytes = fs::read(path).map_err(|source| VehicleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    VehicleDocument::parse(&bytes)
}

/// Find edited records whose content no longer starts with the detection
/// prefix (case-insensitive, leading whitespace ignored).
pub fn reprefix_plan(records: &[ScriptRecord], prefix: &str) -> Vec<ReprefixEntry> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.was_edited && !starts_with_ignore_case(r.content.trim_start(), prefix))
        .map(|(i, r)| ReprefixEntry {
            record: i,
            label: r.label.clone(),
        })
        .collect()
}

/// Prepend `prefix + "\n"` to each planned record, writing through to both
/// the record and its attribute.
pub fn apply_reprefix(
    document: &mut VehicleDocument,
    records: &mut [ScriptRecord],
    plan: &[ReprefixEntry],
    prefix: &str,
) {
    for entry in plan {
        let Some(record) = records.get_mut(entry.record) else {
            log::error!("Re-prefix plan entry {} out of range", entry.record);
            continue;
        };
        let content = format!("{prefix}\n{}", record.content);
        if !document.set_script_attribute(record.node, &content) {
            log::error!("Re-prefix target node {:?} vanished from document", record.node);
            continue;
        }
        record.content = content;
        log::info!("Re-added detection prefix to \"{}\"", record.label);
    }
}

/// Serialize the document and write it to `path` atomically.
pub fn save_document(path: &Path, document: &VehicleDocument) -> Result<(), VehicleError> {
    let bytes = document.to_bytes();

    // Atomic write: write to temp file, then rename over the target.
    let temp_path = path.with_extension("xml.tmp");
    fs::write(&temp_path, &bytes).map_err(|source| VehicleError::Io {
        path: temp_path.clone(),
        source,
    })?;

    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(VehicleError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    log::info!("Saved vehicle to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::detect_scripts;
    use tempfile::TempDir;

    fn record(label: &str, content: &str, edited: bool) -> ScriptRecord {
        ScriptRecord {
            node: crate::document::NodeId(0),
            index: 1,
            content: content.to_string(),
            label: label.to_string(),
            was_edited: edited,
        }
    }

    #[test]
    fn test_load_missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = load_document(&dir.path().join("absent.xml")).unwrap_err();
        assert!(matches!(err, VehicleError::Io { .. }));
        assert!(err.to_string().contains("absent.xml"));
    }

    #[test]
    fn test_load_malformed_file_carries_parser_message() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.xml");
        fs::write(&path, "<vehicle><a></b></vehicle>").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, VehicleError::Parse(_)));
    }

    #[test]
    fn test_plan_skips_unedited_records() {
        let records = vec![record("a", "print(1)", false)];
        assert!(reprefix_plan(&records, "-- autochanger").is_empty());
    }

    #[test]
    fn test_plan_skips_edited_records_that_kept_the_prefix() {
        let records = vec![
            record("kept", "-- autochanger x\nprint(1)", true),
            record("kept upper", "  -- AUTOCHANGER y\nprint(2)", true),
        ];
        assert!(reprefix_plan(&records, "-- autochanger").is_empty());
    }

    #[test]
    fn test_plan_lists_edited_records_missing_the_prefix() {
        let records = vec![
            record("a", "print(1)", true),
            record("b", "-- autochanger ok\nx()", true),
            record("c", "print(3)", true),
        ];
        let plan = reprefix_plan(&records, "-- autochanger");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].record, 0);
        assert_eq!(plan[0].label, "a");
        assert_eq!(plan[1].record, 2);
    }

    #[test]
    fn test_apply_reprefix_updates_record_and_attribute() {
        let mut doc =
            VehicleDocument::parse(b"<v><c script=\"-- autochanger a\nold()\"/></v>").unwrap();
        let mut records = detect_scripts(&doc, "-- autochanger");
        let node = records[0].node;

        doc.set_script_attribute(node, "new()");
        records[0].content = "new()".to_string();
        records[0].was_edited = true;

        let plan = reprefix_plan(&records, "-- autochanger");
        assert_eq!(plan.len(), 1);
        apply_reprefix(&mut doc, &mut records, &plan, "-- autochanger");

        assert_eq!(records[0].content, "-- autochanger\nnew()");
        assert_eq!(doc.script_attribute(node), Some("-- autochanger\nnew()"));
        // A second plan finds nothing left to do.
        assert!(reprefix_plan(&records, "-- autochanger").is_empty());
    }

    #[test]
    fn test_save_round_trip_and_no_temp_leftover() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vehicle.xml");
        let src = "<v>\n\t<c script=\"-- autochanger a\nprint(1)\"/>\n</v>\n";
        fs::write(&path, src).unwrap();

        let doc = load_document(&path).unwrap();
        save_document(&path, &doc).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), src);
        assert!(!path.with_extension("xml.tmp").exists());
    }

    #[test]
    fn test_save_to_unwritable_path_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let doc = VehicleDocument::parse(b"<v/>").unwrap();
        let err = save_document(&dir.path().join("no/such/dir/vehicle.xml"), &doc).unwrap_err();
        assert!(matches!(err, VehicleError::Io { .. }));
    }
}
