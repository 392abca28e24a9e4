//! Editor session: the in-memory list of detected scripts, the current
//! selection, and the replace operation.
//!
//! The session performs no I/O of its own beyond delegating to
//! [`crate::persist`]; all state mutation happens on the thread that owns
//! the session (the UI thread in the application).

use crate::detect::{ScriptRecord, detect_scripts};
use crate::document::VehicleDocument;
use crate::error::{ReplaceError, VehicleError};
use crate::persist::{self, ReprefixEntry};
use std::path::{Path, PathBuf};

/// One loaded vehicle document plus its detected scripts and selection.
///
/// Loading a new document replaces the session wholesale; records never
/// outlive the document they were detected in.
#[derive(Debug)]
pub struct EditorSession {
    path: PathBuf,
    document: VehicleDocument,
    records: Vec<ScriptRecord>,
    selected: Option<usize>,
}

impl EditorSession {
    /// Load a vehicle file and detect its managed scripts.
    pub fn open(path: &Path, prefix: &str) -> Result<Self, VehicleError> {
        let document = persist::load_document(path)?;
        let records = detect_scripts(&document, prefix);
        log::info!(
            "Loaded {} with {} managed script(s)",
            path.display(),
            records.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            document,
            records,
            selected: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[ScriptRecord] {
        &self.records
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&ScriptRecord> {
        self.selected.and_then(|i| self.records.get(i))
    }

    /// Set the active record. Out-of-range indices are a silent no-op.
    pub fn select(&mut self, index: usize) {
        if index < self.records.len() {
            self.selected = Some(index);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Overwrite the selected script with `new_text`.
    ///
    /// Writes through the document and mirrors the record, marking it
    /// edited. Validation failures are [`ReplaceError`]s, kept distinct from
    /// I/O failures so callers can surface them as warnings.
    pub fn apply_replacement(&mut self, new_text: &str) -> Result<(), ReplaceError> {
        let index = self.selected.ok_or(ReplaceError::NoSelection)?;
        if new_text.trim().is_empty() {
            return Err(ReplaceError::BlankScript);
        }

        let record = &mut self.records[index];
        if !self.document.set_script_attribute(record.node, new_text) {
            // Records are rebuilt with the document, so an id can only go
            // stale through a bug; treat it like a missing selection.
            log::error!("Selected record {:?} has no node in the document", record.node);
            return Err(ReplaceError::NoSelection);
        }
        record.content = new_text.to_string();
        record.was_edited = true;
        Ok(())
    }

    /// Re-run detection with a new prefix on the already-loaded document.
    ///
    /// Replaces the record list and clears the selection. Unsaved content
    /// edits live in the document, so nothing is lost; edit markers
    /// (`was_edited`) are reset by design.
    pub fn redetect(&mut self, prefix: &str) {
        self.records = detect_scripts(&self.document, prefix);
        self.selected = None;
        log::info!("Detection re-run: {} managed script(s)", self.records.len());
    }

    /// Reload the backing file after an external change.
    ///
    /// On success the previous selection is restored by list index,
    /// best-effort: a shorter list clears it. On failure the session is left
    /// untouched.
    pub fn reload(&mut self, prefix: &str) -> Result<(), VehicleError> {
        let document = persist::load_document(&self.path)?;
        let records = detect_scripts(&document, prefix);
        let selected = self.selected.filter(|&i| i < records.len());

        self.document = document;
        self.records = records;
        self.selected = selected;
        log::info!(
            "Reloaded {} with {} managed script(s)",
            self.path.display(),
            self.records.len()
        );
        Ok(())
    }

    /// Records a save would re-prefix (see [`persist::reprefix_plan`]).
    pub fn reprefix_plan(&self, prefix: &str) -> Vec<ReprefixEntry> {
        persist::reprefix_plan(&self.records, prefix)
    }

    /// Apply a re-prefix plan and save to the session's path.
    pub fn save(&mut self, prefix: &str, plan: &[ReprefixEntry]) -> Result<(), VehicleError> {
        persist::apply_reprefix(&mut self.document, &mut self.records, plan, prefix);
        persist::save_document(&self.path, &self.document)
    }

    /// Apply a re-prefix plan and save to a new path, which becomes the
    /// session's path.
    pub fn save_as(
        &mut self,
        path: &Path,
        prefix: &str,
        plan: &[ReprefixEntry],
    ) -> Result<(), VehicleError> {
        persist::apply_reprefix(&mut self.document, &mut self.records, plan, prefix);
        persist::save_document(path, &self.document)?;
        self.path = path.to_path_buf();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PREFIX: &str = "-- autochanger";

    fn write_vehicle(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("vehicle.xml");
        fs::write(&path, body).unwrap();
        path
    }

    fn two_script_vehicle(dir: &TempDir) -> PathBuf {
        write_vehicle(
            dir,
            concat!(
                "<v>",
                "<c script=\"-- autochanger a\nprint(1)\"/>",
                "<c script=\"-- autochanger b\nprint(2)\"/>",
                "</v>",
            ),
        )
    }

    #[test]
    fn test_select_out_of_range_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let path = two_script_vehicle(&dir);
        let mut session = EditorSession::open(&path, PREFIX).unwrap();

        session.select(5);
        assert_eq!(session.selected_index(), None);

        session.select(1);
        assert_eq!(session.selected_index(), Some(1));
        session.select(9);
        assert_eq!(session.selected_index(), Some(1));
    }

    #[test]
    fn test_replacement_without_selection_fails() {
        let dir = TempDir::new().unwrap();
        let path = two_script_vehicle(&dir);
        let mut session = EditorSession::open(&path, PREFIX).unwrap();

        assert_eq!(
            session.apply_replacement("print(9)"),
            Err(ReplaceError::NoSelection)
        );
        assert!(session.records().iter().all(|r| !r.was_edited));
    }

    #[test]
    fn test_blank_replacement_fails() {
        let dir = TempDir::new().unwrap();
        let path = two_script_vehicle(&dir);
        let mut session = EditorSession::open(&path, PREFIX).unwrap();
        session.select(0);

        assert_eq!(session.apply_replacement(""), Err(ReplaceError::BlankScript));
        assert_eq!(
            session.apply_replacement(" \n\t "),
            Err(ReplaceError::BlankScript)
        );
        assert!(!session.records()[0].was_edited);
    }

    #[test]
    fn test_replacement_writes_through_document() {
        let dir = TempDir::new().unwrap();
        let path = two_script_vehicle(&dir);
        let mut session = EditorSession::open(&path, PREFIX).unwrap();
        session.select(0);

        session.apply_replacement("print(99)").unwrap();

        let record = &session.records()[0];
        assert!(record.was_edited);
        assert_eq!(record.content, "print(99)");
        // Label stays what detection derived from the original content.
        assert_eq!(record.label, "autochanger a");
    }

    #[test]
    fn test_redetect_after_prefix_change() {
        let dir = TempDir::new().unwrap();
        let path = write_vehicle(
            &dir,
            "<v><c script=\"-- autochanger a\nx()\"/><c script=\"-- managed b\ny()\"/></v>",
        );
        let mut session = EditorSession::open(&path, PREFIX).unwrap();
        session.select(0);
        assert_eq!(session.records().len(), 1);

        session.redetect("-- managed");
        assert_eq!(session.records().len(), 1);
        assert_eq!(session.records()[0].label, "managed b");
        assert_eq!(session.selected_index(), None);
    }

    #[test]
    fn test_reload_restores_selection_by_index() {
        let dir = TempDir::new().unwrap();
        let path = two_script_vehicle(&dir);
        let mut session = EditorSession::open(&path, PREFIX).unwrap();
        session.select(1);

        session.reload(PREFIX).unwrap();
        assert_eq!(session.selected_index(), Some(1));
    }

    #[test]
    fn test_reload_clears_selection_when_list_shrinks() {
        let dir = TempDir::new().unwrap();
        let path = two_script_vehicle(&dir);
        let mut session = EditorSession::open(&path, PREFIX).unwrap();
        session.select(1);

        fs::write(&path, "<v><c script=\"-- autochanger a\nprint(1)\"/></v>").unwrap();
        session.reload(PREFIX).unwrap();
        assert_eq!(session.records().len(), 1);
        assert_eq!(session.selected_index(), None);
    }

    #[test]
    fn test_reload_failure_keeps_previous_state() {
        let dir = TempDir::new().unwrap();
        let path = two_script_vehicle(&dir);
        let mut session = EditorSession::open(&path, PREFIX).unwrap();
        session.select(0);

        fs::write(&path, "<broken").unwrap();
        assert!(session.reload(PREFIX).is_err());
        assert_eq!(session.records().len(), 2);
        assert_eq!(session.selected_index(), Some(0));
    }

    #[test]
    fn test_save_applies_reprefix_plan() {
        let dir = TempDir::new().unwrap();
        let path = two_script_vehicle(&dir);
        let mut session = EditorSession::open(&path, PREFIX).unwrap();
        session.select(0);
        session.apply_replacement("print(99)").unwrap();

        let plan = session.reprefix_plan(PREFIX);
        assert_eq!(plan.len(), 1);
        session.save(PREFIX, &plan).unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("script=\"-- autochanger\nprint(99)\""));
        // The untouched sibling keeps its exact source text.
        assert!(saved.contains("<c script=\"-- autochanger b\nprint(2)\"/>"));
    }

    #[test]
    fn test_save_as_switches_the_session_path() {
        let dir = TempDir::new().unwrap();
        let path = two_script_vehicle(&dir);
        let mut session = EditorSession::open(&path, PREFIX).unwrap();

        let copy = dir.path().join("copy.xml");
        session.save_as(&copy, PREFIX, &[]).unwrap();
        assert_eq!(session.path(), copy.as_path());
        assert!(copy.exists());
    }
}
