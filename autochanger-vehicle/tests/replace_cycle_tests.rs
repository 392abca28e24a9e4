//! End-to-end load → detect → replace → save cycles against real files.

use autochanger_vehicle::{EditorSession, VehicleWatchEvent, VehicleWatcher, detect_scripts};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const PREFIX: &str = "-- autochanger";

fn write_vehicle(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("vehicle.xml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_full_replace_cycle_reprefixes_and_preserves_sibling() {
    let dir = TempDir::new().unwrap();
    let path = write_vehicle(
        &dir,
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<vehicle>\n",
            "\t<c d=\"a\" script=\"-- autochanger label1\nprint(1)\"/>\n",
            "\t<c d=\"b\" script=\"print(2)\"/>\n",
            "</vehicle>\n",
        ),
    );

    let mut session = EditorSession::open(&path, PREFIX).unwrap();

    // Only element A is managed, and its label comes from the comment line.
    assert_eq!(session.records().len(), 1);
    assert_eq!(session.records()[0].label, "autochanger label1");
    assert_eq!(session.records()[0].index, 1);

    // Replace with content that lost the prefix, then save.
    session.select(0);
    session.apply_replacement("print(99)").unwrap();
    let plan = session.reprefix_plan(PREFIX);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].label, "autochanger label1");
    session.save(PREFIX, &plan).unwrap();

    let saved = fs::read_to_string(&path).unwrap();
    // The prefix line was re-added ahead of the new content...
    assert!(saved.contains("script=\"-- autochanger\nprint(99)\""));
    // ...and the unmanaged element's text is byte-identical.
    assert!(saved.contains("<c d=\"b\" script=\"print(2)\"/>"));

    // A fresh load sees the re-prefixed script as managed again.
    let reopened = EditorSession::open(&path, PREFIX).unwrap();
    assert_eq!(reopened.records().len(), 1);
    assert_eq!(reopened.records()[0].content, "-- autochanger\nprint(99)");
}

#[test]
fn test_unedited_save_round_trips_every_byte() {
    let dir = TempDir::new().unwrap();
    let body = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<vehicle data_version=\"3\" bodies_id=\"2\">\n",
        "\t<authors/>\n",
        "\t<bodies>\n",
        "\t\t<body unique_id=\"1\">\n",
        "\t\t\t<components>\n",
        "\t\t\t\t<c d=\"microprocessor\">\n",
        "\t\t\t\t\t<o script=\"-- autochanger gear\nticks = 0\nfunction onTick()\n",
        "\tticks = ticks + 1\nend\">\n",
        "\t\t\t\t\t\t<vp x=\"1\"/>\n",
        "\t\t\t\t\t</o>\n",
        "\t\t\t\t</c>\n",
        "\t\t\t</components>\n",
        "\t\t</body>\n",
        "\t</bodies>\n",
        "</vehicle>\n",
    );
    let path = write_vehicle(&dir, body);

    let mut session = EditorSession::open(&path, PREFIX).unwrap();
    session.save(PREFIX, &[]).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), body);
}

#[test]
fn test_detection_skips_unmanaged_and_blank_scripts() {
    let dir = TempDir::new().unwrap();
    let path = write_vehicle(
        &dir,
        concat!(
            "<vehicle>",
            "<c script=\"-- autochanger one\nx()\"/>",
            "<c script=\"   \"/>",
            "<c other=\"attr\"/>",
            "<c script=\"-- AUTOCHANGER two\ny()\"/>",
            "</vehicle>",
        ),
    );

    let session = EditorSession::open(&path, PREFIX).unwrap();
    let labels: Vec<&str> = session.records().iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["autochanger one", "AUTOCHANGER two"]);
}

#[test]
fn test_detect_scripts_matches_session_view() {
    let dir = TempDir::new().unwrap();
    let path = write_vehicle(&dir, "<v><c script=\"-- autochanger a\nx()\"/></v>");
    let session = EditorSession::open(&path, PREFIX).unwrap();

    let doc = autochanger_vehicle::load_document(&path).unwrap();
    let records = detect_scripts(&doc, PREFIX);
    assert_eq!(records.len(), session.records().len());
    assert_eq!(records[0].label, session.records()[0].label);
}

#[test]
fn test_external_change_reload_keeps_selection() {
    let dir = TempDir::new().unwrap();
    let path = write_vehicle(
        &dir,
        "<v><c script=\"-- autochanger a\nx()\"/><c script=\"-- autochanger b\ny()\"/></v>",
    );

    let mut session = EditorSession::open(&path, PREFIX).unwrap();
    session.select(1);

    // Simulate what the debounced watcher event triggers.
    fs::write(
        &path,
        "<v><c script=\"-- autochanger a\nx2()\"/><c script=\"-- autochanger b\ny2()\"/></v>",
    )
    .unwrap();
    session.reload(PREFIX).unwrap();

    assert_eq!(session.selected_index(), Some(1));
    assert_eq!(session.records()[1].content, "-- autochanger b\ny2()");
}

#[test]
fn test_watcher_reports_removal_of_loaded_vehicle() {
    let dir = TempDir::new().unwrap();
    let path = write_vehicle(&dir, "<v><c script=\"-- autochanger a\nx()\"/></v>");

    let watcher = VehicleWatcher::with_debounce(&path, 50).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(100));

    fs::remove_file(&path).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(800));

    // Platform-dependent delivery; when an event arrives it must be Removed.
    if let Some(event) = watcher.try_recv() {
        assert_eq!(event, VehicleWatchEvent::Removed);
    }
}
