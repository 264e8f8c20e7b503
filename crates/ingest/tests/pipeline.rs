use std::fs;
use std::path::Path;
use tempfile::TempDir;

use shelf_ingest::{backfill_records, to_rows, Ingestor};

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// The canonical catalog layout: a categorized section, a description
/// sidecar, a literal cover, and legacy screenshot pages.
#[test]
fn gift_for_sophie_end_to_end() {
    let root = TempDir::new().unwrap();
    let book = root
        .path()
        .join("Read to Me Stories")
        .join("Art")
        .join("A Gift for Sophie");

    write(
        &book.join("description.txt"),
        b"A Gift for Sophie\nAuthor: Jane Doe\nAges: 4-7\nStart Reading\nSophie finds the perfect gift.\nBook Info\n",
    );
    write(&book.join("cover.jpg"), b"jpg");
    write(&book.join("Screenshot (1).png"), b"png");
    write(&book.join("Screenshot (2).png"), b"png");

    let ingestor = Ingestor::with_defaults();
    let report = ingestor.run(root.path()).unwrap();

    assert_eq!(report.records.len(), 1);
    assert!(report.skipped.is_empty());

    let record = &report.records[0];
    assert_eq!(record.title, "A Gift for Sophie");
    assert_eq!(record.author, "Jane Doe");
    assert_eq!(record.section, "Read to Me Stories");
    assert_eq!(record.category, "Art");
    assert_eq!(record.media_type, "Read to Me");
    assert_eq!(record.description, "Sophie finds the perfect gift.");
    assert_eq!(record.extras.get("age").map(String::as_str), Some("4-7"));

    // Tier-1 cover beats the screenshot tier.
    let cover = record.cover_image.as_deref().unwrap();
    assert!(cover.ends_with("cover.jpg"));

    // The primary reconstruction falls through to the generic PNG
    // strategy: both screenshots, sorted, first one the cover.
    let pages = &record.provenance.page_sequence;
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].file_name, "Screenshot (1).png");
    assert!(pages[0].is_cover);
    assert!(pages[0].file_path.ends_with("Screenshot%20(1).png"));

    // Round-trip through the side-channel blob.
    let blob = record.provenance.to_json().unwrap();
    let parsed = bookdex_core::Provenance::from_json(&blob).unwrap();
    assert_eq!(parsed.page_sequence, record.provenance.page_sequence);
}

/// Legacy backfill over persisted records: Screenshot (1) is the
/// cover/TOC, Screenshot (2) the single content page.
#[test]
fn legacy_backfill_over_persisted_records() {
    let root = TempDir::new().unwrap();
    let book = root
        .path()
        .join("Read to Me Stories")
        .join("Art")
        .join("A Gift for Sophie");

    write(&book.join("description.txt"), b"Author: Jane Doe\n");
    write(&book.join("cover.jpg"), b"jpg");
    write(&book.join("Screenshot (1).png"), b"png");
    write(&book.join("Screenshot (2).png"), b"png");

    let ingestor = Ingestor::with_defaults();
    let mut records = ingestor.run(root.path()).unwrap().records;

    // Simulate an old record persisted without a sequence.
    records[0].provenance.page_sequence.clear();
    records[0].provenance.total_pages = 0;

    assert_eq!(backfill_records(&mut records), 1);

    let prov = &records[0].provenance;
    assert_eq!(prov.total_pages, 1);
    let content: Vec<_> = prov.page_sequence.iter().filter(|p| !p.is_cover).collect();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].file_name, "Screenshot (2).png");
    assert_eq!(content[0].display_name, "Page 1");
}

#[test]
fn collections_expand_one_level() {
    let root = TempDir::new().unwrap();
    let set = root.path().join("Books").join("Fairy Tales");

    for name in ["The Frog Prince", "Rapunzel"] {
        let book = set.join(name);
        write(
            &book.join("description.txt"),
            format!("{}\nAuthor: Jacob Grimm\n", name).as_bytes(),
        );
        write(&book.join("page-1.png"), b"png");
    }

    let ingestor = Ingestor::with_defaults();
    let report = ingestor.run(root.path()).unwrap();

    let mut titles: Vec<&str> = report.records.iter().map(|r| r.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Rapunzel", "The Frog Prince"]);
    for record in &report.records {
        assert_eq!(record.author, "Jacob Grimm");
        assert_eq!(record.category, "Books");
        assert_eq!(record.media_type, "Book");
    }
}

#[test]
fn sheet_rows_from_a_run() {
    let root = TempDir::new().unwrap();
    let book = root.path().join("Audiobooks").join("The Listening Walk");

    write(
        &book.join("description.txt"),
        b"The Listening Walk\nAuthor: Paul Showers\nAges: 4-7\n",
    );
    write(&book.join("narration.mp3"), b"mp3");

    let ingestor = Ingestor::with_defaults();
    let report = ingestor.run(root.path()).unwrap();
    let rows = to_rows(&report.records);

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.name, "The Listening Walk");
    assert_eq!(row.author, "Paul Showers");
    assert_eq!(row.media, "Audiobook");
    assert_eq!(row.age, "4-7");
    assert_eq!(row.status, "Active");
    assert!(row.url.ends_with("narration.mp3"));
    assert_eq!(row.duplicate_key(), "the listening walk_paul showers");
}

#[test]
fn crop_folder_beats_generic_images() {
    let root = TempDir::new().unwrap();
    let book = root.path().join("Books").join("Cropped");

    write(&book.join("resized").join("crop-1.png"), b"png");
    write(&book.join("resized").join("crop-2.png"), b"png");
    write(&book.join("stray.png"), b"png");

    let ingestor = Ingestor::with_defaults();
    let report = ingestor.run(root.path()).unwrap();

    let pages = &report.records[0].provenance.page_sequence;
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].file_name, "crop-1.png");
    assert_eq!(pages[1].file_name, "crop-2.png");
    assert_eq!(report.records[0].provenance.total_pages, 1);
}
