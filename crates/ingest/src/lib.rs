pub mod backfill;
pub mod catalog;
pub mod config;
pub mod docmeta;
pub mod pages;
pub mod pipeline;
pub mod sheets;
pub mod sidecar;
pub mod walker;

pub use backfill::{backfill_provenance, backfill_records, legacy_sequence};
pub use catalog::{catalog_assets, find_cover};
pub use config::IngestConfig;
pub use pages::{encode_viewer_path, page_sequence};
pub use pipeline::{Ingestor, RunReport};
pub use sheets::{to_rows, SheetRow, SHEET_COLUMNS};
pub use walker::{classify, discover, Discovery, FolderKind, ItemFolder, SkipNote, WalkError};
