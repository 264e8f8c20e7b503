pub mod filename;
pub mod merge;
pub mod parsers;
pub mod record;
pub mod registry;
pub mod textmeta;

pub use filename::{detect_media_type, detect_reading_level, looks_like_author, parse_filename};
pub use merge::{merge_fragments, MergeOutcome};
pub use parsers::{
    builtin_registry, reading_level_for_grade, GradeLevelParser, PipeDelimitedParser,
    PublisherSeriesParser, RuleParser, SeriesEpisodeParser, TaggedTextParser,
};
pub use record::{
    AssetCatalog, AssetKind, BookRecord, Fragment, PageEntry, Provenance, INTERNAL_PREFIX,
};
pub use registry::{ParseInput, Parser, ParserError, ParserRegistry, ParserSkip, RegistryOutcome};
pub use textmeta::{
    clean_author_name, extract_description, extract_metadata, is_valid_author_name,
};
