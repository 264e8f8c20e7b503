use std::collections::BTreeMap;

use crate::record::{Fragment, INTERNAL_PREFIX};

/// Categorical fields and their hardcoded fallbacks. These are always
/// present after a merge.
const CATEGORICAL_FIELDS: &[(&str, &str)] = &[
    ("title", "Unknown"),
    ("author", "Unknown"),
    ("genre", "Unknown"),
    ("fiction_type", "Fiction"),
    ("media_type", "Book"),
    ("reading_level", "Unknown"),
];

/// Free-text fields resolved through the same priority chain but left
/// absent (empty) when no source provides them.
const TEXT_FIELDS: &[&str] = &[
    "description",
    "cover_image",
    "subject",
    "url",
    "age",
    "read_time",
    "ar_level",
    "lexile",
    "grl",
    "pages",
    "isbn",
    "publisher",
    "series",
    "year",
    "language",
    "format",
    "notes",
];

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub fields: Fragment,
    /// Per-field attribution: which source tier won.
    pub sources: BTreeMap<String, String>,
}

/// Combine the independent fragments into one canonical field set.
///
/// Per field, first non-empty value wins in this fixed order:
/// custom parser > folder metadata > document properties > filename
/// heuristics > hardcoded default. Extra fields on the custom fragment
/// are carried through verbatim unless internal-prefixed. Every value is
/// trimmed as the final step.
pub fn merge_fragments(
    custom: Option<&Fragment>,
    folder: Option<&Fragment>,
    document: Option<&Fragment>,
    filename: Option<&Fragment>,
) -> MergeOutcome {
    let tiers: [(&str, Option<&Fragment>); 4] = [
        ("custom", custom),
        ("folder", folder),
        ("document", document),
        ("filename", filename),
    ];

    let resolve = |field: &str| -> Option<(&str, String)> {
        tiers.iter().find_map(|(tag, frag)| {
            frag.and_then(|f| f.get(field))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (*tag, v.to_string()))
        })
    };

    let mut outcome = MergeOutcome::default();

    for (field, default) in CATEGORICAL_FIELDS {
        match resolve(field) {
            Some((source, value)) => {
                outcome.fields.set(*field, value);
                outcome.sources.insert(field.to_string(), source.to_string());
            }
            None => {
                outcome.fields.set(*field, *default);
                outcome.sources.insert(field.to_string(), "default".to_string());
            }
        }
    }

    for field in TEXT_FIELDS {
        if let Some((source, value)) = resolve(field) {
            outcome.fields.set(*field, value);
            outcome.sources.insert(field.to_string(), source.to_string());
        }
    }

    if let Some(custom) = custom {
        for (key, value) in custom.iter() {
            if key.starts_with(INTERNAL_PREFIX) || outcome.fields.contains(key) {
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            outcome.fields.set(key, value);
            outcome.sources.insert(key.to_string(), "custom".to_string());
        }
    }

    outcome
}
