use regex::Regex;
use std::sync::LazyLock;

use crate::record::Fragment;

/// Closed synonym table mapping loose key spellings to canonical field
/// names. Order matters: ambiguous synonyms ("type", "length") resolve to
/// the first field that claims them.
const FIELD_SYNONYMS: &[(&str, &[&str])] = &[
    ("title", &["title", "book title", "name", "book name"]),
    ("author", &["author", "by", "written by", "creator"]),
    ("publisher", &["publisher", "published by", "publication"]),
    (
        "description",
        &["description", "summary", "about", "synopsis", "overview"],
    ),
    ("genre", &["genre", "category", "type", "classification"]),
    ("isbn", &["isbn", "isbn-10", "isbn-13"]),
    ("year", &["year", "published", "publication year", "date"]),
    ("pages", &["pages", "page count", "length"]),
    ("language", &["language", "lang"]),
    ("series", &["series", "collection"]),
    (
        "reading_level",
        &["reading level", "grade level", "age group", "target age"],
    ),
    ("format", &["format", "media type"]),
    ("notes", &["notes", "comments", "additional info"]),
    ("age", &["age", "ages", "age range"]),
    ("read_time", &["read time", "reading time", "duration"]),
    ("ar_level", &["ar level"]),
    ("lexile", &["lexile"]),
    ("grl", &["grl"]),
];

pub fn canonical_field(key: &str) -> Option<&'static str> {
    FIELD_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.contains(&key))
        .map(|(field, _)| *field)
}

static TITLE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:book )?title:\s*([^\n]+)").unwrap());
static TITLE_AFTER_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^https?://\S+[ \t]*\r?\n([^\n]+)$").unwrap());

static AUTHOR_LABEL_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bauthors?:\s*([^,\n]+)",
        r"(?i)\bwritten by:\s*([^,\n]+)",
        r"(?i)\bstory by:\s*([^,\n]+)",
        r"(?i)\bby:\s*([^,\n]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
// Standalone capitalized-name line, e.g. an author line between the title
// and the description. Case-sensitive on purpose.
static AUTHOR_NAME_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([A-Z][a-z]+(?: [A-Z][a-z]+)+)[ \t]*$").unwrap());

static DESCRIPTION_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)\bdescription:\s*(.+?)(?:\n[ \t]*\n|$)",
        r"(?is)\bsummary:\s*(.+?)(?:\n[ \t]*\n|$)",
        r"(?is)\babout:\s*(.+?)(?:\n[ \t]*\n|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static ISBN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bisbn[-:\s]*(\d{13}|\d{10}|\d{1,5}-\d{1,7}-\d{1,7}-[\dX])").unwrap()
});
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:published|year):?\s*(\d{4})\b").unwrap());

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static AGE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bages?:?\s*([0-9]+(?:\s*-\s*[0-9]+)?)",
        r"(?i)\bages?:\s*([^\n]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static READ_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:read time|length|duration):\s*([^\n]+)").unwrap());
static AR_LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAR LEVEL:\s*([0-9.]+)").unwrap());
static LEXILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLEXILE©?:\s*([A-Z]*[0-9]+L?)").unwrap());
static PAGES_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)\bpages?:\s*([0-9]+%?)", r"(?i)\b([0-9]+)\s*pages?\b"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});
static SYNOPSIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)start reading\s*(.*?)\s*book info").unwrap());

static AUTHOR_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:by|author|written by|story by):?\s+").unwrap());
static ILLUSTRATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*,?\s*(?:illustrator|illustrated by).*$").unwrap());
static ROMAN_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:Jr|Sr|II|III|IV)\b").unwrap());

const DESCRIPTION_FALLBACK_CHARS: usize = 500;

/// Extract a fragment from a loosely structured text blob.
///
/// Three strategies run in order; later strategies only add fields the
/// earlier ones left unset:
/// 1. line-oriented `key: value` pairs through the synonym table,
/// 2. per-field regex patterns over the whole text,
/// 3. embedded JSON objects found by balanced-brace scan.
pub fn extract_metadata(content: &str) -> Fragment {
    let mut frag = Fragment::new();
    parse_key_value_lines(content, &mut frag);
    parse_field_patterns(content, &mut frag);
    parse_embedded_json(content, &mut frag);
    frag
}

/// Description-file variant: everything `extract_metadata` finds, plus the
/// synopsis between the "Start Reading" / "Book Info" markers (or a
/// truncated fallback), the first URL, and the enrichment fields carried
/// by catalog description files (age, read time, AR level, Lexile, pages).
pub fn extract_description(content: &str) -> Fragment {
    let mut frag = extract_metadata(content);

    if let Some(m) = URL_RE.find(content) {
        put(&mut frag, "url", m.as_str());
    }
    if let Some(c) = first_capture(&AGE_RES, content) {
        put(&mut frag, "age", &c);
    }
    if let Some(c) = READ_TIME_RE.captures(content) {
        put(&mut frag, "read_time", &c[1]);
    }
    if let Some(c) = AR_LEVEL_RE.captures(content) {
        put(&mut frag, "ar_level", &c[1]);
    }
    if let Some(c) = LEXILE_RE.captures(content) {
        put(&mut frag, "lexile", &c[1]);
    }
    if let Some(c) = first_capture(&PAGES_RES, content) {
        put(&mut frag, "pages", &c);
    }

    match SYNOPSIS_RE.captures(content) {
        Some(c) => frag.set("description", normalize_whitespace(&c[1])),
        None => frag.set("description", truncate_chars(content.trim(), DESCRIPTION_FALLBACK_CHARS)),
    }
    frag.set("notes", truncate_chars(content.trim(), DESCRIPTION_FALLBACK_CHARS));

    frag
}

fn parse_key_value_lines(content: &str, frag: &mut Fragment) {
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        if key.is_empty() || !is_plain_key(&key) {
            continue;
        }
        // "https://..." splits into a plausible-looking key; skip protocol
        // remnants.
        if value.trim_start().starts_with("//") {
            continue;
        }

        match canonical_field(&key) {
            Some("author") => put_author(frag, value),
            Some(field) => put(frag, field, value),
            // Unrecognized keys are kept verbatim.
            None => put(frag, &key, value),
        }
    }
}

/// Reject pseudo-keys produced by splitting on ':' in prose or URLs.
fn is_plain_key(key: &str) -> bool {
    key.len() <= 40
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-' || c == '_')
}

fn parse_field_patterns(content: &str, frag: &mut Fragment) {
    if !frag.contains("title") {
        if let Some(title) = extract_title(content) {
            frag.set("title", title);
        }
    }

    if !frag.contains("author") {
        let label_candidates = AUTHOR_LABEL_RES
            .iter()
            .filter_map(|re| re.captures(content))
            .map(|c| c[1].to_string());
        let name_line = AUTHOR_NAME_LINE_RE
            .captures(content)
            .map(|c| c[1].to_string());

        for candidate in label_candidates.chain(name_line) {
            let cleaned = clean_author_name(&candidate);
            if is_valid_author_name(&cleaned) {
                frag.set("author", cleaned);
                break;
            }
        }
    }

    if !frag.contains("description") {
        if let Some(c) = first_capture(&DESCRIPTION_RES, content) {
            put(frag, "description", &c);
        }
    }
    if let Some(c) = ISBN_RE.captures(content) {
        put(frag, "isbn", &c[1]);
    }
    if let Some(c) = YEAR_RE.captures(content) {
        put(frag, "year", &c[1]);
    }
}

fn extract_title(content: &str) -> Option<String> {
    let labeled = TITLE_LABEL_RE.captures(content).map(|c| c[1].to_string());
    let after_url = TITLE_AFTER_URL_RE
        .captures(content)
        .map(|c| c[1].to_string());
    let first_line = content.lines().find(|l| !l.trim().is_empty()).map(String::from);

    [labeled, after_url, first_line]
        .into_iter()
        .flatten()
        .map(|t| normalize_whitespace(&t))
        .find(|t| is_plausible_title(t))
}

fn is_plausible_title(title: &str) -> bool {
    title.chars().count() > 3
        && !title.starts_with("http")
        && !title.to_lowercase().starts_with("author")
}

fn parse_embedded_json(content: &str, frag: &mut Fragment) {
    for span in balanced_json_spans(content) {
        let Ok(serde_json::Value::Object(map)) = serde_json::from_str(span) else {
            continue;
        };
        for (key, value) in map {
            let text = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            match canonical_field(&key) {
                Some("author") => put_author(frag, &text),
                Some(field) => put(frag, field, &text),
                None => put(frag, &key, &text),
            }
        }
    }
}

/// Top-level `{...}` spans with balanced braces, skipping braces inside
/// JSON string literals.
fn balanced_json_spans(content: &str) -> Vec<&str> {
    let bytes = content.as_bytes();
    let mut spans = Vec::new();
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(&content[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    spans
}

fn put(frag: &mut Fragment, field: &str, value: &str) {
    let value = normalize_whitespace(value);
    if !value.is_empty() {
        frag.set_if_absent(field, value);
    }
}

fn put_author(frag: &mut Fragment, candidate: &str) {
    let cleaned = clean_author_name(candidate);
    if is_valid_author_name(&cleaned) {
        frag.set_if_absent("author", cleaned);
    }
}

fn first_capture(patterns: &[Regex], content: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(content))
        .map(|c| c[1].to_string())
}

pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(content: &str, max: usize) -> String {
    if content.chars().count() <= max {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

/// Strip label prefixes, trailing illustrator clauses, and stray
/// punctuation from an author candidate.
pub fn clean_author_name(candidate: &str) -> String {
    let name = AUTHOR_PREFIX_RE.replace(candidate.trim(), "");
    let name = ILLUSTRATOR_RE.replace(&name, "");
    let name = normalize_whitespace(&name);
    name.trim_end_matches(['.', ',', ';', ':']).trim().to_string()
}

/// Validity filter for extracted author names. A candidate must look like
/// a real person's name: multiple capitalized words, no digits (roman
/// numeral suffixes aside), not shouting, and none of the words that leak
/// in from surrounding book-info text.
pub fn is_valid_author_name(name: &str) -> bool {
    const NON_NAME_WORDS: &[&str] = &[
        "book",
        "info",
        "ages",
        "read",
        "time",
        "level",
        "pages",
        "isbn",
        "publisher",
        "description",
    ];

    if name.chars().count() < 3 || !name.contains(' ') {
        return false;
    }
    if name.chars().any(|c| c.is_ascii_digit()) && !ROMAN_SUFFIX_RE.is_match(name) {
        return false;
    }

    let letters: Vec<char> = name.chars().filter(|c| c.is_alphabetic()).collect();
    if !letters.is_empty()
        && (letters.iter().all(|c| c.is_uppercase()) || letters.iter().all(|c| c.is_lowercase()))
    {
        return false;
    }

    let lower = name.to_lowercase();
    if NON_NAME_WORDS.iter().any(|w| lower.contains(w)) {
        return false;
    }

    name.split_whitespace()
        .all(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
}
