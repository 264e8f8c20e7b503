use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::record::Fragment;

/// Title/author splitting patterns, tried in order against the
/// extension-less stem.
static SPLIT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(.+?)\s*-\s*(.+)$",       // "A - B"
        r"(?i)^(.+?)\s+by\s+(.+)$",  // "A by B"
        r"^(.+?)\s*\((.+?)\)$",      // "A (B)"
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static AUTHOR_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b",  // "First Last"
        r"\b[A-Z]\.\s*[A-Z][a-z]+\b",      // "F. Last"
        r"\b[A-Z][a-z]+,\s*[A-Z][a-z]+\b", // "Last, First"
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Keyword table for media-type detection over filename and folder path
/// segments. First matching entry wins.
const MEDIA_TYPE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Read to Me",
        &["read-to-me", "readtome", "read_to_me", "narrated", "audio-story"],
    ),
    (
        "Voice Coach",
        &[
            "voice-coach",
            "voicecoach",
            "voice_coach",
            "pronunciation",
            "speaking",
            "practice",
        ],
    ),
    (
        "Audiobooks",
        &["audiobook", "audio-book", "audio_book", "mp3", "m4a", "wav"],
    ),
    (
        "Video Books",
        &[
            "video-book",
            "videobook",
            "video_book",
            "mp4",
            "avi",
            "mov",
            "educational-video",
        ],
    ),
    (
        "Books",
        &["book", "text", "reading", "literature", "novel", "story"],
    ),
];

#[derive(Clone, Copy)]
enum LevelRule {
    PreK,
    Graded,
}

static READING_LEVEL_PATTERNS: LazyLock<Vec<(Regex, LevelRule)>> = LazyLock::new(|| {
    [
        (r"grade[\s-]?(\d+)", LevelRule::Graded),
        (r"level[\s-]?([a-z]+)", LevelRule::Graded),
        (r"(\d+)(?:st|nd|rd|th)[\s-]?grade", LevelRule::Graded),
        (r"([a-z])[\s-]?level", LevelRule::Graded),
        (r"pre[\s-]?k", LevelRule::PreK),
        (r"kindergarten", LevelRule::PreK),
        (r"k[\s-]?(\d+)", LevelRule::Graded),
    ]
    .iter()
    .map(|(p, rule)| (Regex::new(p).unwrap(), *rule))
    .collect()
});

/// Derive a title/author fragment from a filename (or folder name).
///
/// On a structural match the author-likelihood heuristic decides which
/// half is the author; with no match the stem is the title and the author
/// defaults to "Unknown".
pub fn parse_filename(filename: &str) -> Fragment {
    let stem = file_stem(filename);

    let mut frag = Fragment::new();
    for re in SPLIT_PATTERNS.iter() {
        if let Some(c) = re.captures(stem) {
            let (first, second) = (c[1].trim().to_string(), c[2].trim().to_string());
            if looks_like_author(&first) {
                frag.set("author", first);
                frag.set("title", second);
            } else {
                frag.set("title", first);
                frag.set("author", second);
            }
            return frag;
        }
    }

    frag.set("title", stem.trim());
    frag.set("author", "Unknown");
    frag
}

pub fn looks_like_author(text: &str) -> bool {
    AUTHOR_INDICATORS.iter().any(|re| re.is_match(text))
}

/// Guess the media type from the file extension, then from keywords in
/// the filename and containing-folder segments.
pub fn detect_media_type(filename: &str, folder: Option<&str>) -> String {
    if let Some(ext) = extension(filename) {
        match ext.as_str() {
            "mp3" | "m4a" | "wav" | "ogg" => return "Audiobooks".to_string(),
            "mp4" | "avi" | "mov" | "mkv" | "webm" => return "Video Books".to_string(),
            _ => {}
        }
    }

    let combined = combined_text(filename, folder);
    MEDIA_TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| combined.contains(kw)))
        .map(|(media, _)| media.to_string())
        .unwrap_or_else(|| "Books".to_string())
}

/// Guess a reading level from grade/level markers in the filename or
/// folder path. "Unknown" when nothing matches.
pub fn detect_reading_level(filename: &str, folder: Option<&str>) -> String {
    let combined = combined_text(filename, folder);

    for (re, rule) in READING_LEVEL_PATTERNS.iter() {
        let Some(c) = re.captures(&combined) else {
            continue;
        };
        return match rule {
            LevelRule::PreK => "Pre-K".to_string(),
            LevelRule::Graded => {
                let level = &c[1];
                if level.chars().all(|ch| ch.is_ascii_digit()) {
                    format!("Grade {}", level)
                } else {
                    format!("Level {}", level.to_uppercase())
                }
            }
        };
    }

    "Unknown".to_string()
}

fn combined_text(filename: &str, folder: Option<&str>) -> String {
    let mut parts = vec![filename.to_lowercase()];
    if let Some(folder) = folder {
        parts.extend(
            Path::new(folder)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_lowercase()),
        );
    }
    parts.join(" ")
}

fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_split_author_first() {
        let frag = parse_filename("Roald Dahl - The BFG.pdf");
        assert_eq!(frag.get("author"), Some("Roald Dahl"));
        assert_eq!(frag.get("title"), Some("The BFG"));
    }

    #[test]
    fn dash_split_title_first() {
        let frag = parse_filename("the bfg - illustrated edition.pdf");
        assert_eq!(frag.get("title"), Some("the bfg"));
        assert_eq!(frag.get("author"), Some("illustrated edition"));
    }

    #[test]
    fn by_split() {
        let frag = parse_filename("The BFG by Roald Dahl.epub");
        assert_eq!(frag.get("title"), Some("The BFG"));
        assert_eq!(frag.get("author"), Some("Roald Dahl"));
    }

    #[test]
    fn parenthesized_author() {
        let frag = parse_filename("Matilda (Roald Dahl).pdf");
        assert_eq!(frag.get("title"), Some("Matilda"));
        assert_eq!(frag.get("author"), Some("Roald Dahl"));
    }

    #[test]
    fn no_pattern_defaults_to_unknown_author() {
        let frag = parse_filename("A Gift for Sophie.pdf");
        assert_eq!(frag.get("title"), Some("A Gift for Sophie"));
        assert_eq!(frag.get("author"), Some("Unknown"));
    }

    #[test]
    fn author_likelihood_patterns() {
        assert!(looks_like_author("Roald Dahl"));
        assert!(looks_like_author("J. Tolkien"));
        assert!(looks_like_author("Dahl, Roald"));
        assert!(!looks_like_author("illustrated edition"));
    }

    #[test]
    fn media_type_from_extension_short_circuits() {
        assert_eq!(detect_media_type("story.mp3", None), "Audiobooks");
        assert_eq!(detect_media_type("story.mp4", None), "Video Books");
    }

    #[test]
    fn media_type_from_keywords() {
        assert_eq!(
            detect_media_type("narrated tales.pdf", None),
            "Read to Me"
        );
        assert_eq!(
            detect_media_type("plain.pdf", Some("/library/read-to-me/animals")),
            "Read to Me"
        );
        assert_eq!(detect_media_type("something.pdf", None), "Books");
    }

    #[test]
    fn reading_level_detection() {
        assert_eq!(detect_reading_level("math grade 3 workbook.pdf", None), "Grade 3");
        assert_eq!(detect_reading_level("reader level b.pdf", None), "Level B");
        assert_eq!(detect_reading_level("pre-k shapes.pdf", None), "Pre-K");
        assert_eq!(detect_reading_level("plain.pdf", None), "Unknown");
        assert_eq!(
            detect_reading_level("plain.pdf", Some("/library/Grade 2/animals")),
            "Grade 2"
        );
    }
}
