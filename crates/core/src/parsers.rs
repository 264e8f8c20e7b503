//! Built-in parser strategies for common naming and sidecar conventions,
//! plus the data-driven `RuleParser` for runtime extensibility.

use regex::Regex;
use std::fs;
use std::sync::LazyLock;

use crate::record::Fragment;
use crate::registry::{ParseInput, Parser, ParserError, ParserRegistry};

/// Reading-level band for a numeric grade.
pub fn reading_level_for_grade(grade: u32) -> &'static str {
    match grade {
        0..=2 => "Pre-K to Grade 2",
        3..=5 => "Grade 3-5",
        6..=8 => "Grade 6-8",
        _ => "Grade 9-12",
    }
}

/// Registry preloaded with the built-in strategies.
pub fn builtin_registry() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry.register(Box::new(SeriesEpisodeParser));
    registry.register(Box::new(GradeLevelParser));
    registry.register(Box::new(PublisherSeriesParser));
    registry.register(Box::new(TaggedTextParser));
    registry.register(Box::new(PipeDelimitedParser));
    registry
}

/// Data-driven rule: a regex over the filename stem plus a capture-group
/// to field mapping. This is the supported way to add parsing behavior at
/// runtime without shipping code.
pub struct RuleParser {
    name: String,
    pattern: Regex,
    fields: Vec<(usize, String)>,
    priority: i32,
}

impl RuleParser {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        fields: Vec<(usize, String)>,
        priority: i32,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            fields,
            priority,
        })
    }
}

impl Parser for RuleParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn applies(&self, input: &ParseInput) -> bool {
        self.pattern.is_match(input.stem())
    }

    fn extract(&self, input: &ParseInput) -> Result<Fragment, ParserError> {
        let mut frag = Fragment::new();
        if let Some(captures) = self.pattern.captures(input.stem()) {
            for (group, field) in &self.fields {
                if let Some(m) = captures.get(*group) {
                    let value = m.as_str().trim();
                    if !value.is_empty() {
                        frag.set(field.clone(), value);
                    }
                }
            }
        }
        Ok(frag)
    }
}

static SERIES_EPISODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+?)\s+S(\d+)E(\d+)\s*-\s*(.+)$").unwrap());

/// "Series Name S01E02 - Episode Title.mp4"
pub struct SeriesEpisodeParser;

impl Parser for SeriesEpisodeParser {
    fn name(&self) -> &str {
        "series-episode"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn applies(&self, input: &ParseInput) -> bool {
        SERIES_EPISODE_RE.is_match(input.stem())
    }

    fn extract(&self, input: &ParseInput) -> Result<Fragment, ParserError> {
        let mut frag = Fragment::new();
        if let Some(c) = SERIES_EPISODE_RE.captures(input.stem()) {
            frag.set("title", c[4].trim());
            frag.set("series", c[1].trim());
            frag.set("season", c[2].trim_start_matches('0'));
            frag.set("episode", c[3].trim_start_matches('0'));
            frag.set("media_type", "Video Book");
            frag.set("genre", "Educational Series");
            frag.set("notes", format!("Season {}, Episode {}", &c[2], &c[3]));
        }
        Ok(frag)
    }
}

static GRADE_LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^grade(\d+)_([^_]+)_(.+)$").unwrap());

/// "Grade3_Math_Addition_Workbook.pdf"
pub struct GradeLevelParser;

impl Parser for GradeLevelParser {
    fn name(&self) -> &str {
        "grade-level"
    }

    fn applies(&self, input: &ParseInput) -> bool {
        GRADE_LEVEL_RE.is_match(input.stem())
    }

    fn extract(&self, input: &ParseInput) -> Result<Fragment, ParserError> {
        let mut frag = Fragment::new();
        let Some(c) = GRADE_LEVEL_RE.captures(input.stem()) else {
            return Ok(frag);
        };

        let grade: u32 = c[1]
            .parse()
            .map_err(|_| ParserError::Other(format!("malformed grade number: {}", &c[1])))?;
        let subject = title_case(&c[2].replace('_', " "));
        let title = title_case(&c[3].replace('_', " "));

        frag.set("title", title);
        frag.set("genre", subject.clone());
        frag.set("reading_level", reading_level_for_grade(grade));
        frag.set("media_type", "Read to Me");
        frag.set("notes", format!("Grade {} {} material", grade, subject));
        Ok(frag)
    }
}

/// "Publisher - Series - Title.pdf" (title keeps any further dashes)
pub struct PublisherSeriesParser;

impl Parser for PublisherSeriesParser {
    fn name(&self) -> &str {
        "publisher-series"
    }

    fn applies(&self, input: &ParseInput) -> bool {
        input.stem().split(" - ").count() >= 3
    }

    fn extract(&self, input: &ParseInput) -> Result<Fragment, ParserError> {
        let parts: Vec<&str> = input.stem().split(" - ").collect();
        let mut frag = Fragment::new();
        if parts.len() < 3 {
            return Ok(frag);
        }

        let publisher = parts[0].trim();
        let series = parts[1].trim();
        let title = parts[2..].join(" - ");

        frag.set("title", title.trim());
        frag.set("publisher", publisher);
        frag.set("series", series);
        frag.set("author", format!("{} Series", series));
        frag.set("media_type", "Read to Me");
        frag.set("notes", format!("Part of {} series by {}", series, publisher));
        Ok(frag)
    }
}

static TAG_FIELDS: &[(&str, &str)] = &[
    ("title", "title"),
    ("author", "author"),
    ("grade", "grade"),
    ("subject", "subject"),
    ("description", "description"),
    ("isbn", "isbn"),
    ("publisher", "publisher"),
];

/// Sidecar `.txt` files carrying `<title>...</title>` style tags.
pub struct TaggedTextParser;

impl TaggedTextParser {
    fn tag_pattern(tag: &str) -> Regex {
        Regex::new(&format!(r"(?is)<{tag}>(.*?)</{tag}>")).expect("static tag pattern")
    }
}

impl Parser for TaggedTextParser {
    fn name(&self) -> &str {
        "tagged-text"
    }

    fn applies(&self, input: &ParseInput) -> bool {
        if !input.filename.to_lowercase().ends_with(".txt") {
            return false;
        }
        let Ok(bytes) = fs::read(input.path) else {
            return false;
        };
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_lowercase();
        head.contains("<title>") && head.contains("<author>")
    }

    fn extract(&self, input: &ParseInput) -> Result<Fragment, ParserError> {
        let bytes = fs::read(input.path)?;
        let content = String::from_utf8_lossy(&bytes);

        let mut frag = Fragment::new();
        for (tag, field) in TAG_FIELDS {
            if let Some(c) = Self::tag_pattern(tag).captures(&content) {
                let value = c[1].trim();
                if !value.is_empty() {
                    frag.set(*field, value);
                }
            }
        }

        if let Some(grade) = frag.remove("grade") {
            if let Ok(n) = grade.trim().parse::<u32>() {
                frag.set("reading_level", reading_level_for_grade(n));
            }
        }
        if let Some(subject) = frag.get("subject").map(String::from) {
            frag.set_if_absent("genre", subject);
        }
        Ok(frag)
    }
}

/// Sidecar `.txt` files with a pipe-delimited first line:
/// "Title|Author|Grade|Subject|Description"
pub struct PipeDelimitedParser;

impl PipeDelimitedParser {
    fn first_line(input: &ParseInput) -> Option<String> {
        let bytes = fs::read(input.path).ok()?;
        let content = String::from_utf8_lossy(&bytes);
        content.lines().next().map(|l| l.trim().to_string())
    }
}

impl Parser for PipeDelimitedParser {
    fn name(&self) -> &str {
        "pipe-delimited"
    }

    fn applies(&self, input: &ParseInput) -> bool {
        input.filename.to_lowercase().ends_with(".txt")
            && Self::first_line(input)
                .map(|l| l.matches('|').count() >= 3)
                .unwrap_or(false)
    }

    fn extract(&self, input: &ParseInput) -> Result<Fragment, ParserError> {
        let mut frag = Fragment::new();
        let Some(line) = Self::first_line(input) else {
            return Ok(frag);
        };
        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        if parts.len() < 4 {
            return Ok(frag);
        }

        if !parts[0].is_empty() {
            frag.set("title", parts[0]);
        }
        if !parts[1].is_empty() {
            frag.set("author", parts[1]);
        }
        let digits: String = parts[2].chars().filter(|c| c.is_ascii_digit()).collect();
        if let Ok(grade) = digits.parse::<u32>() {
            frag.set("reading_level", reading_level_for_grade(grade));
        }
        if !parts[3].is_empty() {
            frag.set("genre", parts[3]);
        }
        if parts.len() > 4 && !parts[4].is_empty() {
            frag.set("description", parts[4]);
        }
        Ok(frag)
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
