use std::cmp::Reverse;
use std::path::Path;
use thiserror::Error;

use crate::record::Fragment;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Everything a custom parser gets to look at: the concrete file (or the
/// item folder itself when no file applies), its display name, and the
/// containing folder.
#[derive(Debug, Clone, Copy)]
pub struct ParseInput<'a> {
    pub path: &'a Path,
    pub filename: &'a str,
    pub folder: Option<&'a Path>,
}

impl<'a> ParseInput<'a> {
    pub fn new(path: &'a Path, filename: &'a str, folder: Option<&'a Path>) -> Self {
        Self {
            path,
            filename,
            folder,
        }
    }

    /// Extension-less stem of the input filename.
    pub fn stem(&self) -> &'a str {
        Path::new(self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(self.filename)
    }
}

/// One registered extraction strategy: an applicability predicate plus an
/// extraction function, ranked by priority.
pub trait Parser: Send + Sync {
    fn name(&self) -> &str;

    /// Higher runs first. Ties keep registration order.
    fn priority(&self) -> i32 {
        0
    }

    fn applies(&self, input: &ParseInput) -> bool;

    fn extract(&self, input: &ParseInput) -> Result<Fragment, ParserError>;
}

/// A parser that failed during extraction; recorded, never fatal.
#[derive(Debug, Clone)]
pub struct ParserSkip {
    pub parser: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct RegistryOutcome {
    pub fragment: Option<Fragment>,
    /// Name of the parser that produced the fragment.
    pub parser: Option<String>,
    pub skipped: Vec<ParserSkip>,
}

/// Priority-ordered collection of custom parsers.
///
/// The registry is built before a run and injected into the pipeline;
/// it is never mutated while a run is in flight.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn Parser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parser: Box<dyn Parser>) {
        self.parsers.push(parser);
        // Stable sort: equal priorities keep registration order.
        self.parsers.sort_by_key(|p| Reverse(p.priority()));
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    /// Run the first applicable parser that yields a non-empty fragment.
    /// Parsers that error are skipped with their identity recorded; an
    /// applicable parser returning an empty fragment does not stop the
    /// search.
    pub fn run(&self, input: &ParseInput) -> RegistryOutcome {
        let mut outcome = RegistryOutcome::default();

        for parser in &self.parsers {
            if !parser.applies(input) {
                continue;
            }
            match parser.extract(input) {
                Ok(fragment) if !fragment.is_empty() => {
                    outcome.parser = Some(parser.name().to_string());
                    outcome.fragment = Some(fragment);
                    return outcome;
                }
                Ok(_) => {}
                Err(e) => outcome.skipped.push(ParserSkip {
                    parser: parser.name().to_string(),
                    error: e.to_string(),
                }),
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedParser {
        name: &'static str,
        priority: i32,
        applies: bool,
        result: Result<Vec<(&'static str, &'static str)>, &'static str>,
    }

    impl Parser for FixedParser {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn applies(&self, _input: &ParseInput) -> bool {
            self.applies
        }
        fn extract(&self, _input: &ParseInput) -> Result<Fragment, ParserError> {
            match &self.result {
                Ok(pairs) => {
                    let mut frag = Fragment::new();
                    for (k, v) in pairs {
                        frag.set(*k, *v);
                    }
                    Ok(frag)
                }
                Err(msg) => Err(ParserError::Other(msg.to_string())),
            }
        }
    }

    fn input() -> (std::path::PathBuf, &'static str) {
        (std::path::PathBuf::from("/books/file.txt"), "file.txt")
    }

    #[test]
    fn first_applicable_nonempty_wins() {
        let mut registry = ParserRegistry::new();
        registry.register(Box::new(FixedParser {
            name: "empty",
            priority: 5,
            applies: true,
            result: Ok(vec![]),
        }));
        registry.register(Box::new(FixedParser {
            name: "winner",
            priority: 1,
            applies: true,
            result: Ok(vec![("title", "Found")]),
        }));
        registry.register(Box::new(FixedParser {
            name: "never-reached",
            priority: 0,
            applies: true,
            result: Ok(vec![("title", "Shadowed")]),
        }));

        let (path, filename) = input();
        let outcome = registry.run(&ParseInput::new(&path, filename, None));

        assert_eq!(outcome.parser.as_deref(), Some("winner"));
        assert_eq!(outcome.fragment.unwrap().get("title"), Some("Found"));
    }

    #[test]
    fn priority_descending_stable_on_ties() {
        let mut registry = ParserRegistry::new();
        registry.register(Box::new(FixedParser {
            name: "low",
            priority: 0,
            applies: true,
            result: Ok(vec![("title", "low")]),
        }));
        registry.register(Box::new(FixedParser {
            name: "high",
            priority: 10,
            applies: true,
            result: Ok(vec![("title", "high")]),
        }));
        registry.register(Box::new(FixedParser {
            name: "also-low",
            priority: 0,
            applies: true,
            result: Ok(vec![("title", "also-low")]),
        }));

        assert_eq!(registry.names(), vec!["high", "low", "also-low"]);
    }

    #[test]
    fn erroring_parser_is_skipped_not_fatal() {
        let mut registry = ParserRegistry::new();
        registry.register(Box::new(FixedParser {
            name: "broken",
            priority: 10,
            applies: true,
            result: Err("boom"),
        }));
        registry.register(Box::new(FixedParser {
            name: "fallback",
            priority: 0,
            applies: true,
            result: Ok(vec![("title", "Recovered")]),
        }));

        let (path, filename) = input();
        let outcome = registry.run(&ParseInput::new(&path, filename, None));

        assert_eq!(outcome.parser.as_deref(), Some("fallback"));
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].parser, "broken");
    }

    #[test]
    fn inapplicable_parsers_not_consulted() {
        let mut registry = ParserRegistry::new();
        registry.register(Box::new(FixedParser {
            name: "not-applicable",
            priority: 10,
            applies: false,
            result: Ok(vec![("title", "Wrong")]),
        }));

        let (path, filename) = input();
        let outcome = registry.run(&ParseInput::new(&path, filename, None));

        assert!(outcome.fragment.is_none());
        assert!(outcome.skipped.is_empty());
    }
}
