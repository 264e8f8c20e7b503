use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Characters of extracted document text fed to the metadata extractor.
const EMBEDDED_TEXT_CHARS: usize = 2000;

static RTF_CONTROL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[a-zA-Z]+-?\d*\s?").unwrap());

/// Locate the description file for an item folder: a literal
/// description.txt, else the first .rtf, else the first .txt.
pub fn find_description_file(dir: &Path) -> Option<PathBuf> {
    let exact = dir.join("description.txt");
    if exact.is_file() {
        return Some(exact);
    }
    first_with_extension(dir, "rtf").or_else(|| first_with_extension(dir, "txt"))
}

fn first_with_extension(dir: &Path, wanted: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| {
            !p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(true)
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case(wanted))
                    .unwrap_or(false)
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// Read a sidecar file as text, reducing RTF to plain text when needed.
/// Undecodable bytes are replaced rather than failing the item.
pub fn load_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    let is_rtf = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("rtf"))
        .unwrap_or(false);

    Ok(if is_rtf { rtf_to_text(&content) } else { content })
}

/// Basic RTF-to-text reduction: drop control words and group braces,
/// collapse whitespace.
pub fn rtf_to_text(content: &str) -> String {
    let text = RTF_CONTROL_RE.replace_all(content, "");
    let text = text.replace(['{', '}'], "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text embedded in the folder's document, as a fallback blob when no
/// sidecar exists. Encrypted or corrupt PDFs yield empty text rather
/// than failing the item.
pub fn embedded_text(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    match pdf_extract::extract_text_from_mem(&bytes) {
        Ok(text) => Ok(truncate_chars(text.trim(), EMBEDDED_TEXT_CHARS)),
        Err(e) if is_recoverable_error(&e) => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

fn is_recoverable_error(err: &pdf_extract::OutputError) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("encrypted")
        || msg.contains("password")
        || msg.contains("corrupt")
        || msg.contains("invalid")
}

fn truncate_chars(content: &str, max: usize) -> String {
    content.chars().take(max).collect()
}
