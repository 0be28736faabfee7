//! CLI output formatting for all pipeline stages.
//!
//! Output lists what each stage did to which file or page, grouped the way a
//! user thinks about the site: by language for rendering, by file for
//! translation. Paths are shown relative to the site root.
//!
//! # Output Format
//!
//! ## Translate
//!
//! ```text
//! Languages: en, jp, de
//!
//! Copied
//!     about_us.md
//! Translated
//!     about_us.md → jp, de
//! Unchanged
//!     pages/a-team.md
//! Failed
//!     blog/2023-01-01/today_we_begin.md (de): HTTP error: timed out
//!
//! Translated 1 file, copied 1, 1 unchanged, learned 4 strings, 1 failure
//! ```
//!
//! ## Render
//!
//! ```text
//! en (7 pages)
//!     /en/index.html ← index.j2
//!     /en/about_us.html ← index.j2
//! Landing → index.html
//! Blog index → blog/index.html
//!
//! Rendered 21 pages in 3 languages, copied 2 assets
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::render::{CheckReport, RenderReport};
use crate::translate::TranslateReport;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 file`, `2 files`.
fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

/// `path` relative to `root` with `/` separators, or unchanged when it
/// lies outside `root`.
fn relative(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.display().to_string(),
    }
}

fn display(path: &Path) -> String {
    relative(path, Path::new(""))
}

// ============================================================================
// Translate
// ============================================================================

/// Format a translation report.
pub fn format_translate_output(report: &TranslateReport) -> Vec<String> {
    let mut body = Vec::new();

    if !report.copied.is_empty() {
        body.push("Copied".to_string());
        for file in &report.copied {
            body.push(format!("{}{}", indent(1), display(file)));
        }
    }

    let mut by_file: BTreeMap<&PathBuf, Vec<&str>> = BTreeMap::new();
    for (file, lang) in &report.translated {
        by_file.entry(file).or_default().push(lang);
    }
    if !by_file.is_empty() {
        body.push("Translated".to_string());
        for (file, langs) in &by_file {
            body.push(format!(
                "{}{} \u{2192} {}",
                indent(1),
                display(file),
                langs.join(", ")
            ));
        }
    }

    if !report.unchanged.is_empty() {
        body.push("Unchanged".to_string());
        for file in &report.unchanged {
            body.push(format!("{}{}", indent(1), display(file)));
        }
    }

    if !report.failures.is_empty() {
        body.push("Failed".to_string());
        for failure in &report.failures {
            body.push(format!(
                "{}{} ({}): {}",
                indent(1),
                failure.subject,
                failure.lang,
                failure.message
            ));
        }
    }

    let mut lines = vec![format!("Languages: {}", report.languages.join(", "))];
    if !body.is_empty() {
        lines.push(String::new());
        lines.extend(body);
    }

    lines.push(String::new());
    lines.push(format!(
        "Translated {}, copied {}, {} unchanged, learned {}, {}",
        plural(by_file.len(), "file"),
        report.copied.len(),
        report.unchanged.len(),
        plural(report.strings_learned, "string"),
        plural(report.failures.len(), "failure"),
    ));
    lines
}

/// Print translation output to stdout.
pub fn print_translate_output(report: &TranslateReport) {
    for line in format_translate_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Render
// ============================================================================

/// Format a render report. Output paths are shown relative to `output_root`.
pub fn format_render_output(report: &RenderReport, output_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    let mut by_lang: Vec<(&str, Vec<String>)> = Vec::new();
    for page in &report.pages {
        let line = format!("{}{} \u{2190} {}", indent(1), page.url, page.template);
        match by_lang.last_mut() {
            Some((lang, pages)) if *lang == page.lang => pages.push(line),
            _ => by_lang.push((page.lang.as_str(), vec![line])),
        }
    }
    for (lang, pages) in &by_lang {
        lines.push(format!("{lang} ({})", plural(pages.len(), "page")));
        lines.extend(pages.iter().cloned());
    }

    lines.push(format!(
        "Landing \u{2192} {}",
        relative(&report.landing, output_root)
    ));
    if let Some(blog_index) = &report.blog_index {
        lines.push(format!(
            "Blog index \u{2192} {}",
            relative(blog_index, output_root)
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "Rendered {} in {}, copied {}",
        plural(report.pages.len(), "page"),
        plural(by_lang.len(), "language"),
        plural(report.assets, "asset"),
    ));
    lines
}

/// Print render output to stdout.
pub fn print_render_output(report: &RenderReport, output_root: &Path) {
    for line in format_render_output(report, output_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format a check report: per language, the tree checked and how many pages
/// each template serves. `site_root` shortens the tree paths.
pub fn format_check_output(report: &CheckReport, site_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for lang in &report.languages {
        lines.push(format!(
            "{} ({}) from {}",
            lang.lang,
            plural(lang.pages, "page"),
            relative(&lang.root, site_root)
        ));
        for (template, count) in &lang.templates {
            lines.push(format!("{}{template}: {}", indent(1), plural(*count, "page")));
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Every page of {} has a template",
        plural(report.languages.len(), "language")
    ));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(report: &CheckReport, site_root: &Path) {
    for line in format_check_output(report, site_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
