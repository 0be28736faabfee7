//! Centralized filename conventions.
//!
//! Titles are never written down anywhere: they come from the file or
//! directory name. The same canonical form is used when a title is sent for
//! translation and when it is looked up again at render time, so the two
//! phases must derive it through [`canonical_title`] and nothing else.
//!
//! - `kirk_is_born.md` → "Kirk Is Born"
//! - `about_us.md` → "About Us"
//! - `a-team.md` → "A-Team"
//! - `blog/` → "Blog"
//!
//! Blog posts live in a directory named after their publication date
//! (`blog/2023-01-01/today_we_begin.md`); [`parse_post_date`] reads it.

use chrono::NaiveDate;
use std::path::Path;

/// Date format of blog post directories.
pub const POST_DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical display title for a filename stem.
///
/// Underscores become spaces, surrounding whitespace is stripped and runs of
/// whitespace collapse. Each word is capitalized, and so is each part of a
/// hyphenated word (`a-team` → "A-Team").
pub fn canonical_title(stem: &str) -> String {
    stem.replace('_', " ")
        .split_whitespace()
        .map(|word| word.split('-').map(capitalize).collect::<Vec<_>>().join("-"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical title of a path's file stem (or directory name).
pub fn title_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    canonical_title(&stem)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Parse a blog post directory name (`YYYY-MM-DD`).
pub fn parse_post_date(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, POST_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscores_become_spaces_and_words_capitalized() {
        assert_eq!(canonical_title("kirk_is_born"), "Kirk Is Born");
    }

    #[test]
    fn single_word() {
        assert_eq!(canonical_title("blog"), "Blog");
    }

    #[test]
    fn surrounding_underscores_stripped() {
        assert_eq!(canonical_title("_about_us_"), "About Us");
    }

    #[test]
    fn mixed_case_normalized() {
        assert_eq!(canonical_title("hELLO_wORLD"), "Hello World");
    }

    #[test]
    fn hyphenated_parts_capitalized() {
        assert_eq!(canonical_title("a-team"), "A-Team");
        assert_eq!(canonical_title("state-of-the_art"), "State-Of-The Art");
        assert_eq!(canonical_title("-lead-"), "-Lead-");
    }

    #[test]
    fn dates_unchanged() {
        assert_eq!(canonical_title("2023-01-01"), "2023-01-01");
    }

    #[test]
    fn non_ascii_words() {
        assert_eq!(canonical_title("élan_vital"), "Élan Vital");
    }

    #[test]
    fn title_from_markdown_path() {
        assert_eq!(
            title_from_path(Path::new("blog/2233-03-22/kirk_is_born.md")),
            "Kirk Is Born"
        );
    }

    #[test]
    fn title_from_directory_path() {
        assert_eq!(title_from_path(Path::new("content/pages")), "Pages");
    }

    #[test]
    fn post_date_parsed() {
        assert_eq!(
            parse_post_date("2233-03-22"),
            NaiveDate::from_ymd_opt(2233, 3, 22)
        );
    }

    #[test]
    fn post_date_rejects_other_names() {
        assert_eq!(parse_post_date("blog"), None);
        assert_eq!(parse_post_date("2023-13-01"), None);
        assert_eq!(parse_post_date("2023-1-1x"), None);
    }
}
