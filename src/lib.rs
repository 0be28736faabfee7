//! # Polyglot
//!
//! A static site generator for multilingual sites. You write markdown in one
//! language; Polyglot translates it into every other language through a
//! chat-completions API and renders each language through Jinja-style
//! templates.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Translate  content/       →  _translations/<lang>/   (one mirror per language)
//! 2. Render     _translations/ →  output/<lang>/          (final HTML site)
//! ```
//!
//! The translations mirror sits between the stages as plain markdown, so a
//! translation can be reviewed or corrected by hand before rendering, and
//! re-rendering never costs an API call.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`translate`] | Stage 1: writes the per-language mirrors, skipping unchanged files |
//! | [`render`] | Stage 2: renders every page of every language, the landing page and assets |
//! | [`tree`] | Builds a language's page tree from its content directory |
//! | [`theme`] | Picks the most specific `.j2` template for a content file |
//! | [`tracker`] | Content checksums that drive incremental translation |
//! | [`strings`] | Persisted translations of titles, section labels and the site name |
//! | [`naming`] | Title and blog-date conventions derived from file and directory names |
//! | [`config`] | `config.toml` loading and validation |
//! | [`output`] | CLI output formatting for each stage |
//!
//! # Design Decisions
//!
//! ## Filenames Are Titles
//!
//! A page's title is its file name: `kirk_is_born.md` is "Kirk Is Born". Files
//! keep their source-language names in every mirror so URLs stay stable
//! across languages; the translated titles live in `strings.json` and are
//! looked up at render time.
//!
//! ## Most Specific Template Wins
//!
//! A theme only needs a root `index.j2`. More specific templates
//! (`blog.j2`, `pages/index.j2`, `pages/about.j2`) are picked up when they
//! exist; see [`theme`] for the search order.
//!
//! ## Translate Only What Changed
//!
//! Every API call costs money and time. The [`tracker`] records a checksum
//! per source file once all of its translations succeeded, so a rerun only
//! touches edited files and files whose translation failed last time.

pub mod config;
pub mod naming;
pub mod output;
pub mod render;
pub mod strings;
pub mod theme;
pub mod tracker;
pub mod translate;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;
