//! Template resolution.
//!
//! A theme is a directory of `*.j2` templates. Each page picks the most
//! specific template that exists, walking from the content file's own
//! directory up to the theme root. At every level three names are tried:
//!
//! ```text
//! content: blog/2233-03-22/kirk_is_born.md
//!
//! blog/2233-03-22/kirk_is_born.j2   named after the file
//! blog/2233-03-22/index.j2          generic template for the directory
//! blog/2233-03-22.j2                named after the directory, one level up
//! blog/kirk_is_born.j2
//! blog/index.j2
//! blog.j2
//! kirk_is_born.j2
//! index.j2                          the theme's base case
//! ```
//!
//! The first candidate found on disk wins. A theme without a root `index.j2`
//! can fail to resolve, which is reported as [`TemplateNotFound`].

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of template files.
pub const TEMPLATE_EXT: &str = "j2";

/// Template for the top-level language picker page.
pub const LANDING_TEMPLATE: &str = "landing.j2";

/// Optional template for the cross-language blog listing.
pub const BLOG_INDEX_TEMPLATE: &str = "blog_index.j2";

#[derive(Error, Debug)]
#[error("No template for {} under theme {}", .content.display(), .theme.display())]
pub struct TemplateNotFound {
    pub content: PathBuf,
    pub theme: PathBuf,
}

/// Candidate template paths for a content file, most specific first.
///
/// `rel_content` is relative to a language's content root, e.g.
/// `pages/about.md`. Candidates are relative to the theme root.
pub fn candidates(rel_content: &Path) -> Vec<PathBuf> {
    let stem = rel_content
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = rel_content.parent().unwrap_or_else(|| Path::new(""));

    let mut out = Vec::new();
    for dir in parent.ancestors() {
        out.push(dir.join(format!("{stem}.{TEMPLATE_EXT}")));
        out.push(dir.join(format!("index.{TEMPLATE_EXT}")));
        if let Some(name) = dir.file_name() {
            let above = dir.parent().unwrap_or_else(|| Path::new(""));
            out.push(above.join(format!("{}.{TEMPLATE_EXT}", name.to_string_lossy())));
        }
    }
    out
}

/// Resolve the template for `rel_content`, returned relative to `theme_root`.
pub fn resolve(theme_root: &Path, rel_content: &Path) -> Result<PathBuf, TemplateNotFound> {
    candidates(rel_content)
        .into_iter()
        .find(|candidate| theme_root.join(candidate).is_file())
        .ok_or_else(|| TemplateNotFound {
            content: rel_content.to_path_buf(),
            theme: theme_root.to_path_buf(),
        })
}

/// Template name as the template engine knows it: the theme-relative path
/// with `/` separators.
pub fn template_name(rel_template: &Path) -> String {
    rel_template
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
