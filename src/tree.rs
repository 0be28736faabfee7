//! Page tree construction.
//!
//! Walks one language's content root and turns it into a tree of [`Page`]s
//! that mirrors the directory structure:
//!
//! ```text
//! _translations/jp/                    Index          index.html
//! ├── _layout/                         (skipped, see render::layout_content)
//! ├── assets/                          (skipped, copied verbatim)
//! ├── about_us.md                      Plain          about_us.html
//! ├── pages/                           ContentIndex   pages/index.html
//! │   ├── home.md                      (content of pages/index.html)
//! │   └── a-team.md                    Plain          pages/a-team.html
//! └── blog/                            Index          blog/index.html
//!     └── 2023-01-01/                  Index          blog/2023-01-01/index.html
//!         └── today_we_begin.md        Blog           blog/2023-01-01/today_we_begin/index.html
//! ```
//!
//! Children are visited in lexicographic order so output is reproducible
//! across platforms. Every markdown file under a `blog` directory is a post
//! and must sit in a `YYYY-MM-DD` directory. A directory containing the
//! configured index page (`home.md` by default) or an `index.md` takes that
//! file's title and content; the file itself is not listed among the
//! directory's subpages. Two pages may never share an href: a directory
//! holding both `home.md` and `index.md` fails with
//! [`TreeError::DuplicateHref`].
//!
//! `href` is relative to the language root; `url` is the same location at
//! site level, prefixed with `/{lang}`.

use crate::config::SiteConfig;
use crate::naming;
use crate::strings::StringMap;
use chrono::NaiveDate;
use pulldown_cmark::{Options, Parser, html as md_html};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of content files.
pub const CONTENT_EXT: &str = "md";

/// Directory segment that marks dated blog posts.
pub const BLOG_DIR: &str = "blog";

/// Directory of markdown snippets exposed to templates.
pub const LAYOUT_DIR: &str = "_layout";

/// Directory of static files copied verbatim.
pub const ASSETS_DIR: &str = "assets";

const RESERVED_DIRS: &[&str] = &[LAYOUT_DIR, ASSETS_DIR];

/// File stem that always routes to its directory's `index.html`.
const INDEX_STEM: &str = "index";

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Blog post {path} must be in a YYYY-MM-DD directory, found '{name}'")]
    DateParse { path: PathBuf, name: String },
    #[error("Content root not found: {0}")]
    MissingRoot(PathBuf),
    #[error("{second} and {first} would both be written to {href}")]
    DuplicateHref {
        href: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Fields shared by every kind of page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageInfo {
    /// The file (or directory) the page was built from.
    pub source_path: PathBuf,
    /// Content path relative to the language root, used to pick a template.
    pub rel_path: PathBuf,
    /// Output location relative to the language root.
    pub href: String,
    /// Site-level location: `/{lang}/{href}`.
    pub url: String,
    pub lang: String,
    pub title: String,
}

/// One routable unit of output HTML.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Page {
    /// A markdown file outside any blog directory.
    Plain {
        #[serde(flatten)]
        info: PageInfo,
        content: String,
    },
    /// A markdown file in a dated directory under `blog/`.
    Blog {
        #[serde(flatten)]
        info: PageInfo,
        content: String,
        date: NaiveDate,
    },
    /// A directory listing with no content of its own.
    Index {
        #[serde(flatten)]
        info: PageInfo,
        subpages: Vec<Page>,
    },
    /// A directory listing whose content comes from its index page file.
    ContentIndex {
        #[serde(flatten)]
        info: PageInfo,
        content: String,
        subpages: Vec<Page>,
    },
}

impl Page {
    pub fn info(&self) -> &PageInfo {
        match self {
            Page::Plain { info, .. }
            | Page::Blog { info, .. }
            | Page::Index { info, .. }
            | Page::ContentIndex { info, .. } => info,
        }
    }

    pub fn href(&self) -> &str {
        &self.info().href
    }

    pub fn url(&self) -> &str {
        &self.info().url
    }

    pub fn title(&self) -> &str {
        &self.info().title
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Page::Plain { content, .. }
            | Page::Blog { content, .. }
            | Page::ContentIndex { content, .. } => Some(content),
            Page::Index { .. } => None,
        }
    }

    pub fn subpages(&self) -> &[Page] {
        match self {
            Page::Index { subpages, .. } | Page::ContentIndex { subpages, .. } => subpages,
            Page::Plain { .. } | Page::Blog { .. } => &[],
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Page::Blog { date, .. } => Some(*date),
            _ => None,
        }
    }

    /// The content path a template is resolved for. Directory listings
    /// without content resolve as a virtual `index` file in the directory.
    pub fn template_source(&self) -> PathBuf {
        match self {
            Page::Index { info, .. } => info.rel_path.join("index"),
            _ => self.info().rel_path.clone(),
        }
    }

    /// This page and all its descendants, depth-first, parents first.
    pub fn walk(&self) -> Vec<&Page> {
        let mut out = Vec::new();
        self.walk_into(&mut out);
        out
    }

    fn walk_into<'a>(&'a self, out: &mut Vec<&'a Page>) {
        out.push(self);
        for child in self.subpages() {
            child.walk_into(out);
        }
    }
}

/// Markdown to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options);
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    html
}

/// Build the page tree for one language rooted at `root`.
pub fn build(
    root: &Path,
    lang: &str,
    strings: &StringMap,
    config: &SiteConfig,
) -> Result<Page, TreeError> {
    if !root.is_dir() {
        return Err(TreeError::MissingRoot(root.to_path_buf()));
    }
    let builder = TreeBuilder {
        root,
        lang,
        strings,
        config,
    };
    let tree = builder.directory(root)?;
    check_unique_hrefs(&tree)?;
    Ok(tree)
}

fn check_unique_hrefs(root: &Page) -> Result<(), TreeError> {
    let mut seen: BTreeMap<&str, &Path> = BTreeMap::new();
    for page in root.walk() {
        let info = page.info();
        if let Some(first) = seen.insert(&info.href, &info.source_path) {
            return Err(TreeError::DuplicateHref {
                href: info.href.clone(),
                first: first.to_path_buf(),
                second: info.source_path.clone(),
            });
        }
    }
    Ok(())
}

struct TreeBuilder<'a> {
    root: &'a Path,
    lang: &'a str,
    strings: &'a StringMap,
    config: &'a SiteConfig,
}

impl TreeBuilder<'_> {
    fn node(&self, path: &Path) -> Result<Option<Page>, TreeError> {
        if path.is_dir() {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if RESERVED_DIRS.iter().any(|reserved| *reserved == name) {
                return Ok(None);
            }
            return self.directory(path).map(Some);
        }
        if path.extension().is_some_and(|e| e == CONTENT_EXT) {
            return self.file(path).map(Some);
        }
        Ok(None)
    }

    fn directory(&self, dir: &Path) -> Result<Page, TreeError> {
        let mut subpages = Vec::new();
        for entry in collect_entries(dir)? {
            if let Some(page) = self.node(&entry)? {
                subpages.push(page);
            }
        }

        let rel = self.rel(dir);
        let href = join_href(&rel, "index.html");
        let home = subpages.iter().position(|page| match page {
            Page::Plain { info, .. } => info
                .rel_path
                .file_stem()
                .is_some_and(|s| self.is_index_stem(&s.to_string_lossy())),
            _ => false,
        });

        if let Some(idx) = home
            && let Page::Plain { info, content } = subpages.remove(idx)
        {
            return Ok(Page::ContentIndex {
                info: PageInfo {
                    url: self.url(&href),
                    href,
                    lang: self.lang.to_string(),
                    ..info
                },
                content,
                subpages,
            });
        }

        let title = if rel.as_os_str().is_empty() {
            site_name(self.config, self.strings, self.lang)
        } else {
            self.strings.get_title(self.lang, dir)
        };
        Ok(Page::Index {
            info: PageInfo {
                source_path: dir.to_path_buf(),
                rel_path: rel,
                url: self.url(&href),
                href,
                lang: self.lang.to_string(),
                title,
            },
            subpages,
        })
    }

    fn file(&self, path: &Path) -> Result<Page, TreeError> {
        let rel = self.rel(path);
        let markdown = fs::read_to_string(path).map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = markdown_to_html(&markdown);
        let title = self.strings.get_title(self.lang, path);
        let stem = rel
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = rel.parent().unwrap_or_else(|| Path::new("")).to_path_buf();

        if is_blog_path(&parent) {
            let name = parent
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let date = naming::parse_post_date(&name).ok_or_else(|| TreeError::DateParse {
                path: path.to_path_buf(),
                name,
            })?;
            let href = join_href(&parent.join(&stem), "index.html");
            return Ok(Page::Blog {
                info: self.info(path, rel, href, title),
                content,
                date,
            });
        }

        let href = if self.is_index_stem(&stem) {
            join_href(&parent, "index.html")
        } else {
            path_href(&rel.with_extension("html"))
        };
        Ok(Page::Plain {
            info: self.info(path, rel, href, title),
            content,
        })
    }

    fn is_index_stem(&self, stem: &str) -> bool {
        stem == self.config.index_page || stem == INDEX_STEM
    }

    fn info(&self, path: &Path, rel: PathBuf, href: String, title: String) -> PageInfo {
        PageInfo {
            source_path: path.to_path_buf(),
            rel_path: rel,
            url: self.url(&href),
            href,
            lang: self.lang.to_string(),
            title,
        }
    }

    fn rel(&self, path: &Path) -> PathBuf {
        path.strip_prefix(self.root).unwrap_or(path).to_path_buf()
    }

    fn url(&self, href: &str) -> String {
        format!("/{}/{}", self.lang, href)
    }
}

/// Directory entries sorted by name, skipping hidden files.
fn collect_entries(dir: &Path) -> Result<Vec<PathBuf>, TreeError> {
    let io_err = |source: std::io::Error| TreeError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if !hidden {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

/// Whether a relative content directory lies under a `blog` segment.
pub fn is_blog_path(rel_dir: &Path) -> bool {
    rel_dir.components().any(|c| c.as_os_str() == BLOG_DIR)
}

fn path_href(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn join_href(rel_dir: &Path, file: &str) -> String {
    path_href(&rel_dir.join(file))
}

/// The site's display name in `lang`.
///
/// An explicit `site_name` entry wins, then a learned translation of the
/// source-language name, then the default language's name.
pub fn site_name(config: &SiteConfig, strings: &StringMap, lang: &str) -> String {
    if let Some(name) = config.site_name.get(lang) {
        return name.clone();
    }
    let source_name = config.site_name_for(&config.language.source);
    if strings.is_translated(source_name, lang) {
        strings.lookup(lang, source_name)
    } else {
        config.default_site_name().to_string()
    }
}

/// A language's blog posts, newest first. Posts on the same day are ordered
/// by href.
pub fn blog_posts(root: &Page) -> Vec<&Page> {
    let mut posts: Vec<&Page> = root
        .walk()
        .into_iter()
        .filter(|page| matches!(page, Page::Blog { .. }))
        .collect();
    posts.sort_by(|a, b| b.date().cmp(&a.date()).then_with(|| a.href().cmp(b.href())));
    posts
}

/// Page trees for every output language, built from the translations mirror.
pub fn language_trees(
    config: &SiteConfig,
    strings: &StringMap,
) -> Result<BTreeMap<String, Page>, TreeError> {
    config
        .language
        .output
        .iter()
        .map(|lang| {
            let root = build(&config.translations_for(lang), lang, strings, config)?;
            Ok((lang.clone(), root))
        })
        .collect()
}

/// Every page of every output language as a flat list, parents first.
pub fn page_list(
    config: &SiteConfig,
    strings: &StringMap,
) -> Result<BTreeMap<String, Vec<Page>>, TreeError> {
    Ok(language_trees(config, strings)?
        .into_iter()
        .map(|(lang, root)| (lang, root.walk().into_iter().cloned().collect()))
        .collect())
}
