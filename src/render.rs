//! Render stage: per-language mirror trees → HTML site.
//!
//! For every output language the page tree is built from that language's
//! translations mirror, each page's template is resolved through
//! [`theme::resolve`], and the page is rendered with a context holding:
//!
//! | Key | Value |
//! |-----|-------|
//! | `page` | the page itself (tagged by `kind`) |
//! | `subpages` | its children, empty for leaf pages |
//! | `config` | the site config |
//! | `site_name` | display name of the site in this language |
//! | `home` | the language's root page, for navigation |
//! | `pages` | the root's children |
//! | `lang` | the language code |
//! | `languages` | code → native language name |
//! | `supported_languages` | every output language code |
//! | `layout` | `_layout` snippet stem → HTML |
//!
//! Output goes to `<output_dir>/<lang>/<href>`. After all languages, the
//! landing page (`landing.j2`) is written to `<output_dir>/index.html`, the
//! cross-language blog listing (`blog_index.j2`, if the theme has one) to
//! `<output_dir>/blog/index.html`, and static assets are copied.
//!
//! A page without a template aborts the whole run: a theme missing its base
//! `index.j2` is broken, and a half-rendered site is worse than none.

use crate::config::SiteConfig;
use crate::strings::StringMap;
use crate::theme::{self, BLOG_INDEX_TEMPLATE, LANDING_TEMPLATE, TEMPLATE_EXT, TemplateNotFound};
use crate::tree::{self, ASSETS_DIR, CONTENT_EXT, LAYOUT_DIR, Page, TreeError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tera::Tera;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    TemplateNotFound(#[from] TemplateNotFound),
    #[error("Theme directory not found: {0}")]
    MissingTheme(PathBuf),
    #[error("Failed to load theme: {0}")]
    Theme(String),
    #[error("Template {template} failed: {message}")]
    Template { template: String, message: String },
    #[error("Failed to build template context: {0}")]
    Context(#[from] serde_json::Error),
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Renders a named template with a JSON context.
pub trait Renderer {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, RenderError>;
}

/// [`Renderer`] backed by Tera, loaded from every `*.j2` under a theme root.
/// Templates are named by their `/`-separated path relative to the root.
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    pub fn load(theme_dir: &Path) -> Result<Self, RenderError> {
        if !theme_dir.is_dir() {
            return Err(RenderError::MissingTheme(theme_dir.to_path_buf()));
        }
        let glob = theme_dir.join("**").join(format!("*.{TEMPLATE_EXT}"));
        let tera = Tera::new(&glob.to_string_lossy())
            .map_err(|e| RenderError::Theme(describe(&e)))?;
        log::debug!(
            "Loaded {} templates from {}",
            tera.get_template_names().count(),
            theme_dir.display()
        );
        Ok(Self { tera })
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, RenderError> {
        let template_err = |e: tera::Error| RenderError::Template {
            template: template.to_string(),
            message: describe(&e),
        };
        let context = tera::Context::from_value(context.clone()).map_err(template_err)?;
        self.tera.render(template, &context).map_err(template_err)
    }
}

/// Tera keeps the useful part of an error (which variable, which line) in
/// the source chain.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// One page written by the render stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub lang: String,
    pub url: String,
    pub template: String,
}

/// What a render run wrote.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub pages: Vec<RenderedPage>,
    pub landing: PathBuf,
    pub blog_index: Option<PathBuf>,
    pub assets: usize,
}

#[derive(Serialize)]
struct PageContext<'a> {
    page: &'a Page,
    subpages: &'a [Page],
    config: &'a SiteConfig,
    site_name: &'a str,
    home: &'a serde_json::Value,
    pages: &'a serde_json::Value,
    lang: &'a str,
    languages: &'a BTreeMap<String, String>,
    supported_languages: &'a [String],
    layout: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct LandingContext<'a> {
    title: &'a str,
    lang: &'a str,
    config: &'a SiteConfig,
    languages: &'a BTreeMap<String, String>,
    supported_languages: &'a [String],
    layout: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct BlogIndexContext<'a> {
    title: &'a str,
    lang: &'a str,
    config: &'a SiteConfig,
    languages: &'a BTreeMap<String, String>,
    supported_languages: &'a [String],
    posts: BTreeMap<&'a str, Vec<&'a Page>>,
}

/// Run the render stage over every output language's mirror.
pub fn render(
    config: &SiteConfig,
    strings: &StringMap,
    renderer: &dyn Renderer,
) -> Result<RenderReport, RenderError> {
    let languages = language_names(&config.language.output);
    let mut report = RenderReport::default();
    let mut trees = BTreeMap::new();

    for lang in &config.language.output {
        let root = tree::build(&config.translations_for(lang), lang, strings, config)?;
        render_language(config, strings, renderer, lang, &root, &languages, &mut report)?;
        trees.insert(lang.as_str(), root);
    }

    let default_layout = layout_content(&config.translations_for(&config.language.default))?;
    report.landing = render_landing(config, renderer, &languages, &default_layout)?;
    report.blog_index = render_blog_index(config, renderer, &languages, &trees)?;
    report.assets = copy_static_assets(config)?;
    Ok(report)
}

fn render_language(
    config: &SiteConfig,
    strings: &StringMap,
    renderer: &dyn Renderer,
    lang: &str,
    root: &Page,
    languages: &BTreeMap<String, String>,
    report: &mut RenderReport,
) -> Result<(), RenderError> {
    let layout = layout_content(&config.translations_for(lang))?;
    let site_name = tree::site_name(config, strings, lang);
    let home = serde_json::to_value(root)?;
    let pages = serde_json::to_value(root.subpages())?;

    for page in root.walk() {
        let template = theme::template_name(&theme::resolve(
            &config.theme_dir,
            &page.template_source(),
        )?);
        let context = serde_json::to_value(PageContext {
            page,
            subpages: page.subpages(),
            config,
            site_name: &site_name,
            home: &home,
            pages: &pages,
            lang,
            languages,
            supported_languages: &config.language.output,
            layout: &layout,
        })?;
        let html = renderer.render(&template, &context)?;
        write_output(&config.output_dir.join(lang).join(page.href()), &html)?;
        log::debug!("{} ← {template}", page.url());
        report.pages.push(RenderedPage {
            lang: lang.to_string(),
            url: page.url().to_string(),
            template,
        });
    }
    log::info!("Rendered {} ({} pages)", lang, root.walk().len());
    Ok(())
}

fn render_landing(
    config: &SiteConfig,
    renderer: &dyn Renderer,
    languages: &BTreeMap<String, String>,
    layout: &BTreeMap<String, String>,
) -> Result<PathBuf, RenderError> {
    require_template(config, LANDING_TEMPLATE)?;
    let context = serde_json::to_value(LandingContext {
        title: config.default_site_name(),
        lang: &config.language.default,
        config,
        languages,
        supported_languages: &config.language.output,
        layout,
    })?;
    let html = renderer.render(LANDING_TEMPLATE, &context)?;
    let dest = config.output_dir.join("index.html");
    write_output(&dest, &html)?;
    Ok(dest)
}

/// The blog listing is optional: themes without `blog_index.j2` get none.
fn render_blog_index(
    config: &SiteConfig,
    renderer: &dyn Renderer,
    languages: &BTreeMap<String, String>,
    trees: &BTreeMap<&str, Page>,
) -> Result<Option<PathBuf>, RenderError> {
    if !config.theme_dir.join(BLOG_INDEX_TEMPLATE).is_file() {
        return Ok(None);
    }
    let posts = trees
        .iter()
        .map(|(lang, root)| (*lang, tree::blog_posts(root)))
        .collect();
    let context = serde_json::to_value(BlogIndexContext {
        title: config.default_site_name(),
        lang: &config.language.default,
        config,
        languages,
        supported_languages: &config.language.output,
        posts,
    })?;
    let html = renderer.render(BLOG_INDEX_TEMPLATE, &context)?;
    let dest = config.output_dir.join(tree::BLOG_DIR).join("index.html");
    write_output(&dest, &html)?;
    Ok(Some(dest))
}

fn require_template(config: &SiteConfig, name: &str) -> Result<(), TemplateNotFound> {
    if config.theme_dir.join(name).is_file() {
        Ok(())
    } else {
        Err(TemplateNotFound {
            content: PathBuf::from(name),
            theme: config.theme_dir.clone(),
        })
    }
}

fn write_output(path: &Path, html: &str) -> Result<(), RenderError> {
    let io_err = |source: std::io::Error| RenderError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, html).map_err(io_err)
}

/// Markdown snippets in `<lang_root>/_layout`, rendered to HTML and keyed by
/// file stem. A missing directory yields an empty map.
pub fn layout_content(lang_root: &Path) -> Result<BTreeMap<String, String>, RenderError> {
    let dir = lang_root.join(LAYOUT_DIR);
    let mut layout = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(layout);
    }
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| RenderError::Io { path, source }
    };
    for entry in fs::read_dir(&dir).map_err(io_err(&dir))? {
        let path = entry.map_err(io_err(&dir))?.path();
        if !path.is_file() || !path.extension().is_some_and(|e| e == CONTENT_EXT) {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let markdown = fs::read_to_string(&path).map_err(io_err(&path))?;
        layout.insert(stem, tree::markdown_to_html(&markdown));
    }
    Ok(layout)
}

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("ar", "العربية"),
    ("de", "Deutsch"),
    ("en", "English"),
    ("es", "Español"),
    ("fr", "Français"),
    ("hi", "हिन्दी"),
    ("it", "Italiano"),
    ("ja", "日本語"),
    ("jp", "日本語"),
    ("ko", "한국어"),
    ("nl", "Nederlands"),
    ("pl", "Polski"),
    ("pt", "Português"),
    ("ru", "Русский"),
    ("sv", "Svenska"),
    ("tr", "Türkçe"),
    ("uk", "Українська"),
    ("zh", "中文"),
];

/// Native display names for `codes`. Unknown codes map to themselves.
pub fn language_names(codes: &[String]) -> BTreeMap<String, String> {
    codes
        .iter()
        .map(|code| {
            let name = LANGUAGE_NAMES
                .iter()
                .find(|(known, _)| known == code)
                .map(|(_, name)| name.to_string())
                .unwrap_or_else(|| code.clone());
            (code.clone(), name)
        })
        .collect()
}

/// Copy `<theme>/assets` and then `<content>/assets` into
/// `<output>/assets`, so content assets override theme assets of the same
/// name. Returns the number of files copied.
pub fn copy_static_assets(config: &SiteConfig) -> Result<usize, RenderError> {
    let dest_root = config.output_dir.join(ASSETS_DIR);
    let mut copied = 0;
    for src_root in [
        config.theme_dir.join(ASSETS_DIR),
        config.content_dir.join(ASSETS_DIR),
    ] {
        if !src_root.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&src_root).sort_by_file_name() {
            let entry = entry.map_err(|source| RenderError::Walk {
                path: src_root.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(&src_root).unwrap_or(entry.path());
            let dest = dest_root.join(rel);
            let io_err = |source: std::io::Error| RenderError::Io {
                path: dest.clone(),
                source,
            };
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
            fs::copy(entry.path(), &dest).map_err(io_err)?;
            copied += 1;
        }
    }
    if copied > 0 {
        log::info!("Copied {copied} static assets");
    }
    Ok(copied)
}

/// Template resolution results for one language.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageCheck {
    pub lang: String,
    /// The tree that was checked: the mirror, or the content root if the
    /// language has not been translated yet.
    pub root: PathBuf,
    pub pages: usize,
    /// Template name → number of pages using it.
    pub templates: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub languages: Vec<LanguageCheck>,
}

/// Build every language's tree and resolve every page's template without
/// rendering anything.
pub fn check(config: &SiteConfig, strings: &StringMap) -> Result<CheckReport, RenderError> {
    require_template(config, LANDING_TEMPLATE)?;
    let mut report = CheckReport::default();
    for lang in &config.language.output {
        let mirror = config.translations_for(lang);
        let root_dir = if mirror.is_dir() {
            mirror
        } else {
            log::warn!("No {lang} mirror yet, checking {}", config.content_dir.display());
            config.content_dir.clone()
        };
        let root = tree::build(&root_dir, lang, strings, config)?;
        let mut templates = BTreeMap::new();
        let pages = root.walk();
        for page in &pages {
            let template = theme::resolve(&config.theme_dir, &page.template_source())?;
            *templates.entry(theme::template_name(&template)).or_insert(0) += 1;
        }
        report.languages.push(LanguageCheck {
            lang: lang.clone(),
            root: root_dir,
            pages: pages.len(),
            templates,
        });
    }
    Ok(report)
}
