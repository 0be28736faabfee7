//! Shared test utilities for the polyglot test suite.
//!
//! Provides fixture setup, a deterministic stand-in for the translation
//! service and a renderer that records what it was asked to render.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (tmp, config) = setup_fixtures();
//! let translator = FakeTranslator::default();
//! let mut strings = StringMap::new(&config.strings_file());
//! let report = translate(&config, false, &[], &translator, &mut strings).unwrap();
//! assert!(report.is_success());
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

use crate::config::{LanguageConfig, SiteConfig};
use crate::render::{RenderError, Renderer};
use crate::translate::backend::{BackendError, Translator};

// =========================================================================
// Fixture setup
// =========================================================================

/// Config for a Data Ninja site published in en, jp and de, with every
/// directory under `base`.
pub fn test_config(base: &Path) -> SiteConfig {
    SiteConfig {
        site_name: BTreeMap::from([
            ("en".to_string(), "Data Ninja".to_string()),
            ("jp".to_string(), "データ忍者".to_string()),
        ]),
        language: LanguageConfig {
            default: "en".to_string(),
            source: "en".to_string(),
            output: vec!["en".to_string(), "jp".to_string(), "de".to_string()],
        },
        content_dir: "content".into(),
        output_dir: "output".into(),
        theme_dir: "theme".into(),
        ..SiteConfig::default()
    }
    .resolve_paths(base)
}

/// Copy `fixtures/content/` and `fixtures/theme/` to a temp directory and
/// return it with a [`test_config`] rooted there.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> (TempDir, SiteConfig) {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    copy_dir_recursive(&fixtures.join("content"), &tmp.path().join("content")).unwrap();
    copy_dir_recursive(&fixtures.join("theme"), &tmp.path().join("theme")).unwrap();
    let config = test_config(tmp.path());
    (tmp, config)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Read `root/rel` as text. Panics with the path on failure.
pub fn read_file(root: &Path, rel: &str) -> String {
    let path = root.join(rel);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

// =========================================================================
// Translation service stand-in
// =========================================================================

/// One call made to a [`FakeTranslator`].
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateCall {
    pub text: String,
    pub source: String,
    pub target: String,
    pub preserve_markup: bool,
}

/// Translates by prefixing `[target] `. Fails for any text containing one
/// of the configured needles or any target in the failing set.
#[derive(Debug, Default)]
pub struct FakeTranslator {
    calls: RefCell<Vec<TranslateCall>>,
    failing_texts: Vec<String>,
    failing_targets: Vec<String>,
}

impl FakeTranslator {
    /// Fail every request whose text contains `needle`.
    pub fn failing_on(needle: &str) -> Self {
        Self {
            failing_texts: vec![needle.to_string()],
            ..Self::default()
        }
    }

    /// Fail every request into `lang`.
    pub fn failing_for(lang: &str) -> Self {
        Self {
            failing_targets: vec![lang.to_string()],
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<TranslateCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Number of body (markup-preserving) requests made.
    pub fn body_calls(&self) -> usize {
        self.calls.borrow().iter().filter(|c| c.preserve_markup).count()
    }
}

impl Translator for FakeTranslator {
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
        preserve_markup: bool,
    ) -> Result<String, BackendError> {
        self.calls.borrow_mut().push(TranslateCall {
            text: text.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            preserve_markup,
        });
        let fails = self.failing_targets.iter().any(|t| t == target)
            || self.failing_texts.iter().any(|needle| text.contains(needle.as_str()));
        if fails {
            return Err(BackendError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(format!("[{target}] {text}"))
    }
}

// =========================================================================
// Renderer stand-in
// =========================================================================

/// Records every render call and returns `template|title` as the output.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    rendered: RefCell<Vec<(String, serde_json::Value)>>,
}

impl RecordingRenderer {
    /// Template names in call order.
    pub fn templates(&self) -> Vec<String> {
        self.rendered.borrow().iter().map(|(t, _)| t.clone()).collect()
    }

    /// The context of the first render whose page has the given url.
    pub fn context_for(&self, url: &str) -> serde_json::Value {
        self.rendered
            .borrow()
            .iter()
            .find(|(_, ctx)| ctx["page"]["url"] == url)
            .map(|(_, ctx)| ctx.clone())
            .unwrap_or_else(|| panic!("no page rendered at {url}"))
    }

    /// The context passed with `template`.
    pub fn context_of(&self, template: &str) -> serde_json::Value {
        self.rendered
            .borrow()
            .iter()
            .find(|(t, _)| t == template)
            .map(|(_, ctx)| ctx.clone())
            .unwrap_or_else(|| panic!("template {template} never rendered"))
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, RenderError> {
        self.rendered
            .borrow_mut()
            .push((template.to_string(), context.clone()));
        let title = context["page"]["title"]
            .as_str()
            .or_else(|| context["title"].as_str())
            .unwrap_or_default();
        Ok(format!("{template}|{title}"))
    }
}
