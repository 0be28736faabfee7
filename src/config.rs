//! Site configuration module.
//!
//! Handles loading and validating `config.toml`. Every field has a default, so
//! a config file only needs the values it wants to change. Unknown keys are
//! rejected to catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! index_page = "home"              # Stem that gives a directory its own content
//! content_dir = "content"          # Source markdown
//! output_dir = "output"            # Rendered site
//! theme_dir = "themes/default"     # *.j2 templates
//! translations_dir = "_translations"
//! hash_file = ".hash"              # Change record for incremental translation
//!
//! [site_name]
//! en = "Data Ninja"
//! jp = "データ忍者"
//!
//! [language]
//! default = "en"                   # Language of the landing page
//! source = "en"                    # Language the content is written in
//! output = ["en", "jp"]            # Languages to publish
//!
//! [translator]
//! endpoint = "https://api.openai.com/v1/chat/completions"
//! model = "gpt-3.5-turbo"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_secs = 60
//! max_retries = 3
//! ```
//!
//! ## Paths
//!
//! Relative directory paths are resolved against the directory that holds
//! `config.toml`, so the tool behaves the same regardless of the working
//! directory it is launched from.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up by the CLI.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Display name of the site, per language code.
    pub site_name: BTreeMap<String, String>,
    /// Source, default and published languages.
    pub language: LanguageConfig,
    /// File stem that, when present in a directory, supplies that
    /// directory's own listing content.
    pub index_page: String,
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub theme_dir: PathBuf,
    pub translations_dir: PathBuf,
    /// Persisted change record used to skip unchanged files.
    pub hash_file: PathBuf,
    /// External translation service settings.
    pub translator: TranslatorConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: BTreeMap::from([("en".to_string(), "My Site".to_string())]),
            language: LanguageConfig::default(),
            index_page: "home".to_string(),
            content_dir: PathBuf::from("content"),
            output_dir: PathBuf::from("output"),
            theme_dir: PathBuf::from("themes/default"),
            translations_dir: PathBuf::from("_translations"),
            hash_file: PathBuf::from(".hash"),
            translator: TranslatorConfig::default(),
        }
    }
}

/// Language settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguageConfig {
    /// Language used for the top-level landing page and as the site-name fallback.
    pub default: String,
    /// Language the content directory is written in.
    pub source: String,
    /// Every language the site is published in, source included.
    pub output: Vec<String>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            default: "en".to_string(),
            source: "en".to_string(),
            output: vec!["en".to_string()],
        }
    }
}

/// Settings for the chat-completions translation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslatorConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

impl SiteConfig {
    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lang = &self.language;
        if lang.output.is_empty() {
            return Err(ConfigError::Validation(
                "language.output must not be empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        for code in &lang.output {
            if !seen.insert(code.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "language.output lists '{code}' more than once"
                )));
            }
        }
        if !lang.output.contains(&lang.default) {
            return Err(ConfigError::Validation(format!(
                "language.default '{}' must be one of language.output",
                lang.default
            )));
        }
        if !lang.output.contains(&lang.source) {
            return Err(ConfigError::Validation(format!(
                "language.source '{}' must be one of language.output",
                lang.source
            )));
        }
        if !self.site_name.contains_key(&lang.default) {
            return Err(ConfigError::Validation(format!(
                "site_name must have an entry for the default language '{}'",
                lang.default
            )));
        }
        if self.index_page.trim().is_empty() {
            return Err(ConfigError::Validation(
                "index_page must not be empty".into(),
            ));
        }
        if self.translator.max_retries > 10 {
            return Err(ConfigError::Validation(
                "translator.max_retries must be 0-10".into(),
            ));
        }
        Ok(())
    }

    /// Site name in the default language.
    pub fn default_site_name(&self) -> &str {
        self.site_name
            .get(&self.language.default)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Site name for `lang`, falling back to the default language.
    pub fn site_name_for(&self, lang: &str) -> &str {
        self.site_name
            .get(lang)
            .map(String::as_str)
            .unwrap_or_else(|| self.default_site_name())
    }

    /// The mirror directory holding `lang`'s translated content.
    pub fn translations_for(&self, lang: &str) -> PathBuf {
        self.translations_dir.join(lang)
    }

    /// Path of the persisted string map.
    pub fn strings_file(&self) -> PathBuf {
        self.translations_dir.join("strings.json")
    }

    /// Make every relative directory absolute with respect to `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        for path in [
            &mut self.content_dir,
            &mut self.output_dir,
            &mut self.theme_dir,
            &mut self.translations_dir,
            &mut self.hash_file,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, resolving relative directories against
/// its parent directory.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.resolve_paths(base))
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `init` and `gen-config` CLI commands.
pub fn stock_config_toml() -> &'static str {
    r##"# Polyglot Configuration
# ======================
# All settings are optional. Values shown below are the defaults.
# Relative paths are resolved against the directory holding this file.
# Unknown keys will cause an error.

# A markdown file with this stem supplies its directory's own content
# (content/pages/home.md becomes pages/index.html).
index_page = "home"

content_dir = "content"
output_dir = "output"
theme_dir = "themes/default"
translations_dir = "_translations"

# Change record: files whose checksum is unchanged are not re-translated.
hash_file = ".hash"

# ---------------------------------------------------------------------------
# Site name, per language. Languages without an entry are translated from
# the source-language name, or fall back to the default language's name.
# ---------------------------------------------------------------------------
[site_name]
en = "My Site"

# ---------------------------------------------------------------------------
# Languages
# ---------------------------------------------------------------------------
[language]
# Language of the landing page.
default = "en"
# Language the content directory is written in.
source = "en"
# Every published language, source included.
output = ["en"]

# ---------------------------------------------------------------------------
# Translation service (OpenAI-compatible chat completions)
# ---------------------------------------------------------------------------
[translator]
endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-3.5-turbo"
# Environment variable holding the API key.
api_key_env = "OPENAI_API_KEY"
# Per-request timeout in seconds.
timeout_secs = 60
# Retries after the first attempt, for timeouts, rate limits and 5xx replies.
max_retries = 3
"##
}
