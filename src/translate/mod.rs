//! Translation stage: source content → per-language mirror trees.
//!
//! Every markdown file under the content root is written once per working
//! language into `<translations_dir>/<lang>/<same relative path>`. The
//! source language gets a byte-for-byte copy; every other language gets the
//! body as returned by the [`Translator`].
//!
//! ## Incremental runs
//!
//! A file is reprocessed when the [`ChangeTracker`] reports it changed, when
//! `--all` is given, or when an explicit language subset is requested. An
//! unchanged file is still written for any language whose mirror copy has
//! gone missing.
//!
//! A file's checksum is recorded only after every working language
//! succeeded, and only when the working set is the full configured output
//! set. A file whose translation failed, or that was only translated into a
//! subset, therefore stays "changed" and is picked up by the next run.
//!
//! ## Short strings
//!
//! Titles come from file names, which are never translated on disk, so each
//! title is translated on its own and stored in the [`StringMap`]. The site
//! name, the "Blog" label and the label of every content directory are
//! translated up front. Entries already in the map are never requested
//! again.
//!
//! Translation failures never abort the run. They are logged, collected in
//! the [`TranslateReport`], and the file or string is skipped.

pub mod backend;

use crate::config::SiteConfig;
use crate::naming;
use crate::strings::{StringMap, StringMapError};
use crate::tracker::ChangeTracker;
use crate::tree::{ASSETS_DIR, BLOG_DIR, CONTENT_EXT, LAYOUT_DIR};
use backend::{BackendError, Translator};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to walk content directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Strings(#[from] StringMapError),
    #[error("Content directory not found: {0}")]
    MissingContent(PathBuf),
    #[error("Language '{0}' is not one of language.output")]
    UnknownLanguage(String),
}

/// A file or string that could not be translated into one language.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateFailure {
    /// Content path relative to the content root, or the string itself.
    pub subject: String,
    pub lang: String,
    pub message: String,
}

/// What a translation run did.
#[derive(Debug, Default)]
pub struct TranslateReport {
    /// The working set of languages, in configured order.
    pub languages: Vec<String>,
    /// Files copied into the source language's mirror.
    pub copied: Vec<PathBuf>,
    /// `(file, language)` pairs written from a translation.
    pub translated: Vec<(PathBuf, String)>,
    /// Files skipped because nothing needed doing.
    pub unchanged: Vec<PathBuf>,
    /// Entries added to the string map.
    pub strings_learned: usize,
    pub failures: Vec<TranslateFailure>,
}

impl TranslateReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run the translation stage.
///
/// `target_languages` restricts the run to a subset of `language.output`;
/// empty means all of them. `strings` is saved before returning, including
/// when a fatal error cut the run short.
pub fn translate(
    config: &SiteConfig,
    force_all: bool,
    target_languages: &[String],
    translator: &dyn Translator,
    strings: &mut StringMap,
) -> Result<TranslateReport, TranslateError> {
    let languages = working_set(config, target_languages)?;
    if !config.content_dir.is_dir() {
        return Err(TranslateError::MissingContent(config.content_dir.clone()));
    }

    let mut pipeline = Pipeline {
        config,
        translator,
        strings,
        tracker: ChangeTracker::open(&config.hash_file),
        reprocess: force_all || !target_languages.is_empty(),
        record: languages.len() == config.language.output.len(),
        report: TranslateReport {
            languages: languages.clone(),
            ..TranslateReport::default()
        },
    };

    let result = pipeline.run(&languages);
    let saved = pipeline.strings.save();
    result?;
    saved?;
    Ok(pipeline.report)
}

/// The configured output languages, filtered to `requested` when given.
fn working_set(config: &SiteConfig, requested: &[String]) -> Result<Vec<String>, TranslateError> {
    let output = &config.language.output;
    if let Some(unknown) = requested.iter().find(|lang| !output.contains(lang)) {
        return Err(TranslateError::UnknownLanguage(unknown.clone()));
    }
    Ok(output
        .iter()
        .filter(|lang| requested.is_empty() || requested.contains(lang))
        .cloned()
        .collect())
}

struct Pipeline<'a> {
    config: &'a SiteConfig,
    translator: &'a dyn Translator,
    strings: &'a mut StringMap,
    tracker: ChangeTracker,
    /// Process every file regardless of its checksum.
    reprocess: bool,
    /// Record checksums of fully processed files.
    record: bool,
    report: TranslateReport,
}

impl Pipeline<'_> {
    fn run(&mut self, languages: &[String]) -> Result<(), TranslateError> {
        let labels = self.section_labels()?;
        for lang in languages {
            self.learn_site_name(lang);
            for label in &labels {
                self.learn(label, lang, label);
            }
        }

        let walker = WalkDir::new(&self.config.content_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped(e));
        for entry in walker {
            let entry = entry?;
            let is_content = entry.file_type().is_file()
                && entry.path().extension().is_some_and(|e| e == CONTENT_EXT);
            if is_content {
                self.file(entry.path(), languages)?;
            }
        }
        Ok(())
    }

    /// "Blog" plus the canonical title of every content directory. Dated
    /// post directories are left out.
    fn section_labels(&self) -> Result<BTreeSet<String>, TranslateError> {
        let mut labels = BTreeSet::from([naming::canonical_title(BLOG_DIR)]);
        let walker = WalkDir::new(&self.config.content_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !is_skipped(e) && !is_layout_dir(e));
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            if naming::parse_post_date(&entry.file_name().to_string_lossy()).is_none() {
                labels.insert(naming::title_from_path(entry.path()));
            }
        }
        Ok(labels)
    }

    fn file(&mut self, path: &Path, languages: &[String]) -> Result<(), TranslateError> {
        let config = self.config;
        let source = config.language.source.as_str();
        let rel = path
            .strip_prefix(&config.content_dir)
            .unwrap_or(path)
            .to_path_buf();

        let pending: Vec<&String> = if self.reprocess || self.tracker.has_changed(path) {
            languages.iter().collect()
        } else {
            languages
                .iter()
                .filter(|lang| !config.translations_for(lang).join(&rel).is_file())
                .collect()
        };
        if pending.is_empty() {
            log::debug!("Unchanged: {}", rel.display());
            self.report.unchanged.push(rel);
            return Ok(());
        }

        let content = fs::read_to_string(path).map_err(|source| TranslateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let subject = rel.display().to_string();
        let title = (!rel.starts_with(LAYOUT_DIR)).then(|| naming::title_from_path(path));
        let mut complete = pending.len() == languages.len();

        for lang in pending {
            if let Some(title) = &title {
                complete &= self.learn(title, lang, &subject);
            }
            let dest = config.translations_for(lang).join(&rel);
            if lang == source {
                create_parent(&dest)?;
                fs::copy(path, &dest).map_err(|source| TranslateError::Io {
                    path: dest.clone(),
                    source,
                })?;
                log::debug!("Copied {subject} into {lang}");
                self.report.copied.push(rel.clone());
                continue;
            }

            log::info!("Translating {subject} into {lang}");
            match self.translator.translate(&content, source, lang, true) {
                Ok(body) => {
                    create_parent(&dest)?;
                    fs::write(&dest, body).map_err(|source| TranslateError::Io {
                        path: dest.clone(),
                        source,
                    })?;
                    self.report.translated.push((rel.clone(), lang.clone()));
                }
                Err(err) => {
                    self.fail(&subject, lang, &err);
                    complete = false;
                }
            }
        }

        if complete && self.record {
            self.tracker
                .update(path)
                .map_err(|source| TranslateError::Io {
                    path: config.hash_file.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Make sure `string` has a translation into `lang`. Returns false if
    /// the translation service failed.
    fn learn(&mut self, string: &str, lang: &str, subject: &str) -> bool {
        if self.strings.is_translated(string, lang) {
            return true;
        }
        let source = self.config.language.source.as_str();
        let translation = if lang == source {
            string.to_string()
        } else {
            match self.translator.translate(string, source, lang, false) {
                Ok(translation) => translation.trim().to_string(),
                Err(err) => {
                    self.fail(subject, lang, &err);
                    return false;
                }
            }
        };
        self.remember(string, lang, &translation);
        true
    }

    /// An explicit `site_name` entry is recorded as the translation of the
    /// source-language name; otherwise the name is translated.
    fn learn_site_name(&mut self, lang: &str) {
        let config = self.config;
        let source_name = config.site_name_for(&config.language.source);
        match config.site_name.get(lang) {
            Some(name) => self.remember(source_name, lang, name),
            None => {
                self.learn(source_name, lang, "site name");
            }
        }
    }

    fn remember(&mut self, string: &str, lang: &str, translation: &str) {
        if self.strings.add(string, lang, translation) {
            self.report.strings_learned += 1;
        }
    }

    fn fail(&mut self, subject: &str, lang: &str, err: &BackendError) {
        log::warn!("Could not translate {subject} into {lang}: {err}");
        self.report.failures.push(TranslateFailure {
            subject: subject.to_string(),
            lang: lang.to_string(),
            message: err.to_string(),
        });
    }
}

/// Hidden entries and asset directories are never translated.
fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && name == ASSETS_DIR)
}

fn is_layout_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == LAYOUT_DIR
}

fn create_parent(path: &Path) -> Result<(), TranslateError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|source| TranslateError::Io {
            path: parent.to_path_buf(),
            source,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FakeTranslator, read_file, setup_fixtures, test_config};
    use tempfile::TempDir;

    const FIXTURE_FILES: [&str; 4] = [
        "_layout/footer.md",
        "about_us.md",
        "blog/2023-01-01/today_we_begin.md",
        "pages/a-team.md",
    ];

    fn run(
        config: &SiteConfig,
        force_all: bool,
        languages: &[&str],
        translator: &FakeTranslator,
    ) -> TranslateReport {
        let languages: Vec<String> = languages.iter().map(|l| l.to_string()).collect();
        let mut strings = StringMap::load(&config.strings_file()).unwrap();
        translate(config, force_all, &languages, translator, &mut strings).unwrap()
    }

    fn strings(config: &SiteConfig) -> StringMap {
        StringMap::load(&config.strings_file()).unwrap()
    }

    #[test]
    fn mirrors_created_for_every_language() {
        let (_tmp, config) = setup_fixtures();
        let report = run(&config, false, &[], &FakeTranslator::default());

        assert!(report.is_success());
        for lang in ["en", "jp", "de"] {
            for file in FIXTURE_FILES {
                assert!(
                    config.translations_for(lang).join(file).is_file(),
                    "{lang}/{file} missing"
                );
            }
        }
        assert_eq!(report.copied.len(), FIXTURE_FILES.len());
        assert_eq!(report.translated.len(), FIXTURE_FILES.len() * 2);
    }

    #[test]
    fn source_copy_is_byte_identical() {
        let (_tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());
        let original = fs::read(config.content_dir.join("about_us.md")).unwrap();
        let copy = fs::read(config.translations_for("en").join("about_us.md")).unwrap();
        assert_eq!(original, copy);
    }

    #[test]
    fn translated_body_written_to_mirror() {
        let (_tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());
        let original = read_file(&config.content_dir, "about_us.md");
        let jp = read_file(&config.translations_for("jp"), "about_us.md");
        assert_eq!(jp, format!("[jp] {original}"));
    }

    #[test]
    fn source_only_site_makes_no_requests() {
        let (_tmp, mut config) = setup_fixtures();
        config.language.output = vec!["en".to_string()];
        let translator = FakeTranslator::default();
        let report = run(&config, false, &[], &translator);

        assert_eq!(translator.call_count(), 0);
        assert_eq!(report.copied.len(), FIXTURE_FILES.len());
        assert_eq!(strings(&config).lookup("en", "About Us"), "About Us");
    }

    #[test]
    fn bodies_preserve_markup_and_titles_do_not() {
        let (_tmp, config) = setup_fixtures();
        let translator = FakeTranslator::default();
        run(&config, false, &[], &translator);

        for call in translator.calls() {
            assert_eq!(call.source, "en");
            assert_ne!(call.target, "en");
            if call.text == "About Us" {
                assert!(!call.preserve_markup);
            }
        }
        assert_eq!(translator.body_calls(), FIXTURE_FILES.len() * 2);
    }

    #[test]
    fn titles_and_labels_learned() {
        let (_tmp, config) = setup_fixtures();
        let report = run(&config, false, &[], &FakeTranslator::default());
        let strings = strings(&config);

        assert_eq!(strings.lookup("jp", "About Us"), "[jp] About Us");
        assert_eq!(strings.lookup("de", "Today We Begin"), "[de] Today We Begin");
        assert_eq!(strings.lookup("en", "A-Team"), "A-Team");
        assert_eq!(strings.lookup("de", "Blog"), "[de] Blog");
        assert_eq!(strings.lookup("jp", "Pages"), "[jp] Pages");
        assert!(report.strings_learned > 0);
    }

    #[test]
    fn layout_snippets_have_no_title() {
        let (_tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());
        assert!(!strings(&config).is_translated("Footer", "jp"));
    }

    #[test]
    fn dated_directories_are_not_labels() {
        let (_tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());
        assert!(!strings(&config).is_translated("2023-01-01", "jp"));
    }

    #[test]
    fn explicit_site_name_needs_no_request() {
        let (_tmp, config) = setup_fixtures();
        let translator = FakeTranslator::default();
        run(&config, false, &[], &translator);
        let strings = strings(&config);

        assert_eq!(strings.lookup("jp", "Data Ninja"), "データ忍者");
        assert_eq!(strings.lookup("de", "Data Ninja"), "[de] Data Ninja");
        let site_name_calls: Vec<_> = translator
            .calls()
            .into_iter()
            .filter(|c| c.text == "Data Ninja")
            .collect();
        assert_eq!(site_name_calls.len(), 1);
        assert_eq!(site_name_calls[0].target, "de");
    }

    #[test]
    fn unchanged_files_skipped_on_second_run() {
        let (_tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());

        let translator = FakeTranslator::default();
        let report = run(&config, false, &[], &translator);
        assert_eq!(translator.call_count(), 0);
        assert_eq!(report.unchanged.len(), FIXTURE_FILES.len());
        assert!(report.copied.is_empty());
    }

    #[test]
    fn same_site_through_dotted_root_is_unchanged() {
        let (tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());

        let dotted = test_config(&tmp.path().join("."));
        let translator = FakeTranslator::default();
        let report = run(&dotted, false, &[], &translator);
        assert_eq!(translator.body_calls(), 0);
        assert_eq!(report.unchanged.len(), FIXTURE_FILES.len());
    }

    #[test]
    fn modified_file_retranslated() {
        let (_tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());
        fs::write(config.content_dir.join("about_us.md"), "# About\n\nNew text.\n").unwrap();

        let translator = FakeTranslator::default();
        let report = run(&config, false, &[], &translator);
        assert_eq!(translator.body_calls(), 2);
        assert_eq!(report.copied, vec![PathBuf::from("about_us.md")]);
        assert!(read_file(&config.translations_for("de"), "about_us.md").contains("New text."));
    }

    #[test]
    fn force_all_retranslates_everything() {
        let (_tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());

        let translator = FakeTranslator::default();
        run(&config, true, &[], &translator);
        assert_eq!(translator.body_calls(), FIXTURE_FILES.len() * 2);
    }

    #[test]
    fn known_titles_not_requested_again() {
        let (_tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());

        let translator = FakeTranslator::default();
        run(&config, true, &[], &translator);
        assert_eq!(translator.call_count(), translator.body_calls());
    }

    #[test]
    fn failed_translation_retried_next_run() {
        let (_tmp, config) = setup_fixtures();
        let report = run(
            &config,
            false,
            &[],
            &FakeTranslator::failing_on("plan comes together"),
        );

        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| f.subject == "pages/a-team.md"));
        assert!(!config.translations_for("jp").join("pages/a-team.md").exists());
        assert!(config.translations_for("jp").join("about_us.md").exists());

        let translator = FakeTranslator::default();
        let report = run(&config, false, &[], &translator);
        assert!(report.is_success());
        assert_eq!(translator.body_calls(), 2);
        assert!(config.translations_for("jp").join("pages/a-team.md").exists());
    }

    #[test]
    fn failing_language_does_not_block_others() {
        let (_tmp, config) = setup_fixtures();
        let report = run(&config, false, &[], &FakeTranslator::failing_for("de"));

        assert!(!report.is_success());
        assert!(report.failures.iter().all(|f| f.lang == "de"));
        assert!(config.translations_for("jp").join("about_us.md").exists());
        assert!(!config.translations_for("de").join("about_us.md").exists());
        assert!(ChangeTracker::open(&config.hash_file).is_empty());
    }

    #[test]
    fn language_subset_processes_only_those_and_records_nothing() {
        let (_tmp, config) = setup_fixtures();
        let translator = FakeTranslator::default();
        let report = run(&config, false, &["jp"], &translator);

        assert_eq!(report.languages, vec!["jp"]);
        assert!(config.translations_for("jp").join("about_us.md").exists());
        assert!(!config.translations_for("de").join("about_us.md").exists());
        assert!(!config.translations_for("en").join("about_us.md").exists());
        assert!(ChangeTracker::open(&config.hash_file).is_empty());

        let translator = FakeTranslator::default();
        run(&config, false, &[], &translator);
        assert_eq!(translator.body_calls(), FIXTURE_FILES.len() * 2);
    }

    #[test]
    fn missing_mirror_file_rewritten() {
        let (_tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());
        fs::remove_file(config.translations_for("jp").join("about_us.md")).unwrap();

        let translator = FakeTranslator::default();
        let report = run(&config, false, &[], &translator);
        assert_eq!(translator.body_calls(), 1);
        assert_eq!(report.translated, vec![(PathBuf::from("about_us.md"), "jp".to_string())]);
        assert!(config.translations_for("jp").join("about_us.md").exists());
    }

    #[test]
    fn assets_and_hidden_files_not_mirrored() {
        let (_tmp, config) = setup_fixtures();
        fs::write(config.content_dir.join(".draft.md"), "draft").unwrap();
        fs::write(config.content_dir.join("assets").join("notes.md"), "notes").unwrap();
        run(&config, false, &[], &FakeTranslator::default());

        let en = config.translations_for("en");
        assert!(!en.join(".draft.md").exists());
        assert!(!en.join("assets").exists());
    }

    #[test]
    fn strings_saved_after_run() {
        let (_tmp, config) = setup_fixtures();
        run(&config, false, &[], &FakeTranslator::default());
        assert!(config.strings_file().is_file());
        assert!(!strings(&config).is_empty());
    }

    #[test]
    fn unknown_language_rejected() {
        let (_tmp, config) = setup_fixtures();
        let mut strings = StringMap::new(&config.strings_file());
        let result = translate(
            &config,
            false,
            &["fr".to_string()],
            &FakeTranslator::default(),
            &mut strings,
        );
        assert!(matches!(result, Err(TranslateError::UnknownLanguage(lang)) if lang == "fr"));
    }

    #[test]
    fn missing_content_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let mut strings = StringMap::new(&config.strings_file());
        let result = translate(&config, false, &[], &FakeTranslator::default(), &mut strings);
        assert!(matches!(result, Err(TranslateError::MissingContent(_))));
    }

    #[test]
    fn working_set_follows_configured_order() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let requested = vec!["de".to_string(), "jp".to_string(), "de".to_string()];
        assert_eq!(working_set(&config, &requested).unwrap(), vec!["jp", "de"]);
        assert_eq!(working_set(&config, &[]).unwrap(), vec!["en", "jp", "de"]);
    }
}
