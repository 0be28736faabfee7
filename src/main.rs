use clap::{Parser, Subcommand};
use polyglot_ssg::render::{self, TeraRenderer};
use polyglot_ssg::strings::StringMap;
use polyglot_ssg::translate::{self, TranslateReport, backend::ChatTranslator};
use polyglot_ssg::{config, output};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Shared flags for commands that translate.
#[derive(clap::Args, Clone)]
struct TranslateArgs {
    /// Translate every file, even ones unchanged since the last run
    #[arg(short, long)]
    all: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("POLYGLOT_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("POLYGLOT_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "polyglot")]
#[command(about = "Static site generator that translates your site into every language")]
#[command(long_about = "\
Static site generator that translates your site into every language

Write markdown in one language. Polyglot translates it through a
chat-completions API into a mirror per language, then renders every
language through your .j2 templates.

Content structure:

  content/
  ├── about_us.md                  # Page → /<lang>/about_us.html
  ├── pages/
  │   ├── home.md                  # Index page → /<lang>/pages/index.html
  │   └── a-team.md                # Page → /<lang>/pages/a-team.html
  ├── blog/
  │   └── 2023-01-01/              # Post date
  │       └── today_we_begin.md    # Post → /<lang>/blog/2023-01-01/today_we_begin/index.html
  ├── _layout/
  │   └── footer.md                # Snippet, available to templates as layout.footer
  └── assets/                      # Copied verbatim to output/assets/

Titles come from file names: today_we_begin.md is \"Today We Begin\".

The API key is read from the environment variable named in config.toml
(OPENAI_API_KEY by default). Set RUST_LOG=debug for detailed logs.

Run 'polyglot gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site config file; relative paths in it resolve against its directory
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a stock config.toml
    Init,
    /// Translate changed content into every output language
    Translate {
        #[command(flatten)]
        args: TranslateArgs,
        /// Only translate into this language (repeatable); implies --all
        #[arg(short, long = "lang", value_name = "CODE")]
        lang: Vec<String>,
    },
    /// Render the translated content into the output directory
    Render,
    /// Run the full pipeline: translate → render
    Build(TranslateArgs),
    /// Resolve every page's template without rendering
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Init => {
            if cli.config.exists() {
                return Err(format!("{} already exists", cli.config.display()).into());
            }
            std::fs::write(&cli.config, config::stock_config_toml())?;
            println!("Wrote {}", cli.config.display());
        }
        Command::Translate { args, lang } => {
            let site = config::load_config(&cli.config)?;
            let report = run_translate(&site, args.all, &lang)?;
            if !report.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Render => {
            let site = config::load_config(&cli.config)?;
            run_render(&site)?;
        }
        Command::Build(args) => {
            let site = config::load_config(&cli.config)?;

            println!("==> Stage 1: Translating {}", site.content_dir.display());
            let report = run_translate(&site, args.all, &[])?;

            println!("==> Stage 2: Rendering → {}", site.output_dir.display());
            run_render(&site)?;

            println!("==> Build complete: {}", site.output_dir.display());
            if !report.is_success() {
                log::warn!(
                    "{} translations failed; rerun to retry them",
                    report.failures.len()
                );
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Check => {
            let site = config::load_config(&cli.config)?;
            let strings = StringMap::load(&site.strings_file())?;
            println!("==> Checking {}", site.theme_dir.display());
            let report = render::check(&site, &strings)?;
            output::print_check_output(&report, site_root(&cli.config));
            println!("==> Theme is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_translate(
    site: &config::SiteConfig,
    all: bool,
    languages: &[String],
) -> Result<TranslateReport, Box<dyn std::error::Error>> {
    let translator = ChatTranslator::from_config(&site.translator)?;
    let mut strings = StringMap::load(&site.strings_file())?;
    let report = translate::translate(site, all, languages, &translator, &mut strings)?;
    output::print_translate_output(&report);
    Ok(report)
}

fn run_render(site: &config::SiteConfig) -> Result<(), Box<dyn std::error::Error>> {
    let strings = StringMap::load(&site.strings_file())?;
    let renderer = TeraRenderer::load(&site.theme_dir)?;
    let report = render::render(site, &strings, &renderer)?;
    output::print_render_output(&report, &site.output_dir);
    Ok(())
}

/// Directory holding the config file, against which site paths resolve.
fn site_root(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new(""))
}
