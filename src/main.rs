//! build-attest CLI
//!
//! Entry point for the `build-attest` command-line tool.

use clap::{Args, Parser, Subcommand};
use build_attest::config::{parse_bool, DEFAULT_CONFIG_FILE};
use build_attest::pipeline::check_artifact_dir;
use build_attest::{
    logging, verify_fingerprints, AttestConfig, ConfigError, EffectiveConfig, EnvSnapshot,
    ExitCode, Pipeline, PipelineError,
};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "build-attest")]
#[command(about = "Record provenance, health and integrity sidecars for a static build", version)]
struct Cli {
    /// Debug-level logging on stderr (overridden by BUILD_ATTEST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all attestation stages over a build directory
    Run {
        /// Build output directory
        artifact_dir: PathBuf,

        #[command(flatten)]
        overrides: Overrides,

        /// Print the run summary as JSON instead of progress lines
        #[arg(long)]
        json: bool,
    },

    /// Re-hash the entry file and compare against its digest sidecars
    Verify {
        /// Build output directory
        artifact_dir: PathBuf,

        #[command(flatten)]
        overrides: Overrides,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration and where it came from
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(Args, Default)]
struct Overrides {
    /// Path to config file (default: ./attest.toml when present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Semantic version to record
    #[arg(long = "version-string")]
    version_string: Option<String>,

    /// Environment name to record
    #[arg(long)]
    environment: Option<String>,

    /// Source revision to record
    #[arg(long)]
    revision: Option<String>,

    /// Backend-selection flag (true/false)
    #[arg(long = "remote-backend")]
    remote_backend: Option<String>,

    /// Entry file to fingerprint, relative to the build directory
    #[arg(long)]
    entry: Option<String>,
}

impl Overrides {
    /// CLI layer as a config overlay (None when no flag was given), plus
    /// any flag value that could not be interpreted
    fn to_value(&self) -> (Option<serde_json::Value>, Vec<ConfigError>) {
        let mut issues = Vec::new();
        let mut provenance = serde_json::Map::new();
        if let Some(ref v) = self.version_string {
            provenance.insert("version".to_string(), v.clone().into());
        }
        if let Some(ref v) = self.environment {
            provenance.insert("environment".to_string(), v.clone().into());
        }
        if let Some(ref v) = self.revision {
            provenance.insert("source_revision".to_string(), v.clone().into());
        }
        if let Some(ref v) = self.remote_backend {
            match parse_bool("--remote-backend", v) {
                Ok(flag) => {
                    provenance.insert("remote_backend".to_string(), flag.into());
                }
                Err(e) => issues.push(e),
            }
        }

        let mut overlay = serde_json::Map::new();
        if !provenance.is_empty() {
            overlay.insert("provenance".to_string(), provenance.into());
        }
        if let Some(ref entry) = self.entry {
            overlay.insert("fingerprint".to_string(), serde_json::json!({ "entry": entry }));
        }

        ((!overlay.is_empty()).then(|| overlay.into()), issues)
    }

    fn config_file(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        })
    }

    fn load(&self) -> EffectiveConfig {
        let env = EnvSnapshot::capture();
        let (cli, cli_issues) = self.to_value();
        let mut effective = EffectiveConfig::build(self.config_file().as_deref(), &env, cli);
        for issue in cli_issues {
            effective.add_issue(issue);
        }
        effective
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Run {
            artifact_dir,
            overrides,
            json,
        } => run_attest(&artifact_dir, &overrides, json),
        Commands::Verify {
            artifact_dir,
            overrides,
            json,
        } => run_verify(&artifact_dir, &overrides, json),
        Commands::Config { overrides } => run_config(&overrides),
    }
}

fn exit_with(err: PipelineError) -> ! {
    eprintln!("✗ {}", err);
    process::exit(err.exit_code().as_i32());
}

/// Directory precondition first, then configuration.
///
/// Unusable configuration values fall back to their defaults; the stages
/// always run once the directory exists.
fn prepare(artifact_dir: &Path, overrides: &Overrides) -> AttestConfig {
    if let Err(e) = check_artifact_dir(artifact_dir) {
        exit_with(e);
    }
    let (config, _issues) = overrides.load().resolve_lenient();
    config
}

fn run_attest(artifact_dir: &Path, overrides: &Overrides, json_output: bool) {
    let config = prepare(artifact_dir, overrides);
    let pipeline = Pipeline::new(artifact_dir, config);

    if !json_output {
        println!("Attesting build in {}", artifact_dir.display());
    }

    let result = pipeline.run_with(|report| {
        if !json_output {
            println!("  {}", report.to_line());
        }
    });

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => exit_with(e),
    };

    if json_output {
        match summary.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing summary: {}", e),
        }
    } else {
        println!("{}", summary.human_summary);
    }

    process::exit(summary.exit_code().as_i32());
}

fn run_verify(artifact_dir: &Path, overrides: &Overrides, json_output: bool) {
    let config = prepare(artifact_dir, overrides);

    let result = match verify_fingerprints(artifact_dir, &config.fingerprint.entry) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(ExitCode::VerificationFailed.as_i32());
        }
    };

    if json_output {
        let output = serde_json::json!({
            "entry": config.fingerprint.entry,
            "passed": result.passed(),
            "summary": result.summary(),
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
    } else {
        let marker = if result.passed() { "✓" } else { "✗" };
        println!("{} {}", marker, result.summary());
    }

    let code = if result.passed() {
        ExitCode::Success
    } else {
        ExitCode::VerificationFailed
    };
    process::exit(code.as_i32());
}

/// Print the effective configuration; any configuration problem exits with
/// `ExitCode::Config` after printing
fn run_config(overrides: &Overrides) {
    let effective = overrides.load();

    match effective.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            process::exit(ExitCode::Config.as_i32());
        }
    }

    if let Err(e) = effective.resolve() {
        exit_with(PipelineError::Config(e));
    }
}
