//! modelgate CLI
//!
//! Two build-pipeline stages, run as separate invocations:
//!
//! - `identify`: list the files changed in the build and save them as commit
//!   items in the artifacts directory
//! - `filter`: reduce the saved commit items to the model scripts that are
//!   materialized as persistent tables, and save that list for deployment
//!
//! Every path comes from a flag or the CI environment variable named next to
//! it; nothing below the CLI reads the environment.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use modelgate_core::{
    filter_deployable_models, identify_commit_items, BuildRef, DeployError,
    MaterializationDetection, MissingModelPolicy, PathMatching, PipelineConfig, RecordFormat,
    SelectionRules,
};
use modelgate_source::GitChangeSource;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "modelgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve a build's changes into deployable persistent-table models", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the files changed in a build and save them as commit items
    Identify {
        #[command(flatten)]
        location: Location,

        /// Build identifier
        #[arg(long, env = "BUILD_BUILDID")]
        build_id: String,

        /// Build number, for logging
        #[arg(long, env = "BUILD_BUILDNUMBER")]
        build_number: Option<String>,

        /// Revision before the build's first commit (default: only list HEAD)
        #[arg(long)]
        base: Option<String>,

        /// Last revision of the build
        #[arg(long, default_value = "HEAD")]
        head: String,

        /// Encoding of the commit item record
        #[arg(long, value_enum, default_value_t = FormatArg::Jsonl)]
        format: FormatArg,
    },

    /// Filter saved commit items down to deployable model scripts
    Filter {
        #[command(flatten)]
        location: Location,

        /// Directory marker that identifies model scripts
        #[arg(long, default_value = modelgate_core::rules::DEFAULT_MODELS_DIR)]
        models_dir: String,

        /// Script file extension
        #[arg(long, default_value = modelgate_core::rules::DEFAULT_SCRIPT_EXTENSION)]
        extension: String,

        /// Materialization marker that makes a model deployable
        #[arg(long, default_value = modelgate_core::rules::DEFAULT_MARKER)]
        marker: String,

        /// How the extension and models directory are matched
        #[arg(long, value_enum, default_value_t = PathMatchingArg::Substring)]
        path_matching: PathMatchingArg,

        /// How the marker is detected in model content
        #[arg(long, value_enum, default_value_t = DetectionArg::Substring)]
        detection: DetectionArg,

        /// Warn and continue when a committed model is missing from the checkout
        #[arg(long)]
        skip_missing: bool,
    },
}

#[derive(Args)]
struct Location {
    /// Directory holding ListOfCommitItems.txt and DeployableModels.txt
    #[arg(long, env = "SYSTEM_ARTIFACTSDIRECTORY")]
    artifacts_dir: PathBuf,

    /// Repository checkout
    #[arg(long, env = "BUILD_SOURCESDIRECTORY", default_value = ".")]
    repo: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Jsonl,
    Legacy,
}

impl From<FormatArg> for RecordFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jsonl => RecordFormat::JsonLines,
            FormatArg::Legacy => RecordFormat::Legacy,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PathMatchingArg {
    Substring,
    Segment,
}

impl From<PathMatchingArg> for PathMatching {
    fn from(arg: PathMatchingArg) -> Self {
        match arg {
            PathMatchingArg::Substring => PathMatching::Substring,
            PathMatchingArg::Segment => PathMatching::Segment,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DetectionArg {
    Substring,
    ConfigBlock,
}

impl From<DetectionArg> for MaterializationDetection {
    fn from(arg: DetectionArg) -> Self {
        match arg {
            DetectionArg::Substring => MaterializationDetection::Substring,
            DetectionArg::ConfigBlock => MaterializationDetection::ConfigBlock,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    modelgate_core::init_tracing(cli.json, level);

    match run(cli.command).await {
        Ok(()) => {
            info!("Finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let kind = err
                .downcast_ref::<DeployError>()
                .map(DeployError::kind)
                .unwrap_or("unexpected");
            error!(kind, "{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Identify {
            location,
            build_id,
            build_number,
            base,
            head,
            format,
        } => {
            let mut build = BuildRef::new(build_id);
            if let Some(number) = build_number {
                build = build.with_number(number);
            }
            let config = PipelineConfig::new(location.artifacts_dir, &location.repo)
                .with_record_format(format.into());

            let mut source = GitChangeSource::new(location.repo).with_head(head);
            if let Some(base) = base {
                source = source.with_base(base);
            }

            cmd_identify(&source, &build, &config).await
        }
        Commands::Filter {
            location,
            models_dir,
            extension,
            marker,
            path_matching,
            detection,
            skip_missing,
        } => {
            let rules = SelectionRules {
                script_extension: extension,
                models_dir,
                marker,
                path_matching: path_matching.into(),
                detection: detection.into(),
                missing: if skip_missing {
                    MissingModelPolicy::Skip
                } else {
                    MissingModelPolicy::Fail
                },
            };
            let config =
                PipelineConfig::new(location.artifacts_dir, location.repo).with_rules(rules);

            cmd_filter(&config)
        }
    }
}

/// Record the build's commit items
async fn cmd_identify(
    source: &GitChangeSource,
    build: &BuildRef,
    config: &PipelineConfig,
) -> Result<()> {
    let report = identify_commit_items(source, build, config)
        .await
        .with_context(|| format!("Failed to identify commit items for build {build}"))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Write the deployable model list
fn cmd_filter(config: &PipelineConfig) -> Result<()> {
    info!(config = %serde_json::to_string(config)?, "Filtering deployable models");

    let report = filter_deployable_models(config).context("Failed to filter deployable models")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn filter_flags_map_onto_rules() {
        let cli = Cli::try_parse_from([
            "modelgate",
            "filter",
            "--artifacts-dir",
            "/tmp/a",
            "--repo",
            "/tmp/r",
            "--path-matching",
            "segment",
            "--detection",
            "config-block",
            "--skip-missing",
        ])
        .unwrap();

        match cli.command {
            Commands::Filter {
                location,
                marker,
                path_matching,
                detection,
                skip_missing,
                ..
            } => {
                assert_eq!(location.artifacts_dir, PathBuf::from("/tmp/a"));
                assert_eq!(location.repo, PathBuf::from("/tmp/r"));
                assert_eq!(marker, "persistent_table");
                assert_eq!(PathMatching::from(path_matching), PathMatching::Segment);
                assert_eq!(
                    MaterializationDetection::from(detection),
                    MaterializationDetection::ConfigBlock
                );
                assert!(skip_missing);
            }
            _ => panic!("expected filter command"),
        }
    }

    #[test]
    fn identify_accepts_legacy_format() {
        let cli = Cli::try_parse_from([
            "modelgate",
            "identify",
            "--artifacts-dir",
            "/tmp/a",
            "--build-id",
            "77",
            "--base",
            "origin/main",
            "--format",
            "legacy",
        ])
        .unwrap();

        match cli.command {
            Commands::Identify {
                build_id,
                base,
                head,
                format,
                ..
            } => {
                assert_eq!(build_id, "77");
                assert_eq!(base.as_deref(), Some("origin/main"));
                assert_eq!(head, "HEAD");
                assert_eq!(RecordFormat::from(format), RecordFormat::Legacy);
            }
            _ => panic!("expected identify command"),
        }
    }

    #[test]
    fn filter_command_reports_missing_record_kind() {
        let artifacts = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new(artifacts.path(), artifacts.path());

        let err = cmd_filter(&config).unwrap_err();
        let kind = err.downcast_ref::<DeployError>().map(DeployError::kind);
        assert_eq!(kind, Some("not_found"));
    }
}
