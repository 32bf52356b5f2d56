use anyhow::Context;
use scrivener::cli::output::Output;
use scrivener::cli::{Cli, Commands};
use scrivener::export;
use scrivener::llm::{LLMClient, LLMClientFactory};
use scrivener::research::{ResearchCoordinator, ResearchOutcome, RunFailure, RunInput};
use scrivener::tools::WebSearchProvider;
use scrivener::utils::config::Config;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EXIT_RUN_FAILED: u8 = 1;
const EXIT_STARTUP_FAILED: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose, cli.log_json);

    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let result = match cli.command {
        Commands::Research {
            topic,
            document,
            output: directory,
            no_trace,
        } => {
            research(
                &cli.config,
                topic,
                document,
                directory,
                no_trace,
                &output,
            )
            .await
        }
        Commands::Config => show_config(&cli.config, &output),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            output.error(&format!("{:#}", e));
            ExitCode::from(EXIT_STARTUP_FAILED)
        }
    }
}

/// Logs go to stderr so they never interleave with the live trace on stdout.
fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "scrivener=debug,info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

async fn research(
    config_path: &Path,
    topic: String,
    document: Option<PathBuf>,
    directory: Option<PathBuf>,
    no_trace: bool,
    output: &Output,
) -> anyhow::Result<ExitCode> {
    let config = Config::load(Some(config_path)).context("Failed to load configuration")?;

    let factory = LLMClientFactory::new(config.llm.provider()?);
    let llm: Arc<dyn LLMClient> = Arc::from(
        factory
            .create_default()
            .await
            .context("Failed to create LLM client")?,
    );
    let search = Arc::new(WebSearchProvider::new(config.research.results_per_query));
    let coordinator = ResearchCoordinator::new(llm, search, config.research.clone());

    output.banner();
    output.kv("Topic", &topic);
    output.kv(
        "Model",
        &format!("{} ({})", factory.default_provider().model(), factory.default_provider().name()),
    );
    if let Some(path) = &document {
        output.kv("Reference", &path.display().to_string());
    }
    output.header("Progress");

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let colored = output.colored;
    let printer = tokio::spawn(async move {
        let output = if colored {
            Output::new()
        } else {
            Output::no_color()
        };
        while let Some(entry) = progress_rx.recv().await {
            output.trace_entry(&entry);
        }
    });

    let mut input = RunInput::new(topic)
        .with_cancel(cancel)
        .with_progress(progress_tx);
    if let Some(path) = document {
        input = input.with_document_path(path);
    }

    let result = coordinator.run(input).await;
    ctrl_c.abort();
    printer.await.ok();

    let directory = directory.unwrap_or_else(|| PathBuf::from(&config.output.directory));
    let write_trace = config.output.write_trace && !no_trace;

    match result {
        Ok(outcome) => {
            let paths = export::write_outcome(&directory, &outcome, write_trace)
                .await
                .context("Failed to write report")?;
            print_summary(output, &outcome);
            if let Some(path) = paths.report {
                output.success(&format!("Report written to {}", path.display()));
            }
            if let Some(path) = paths.trace {
                output.info(&format!("Trace written to {}", path.display()));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            report_failure(output, &failure);
            let paths = export::write_failure(&directory, &failure, write_trace)
                .await
                .context("Failed to write partial artifacts")?;
            if let Some(path) = paths.report {
                output.info(&format!("Partial results written to {}", path.display()));
            }
            if let Some(path) = paths.trace {
                output.info(&format!("Trace written to {}", path.display()));
            }

            let code = if failure.is_cancelled() {
                EXIT_CANCELLED
            } else {
                EXIT_RUN_FAILED
            };
            Ok(ExitCode::from(code))
        }
    }
}

fn print_summary(output: &Output, outcome: &ResearchOutcome) {
    output.header("Report");
    output.kv("Title", &outcome.report.title);
    output.kv("Sections", &outcome.report.sections.len().to_string());
    output.kv("Words", &outcome.report.word_count().to_string());
    output.kv("Facts", &outcome.facts.len().to_string());
    output.kv("Sources", &outcome.report.sources.len().to_string());
    if let Some(comparison) = &outcome.comparison {
        output.kv("Comparison score", &format!("{:.0}/100", comparison.score));
    }

    let warnings: Vec<_> = outcome.warnings().collect();
    if !warnings.is_empty() {
        output.header(&format!("Warnings ({})", warnings.len()));
        for warning in warnings {
            output.list_item(&format!("[{}] {}", warning.stage, warning.message));
        }
    }
    output.newline();
}

fn report_failure(output: &Output, failure: &RunFailure) {
    if failure.is_cancelled() {
        output.warning(&format!("Run cancelled during {}", failure.stage));
    } else {
        output.error(&format!("Run failed during {}: {}", failure.stage, failure.error));
    }
    if !failure.partial.facts.is_empty() {
        output.info(&format!(
            "{} facts were collected before the run stopped",
            failure.partial.facts.len()
        ));
    }
}

fn show_config(path: &Path, output: &Output) -> anyhow::Result<ExitCode> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        Config::from_toml_str(&content)?
    } else {
        output.info(&format!("{} not found, showing defaults", path.display()));
        Config::from_toml_str("")?
    };

    dotenvy::dotenv().ok();
    let credential = if std::env::var(&config.llm.api_key_env).is_ok() {
        "set"
    } else {
        "missing"
    };

    output.header("Configuration");
    println!("{}", toml::to_string_pretty(&config)?);
    output.kv(&config.llm.api_key_env, credential);
    output.hint("Every key is optional; edit scrivener.toml to override the defaults above.");
    Ok(ExitCode::SUCCESS)
}
