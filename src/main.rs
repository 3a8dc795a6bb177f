//! # Email Verifier CLI
//!
//! Command-line interface for the Email Verifier library (`email_verifier_core`).
//! This binary parses arguments, sets up configuration, and runs one of the
//! verify, batch, retry or history commands. Failures are printed as the JSON
//! error envelope before the process exits non-zero.

use email_verifier_core::{
    initialize_orchestrator, initialize_verifier, verify_single_email, AddressVerifier, AppError,
    BatchCheckpoint, BatchInput, BatchJob, BatchSummary, CancelFlag, Config, ConfigBuilder,
    EmailVerifier, FsHistoryStore, HistoryStore, VerificationResult, DEFAULT_KIND,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::future::BoxFuture;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Validates and verifies email addresses.",
    long_about = "Email Verifier checks syntax, disposable domains, role accounts, typos and MX records, then confirms deliverability with a remote provider. Batches of discovered contacts are verified sequentially with checkpoints."
)]
struct AppArgs {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Path to a configuration file (TOML format) to load settings from. CLI args override file settings.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_CONFIG")]
    config_file: Option<String>,

    /// DNS resolution timeout in seconds.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_DNS_TIMEOUT")]
    dns_timeout: Option<u64>,

    /// Comma-separated list of DNS servers to use for lookups.
    #[arg(long, global = true, value_delimiter = ',', env = "EMAIL_VERIFIER_DNS_SERVERS")]
    dns_servers: Option<Vec<String>>,

    /// HTTP request timeout in seconds.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// User agent string for provider and discovery requests.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_USER_AGENT")]
    user_agent: Option<String>,

    /// Endpoint of the deliverability provider.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_PROVIDER_URL")]
    provider_url: Option<String>,

    /// Bearer token for the deliverability provider.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_PROVIDER_API_KEY", hide_env_values = true)]
    provider_api_key: Option<String>,

    /// Endpoint of the discovery service used by `retry`.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_DISCOVERY_URL")]
    discovery_url: Option<String>,

    /// Bearer token for the discovery service.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_DISCOVERY_API_KEY", hide_env_values = true)]
    discovery_api_key: Option<String>,

    /// Publish a batch checkpoint after this many records.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_CHECKPOINT_INTERVAL")]
    checkpoint_interval: Option<usize>,

    /// Root directory of the history store.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_HISTORY_DIR")]
    history_dir: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a single address and print the result as JSON.
    Verify {
        #[arg(short, long)]
        email: String,
    },
    /// Verify every unchecked record of a batch file.
    Batch {
        /// Input JSON: a job object or a bare array of records.
        #[arg(short, long, env = "EMAIL_VERIFIER_INPUT")]
        input: String,

        /// Output JSON, rewritten at every checkpoint.
        #[arg(short, long, default_value = "results.json", env = "EMAIL_VERIFIER_OUTPUT")]
        output: String,

        /// Owner of the history entry.
        #[arg(long)]
        user: Option<String>,

        /// Store the finished job in the history store (requires --user).
        #[arg(long, requires = "user")]
        save_history: bool,

        /// Exit non-zero when any record failed.
        #[arg(long)]
        strict: bool,
    },
    /// Re-run discovery for one record of a batch file.
    Retry {
        #[arg(short, long)]
        input: String,

        /// Zero-based record index.
        #[arg(long)]
        index: usize,

        /// Output JSON. Defaults to rewriting the input file.
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List stored batch jobs for a user.
    History {
        #[arg(long)]
        user: String,

        #[arg(long, default_value = DEFAULT_KIND)]
        kind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    tracing::info!(
        "Email Verifier CLI v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let args = AppArgs::parse();
    tracing::debug!("Parsed CLI arguments: {:?}", args);

    let config = match build_config(&args.global) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            return Err(report(e));
        }
    };
    tracing::debug!("Effective configuration loaded: {:?}", *config);

    let start_time = Instant::now();
    let execution_result = match args.command {
        Command::Verify { ref email } => run_verify(&config, email).await,
        Command::Batch {
            ref input,
            ref output,
            ref user,
            save_history,
            strict,
        } => {
            let history_user = if save_history { user.as_deref() } else { None };
            run_batch(config.clone(), input, output, history_user, strict, start_time).await
        }
        Command::Retry {
            ref input,
            index,
            ref output,
        } => run_retry(config.clone(), input, index, output.as_deref().unwrap_or(input)).await,
        Command::History { ref user, ref kind } => run_history(&config, user, kind).await,
    };

    if let Err(e) = execution_result {
        tracing::error!("Execution failed: {}", e);
        return Err(e);
    }
    tracing::info!("Finished. Total duration: {:.2?}", start_time.elapsed());
    Ok(())
}

fn build_config(args: &GlobalArgs) -> email_verifier_core::Result<Config> {
    let mut config_builder = ConfigBuilder::new();

    if let Some(ref path) = args.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(t) = args.dns_timeout {
        config_builder = config_builder.dns_timeout(Duration::from_secs(t));
    }
    if let Some(ref servers) = args.dns_servers {
        if !servers.is_empty() {
            config_builder = config_builder.dns_servers(servers.clone());
        }
    }
    if let Some(t) = args.request_timeout {
        config_builder = config_builder.request_timeout(Duration::from_secs(t));
    }
    if let Some(ref ua) = args.user_agent {
        config_builder = config_builder.user_agent(ua);
    }
    if let Some(ref url) = args.provider_url {
        config_builder = config_builder.deliverability_url(Some(url));
    }
    if let Some(ref key) = args.provider_api_key {
        config_builder = config_builder.deliverability_api_key(Some(key));
    }
    if let Some(ref url) = args.discovery_url {
        config_builder = config_builder.discovery_url(Some(url));
    }
    if let Some(ref key) = args.discovery_api_key {
        config_builder = config_builder.discovery_api_key(Some(key));
    }
    if let Some(n) = args.checkpoint_interval {
        config_builder = config_builder.checkpoint_interval(n);
    }
    if let Some(ref dir) = args.history_dir {
        config_builder = config_builder.history_dir(dir);
    }

    config_builder.build()
}

/// Prints the error envelope as JSON on stdout and converts the error for `main`.
fn report(err: AppError) -> anyhow::Error {
    let envelope = err.envelope();
    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("Failed to serialize error envelope: {}", e),
    }
    anyhow::anyhow!("{} (status {})", err, envelope.status)
}

async fn run_verify(config: &Config, email: &str) -> Result<()> {
    let verifier = initialize_verifier(config).await.map_err(report)?;
    let result = verify_single_email(&verifier, email).await.map_err(report)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialize result")?
    );
    Ok(())
}

/// Advances the progress bar after every verified address.
struct ProgressVerifier {
    inner: EmailVerifier,
    pb: ProgressBar,
}

impl AddressVerifier for ProgressVerifier {
    fn verify_address<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, email_verifier_core::Result<VerificationResult>> {
        Box::pin(async move {
            self.pb.set_message(email.to_string());
            let result = self.inner.verify(email).await;
            self.pb.inc(1);
            result
        })
    }
}

async fn run_batch(
    config: Arc<Config>,
    input: &str,
    output: &str,
    history_user: Option<&str>,
    strict: bool,
    start_time: Instant,
) -> Result<()> {
    tracing::info!("Running batch verification. Input: '{}', Output: '{}'", input, output);
    let job = load_job(input)?;
    prepare_output(output)?;

    let eligible = job.records.iter().filter(|r| r.needs_verification()).count();
    tracing::info!(
        "Loaded {} records from '{}' ({} to verify).",
        job.record_count,
        input,
        eligible
    );

    let pb = ProgressBar::new(eligible as u64);
    pb.set_style(ProgressStyle::default_bar()
         .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | ETA: {eta} | {msg}")
         .context("Failed to set progress bar template")?
         .progress_chars("=> "));
    pb.set_message("Verifying records...");

    let verifier = initialize_verifier(&config).await.map_err(report)?;
    let progress_verifier = Arc::new(ProgressVerifier {
        inner: verifier,
        pb: pb.clone(),
    });
    let orchestrator = initialize_orchestrator(config.clone(), progress_verifier).map_err(report)?;

    let cancel = CancelFlag::new();
    let ctrl_c_flag = cancel.clone();
    let ctrl_c_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received; stopping after the current record.");
            ctrl_c_flag.cancel();
        }
    });

    let sink = |checkpoint: &BatchCheckpoint| {
        let snapshot = job.with_records(checkpoint.records.clone());
        match save_job(&snapshot, output) {
            Ok(()) => tracing::debug!(
                "Checkpoint {}/{}{} written to '{}'.",
                checkpoint.processed,
                checkpoint.eligible,
                if checkpoint.is_final { " (final)" } else { "" },
                output
            ),
            Err(e) => tracing::warn!("Failed to write checkpoint to '{}': {:#}", output, e),
        }
    };
    let run = orchestrator.verify_all(&job, &sink, &cancel).await;
    ctrl_c_task.abort();

    pb.finish_with_message(format!("Verified {} records", run.summary.processed));

    if let Some(user) = history_user {
        let store = FsHistoryStore::from_config(&config);
        let key = store
            .save(user, DEFAULT_KIND, &run.job)
            .await
            .map_err(report)?;
        tracing::info!("Saved batch to history as '{}'.", key);
    }

    log_summary(&run.summary, start_time.elapsed());

    if strict {
        run.summary.ensure_complete().map_err(report)?;
    }
    if run.summary.cancelled {
        return Err(anyhow::anyhow!(
            "Batch cancelled after {} of {} records; partial results are in '{}'",
            run.summary.processed,
            run.summary.eligible,
            output
        ));
    }
    Ok(())
}

async fn run_retry(config: Arc<Config>, input: &str, index: usize, output: &str) -> Result<()> {
    let job = load_job(input)?;
    let verifier = initialize_verifier(&config).await.map_err(report)?;
    let orchestrator = initialize_orchestrator(config, Arc::new(verifier)).map_err(report)?;

    let updated = orchestrator.retry(&job, index).await.map_err(report)?;
    save_job(&updated, output)?;
    tracing::info!("Record {} updated; job written to '{}'.", index, output);
    println!(
        "{}",
        serde_json::to_string_pretty(&updated.records[index])
            .context("Failed to serialize record")?
    );
    Ok(())
}

async fn run_history(config: &Config, user: &str, kind: &str) -> Result<()> {
    let store = FsHistoryStore::from_config(config);
    let entries = store.list(user, kind).await.map_err(report)?;
    let degraded = entries.iter().filter(|e| e.degraded).count();
    tracing::info!("Found {} history entries ({} degraded).", entries.len(), degraded);
    println!(
        "{}",
        serde_json::to_string_pretty(&entries).context("Failed to serialize history")?
    );
    Ok(())
}

fn load_job(file_path: &str) -> Result<BatchJob> {
    tracing::debug!("Opening input file: {}", file_path);
    let file = File::open(file_path)
        .with_context(|| format!("Failed to open input file '{}'", file_path))?;
    let reader = BufReader::new(file);

    let input: BatchInput = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse JSON from '{}'. Expected a job object or an array of records.",
            file_path
        )
    })?;
    let file_name = Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.to_string());
    Ok(input.into_job(&file_name))
}

fn prepare_output(file_path: &str) -> Result<()> {
    if let Some(parent_dir) = Path::new(file_path).parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            tracing::debug!("Creating output directory: {}", parent_dir.display());
            std::fs::create_dir_all(parent_dir).with_context(|| {
                format!(
                    "Failed to create output directory '{}'",
                    parent_dir.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Writes the job as pretty JSON, replacing the file.
fn save_job(job: &BatchJob, file_path: &str) -> Result<()> {
    let file = File::create(file_path)
        .with_context(|| format!("Failed to create/truncate output file '{}'", file_path))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, job)
        .with_context(|| format!("Failed to serialize job to JSON for '{}'", file_path))?;
    Ok(())
}

/// Logs a summary of the batch run to the console using `tracing::info`.
fn log_summary(summary: &BatchSummary, duration: Duration) {
    tracing::info!("-------------------- Batch Summary --------------------");
    tracing::info!("Total Records in Input File : {}", summary.total_records);
    tracing::info!("Records Needing Verification: {}", summary.eligible);
    tracing::info!("Records Processed           : {}", summary.processed);
    tracing::info!("  - Verified                : {}", summary.verified);
    tracing::info!("  - Rejected                : {}", summary.rejected);
    tracing::info!("  - Errors During Processing: {}", summary.failed);
    tracing::info!("  - Skipped (No Email/Done) : {}", summary.skipped);
    if summary.cancelled {
        tracing::info!("  - Cancelled before        : {}", summary.eligible - summary.processed);
    }
    tracing::info!("Total Time Taken            : {:.2?}", duration);
    if duration.as_secs_f64() > 0.01 && summary.processed > 0 {
        let rate = (summary.processed as f64) / duration.as_secs_f64();
        tracing::info!("Processing Rate             : {:.2} records/sec", rate);
    }
    tracing::info!("-------------------------------------------------------");
}
