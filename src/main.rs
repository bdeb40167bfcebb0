use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::net::TcpListener;
use tracing::{info, warn};

use oxidized_paper::dataset::{DefaultDecoder, FileKind, TabularDecoder};
use oxidized_paper::export::ExportFormat;
use oxidized_paper::llm::{adapter_from_config, GenerationClient};
use oxidized_paper::registry::SessionRegistry;
use oxidized_paper::session::{RevisionOutcome, SessionSettings};
use oxidized_paper::utils::init_tracing;
use oxidized_paper::{create_router, AppState, Config, Session};

#[derive(Parser)]
#[command(name = "oxidized-paper", version, about = "Dataset to research paper pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Run the whole pipeline headless and write the export
    Generate(GenerateArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// CSV, spreadsheet or JSON file
    #[arg(short, long)]
    input: PathBuf,
    /// File type hint, overrides the extension
    #[arg(long = "type")]
    file_type: Option<String>,
    /// Id of the hypothesis to write about
    #[arg(long, default_value_t = 1)]
    hypothesis: u32,
    /// Extra context for the prompts
    #[arg(long)]
    context: Option<String>,
    /// Revision instruction, applied in order; may be repeated
    #[arg(long = "revise")]
    revisions: Vec<String>,
    /// Output path; the extension follows the produced format
    #[arg(short, long, default_value = "research_paper")]
    out: PathBuf,
    #[arg(long, value_enum, default_value_t = FormatArg::Pdf)]
    format: FormatArg,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatArg {
    Txt,
    Pdf,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Txt => ExportFormat::Text,
            FormatArg::Pdf => ExportFormat::Pdf,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    let _log_guard = init_tracing(config.logging.log_dir.as_deref());
    info!("Configuration loaded: {:?}", config.server);

    if config.llm.api_key.is_empty() {
        warn!(provider = %config.llm.provider, "No LLM API key configured, generation calls will fail");
    }
    let adapter = adapter_from_config(&config.llm)?;
    let client = GenerationClient::new(adapter);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, client).await,
        Command::Generate(args) => generate(config, client, args).await,
    }
}

async fn serve(config: Config, client: GenerationClient) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("HOST and PORT do not form a socket address")?;

    let sessions = SessionRegistry::default();
    if config.server.session_ttl_secs > 0 {
        let _sweeper = sessions.spawn_sweeper(
            Duration::from_secs(config.server.session_ttl_secs),
            Duration::from_secs(config.server.session_sweep_secs),
        );
        info!(ttl_secs = config.server.session_ttl_secs, "Idle session sweep enabled");
    }

    let state = AppState {
        config,
        sessions,
        client,
        decoder: Arc::new(DefaultDecoder),
    };
    let app = create_router(state);

    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn generate(config: Config, client: GenerationClient, args: GenerateArgs) -> anyhow::Result<()> {
    let content = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let kind = match &args.file_type {
        Some(hint) => FileKind::from_hint(hint)?,
        None => FileKind::from_filename(&args.input.to_string_lossy())?,
    };
    let records = DefaultDecoder.decode(&content, kind)?;

    let session = Session::new(client, SessionSettings::from(&config));
    let report = session.ingest(records).await?;
    if let Some(warning) = report.warning {
        warn!("{}", warning);
    }
    if let Some(context) = &args.context {
        session.set_context(context).await;
    }

    let hypotheses = session.generate_hypotheses().await?;
    if let Some(reason) = hypotheses.reason() {
        warn!(reason = %reason, "Using fallback hypotheses");
    }
    for hypothesis in hypotheses.value() {
        println!("{}. {}\n   {}", hypothesis.id, hypothesis.title, hypothesis.description);
    }

    let selected = session.select_hypothesis(args.hypothesis).await?;
    info!(hypothesis_id = selected.id, title = %selected.title, "Writing paper");
    let document = session.generate_document().await?;
    if let Some(reason) = document.reason() {
        warn!(reason = %reason, "Paper generation failed, exporting the error document");
    }

    for instruction in &args.revisions {
        match session.revise(instruction).await? {
            RevisionOutcome::Applied => info!(instruction = %instruction, "Revision applied"),
            other => warn!(instruction = %instruction, outcome = other.label(), "Revision not applied"),
        }
    }

    let artifact = session.export(args.format.into()).await?;
    let extension = Path::new(artifact.file_name)
        .extension()
        .unwrap_or_default();
    let path = args.out.with_extension(extension);
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if let Some(reason) = &artifact.degraded {
        warn!(reason = %reason, "PDF export failed, wrote plain text instead");
    }
    println!("Wrote {}", path.display());
    Ok(())
}
