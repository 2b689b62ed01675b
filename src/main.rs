use clap::{Parser, ValueEnum};
use model_compare::{
    CompareConfig, ComparisonSession, Coordinator, SelectOutcome, Slot, client::HttpAnswerProvider,
    metrics::COMPARE_METRICS,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "model-compare", version, about = "Stream two model answers side by side")]
struct Cli {
    /// TOML config file; falls back to COMPARE_* environment variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source for the first slot
    #[arg(long, default_value = "gemini-2.5-flash-lite")]
    first: String,

    /// Source for the second slot
    #[arg(long, default_value = "gpt-4o")]
    second: String,

    /// Pick one of the answers once both are done
    #[arg(long, value_enum)]
    select: Option<SlotArg>,

    /// The prompt sent to both sources
    prompt: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SlotArg {
    First,
    Second,
}

impl From<SlotArg> for Slot {
    fn from(arg: SlotArg) -> Self {
        match arg {
            SlotArg::First => Slot::First,
            SlotArg::Second => Slot::Second,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CompareConfig::from_file(path)?,
        None => CompareConfig::from_env()?,
    };
    config.validate()?;

    eprintln!("Comparing answers...");
    eprintln!("  Endpoint: {}", config.upstream.endpoint);
    eprintln!("  First:    {}", config.source(&cli.first).label);
    eprintln!("  Second:   {}", config.source(&cli.second).label);

    let provider = Arc::new(HttpAnswerProvider::new(config.upstream.clone())?);
    let coordinator = Coordinator::new(provider);

    let session = coordinator
        .start_comparison(
            &cli.prompt,
            config.source(&cli.first),
            config.source(&cli.second),
        )
        .await?;

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = session.settled() => break,
            _ = ticker.tick() => print_progress(&session),
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Interrupted, discarding comparison");
                coordinator.discard().await;
                return Ok(());
            }
        }
    }

    for slot in Slot::BOTH {
        print_slot(&session, slot);
    }

    if let Some(choice) = cli.select {
        let slot = Slot::from(choice);
        match session.select(slot) {
            SelectOutcome::Rejected => eprintln!("Cannot select {}: it produced no text", slot),
            _ => println!("{}", serde_json::to_string_pretty(&session.result())?),
        }
    }

    tracing::debug!("{}", COMPARE_METRICS.snapshot());

    Ok(())
}

fn print_progress(session: &ComparisonSession) {
    let first = session.snapshot(Slot::First);
    let second = session.snapshot(Slot::Second);
    eprintln!(
        "  [{:?}] first: {} chars ({:?}) | second: {} chars ({:?})",
        session.phase(),
        first.text().chars().count(),
        first.status(),
        second.text().chars().count(),
        second.status()
    );
}

fn print_slot(session: &ComparisonSession, slot: Slot) {
    let state = session.snapshot(slot);
    let source = session.source(slot);

    println!("{}", "=".repeat(80));
    println!("{} ({}) - {:?}", source.label, slot, state.status());
    if let Some(error) = state.error_message() {
        println!("Error: {}", error);
    }
    println!("{}", "-".repeat(80));
    println!("{}", state.text());

    if let Some(answer) = session.final_answer(slot)
        && !answer.code_blocks.is_empty()
    {
        println!("{}", "-".repeat(80));
        for (i, block) in answer.code_blocks.iter().enumerate() {
            let language = if block.language.is_empty() {
                "text"
            } else {
                block.language.as_str()
            };
            println!("Code block {} [{}], {} lines", i + 1, language, block.code.lines().count());
        }
    }
}
