//! Command-line interface for callscribe.
//!
//! Provides commands for running the pipeline daemon, triggering single
//! sweeps, transcribing individual files, analyzing records, and
//! inspecting the record store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::analyze::{
    AnalysisEngine, Analyzer, EngineKind, HeuristicEngine, OllamaEngine, OpenAiEngine,
};
use crate::config::Config;
use crate::domain::{CallRecord, Registry};
use crate::ingest::Mapper;
use crate::schedule::Scheduler;
use crate::store::RecordStore;
use crate::transcribe::{Transcriber, WhisperClient};

/// callscribe - Call recording transcription and sale-outcome analysis
#[derive(Parser, Debug)]
#[command(name = "callscribe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline daemon (scheduled mapping + transcription)
    Run,

    /// Run one mapping sweep over the inbox
    Map {
        /// Maximum number of files to map
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Run one transcription sweep over mapped records
    Transcribe {
        /// Maximum number of records to transcribe
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Transcribe a single audio file (export filename grammar)
    TranscribeFile {
        /// Path to the audio file
        path: PathBuf,
    },

    /// Analyze transcribed records for sale outcomes
    Analyze {
        /// Analyze one specific record by id
        #[arg(short, long)]
        id: Option<String>,

        /// Maximum number of records to analyze
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// List records awaiting analysis
    Pending {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// List records in the store
    Records {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show aggregate pipeline statistics
    Stats,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Commands::Run => run_daemon(&config).await,
            Commands::Map { limit } => run_map(&config, limit).await,
            Commands::Transcribe { limit } => run_transcribe(&config, limit).await,
            Commands::TranscribeFile { path } => run_transcribe_file(&config, &path).await,
            Commands::Analyze { id, limit } => run_analyze(&config, id, limit).await,
            Commands::Pending { limit } => list_pending(&config, limit).await,
            Commands::Records { limit } => list_records(&config, limit).await,
            Commands::Stats => show_stats(&config).await,
            Commands::Config => show_config(&config).await,
        }
    }
}

/// Open the record store under the configured home
async fn open_store(config: &Config) -> Result<Arc<RecordStore>> {
    let store = RecordStore::open(config.store_path.clone())
        .await
        .context("Failed to open record store")?;
    Ok(Arc::new(store))
}

fn build_mapper(config: &Config, store: Arc<RecordStore>) -> Arc<Mapper> {
    Arc::new(Mapper::new(
        store,
        config.inbox.clone(),
        config.processed.clone(),
    ))
}

/// Build the transcriber with the Whisper HTTP engine
fn build_transcriber(config: &Config, store: Arc<RecordStore>) -> Result<Arc<Transcriber>> {
    let api_key = config
        .openai_api_key
        .clone()
        .context("Missing API key for transcription. Set OPENAI_API_KEY env var")?;

    let engine = WhisperClient::new(api_key).with_model(config.whisper_model.clone());

    Ok(Arc::new(Transcriber::new(
        store,
        Arc::new(engine),
        config.language.clone(),
    )))
}

/// Build the configured analysis backend
fn build_analysis_engine(config: &Config) -> Result<Arc<dyn AnalysisEngine>> {
    match config.engine {
        EngineKind::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .context("Missing API key for analysis. Set OPENAI_API_KEY env var")?;
            Ok(Arc::new(
                OpenAiEngine::new(api_key).with_model(config.openai_model.clone()),
            ))
        }
        EngineKind::Ollama => Ok(Arc::new(
            OllamaEngine::new(config.ollama_host.clone()).with_model(config.ollama_model.clone()),
        )),
        EngineKind::Heuristic => Ok(Arc::new(HeuristicEngine::default())),
    }
}

fn build_analyzer(config: &Config, store: Arc<RecordStore>) -> Result<Analyzer> {
    let registry = Registry::load(&config.registry_path)?;
    let engine = build_analysis_engine(config)?;
    Ok(Analyzer::new(store, Arc::new(registry), engine))
}

/// Run the daemon: scheduled mapping and transcription until Ctrl+C
async fn run_daemon(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let mapper = build_mapper(config, store.clone());
    let transcriber = build_transcriber(config, store)?;

    println!("callscribe pipeline");
    println!("  Inbox:     {}", config.inbox.display());
    println!("  Processed: {}", config.processed.display());
    println!("  Store:     {}", config.store_path.display());
    println!("  Press Ctrl+C to stop");
    println!();

    let scheduler = Arc::new(Scheduler::new(mapper, transcriber, config.schedule.clone()));
    scheduler.run().await
}

/// Run one mapping sweep
async fn run_map(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config).await?;
    let mapper = build_mapper(config, store);

    let mapped = mapper.map_latest_files(limit).await?;

    if mapped.is_empty() {
        println!("No new recordings to map");
        return Ok(());
    }

    print_record_table(&mapped);
    println!("\n✅ Mapped {} recording(s)", mapped.len());

    Ok(())
}

/// Run one transcription sweep
async fn run_transcribe(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config).await?;
    let transcriber = build_transcriber(config, store)?;

    let transcribed = transcriber.transcribe_mapped_files(limit).await?;

    if transcribed.is_empty() {
        println!("No records to transcribe");
        return Ok(());
    }

    for record in &transcribed {
        println!("{}  {}", record.id, record.file.display());
    }
    println!("\n✅ Transcribed {} record(s)", transcribed.len());

    Ok(())
}

/// Transcribe a single file and print the transcript
async fn run_transcribe_file(config: &Config, path: &std::path::Path) -> Result<()> {
    let store = open_store(config).await?;
    let transcriber = build_transcriber(config, store)?;

    let record = transcriber.transcribe_file(path).await?;

    println!("Record: {}", record.id);
    println!("User:   {}", record.user);
    println!("Caller: {}", record.caller_id);
    println!();
    println!("{}", record.transcription);

    Ok(())
}

/// Analyze one record or a batch of pending records
async fn run_analyze(config: &Config, id: Option<String>, limit: usize) -> Result<()> {
    let store = open_store(config).await?;
    let analyzer = build_analyzer(config, store)?;

    if let Some(id) = id {
        let outcome = analyzer.analyze_record(&id).await?;

        println!("Record: {}", id);
        println!("  Sale:   {}", if outcome.success_sell { "✅ yes" } else { "❌ no" });
        if let Some(amount) = outcome.amount_to_pay {
            println!("  Amount: {}", amount);
        }
        if let Some(reason) = &outcome.reason_fail {
            println!("  Reason: {}", reason);
        }
        return Ok(());
    }

    let analyzed = analyzer.analyze_pending(limit).await?;

    if analyzed.is_empty() {
        println!("No records pending analysis");
        return Ok(());
    }

    println!("{:<14} {:<6} {:<12} {:<40}", "ID", "SALE", "AMOUNT", "REASON");
    println!("{}", "-".repeat(75));
    for record in &analyzed {
        if let Some(outcome) = &record.outcome {
            println!(
                "{:<14} {:<6} {:<12} {:<40}",
                record.id,
                if outcome.success_sell { "yes" } else { "no" },
                outcome
                    .amount_to_pay
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                outcome.reason_fail.as_deref().unwrap_or("-"),
            );
        }
    }
    println!("\n✅ Analyzed {} record(s)", analyzed.len());

    Ok(())
}

/// List records awaiting analysis
async fn list_pending(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config).await?;
    let pending = store.pending_analysis(limit).await?;

    if pending.is_empty() {
        println!("No records pending analysis");
        return Ok(());
    }

    print_record_table(&pending);
    Ok(())
}

/// List records in the store
async fn list_records(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config).await?;
    let records = store.all(limit).await?;

    if records.is_empty() {
        println!("No records in store. Use 'callscribe map' to ingest recordings.");
        return Ok(());
    }

    print_record_table(&records);
    Ok(())
}

fn print_record_table(records: &[CallRecord]) {
    println!(
        "{:<14} {:<10} {:<8} {:<6} {:<8} {:<30}",
        "ID", "CALLER", "TYPE", "TRANS", "OUTCOME", "FILE"
    );
    println!("{}", "-".repeat(80));

    for record in records {
        let trans = match record.transcribed {
            Some(true) => "done",
            Some(false) => "failed",
            None => "-",
        };
        let outcome = match &record.outcome {
            Some(o) if o.success_sell => "sale",
            Some(_) => "no-sale",
            None => "-",
        };
        let file_name = record
            .file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| record.file.display().to_string());
        let file_truncated = if file_name.len() > 28 {
            format!("{}...", &file_name[..25])
        } else {
            file_name
        };

        println!(
            "{:<14} {:<10} {:<8} {:<6} {:<8} {:<30}",
            record.id, record.caller_id, record.record_type, trans, outcome, file_truncated
        );
    }
}

/// Show aggregate statistics
async fn show_stats(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let stats = store.stats().await?;

    println!();
    println!("Pipeline Statistics");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!("  Total records:     {}", stats.total);
    println!("  Transcribed:       {}", stats.transcribed);
    println!("  Pending analysis:  {}", stats.pending_analysis);
    println!("  Analyzed:          {}", stats.analyzed);
    println!("  Successful sales:  {}", stats.successful_sales);
    println!("  Failed sales:      {}", stats.failed_sales);
    println!();

    Ok(())
}

/// Show the resolved configuration and check the analysis backend
async fn show_config(config: &Config) -> Result<()> {
    println!();
    println!("Callscribe Configuration");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:      {}", config.home.display());
    println!("  Inbox:     {}", config.inbox.display());
    println!("  Processed: {}", config.processed.display());
    println!("  Store:     {}", config.store_path.display());
    println!("  Registry:  {}", config.registry_path.display());
    println!();
    println!("Transcription:");
    println!("  Language: {}", config.language);
    println!("  Model:    {}", config.whisper_model);
    println!("  API key:  {}", if config.openai_api_key.is_some() { "set" } else { "⚠️  not set" });
    println!();
    println!("Analysis:");
    println!("  Engine: {:?}", config.engine);
    match config.engine {
        EngineKind::OpenAi => println!("  Model:  {}", config.openai_model),
        EngineKind::Ollama => {
            println!("  Host:   {}", config.ollama_host);
            println!("  Model:  {}", config.ollama_model);
        }
        EngineKind::Heuristic => {}
    }
    match build_analysis_engine(config) {
        Ok(engine) => match engine.health_check().await {
            Ok(()) => println!("  Status: ✅ {} is reachable", engine.name()),
            Err(e) => println!("  Status: ⚠️  {}", e),
        },
        Err(e) => println!("  Status: ⚠️  {}", e),
    }
    println!();
    println!("Schedule:");
    println!(
        "  Mapping:       every {:?} (limit {})",
        config.schedule.map_interval, config.schedule.map_limit
    );
    println!(
        "  Transcription: every {:?} (limit {})",
        config.schedule.transcribe_interval, config.schedule.transcribe_limit
    );
    println!();

    // Flag a missing inbox early; the recorder may not be syncing yet
    if !config.inbox.exists() {
        println!("⚠️  Inbox does not exist: {}", config.inbox.display());
    }

    Ok(())
}
