mod config;

use clap::{Parser, Subcommand};
use config::{PrepcastConfig, ResolvedProvider};
use prepcast_builtins::{
    register_builtins, AnthropicGenerator, BuiltinServices, ContextSearcher, GoogleSearcher,
    NoopSearcher, OpenAiGenerator, StoryboardRenderer, TextGenerator, STANDARD_PIPELINE,
};
use prepcast_core::{Context, Outcome};
use prepcast_orchestrator::{Engine, ExecutionLogEntry, StrategyCoordinator, EXECUTION_LOG};
use prepcast_store::{sample_questions, QuestionStore, SqliteQuestionStore};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prepcast", about = "Prepcast: exam question explainer pipeline")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "prepcast.toml")]
    config: PathBuf,

    /// Print final outcomes as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the standard pipeline and produce explanation artifacts
    Generate {
        /// Only pick questions of this subject
        #[arg(long, value_parser = ["Quant", "Verbal", "Logic", "DI"])]
        subject: Option<String>,
        /// Number of artifacts (defaults to max_questions_per_run)
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Let the coordinator choose a processing strategy
        #[arg(long)]
        adaptive: bool,
    },
    /// Show store, provider and engine status
    Status,
    /// Store the sample questions
    Setup,
    /// Run one pipeline end to end, seeding the store if it is empty
    Test {
        #[arg(long)]
        adaptive: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = PrepcastConfig::load(&cli.config)?;
    config.apply_env(|key| std::env::var(key).ok())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let store: Arc<dyn QuestionStore> = Arc::new(
        SqliteQuestionStore::open(config.sqlite_path())
            .map_err(|e| anyhow::anyhow!("Failed to open question store: {e}"))?,
    );
    let engine = build_engine(&config, store.clone())?;

    match cli.command {
        Commands::Generate {
            subject,
            count,
            adaptive,
        } => {
            let count = count.unwrap_or(config.max_questions_per_run);
            generate(&engine, &config, store.as_ref(), subject, count, adaptive, cli.json).await?;
        }
        Commands::Status => status(&engine, &config, store.as_ref()).await?,
        Commands::Setup => setup(store.as_ref()).await?,
        Commands::Test { adaptive } => {
            if store.count().await? == 0 {
                setup(store.as_ref()).await?;
            }
            let outcome = run_once(&engine, &config, None, adaptive).await;
            report(&outcome, adaptive, cli.json)?;
            if !outcome.is_success() {
                print_execution_log(&outcome);
                anyhow::bail!("pipeline test failed");
            }
        }
    }

    Ok(())
}

fn build_engine(config: &PrepcastConfig, store: Arc<dyn QuestionStore>) -> anyhow::Result<Engine> {
    let coordinator = StrategyCoordinator::new().with_profiles(config.strategy_profiles()?);
    let engine = Engine::with_coordinator(coordinator);

    let searcher: Arc<dyn ContextSearcher> =
        match (&config.search.api_key, &config.search.engine_id) {
            (Some(key), Some(cx)) => {
                let mut google = GoogleSearcher::new(key, cx);
                if let Some(url) = &config.search.base_url {
                    google = google.with_base_url(url);
                }
                Arc::new(google)
            }
            _ => {
                info!("No search credentials, reasoning will use templates");
                Arc::new(NoopSearcher)
            }
        };

    register_builtins(
        &engine,
        BuiltinServices {
            store,
            searcher,
            generator: build_generator(config)?,
            renderer: Arc::new(StoryboardRenderer::new(&config.output_dir)),
        },
    );
    info!(steps = engine.status().available_steps.len(), "Built-in steps registered");
    Ok(engine)
}

fn build_generator(config: &PrepcastConfig) -> anyhow::Result<Option<Arc<dyn TextGenerator>>> {
    let llm = &config.llm;
    let generator: Arc<dyn TextGenerator> = match config.llm_provider()? {
        Some(ResolvedProvider::Openai { api_key }) => {
            let mut openai = OpenAiGenerator::new(api_key);
            if let Some(model) = &llm.model {
                openai = openai.with_model(model);
            }
            if let Some(url) = &llm.base_url {
                openai = openai.with_base_url(url);
            }
            if let Some(secs) = llm.timeout_secs {
                openai = openai.with_timeout(Duration::from_secs(secs));
            }
            info!(provider = "openai", "Text generation enabled");
            Arc::new(openai)
        }
        Some(ResolvedProvider::Anthropic { api_key }) => {
            let mut anthropic = AnthropicGenerator::new(api_key);
            if let Some(model) = &llm.model {
                anthropic = anthropic.with_model(model);
            }
            if let Some(url) = &llm.anthropic_base_url {
                anthropic = anthropic.with_base_url(url);
            }
            if let Some(secs) = llm.timeout_secs {
                anthropic = anthropic.with_timeout(Duration::from_secs(secs));
            }
            info!(provider = "anthropic", "Text generation enabled");
            Arc::new(anthropic)
        }
        None if config.has_paid_llm() => {
            info!("LLM provider set to template, API keys are ignored");
            return Ok(None);
        }
        None => {
            info!("No LLM API key, explanations will use templates");
            return Ok(None);
        }
    };
    Ok(Some(generator))
}

async fn run_once(
    engine: &Engine,
    config: &PrepcastConfig,
    subject: Option<&str>,
    adaptive: bool,
) -> Outcome {
    let mut initial = Context::new();
    if let Some(subject) = subject {
        initial.insert("subject".into(), json!(subject));
    }
    if adaptive {
        engine
            .run_pipeline(&STANDARD_PIPELINE, Some(initial), None, true)
            .await
    } else {
        let direct = config.direct_pipeline_config();
        engine
            .run_pipeline(&STANDARD_PIPELINE, Some(initial), Some(&direct), false)
            .await
    }
}

async fn generate(
    engine: &Engine,
    config: &PrepcastConfig,
    store: &dyn QuestionStore,
    subject: Option<String>,
    count: usize,
    adaptive: bool,
    as_json: bool,
) -> anyhow::Result<()> {
    let available = store.count().await?;
    if available == 0 {
        println!("No questions found in database. Run `prepcast setup` first.");
        return Ok(());
    }
    println!(
        "Generating {count} artifact(s), subject: {}, mode: {}",
        subject.as_deref().unwrap_or("all"),
        if adaptive { "adaptive" } else { "direct" }
    );
    println!("{available} question(s) in store");

    let mut succeeded = 0;
    for i in 0..count {
        println!("\n[{}/{count}]", i + 1);
        let outcome = run_once(engine, config, subject.as_deref(), adaptive).await;
        if outcome.is_success() {
            succeeded += 1;
        } else {
            warn!(error = ?outcome.error(), "Generation failed");
        }
        report(&outcome, adaptive, as_json)?;
    }

    println!("\nSuccessful: {succeeded}/{count}");
    if succeeded > 0 {
        println!("Output directory: {}", config.output_dir.join("videos").display());
    }
    Ok(())
}

fn report(outcome: &Outcome, adaptive: bool, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    if outcome.is_success() {
        let path = outcome.data().get("video_path").and_then(|v| v.as_str());
        println!("Artifact generated: {}", path.unwrap_or("(none)"));
    } else {
        println!(
            "Generation failed: {}",
            outcome.error().unwrap_or("no error reported")
        );
    }

    if adaptive {
        let meta = outcome.metadata();
        if let Some(strategy) = meta.get("strategy_used").and_then(|v| v.as_str()) {
            println!("Strategy: {strategy}");
        }
        if let Some(insight) = meta
            .get("analysis")
            .and_then(|a| a.get("insight_text"))
            .and_then(|v| v.as_str())
        {
            println!("Analysis: {insight}");
        }
        if let Some(confidence) = meta.get("confidence").and_then(|v| v.as_f64()) {
            println!("Confidence: {:.0}%", confidence * 100.0);
        }
        if let Some(elapsed) = meta.get("execution_time").and_then(|v| v.as_f64()) {
            println!("Processing time: {elapsed:.1}s");
        }
    }
    Ok(())
}

fn print_execution_log(outcome: &Outcome) {
    let Some(log) = outcome.metadata().get(EXECUTION_LOG) else {
        return;
    };
    let entries: Vec<ExecutionLogEntry> = match serde_json::from_value(log.clone()) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Unreadable execution log");
            return;
        }
    };
    println!("Execution log:");
    for entry in entries {
        let mark = if entry.success { "ok" } else { "FAILED" };
        match entry.error {
            Some(error) => println!("  {:<24} {mark}: {error}", entry.step_name),
            None => println!("  {:<24} {mark}", entry.step_name),
        }
    }
}

async fn status(
    engine: &Engine,
    config: &PrepcastConfig,
    store: &dyn QuestionStore,
) -> anyhow::Result<()> {
    let status = engine.status();
    let count = store.count().await?;
    let subjects = store.subjects().await?;

    println!("Prepcast status\n");
    println!("Store: {} ({count} question(s))", config.sqlite_path().display());
    if !subjects.is_empty() {
        println!("Subjects: {}", subjects.join(", "));
    }
    let model = config.llm.model.as_deref();
    match config.llm_provider()? {
        Some(ResolvedProvider::Openai { .. }) => println!(
            "LLM: OpenAI, {}",
            model.unwrap_or(OpenAiGenerator::DEFAULT_MODEL)
        ),
        Some(ResolvedProvider::Anthropic { .. }) => println!(
            "LLM: Anthropic, {}",
            model.unwrap_or(AnthropicGenerator::DEFAULT_MODEL)
        ),
        None => println!("LLM: not configured, using templates"),
    }
    println!(
        "Search: {}",
        if config.has_search() { "Google Custom Search" } else { "disabled" }
    );
    println!("Steps: {}", status.available_steps.join(", "));
    println!("Coordinator: {} ({})", status.coordinator, status.capabilities.join(", "));
    println!("Output directory: {}", config.output_dir.display());
    Ok(())
}

async fn setup(store: &dyn QuestionStore) -> anyhow::Result<()> {
    let samples = sample_questions();
    let total = samples.len();
    for question in samples {
        store.store(question).await?;
    }
    info!(count = total, "Sample questions stored");
    println!("Stored {total} sample question(s). Run `prepcast generate` next.");
    Ok(())
}
