use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use dialoguer::Input;
use tokio_util::sync::CancellationToken;

use bedtime_agent::{ChatModel, OpenAiChatModel, StoryTeller};
use bedtime_core::{Pipeline, PipelineConfig, PipelineResult};
use bedtime_critic::StoryJudge;
use bedtime_logging::{init_tracing, LogFormat, Logger};

mod config;

use config::{FileConfig, Overrides, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "bedtime",
    about = "Bedtime story generator with a single judged revision pass",
    version,
    author
)]
struct Cli {
    /// Story request (prompts interactively if not provided)
    #[arg(short, long)]
    request: Option<String>,

    /// Minimum rubric score (0-5) every axis needs to skip the revision
    #[arg(short, long)]
    threshold: Option<i64>,

    /// Model for both storyteller and judge
    #[arg(short, long)]
    model: Option<String>,

    /// Model for the judge only
    #[arg(long)]
    judge_model: Option<String>,

    /// File holding the storyteller system framing
    #[arg(long)]
    system_prompt_file: Option<PathBuf>,

    /// Per-call timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also append JSON log lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show resolved configuration without calling any model
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            model: self.model.clone(),
            judge_model: self.judge_model.clone(),
            threshold: self.threshold,
            timeout_secs: self.timeout_secs,
            system_prompt_file: self.system_prompt_file.clone(),
        }
    }
}

/// Token of the run in flight, if any
type ActiveRun = Arc<Mutex<Option<CancellationToken>>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing("warn", log_format);

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let file_config = FileConfig::load_layered(&working_dir)?;
    let settings = Settings::resolve(&cli.overrides(), file_config)
        .context("Invalid configuration")?;
    let system_prompt = settings.system_prompt()?;

    if cli.dry_run {
        print_dry_run(&settings, cli.request.as_deref());
        return Ok(());
    }

    let api_key = settings.api_key()?;
    let model: Arc<dyn ChatModel> =
        Arc::new(OpenAiChatModel::new(Some(api_key.as_str())).with_base_url(&settings.api_base));
    if !model.is_configured() {
        bail!("Chat model '{}' is not configured", model.name());
    }

    let storyteller = StoryTeller::new(model.clone(), settings.storyteller.clone())
        .with_system_prompt(system_prompt);
    let judge =
        StoryJudge::new(model, settings.judge.clone()).with_options(settings.review.clone());

    let logger = match &cli.log_file {
        Some(path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };
    let logger = Arc::new(logger);

    let pipeline_config = PipelineConfig {
        threshold: settings.threshold,
        call_timeout: Some(settings.call_timeout),
    };

    // Handle Ctrl+C: cancel the run in flight, or leave if idle
    let active: ActiveRun = Arc::new(Mutex::new(None));
    let handler_active = active.clone();
    ctrlc::set_handler(move || {
        let token = handler_active.lock().ok().and_then(|guard| guard.clone());
        match token {
            Some(token) => {
                eprintln!("\nCancelling current story...");
                token.cancel();
            }
            None => std::process::exit(130),
        }
    })
    .context("Failed to set Ctrl+C handler")?;

    let pipeline = Pipeline::new(&storyteller, &judge, logger).with_config(pipeline_config);

    let run = |request: String| {
        let active = active.clone();
        let pipeline = &pipeline;
        async move {
            let cancel = CancellationToken::new();
            if let Ok(mut guard) = active.lock() {
                *guard = Some(cancel.clone());
            }
            let result = pipeline
                .run_with_cancel(&request, pipeline.config().threshold, cancel)
                .await;
            if let Ok(mut guard) = active.lock() {
                *guard = None;
            }
            result
        }
    };

    if let Some(request) = cli.request.clone() {
        let result = run(request).await;
        emit(&result, cli.json_output)?;
        std::process::exit(result.exit_code());
    }

    loop {
        let input: String = Input::new()
            .with_prompt("What kind of story do you want to hear?")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read story request")?;

        let request = input.trim();
        if request.is_empty() {
            continue;
        }
        if matches!(request.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let result = run(request.to_string()).await;
        emit(&result, cli.json_output)?;
    }

    Ok(())
}

fn emit(result: &PipelineResult, json_output: bool) -> Result<()> {
    if json_output {
        let json = serde_json::to_string_pretty(result)?;
        println!("{}", json);
    } else {
        print_outcome(result);
    }
    Ok(())
}

fn print_dry_run(settings: &Settings, request: Option<&str>) {
    println!("=== Dry Run ===");
    match request {
        Some(request) => println!("Request: {}", request),
        None => println!("Request: (interactive)"),
    }
    println!("API base: {}", settings.api_base);
    println!("API key env: {}", settings.api_key_env);
    println!(
        "Storyteller: {} (temperature {}, max tokens {})",
        settings.storyteller.model, settings.storyteller.temperature, settings.storyteller.max_tokens
    );
    println!(
        "Judge: {} (temperature {}, max tokens {})",
        settings.judge.model, settings.judge.temperature, settings.judge.max_tokens
    );
    println!(
        "Audience: age {}, tone {}, ~{} words",
        settings.review.child_age, settings.review.tone, settings.review.length_target
    );
    println!("Threshold: {}", settings.threshold);
    println!("Timeout: {}s per call", settings.call_timeout.as_secs());
    match &settings.system_prompt_file {
        Some(path) => println!("System prompt: {}", path.display()),
        None => println!("System prompt: built-in"),
    }
}

fn print_outcome(result: &PipelineResult) {
    match result {
        PipelineResult::Completed {
            final_story,
            judge_feedback,
            revised,
            duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== STORY ===".bright_green().bold());
            println!("{}", final_story);
            eprintln!();
            eprintln!("Scores: {}", judge_feedback.scores.summary());
            if !judge_feedback.issues.is_empty() {
                eprintln!("Issues: {}", judge_feedback.issues.join("; "));
            }
            if *revised {
                eprintln!("Revised once: {}", judge_feedback.edit_instructions);
            } else {
                eprintln!("Accepted without revision");
            }
            eprintln!("Duration: {:.1}s", duration_secs);
        }
        PipelineResult::Failed {
            error_kind,
            stage,
            error,
            partial_draft,
            duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== FAILED ===".bright_red().bold());
            eprintln!("{} while {}: {}", error_kind, stage, error);
            if partial_draft.is_some() {
                eprintln!("A draft was written before the failure (see --json-output).");
            }
            eprintln!("Duration: {:.1}s", duration_secs);
        }
        PipelineResult::Cancelled {
            stage,
            duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== CANCELLED ===".bright_yellow().bold());
            eprintln!("Stopped while {}", stage);
            eprintln!("Duration: {:.1}s", duration_secs);
        }
    }
}
