//! CLI binary for edgequake-pdf2quiz.
//!
//! A thin shim over the library crate: flags map to `PipelineConfig`, each
//! subcommand drives a `Workspace`, and the quiz is answered on stdin.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use edgequake_pdf2quiz::config::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use edgequake_pdf2quiz::pipeline::llm::resolve_client;
use edgequake_pdf2quiz::{
    ModelStatus, PageSeparator, PipelineConfig, PipelineProgressCallback, ProgressCallback,
    QuizWarning, Task, Workspace,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Shows a spinner while a task runs and a ✓/✗ line when it ends.
struct CliProgressCallback {
    active: Mutex<Option<(ProgressBar, Instant)>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            active: Mutex::new(None),
        })
    }

    fn finish(&self) -> Option<Duration> {
        let (bar, started) = self.active.lock().ok()?.take()?;
        bar.finish_and_clear();
        Some(started.elapsed())
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_task_start(&self, task: Task) {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_message(format!("{task}…"));
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut active) = self.active.lock() {
            *active = Some((bar, Instant::now()));
        }
    }

    fn on_task_complete(&self, task: Task) {
        let secs = self.finish().map(|d| d.as_secs_f64()).unwrap_or(0.0);
        eprintln!("{} {}  {}", green("✓"), task, dim(&format!("{secs:.1}s")));
    }

    fn on_task_error(&self, task: Task, _error: &str) {
        self.finish();
        eprintln!("{} {}", red("✗"), task);
    }

    fn on_quiz_warning(&self, warning: &QuizWarning) {
        eprintln!("{} {}", cyan("⚠"), warning);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Check that Ollama is running and the model is installed
  pdf2quiz models

  # Show the text that will be sent to the model
  pdf2quiz extract lecture.pdf --preview 500

  # Summarise a PDF (local file or URL)
  pdf2quiz summarize lecture.pdf
  pdf2quiz summarize https://arxiv.org/pdf/1706.03762

  # Summarise pasted text (use - to read stdin)
  pdf2quiz summarize --text "$(cat notes.txt)"

  # Take an 8-question quiz interactively
  pdf2quiz quiz lecture.pdf -n 8

  # Dump the quiz as JSON instead
  pdf2quiz quiz lecture.pdf --json > quiz.json

ENVIRONMENT VARIABLES:
  OLLAMA_HOST          Ollama endpoint (default http://localhost:11434)
  PDF2QUIZ_MODEL       Model name (default llama3:latest)
  EDGEQUAKE_PROVIDER   Use an edgequake-llm provider instead of Ollama
  OPENAI_API_KEY …     API key for the chosen provider
  RUST_LOG             Log filter (overrides -v / -q)

SETUP:
  1. Install Ollama and start it:  ollama serve
  2. Pull a model:                 ollama pull llama3
  3. Run:                          pdf2quiz quiz document.pdf
"#;

/// Summarise PDFs and quiz yourself on them with a local LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2quiz",
    version,
    about = "Summarise PDFs and generate multiple-choice quizzes with a local LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Ollama endpoint URL.
    #[arg(long, global = true, env = "OLLAMA_HOST", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Model name as installed on the service.
    #[arg(short, long, global = true, env = "PDF2QUIZ_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// edgequake-llm provider (openai, anthropic, gemini, mistral, ollama…).
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "PDF2QUIZ_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max tokens the model may generate per request.
    #[arg(long, global = true, env = "PDF2QUIZ_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Characters of document text embedded in a prompt.
    #[arg(long, global = true, env = "PDF2QUIZ_MAX_PROMPT_CHARS", default_value_t = 12_000)]
    max_prompt_chars: usize,

    /// Per-request LLM timeout in seconds.
    #[arg(long, global = true, env = "PDF2QUIZ_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, global = true, env = "PDF2QUIZ_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Page separator: newline, blank, marker, or a custom string.
    #[arg(long, global = true, env = "PDF2QUIZ_SEPARATOR", default_value = "newline")]
    separator: String,

    /// Disable the spinner.
    #[arg(long, global = true, env = "PDF2QUIZ_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2QUIZ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "PDF2QUIZ_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List installed models and check the configured one.
    Models,

    /// Extract and print document text.
    Extract {
        /// Local PDF path or HTTP/HTTPS URL.
        input: String,

        /// Print only the first N characters.
        #[arg(long)]
        preview: Option<usize>,
    },

    /// Summarise a document or pasted text.
    Summarize {
        #[command(flatten)]
        source: SourceArgs,

        /// Output JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },

    /// Generate a quiz and take it on the terminal.
    Quiz {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of questions (1–50).
        #[arg(short = 'n', long, env = "PDF2QUIZ_QUESTIONS", default_value_t = 5,
              value_parser = clap::value_parser!(u16).range(1..=50))]
        questions: u16,

        /// Print the quiz as JSON instead of asking the questions.
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// Local PDF path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    input: Option<String>,

    /// Use this text instead of a PDF ("-" reads stdin).
    #[arg(long)]
    text: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the feedback that matters; keep library INFO logs
    // quiet unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let question_count = match &cli.command {
        Command::Quiz { questions, .. } => usize::from(*questions),
        _ => 5,
    };
    let config = build_config(&cli, progress_cb, question_count)?;

    match &cli.command {
        Command::Models => run_models(&config).await,
        Command::Extract { input, preview } => run_extract(config, input, *preview).await,
        Command::Summarize { source, json } => run_summarize(config, source, *json, cli.quiet).await,
        Command::Quiz { source, json, .. } => run_quiz(config, source, *json).await,
    }
}

/// Map CLI args to `PipelineConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    question_count: usize,
) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .endpoint(normalise_endpoint(&cli.endpoint))
        .model(cli.model.clone())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_prompt_chars(cli.max_prompt_chars)
        .request_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout)
        .page_separator(parse_separator(&cli.separator))
        .question_count(question_count);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `OLLAMA_HOST` is often set without a scheme (`127.0.0.1:11434`).
fn normalise_endpoint(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("http://") || s.starts_with("https://") {
        s.to_string()
    } else {
        format!("http://{s}")
    }
}

/// Parse `--separator` into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "newline" | "none" => PageSeparator::Newline,
        "blank" => PageSeparator::BlankLine,
        "marker" => PageSeparator::Marker,
        _ => PageSeparator::Custom(s.to_string()),
    }
}

async fn load_source(ws: &mut Workspace, source: &SourceArgs) -> Result<()> {
    match (&source.input, &source.text) {
        (_, Some(text)) => {
            let text = if text == "-" {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read text from stdin")?;
                buf
            } else {
                text.clone()
            };
            ws.load_text(&text)?;
        }
        (Some(input), None) => {
            ws.load_path(input).await?;
        }
        (None, None) => bail!("Provide a PDF path/URL or --text"),
    }
    Ok(())
}

// ── Subcommands ──────────────────────────────────────────────────────────────

async fn run_models(config: &PipelineConfig) -> Result<()> {
    let client = resolve_client(config)?;
    let models = client.list_models().await?;

    println!("{}", bold(&format!("{} model(s) on {}", models.len(), client.name())));
    for m in &models {
        let size = m
            .size
            .map(|b| format!("{:.1} GB", b as f64 / 1e9))
            .unwrap_or_default();
        println!(
            "  {:<32} {:>8}  {}",
            m.name,
            dim(&size),
            dim(m.parameter_size.as_deref().unwrap_or(""))
        );
    }

    let ws = Workspace::new(config.clone())?;
    match ws.check_model().await {
        ModelStatus::Available(m) => println!("{} {} is available", green("✔"), bold(&m.name)),
        ModelStatus::Missing { model, .. } => {
            println!("{} {} is not installed", red("✘"), bold(&model));
            println!("   Pull it using: ollama pull {model}");
        }
        ModelStatus::Unreachable { reason } => bail!(reason),
    }
    Ok(())
}

async fn run_extract(config: PipelineConfig, input: &str, preview: Option<usize>) -> Result<()> {
    let mut ws = Workspace::new(config)?;
    let text = ws.load_path(input).await?;
    let out = match preview {
        Some(n) => text.preview(n),
        None => text.as_str().to_string(),
    };
    println!("{out}");
    eprintln!(
        "{}",
        dim(&format!(
            "{} pages, {} characters",
            text.page_count(),
            text.char_count()
        ))
    );
    Ok(())
}

async fn run_summarize(config: PipelineConfig, source: &SourceArgs, json: bool, quiet: bool) -> Result<()> {
    let mut ws = Workspace::new(config)?;
    load_source(&mut ws, source).await?;
    let summary = ws.generate_summary().await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(summary).context("Failed to serialise summary")?
        );
        return Ok(());
    }

    println!("{}", summary.text);
    if summary.source_truncated && !quiet {
        eprintln!(
            "{} The document was too long; the summary covers its beginning only.",
            cyan("⚠")
        );
    }
    Ok(())
}

async fn run_quiz(config: PipelineConfig, source: &SourceArgs, json: bool) -> Result<()> {
    let mut ws = Workspace::new(config)?;
    load_source(&mut ws, source).await?;
    let quiz = ws.generate_quiz().await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(quiz).context("Failed to serialise quiz")?
        );
        return Ok(());
    }

    let questions = quiz.questions().to_vec();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    'questions: for (i, q) in questions.iter().enumerate() {
        println!();
        println!("{}", bold(&format!("{}. {}", i + 1, q.prompt())));
        for (j, choice) in q.choices().iter().enumerate() {
            println!("   {}) {}", (b'A' + j as u8) as char, choice);
        }
        loop {
            print!("{} ", cyan("Your answer (A–D, Enter to skip):"));
            io::stdout().flush().ok();
            let Some(line) = lines.next() else {
                break 'questions;
            };
            let line = line.context("Failed to read answer")?;
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            match ws.select_answer(i, line) {
                Ok(()) => break,
                Err(e) => eprintln!("{} {}", red("✗"), e),
            }
        }
    }

    let score = ws.submit_quiz()?;
    println!();
    if let Some(results) = ws.session().results() {
        for r in &results {
            let mark = if r.is_correct { green("✓") } else { red("✗") };
            let correct = &r.choices[r.correct];
            println!("{} {}. {}", mark, r.index + 1, r.prompt);
            if !r.is_correct {
                let yours = r
                    .selected
                    .and_then(|s| r.choices.get(s))
                    .map(String::as_str)
                    .unwrap_or("(no answer)");
                println!("   your answer: {}  correct: {}", red(yours), green(correct));
            }
            if let Some(ref e) = r.explanation {
                println!("   {}", dim(e));
            }
        }
    }
    let total = ws.session().total();
    println!();
    println!(
        "{}",
        bold(&format!(
            "Score: {score}/{total} ({:.0}%)",
            ws.session().snapshot().percentage
        ))
    );
    Ok(())
}
