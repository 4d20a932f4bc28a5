//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use docchat_core::{
    ChatSession, KnowledgeBuffer, ProgressReporter, knowledge_base, knowledge_cache, start_session,
};
use docchat_shared::{
    AppConfig, DocChatError, ErrorMessages, Message, Role, init_config, load_config,
    load_secrets, resolve_config_path,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DocChat: ask questions about the documents in a Google Drive folder.
#[derive(Parser)]
#[command(
    name = "docchat",
    version,
    about = "Chat with the Google Docs and PDFs in a Drive folder.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to config.toml (defaults to ./config.toml, then ~/.docchat/config.toml).
    #[arg(long, env = "DOCCHAT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Path to secrets.toml (defaults to ./.docchat/secrets.toml, then ~/.docchat/secrets.toml).
    #[arg(long, env = "DOCCHAT_SECRETS", global = true)]
    pub secrets: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start an interactive chat session.
    Chat,

    /// Ask a single question and print the answer.
    Ask {
        /// The question (remaining arguments are joined with spaces).
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Build the knowledge base and print what it contains.
    Knowledge {
        /// Print the full knowledge buffer instead of a summary.
        #[arg(long)]
        full: bool,

        /// Print the summary as JSON.
        #[arg(long, conflicts_with = "full")]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file and sample prompt template with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so answers on
/// stdout stay clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docchat=warn",
        1 => "docchat=info",
        2 => "docchat=debug",
        _ => "docchat=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();
    let secrets_path = cli.secrets.as_deref();

    match cli.command {
        Command::Chat => cmd_chat(config_path, secrets_path).await,
        Command::Ask { question } => cmd_ask(config_path, secrets_path, &question.join(" ")).await,
        Command::Knowledge { full, json } => {
            cmd_knowledge(config_path, secrets_path, full, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load config, rendering a failure with the built-in messages.
fn load_or_report(config_path: Option<&Path>) -> std::result::Result<AppConfig, ExitCode> {
    load_config(config_path).map_err(|err| report(&ErrorMessages::builtin(), &err))
}

/// Print the user-facing message for `err` and pick the exit code.
fn report(messages: &ErrorMessages, err: &DocChatError) -> ExitCode {
    warn!(scenario = err.scenario(), error = %err.detail(), "command failed");
    eprintln!("  ✗ {}", messages.for_error(err));
    ExitCode::FAILURE
}

fn print_header(config: &AppConfig) {
    println!();
    println!("  {} {}", config.app.icon, config.app.title);
    if !config.app.caption.is_empty() {
        println!("  {}", config.app.caption);
    }
    println!();
}

fn print_message(message: &Message) {
    let label = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    println!("  [{label}]");
    for line in message.content.lines() {
        println!("  {line}");
    }
    println!();
}

async fn cmd_chat(config_path: Option<&Path>, secrets_path: Option<&Path>) -> Result<ExitCode> {
    let config = match load_or_report(config_path) {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };
    let messages = &config.error_messages;
    print_header(&config);

    let progress = CliProgress::new("Loading knowledge base");
    let started = start_session(&config, secrets_path, knowledge_cache(&config), &progress).await;
    progress.finish();
    let mut session = match started {
        Ok(session) => session,
        Err(err) => return Ok(report(messages, &err)),
    };

    for message in session.conversation().history() {
        print_message(message);
    }
    println!(
        "  {} (/refresh reloads documents, /quit exits)",
        config.app.chat_input_placeholder
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("› ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();

        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/refresh" => {
                let progress = CliProgress::new("Refreshing knowledge base");
                let refreshed = session.knowledge().refresh(&progress).await;
                progress.finish();
                match refreshed {
                    Ok(buffer) => println!("  Loaded {} documents.\n", buffer.documents().len()),
                    Err(err) if err.halts_chat() => return Ok(report(messages, &err)),
                    Err(err) => {
                        report(messages, &err);
                        println!();
                    }
                }
                continue;
            }
            _ => {}
        }

        match ask_with_spinner(&mut session, question).await {
            Ok(answer) => print_message(&Message::assistant(answer)),
            Err(err) if err.halts_chat() => return Ok(report(messages, &err)),
            Err(err) => {
                report(messages, &err);
                println!();
            }
        }
    }

    info!(turns = session.conversation().len(), "chat ended");
    Ok(ExitCode::SUCCESS)
}

async fn ask_with_spinner(
    session: &mut ChatSession,
    question: &str,
) -> std::result::Result<String, DocChatError> {
    let progress = CliProgress::new("Thinking...");
    let answer = session.ask(question, &progress).await;
    progress.finish();
    answer
}

async fn cmd_ask(
    config_path: Option<&Path>,
    secrets_path: Option<&Path>,
    question: &str,
) -> Result<ExitCode> {
    let config = match load_or_report(config_path) {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };

    let progress = CliProgress::new("Loading knowledge base");
    let started = start_session(&config, secrets_path, knowledge_cache(&config), &progress).await;
    progress.finish();
    let mut session = match started {
        Ok(session) => session,
        Err(err) => return Ok(report(&config.error_messages, &err)),
    };

    match ask_with_spinner(&mut session, question).await {
        Ok(answer) => {
            println!("{answer}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(report(&config.error_messages, &err)),
    }
}

async fn cmd_knowledge(
    config_path: Option<&Path>,
    secrets_path: Option<&Path>,
    full: bool,
    json: bool,
) -> Result<ExitCode> {
    let config = match load_or_report(config_path) {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };
    let messages = &config.error_messages;

    let secrets = match load_secrets(secrets_path, &config.completion.api_key_env) {
        Ok(secrets) => secrets,
        Err(err) => return Ok(report(messages, &err)),
    };
    let kb = match knowledge_base(&config, &secrets, knowledge_cache(&config)) {
        Ok(kb) => kb,
        Err(err) => return Ok(report(messages, &err)),
    };

    let progress = CliProgress::new("Loading knowledge base");
    let built = kb.current(&progress).await;
    progress.finish();
    let buffer = match built {
        Ok(buffer) => buffer,
        Err(err) => return Ok(report(messages, &err)),
    };

    if full {
        print!("{buffer}");
    } else if json {
        let summary = serde_json::json!({
            "folder_id": kb.folder_id(),
            "documents": buffer.documents(),
            "bytes": buffer.len(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(kb.folder_id(), &buffer);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary(folder_id: &str, buffer: &KnowledgeBuffer) {
    println!();
    println!("  Folder:    {folder_id}");
    println!("  Documents: {}", buffer.documents().len());
    println!("  Size:      {} bytes", buffer.len());
    println!();
    for name in buffer.documents() {
        println!("    - {name}");
    }
    println!();
}

fn cmd_config_init() -> Result<ExitCode> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<ExitCode> {
    let path = resolve_config_path(config_path)?;
    let config = match load_or_report(config_path) {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };
    println!("# {}", path.display());
    println!("# prompt template: {}", config.template_path().display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_loaded(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Reading [{current}/{total}] {name}"));
    }

    fn document_skipped(&self, name: &str, reason: &str) {
        self.spinner
            .println(format!("  ! skipped '{name}': {reason}"));
    }

    fn done(&self, buffer: &KnowledgeBuffer) {
        self.spinner.set_message(format!(
            "Knowledge base ready ({} documents)",
            buffer.documents().len()
        ));
    }
}
