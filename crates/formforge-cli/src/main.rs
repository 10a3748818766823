//! Formforge CLI
//!
//! Command-line surface over `formforge-core`:
//! - Generating a form schema from a description (AI with keyword fallback)
//! - Listing contradictions a description contains
//! - Checking, editing and resolving clarifications on saved documents
//!
//! Documents are JSON on stdout; diagnostics and logs go to stderr.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use formforge_core::ai::{AiGenerator, GeneratedForm, GenerationSettings};
use formforge_core::editor::{apply_edits, FieldDraft, FieldEdit, FieldKind, Resolution};
use formforge_core::llm::{ConfigError, LLMConfig, UnifiedClient};
use formforge_core::schema::SchemaDocument;
use formforge_core::{ambiguity, FallbackGenerator};

#[derive(Parser)]
#[command(name = "formforge")]
#[command(
    author,
    version,
    about = "Formforge: describe a form in plain language, get a renderable schema"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a schema document from a description.
    ///
    /// Uses the configured LLM provider (see OPENROUTER_API_KEY and friends)
    /// and falls back to keyword rules when none is configured or the call fails.
    Generate {
        description: String,
        /// Skip the LLM and use the keyword rules only
        #[arg(long)]
        offline: bool,
        /// Write the document here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List the contradictions a description contains
    Detect { description: String },

    /// Validate a saved document
    Check { file: PathBuf },

    /// Apply one edit to a saved document
    Edit {
        file: PathBuf,
        /// Overwrite FILE instead of printing the result
        #[arg(long)]
        in_place: bool,
        #[command(subcommand)]
        op: EditCommands,
    },

    /// Apply a JSON array of edits, in order
    Apply {
        file: PathBuf,
        edits: PathBuf,
        #[arg(long)]
        in_place: bool,
    },

    /// Answer a clarification request
    Resolve {
        file: PathBuf,
        /// Position of the request in `followups`
        #[arg(long)]
        index: usize,
        /// Id of one of the offered options
        #[arg(long, conflicts_with = "custom", required_unless_present = "custom")]
        option: Option<String>,
        /// Free-text answer
        #[arg(long)]
        custom: Option<String>,
        #[arg(long)]
        in_place: bool,
    },

    /// List the fields the keyword rules can produce
    #[command(hide = true)]
    Rules,
}

#[derive(Subcommand)]
enum EditCommands {
    /// Append a field
    Add {
        key: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_enum, default_value_t = KindArg::Text)]
        kind: KindArg,
        #[arg(long)]
        required: bool,
        #[arg(long)]
        placeholder: Option<String>,
        /// Choice for dropdown / multi-select fields (repeatable)
        #[arg(long = "option")]
        options: Vec<String>,
    },
    /// Remove a field
    Remove { key: String },
    /// Set the full field order
    Reorder {
        #[arg(required = true, num_args = 1..)]
        keys: Vec<String>,
    },
    /// Move one field to a position
    Move { key: String, to: usize },
    /// Toggle whether a field is required
    Require { key: String },
    /// Change a field's title
    Rename { key: String, title: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Text,
    Email,
    Number,
    Integer,
    Checkbox,
    MultiSelect,
    Dropdown,
}

impl From<KindArg> for FieldKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Text => FieldKind::Text,
            KindArg::Email => FieldKind::Email,
            KindArg::Number => FieldKind::Number,
            KindArg::Integer => FieldKind::Integer,
            KindArg::Checkbox => FieldKind::Checkbox,
            KindArg::MultiSelect => FieldKind::MultiSelect,
            KindArg::Dropdown => FieldKind::Dropdown,
        }
    }
}

impl EditCommands {
    fn into_edit(self) -> FieldEdit {
        match self {
            EditCommands::Add {
                key,
                title,
                kind,
                required,
                placeholder,
                options,
            } => FieldEdit::AddDraft {
                draft: FieldDraft {
                    title: title.unwrap_or_else(|| key.clone()),
                    key,
                    kind: kind.into(),
                    required,
                    placeholder,
                    options,
                },
            },
            EditCommands::Remove { key } => FieldEdit::Remove { key },
            EditCommands::Reorder { keys } => FieldEdit::Reorder { order: keys },
            EditCommands::Move { key, to } => FieldEdit::Move { key, to },
            EditCommands::Require { key } => FieldEdit::ToggleRequired { key },
            EditCommands::Rename { key, title } => FieldEdit::RenameTitle { key, title },
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("FORMFORGE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the process environment still applies.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            description,
            offline,
            out,
        } => cmd_generate(&description, offline, out.as_deref()).await,
        Commands::Detect { description } => cmd_detect(&description),
        Commands::Check { file } => cmd_check(&file),
        Commands::Edit { file, in_place, op } => {
            let doc = load_document(&file)?;
            let edited = op
                .into_edit()
                .apply(&doc)
                .with_context(|| format!("failed to edit {}", file.display()))?;
            emit_document(&edited, &file, in_place)
        }
        Commands::Apply {
            file,
            edits,
            in_place,
        } => cmd_apply(&file, &edits, in_place),
        Commands::Resolve {
            file,
            index,
            option,
            custom,
            in_place,
        } => {
            let resolution = match (option, custom) {
                (Some(id), _) => Resolution::Option(id),
                (None, Some(text)) => Resolution::Custom(text),
                (None, None) => return Err(anyhow!("pass --option or --custom")),
            };
            let doc = load_document(&file)?;
            let resolved = FieldEdit::Resolve { index, resolution }
                .apply(&doc)
                .with_context(|| format!("failed to resolve clarification #{index}"))?;
            emit_document(&resolved, &file, in_place)
        }
        Commands::Rules => {
            for key in FallbackGenerator::new().rule_keys() {
                println!("{key}");
            }
            Ok(())
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_generate(description: &str, offline: bool, out: Option<&Path>) -> Result<()> {
    let form = if offline {
        GeneratedForm::offline(description)
    } else {
        match LLMConfig::from_env() {
            Ok(config) => {
                tracing::info!(provider = config.provider.as_str(), model = %config.model, "using LLM provider");
                let settings = GenerationSettings::from_config(&config);
                let client = UnifiedClient::from_config(config).context("failed to build LLM client")?;
                AiGenerator::new(Arc::new(client), settings)
                    .generate(description)
                    .await
            }
            Err(ConfigError::NoProviderConfigured) => {
                tracing::warn!("no LLM provider configured, using keyword rules");
                GeneratedForm::offline(description)
            }
            Err(err) => return Err(err).context("invalid LLM configuration"),
        }
    };

    let json = to_pretty_json(&form)?;
    match out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{} {} ({} fields, source: {})",
                "wrote".green().bold(),
                path.display().to_string().bold(),
                form.document.len(),
                if form.is_fallback() { "fallback" } else { "ai" }
            );
        }
        None => println!("{json}"),
    }
    if !form.document.followups.is_empty() {
        eprintln!(
            "{} {} clarification(s) pending; see `followups`",
            "info:".yellow().bold(),
            form.document.followups.len()
        );
    }
    Ok(())
}

fn cmd_detect(description: &str) -> Result<()> {
    let followups = ambiguity::detect(description);
    if followups.is_empty() {
        eprintln!("{} no contradictions found", "ok".green().bold());
    } else {
        for request in &followups {
            let field = request.field.as_deref().unwrap_or("-");
            eprintln!("{} [{}] {}", "conflict".yellow().bold(), field, request.message);
            for option in &request.options {
                eprintln!("  {} {}: {}", "→".yellow(), option.id.bold(), option.label);
            }
        }
    }
    println!("{}", to_pretty_json(&followups)?);
    Ok(())
}

fn cmd_check(file: &Path) -> Result<()> {
    let doc = load_document(file)?;
    match doc.validate() {
        Ok(()) => {
            println!(
                "{} {} ({} fields, {} required, {} followups)",
                "ok".green().bold(),
                file.display(),
                doc.len(),
                doc.schema.required.len(),
                doc.followups.len()
            );
            Ok(())
        }
        Err(violations) => {
            for violation in &violations {
                eprintln!("{} {}", "error:".red().bold(), violation);
            }
            Err(anyhow!(
                "{} has {} integrity violation(s)",
                file.display(),
                violations.len()
            ))
        }
    }
}

fn cmd_apply(file: &Path, edits_path: &Path, in_place: bool) -> Result<()> {
    let doc = load_document(file)?;
    let raw = fs::read_to_string(edits_path)
        .with_context(|| format!("failed to read {}", edits_path.display()))?;
    let edits: Vec<FieldEdit> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of edits", edits_path.display()))?;
    let edited = apply_edits(&doc, &edits)?;
    tracing::info!(edits = edits.len(), "applied edits");
    emit_document(&edited, file, in_place)
}

// ============================================================================
// I/O helpers
// ============================================================================

/// Read a document. A saved `GeneratedForm` loads too; its `source` is ignored.
fn load_document(path: &Path) -> Result<SchemaDocument> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a schema document", path.display()))
}

fn emit_document(doc: &SchemaDocument, file: &Path, in_place: bool) -> Result<()> {
    let json = to_pretty_json(doc)?;
    if in_place {
        fs::write(file, json).with_context(|| format!("failed to write {}", file.display()))?;
        eprintln!("{} {}", "wrote".green().bold(), file.display().to_string().bold());
    } else {
        println!("{json}");
    }
    Ok(())
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize JSON")
}
