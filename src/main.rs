// PromptShelf — Prompt library for coding assistants
// License: Apache-2.0

use clap::{Args, Parser, Subcommand, ValueEnum};
use promptshelf::analytics;
use promptshelf::config::Config;
use promptshelf::context::{self, Diagnostic, EditorContext, EditorSnapshot};
use promptshelf::evaluator::{evaluate_or_fallback, Evaluator, LlmEvaluator, PromptScore};
use promptshelf::preferences::{existing_favorites, JsonPreferencesStore, PreferencesStore};
use promptshelf::prompt::{parse_tag_list, CategoryKind, Entry, PromptDocument, PromptTree};
use promptshelf::provider::factory::create_provider;
use promptshelf::relevance;
use promptshelf::search::{search, tag_counts};
use promptshelf::store::{NewPrompt, PromptPatch, PromptStore, StorePaths};
use promptshelf::submission;
use promptshelf::transfer;
use promptshelf::usage::{self, chat_sink, clipboard_sink, OutputSink, StdoutSink, UseRequest};
use promptshelf::variables::{TerminalInput, VariableInput};
use promptshelf::ShelfError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const LOGO: &str = "📚";

/// Exit code for a user-cancelled action, as for SIGINT.
const EXIT_CANCELLED: i32 = 130;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "promptshelf",
    about = "PromptShelf — Prompt library for coding assistants",
    version
)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill in a prompt's variables and deliver it
    Use {
        /// Prompt id
        id: String,
        /// Preset variable values (name=value), may be repeated
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
        /// Where to send the processed prompt: stdout, clipboard or chat:<name>
        #[arg(long, default_value = "stdout")]
        to: String,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Add a user prompt (asks for missing fields)
    Add {
        #[arg(short, long)]
        label: Option<String>,
        /// Prompt text
        #[arg(short, long)]
        body: Option<String>,
        /// Read the prompt text from a file
        #[arg(long, conflicts_with = "body")]
        body_file: Option<PathBuf>,
        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
        /// User category, group or prompt to add next to
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Edit a user prompt
    Edit {
        id: String,
        #[arg(short, long)]
        label: Option<String>,
        #[arg(short, long)]
        body: Option<String>,
        /// Replace tags (comma-separated)
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// Delete a user prompt, group or category
    Delete {
        id: String,
        /// Skip the confirmation question
        #[arg(short, long)]
        yes: bool,
    },
    /// Add a group to a user category
    AddGroup {
        category: String,
        label: String,
    },
    /// Add a user category
    AddCategory { label: String },
    /// Search prompts and keep the filter for `list`
    Search {
        query: String,
        /// Show results without keeping the filter
        #[arg(long)]
        once: bool,
    },
    /// Drop the active search and tag filter
    ClearSearch,
    /// Show tag counts, or filter by tags
    Tags {
        /// Tags to filter by (comma-separated)
        #[arg(short, long)]
        select: Option<String>,
        /// Require every selected tag instead of any
        #[arg(long)]
        all: bool,
    },
    /// Toggle a prompt's favorite flag
    Favorite { id: String },
    /// List prompts
    List {
        #[arg(long, value_enum, default_value_t = ListView::All)]
        view: ListView,
    },
    /// Show one prompt in full
    Show { id: String },
    /// Export system prompts to a file
    Export { path: PathBuf },
    /// Replace system prompts with a file's contents (user prompts are kept)
    Import { path: PathBuf },
    /// Usage and quality report
    Analytics,
    /// Compose a submission email for a user prompt
    Submit {
        id: String,
        /// Open the message in the default mail client
        #[arg(long)]
        open: bool,
        /// Copy the message text to the clipboard
        #[arg(long)]
        copy: bool,
    },
    /// List configured chat commands
    ChatCommands,
    /// Pick from favorites and recent prompts
    Quick {
        #[arg(long, default_value = "stdout")]
        to: String,
    },
    /// Rank prompts for an editor context
    Suggest {
        #[command(flatten)]
        context: ContextArgs,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Score a prompt with the evaluator
    Evaluate {
        /// Prompt id
        id: Option<String>,
        /// Score free text instead of a stored prompt
        #[arg(long, conflicts_with = "id")]
        text: Option<String>,
    },
    /// Browse prompts in the terminal
    Browse {
        #[arg(long, default_value = "stdout")]
        to: String,
    },
    /// Create the config and install the bundled system prompts
    Init {
        /// Overwrite an existing system prompts file
        #[arg(long)]
        force: bool,
    },
    /// Show configuration and storage status
    Status,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ListView {
    All,
    Favorites,
    Recent,
}

/// Editor state passed on the command line.
#[derive(Args)]
struct ContextArgs {
    /// File the cursor is in
    #[arg(long)]
    file: Option<PathBuf>,
    /// Cursor line (1-based)
    #[arg(long, default_value_t = 1)]
    line: usize,
    /// Selected text
    #[arg(long)]
    selection: Option<String>,
    /// Diagnostic at a line, as LINE:CODE:MESSAGE (may be repeated)
    #[arg(long = "diag", value_name = "LINE:CODE:MESSAGE")]
    diagnostics: Vec<String>,
    /// Language id, inferred from the file extension when absent
    #[arg(long)]
    language: Option<String>,
}

impl ContextArgs {
    fn is_empty(&self) -> bool {
        self.file.is_none() && self.selection.is_none() && self.diagnostics.is_empty()
    }

    fn to_context(&self) -> anyhow::Result<Option<EditorContext>> {
        if self.is_empty() {
            return Ok(None);
        }
        let cursor = self.line.saturating_sub(1);
        let mut snapshot = match &self.file {
            Some(path) => EditorSnapshot::from_file(path, cursor)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?,
            None => EditorSnapshot {
                file_name: "untitled".into(),
                cursor_line: cursor,
                ..Default::default()
            },
        };
        snapshot.selection = self.selection.clone();
        snapshot.language = self.language.clone();
        snapshot.workspace_root = std::env::current_dir().ok();
        for raw in &self.diagnostics {
            let diag = Diagnostic::parse_cli(raw).ok_or_else(|| {
                anyhow::anyhow!("invalid diagnostic '{}', expected LINE:CODE:MESSAGE", raw)
            })?;
            snapshot.diagnostics.push(diag);
        }
        Ok(Some(context::detect(&snapshot)))
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    promptshelf::logger::init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(command) => run(command, cfg).await,
        None => list_cmd(&cfg, ListView::All).await,
    };

    if let Err(e) = result {
        let cancelled = e
            .downcast_ref::<ShelfError>()
            .is_some_and(ShelfError::is_cancelled);
        if cancelled {
            eprintln!("Cancelled.");
            std::process::exit(EXIT_CANCELLED);
        }
        eprintln!("{} Error: {}", LOGO, e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, cfg: Config) -> anyhow::Result<()> {
    match command {
        Commands::Use {
            id,
            vars,
            to,
            context,
        } => use_cmd(&cfg, &id, &vars, &to, &context).await,
        Commands::Add {
            label,
            body,
            body_file,
            tags,
            parent,
        } => add_cmd(&cfg, label, body, body_file, tags, parent).await,
        Commands::Edit {
            id,
            label,
            body,
            tags,
        } => edit_cmd(&cfg, &id, label, body, tags).await,
        Commands::Delete { id, yes } => delete_cmd(&cfg, &id, yes).await,
        Commands::AddGroup { category, label } => {
            let mut store = open_store(&cfg).await?;
            let id = store.add_group(&category, &label).await?;
            println!("  ✅ Group {} created", id);
            Ok(())
        }
        Commands::AddCategory { label } => {
            let mut store = open_store(&cfg).await?;
            let id = store.add_category(&label).await?;
            println!("  ✅ Category {} created", id);
            Ok(())
        }
        Commands::Search { query, once } => search_cmd(&cfg, &query, once).await,
        Commands::ClearSearch => {
            let prefs_store = preferences(&cfg)?;
            let mut prefs = prefs_store.load()?;
            prefs.filter = Default::default();
            prefs_store.save(&prefs)?;
            println!("  ✅ Filter cleared");
            Ok(())
        }
        Commands::Tags { select, all } => tags_cmd(&cfg, select, all).await,
        Commands::Favorite { id } => favorite_cmd(&cfg, &id).await,
        Commands::List { view } => list_cmd(&cfg, view).await,
        Commands::Show { id } => show_cmd(&cfg, &id).await,
        Commands::Export { path } => {
            let store = open_store(&cfg).await?;
            let count = transfer::export_system(&store, &path).await?;
            println!("  ✅ Exported {} system prompts to {}", count, path.display());
            Ok(())
        }
        Commands::Import { path } => {
            let mut store = open_store(&cfg).await?;
            let summary = transfer::import_system(&mut store, &path).await?;
            println!(
                "  ✅ Imported {} categories, {} prompts ({} ids renumbered). User prompts untouched.",
                summary.categories, summary.prompts, summary.reassigned
            );
            Ok(())
        }
        Commands::Analytics => {
            let store = open_store(&cfg).await?;
            let prefs = preferences(&cfg)?.load()?;
            println!("{}", analytics::format_report(&analytics::report(store.tree(), &prefs)));
            Ok(())
        }
        Commands::Submit { id, open, copy } => submit_cmd(&cfg, &id, open, copy).await,
        Commands::ChatCommands => {
            chat_commands_cmd(&cfg);
            Ok(())
        }
        Commands::Quick { to } => quick_cmd(&cfg, &to).await,
        Commands::Suggest { context, limit } => suggest_cmd(&cfg, &context, limit).await,
        Commands::Evaluate { id, text } => evaluate_cmd(&cfg, id, text).await,
        Commands::Browse { to } => browse_cmd(&cfg, &to).await,
        Commands::Init { force } => init_cmd(&cfg, force).await,
        Commands::Status => {
            status_cmd(&cfg).await;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

fn load_config(path: Option<&str>) -> Config {
    let config_path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        Config::default_path().unwrap_or_else(|_| PathBuf::from("config.json"))
    };

    Config::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    })
}

fn build_evaluator(cfg: &Config) -> Option<Arc<dyn Evaluator>> {
    if !cfg.evaluation_active() {
        tracing::debug!("Prompt evaluation disabled");
        return None;
    }
    match create_provider(cfg) {
        Ok(provider) => {
            let evaluator: Arc<dyn Evaluator> = Arc::new(LlmEvaluator::new(Arc::from(provider)));
            Some(evaluator)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Evaluator unavailable");
            None
        }
    }
}

async fn open_store(cfg: &Config) -> anyhow::Result<PromptStore> {
    cfg.validate()?;
    let paths = StorePaths {
        system: cfg.system_prompts_path()?,
        user: cfg.user_prompts_path()?,
    };
    let store = PromptStore::open(
        paths,
        build_evaluator(cfg),
        Duration::from_secs(cfg.evaluator.timeout_secs),
    )
    .await?;
    Ok(store)
}

fn preferences(cfg: &Config) -> anyhow::Result<JsonPreferencesStore> {
    Ok(JsonPreferencesStore::new(cfg.preferences_path()?))
}

fn sink_for(cfg: &Config, target: &str) -> anyhow::Result<Box<dyn OutputSink>> {
    let sink: Box<dyn OutputSink> = match target {
        "stdout" | "-" => Box::new(StdoutSink),
        "clipboard" => Box::new(clipboard_sink(&cfg.output)?),
        other => match other.strip_prefix("chat:") {
            Some(name) => Box::new(chat_sink(&cfg.output, name)?),
            None => anyhow::bail!(
                "unknown target '{}', expected stdout, clipboard or chat:<name>",
                other
            ),
        },
    };
    Ok(sink)
}

fn parse_vars(raw: &[String]) -> anyhow::Result<HashMap<String, String>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| anyhow::anyhow!("invalid --var '{}', expected NAME=VALUE", pair))
        })
        .collect()
}

/// Ask for a value on the terminal. Ctrl-C / Ctrl-D cancel.
fn ask(question: &str, default: Option<&str>) -> anyhow::Result<String> {
    let mut input = TerminalInput::new()?;
    Ok(input.ask(question, default)?)
}

// ---------------------------------------------------------------------------
// Prompt commands
// ---------------------------------------------------------------------------

async fn use_cmd(
    cfg: &Config,
    id: &str,
    vars: &[String],
    to: &str,
    context_args: &ContextArgs,
) -> anyhow::Result<()> {
    let store = open_store(cfg).await?;
    let presets = parse_vars(vars)?;
    let ctx = context_args.to_context()?;
    deliver(cfg, &store, id, ctx.as_ref(), &presets, to).await
}

async fn deliver(
    cfg: &Config,
    store: &PromptStore,
    id: &str,
    ctx: Option<&EditorContext>,
    presets: &HashMap<String, String>,
    to: &str,
) -> anyhow::Result<()> {
    let sink = sink_for(cfg, to)?;
    let prefs = preferences(cfg)?;
    let mut input = TerminalInput::new()?;

    usage::use_prompt(
        store,
        UseRequest {
            id,
            context: ctx,
            presets,
        },
        &mut input,
        sink.as_ref(),
        &prefs,
    )
    .await?;

    if to != "stdout" && to != "-" {
        eprintln!("  ✅ Prompt {} sent to {}", id, sink.name());
    }
    Ok(())
}

async fn add_cmd(
    cfg: &Config,
    label: Option<String>,
    body: Option<String>,
    body_file: Option<PathBuf>,
    tags: Option<String>,
    parent: Option<String>,
) -> anyhow::Result<()> {
    let mut store = open_store(cfg).await?;

    let label = match label {
        Some(l) => l,
        None => ask("Label", None)?,
    };
    let body = match (body, body_file) {
        (Some(b), _) => b,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?,
        (None, None) => ask("Prompt text", None)?,
    };
    let tags = match tags {
        Some(t) => t,
        None => ask("Tags (comma-separated)", Some(""))?,
    };

    let id = store
        .add(
            NewPrompt {
                label,
                body,
                tags: parse_tag_list(&tags),
            },
            parent.as_deref(),
        )
        .await?;

    println!("  ✅ Prompt {} added", id);
    if let Some(score) = store.prompt(&id).and_then(|p| p.evaluation.as_ref()) {
        print_score(score);
    }
    Ok(())
}

async fn edit_cmd(
    cfg: &Config,
    id: &str,
    label: Option<String>,
    body: Option<String>,
    tags: Option<String>,
) -> anyhow::Result<()> {
    let mut store = open_store(cfg).await?;
    let Some(current) = store.prompt(id).cloned() else {
        return Err(ShelfError::NotFound(id.to_string()).into());
    };
    if !store.is_mutable(id) {
        return Err(ShelfError::ReadOnly(id.to_string()).into());
    }

    let interactive = label.is_none() && body.is_none() && tags.is_none();
    let patch = if interactive {
        let current_tags = current.tags.iter().cloned().collect::<Vec<_>>().join(", ");
        PromptPatch {
            label: Some(ask("Label", Some(&current.label))?),
            body: Some(ask("Prompt text", Some(&current.body))?),
            tags: Some(parse_tag_list(&ask("Tags", Some(&current_tags))?)),
        }
    } else {
        PromptPatch {
            label,
            body,
            tags: tags.as_deref().map(parse_tag_list),
        }
    };

    store.update(id, patch).await?;
    println!("  ✅ Prompt {} updated", id);
    if let Some(score) = store.prompt(id).and_then(|p| p.evaluation.as_ref()) {
        print_score(score);
    }
    Ok(())
}

async fn delete_cmd(cfg: &Config, id: &str, yes: bool) -> anyhow::Result<()> {
    let mut store = open_store(cfg).await?;
    let Some(entry) = store.find_by_id(id) else {
        return Err(ShelfError::NotFound(id.to_string()).into());
    };
    if !store.is_mutable(id) {
        return Err(ShelfError::ReadOnly(id.to_string()).into());
    }

    if !yes {
        let question = format!("Delete {} '{}'? [y/N]", entry.kind_name(), entry.label());
        let answer = ask(&question, None)?;
        if !matches!(answer.to_lowercase().as_str(), "y" | "yes") {
            return Err(ShelfError::Cancelled.into());
        }
    }

    store.delete(id).await?;
    let prefs_store = preferences(cfg)?;
    let mut prefs = prefs_store.load()?;
    if prefs.prune(|pid| store.find_by_id(pid).is_some()) {
        prefs_store.save(&prefs)?;
    }
    println!("  ✅ Deleted {}", id);
    Ok(())
}

async fn search_cmd(cfg: &Config, query: &str, once: bool) -> anyhow::Result<()> {
    let store = open_store(cfg).await?;
    let prefs_store = preferences(cfg)?;
    let mut prefs = prefs_store.load()?;

    let result = search(store.tree(), query);
    if result.prompt_count() == 0 {
        println!("  No prompts match '{}'", query);
    } else {
        print_tree(&result, &prefs.favorites);
    }

    prefs.record_search(query);
    if !once {
        prefs.filter.query = query.trim().to_string();
    }
    prefs_store.save(&prefs)?;
    Ok(())
}

async fn tags_cmd(cfg: &Config, select: Option<String>, all: bool) -> anyhow::Result<()> {
    let store = open_store(cfg).await?;
    let prefs_store = preferences(cfg)?;

    let Some(select) = select else {
        println!("{} Tags\n", LOGO);
        for (tag, count) in tag_counts(store.tree()) {
            println!("  {:<24} {:>4}", tag, count);
        }
        return Ok(());
    };

    let mut prefs = prefs_store.load()?;
    prefs.filter.tags = parse_tag_list(&select);
    prefs.filter.match_all = all;
    prefs_store.save(&prefs)?;

    let result = prefs.filter.apply(store.tree());
    if result.prompt_count() == 0 {
        println!("  No prompts carry {}", select);
    } else {
        print_tree(&result, &prefs.favorites);
    }
    Ok(())
}

async fn favorite_cmd(cfg: &Config, id: &str) -> anyhow::Result<()> {
    let store = open_store(cfg).await?;
    if store.prompt(id).is_none() {
        return Err(ShelfError::NotFound(id.to_string()).into());
    }
    let prefs_store = preferences(cfg)?;
    let mut prefs = prefs_store.load()?;
    let starred = prefs.toggle_favorite(id);
    prefs_store.save(&prefs)?;
    if starred {
        println!("  ★ {} added to favorites", id);
    } else {
        println!("  ☆ {} removed from favorites", id);
    }
    Ok(())
}

async fn list_cmd(cfg: &Config, view: ListView) -> anyhow::Result<()> {
    let store = open_store(cfg).await?;
    let prefs = preferences(cfg)?.load()?;
    let tree = prefs.filter.apply(store.tree());

    if !prefs.filter.is_empty() {
        println!(
            "  (filtered: query '{}', tags [{}]; run `promptshelf clear-search` to reset)\n",
            prefs.filter.query,
            prefs.filter.tags.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    match view {
        ListView::All => print_tree(&tree, &prefs.favorites),
        ListView::Favorites => {
            let ids = existing_favorites(&prefs, |id| tree.prompt(id).is_some());
            print_flat(&tree, ids.iter().map(String::as_str), "No favorites yet");
        }
        ListView::Recent => {
            print_flat(
                &tree,
                prefs.recent.iter().map(String::as_str),
                "No recently used prompts",
            );
        }
    }
    Ok(())
}

async fn show_cmd(cfg: &Config, id: &str) -> anyhow::Result<()> {
    let store = open_store(cfg).await?;
    let prefs = preferences(cfg)?.load()?;
    let Some(prompt) = store.prompt(id) else {
        return Err(ShelfError::NotFound(id.to_string()).into());
    };

    let kind = store.kind_of(id).map(|k| k.as_str()).unwrap_or("unknown");
    let location: Vec<&str> = store
        .tree()
        .ancestors(id)
        .iter()
        .filter_map(|a| store.find_by_id(a).map(Entry::label))
        .collect();

    println!("{} {}", LOGO, prompt.label);
    println!("  Id:        {} ({})", prompt.id, kind);
    println!("  Location:  {}", location.join(" / "));
    println!(
        "  Tags:      {}",
        prompt.tags.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    println!(
        "  Variables: {}",
        promptshelf::variables::extract_variables(&prompt.body).join(", ")
    );
    println!("  Favorite:  {}", if prefs.is_favorite(id) { "yes" } else { "no" });
    println!("  Used:      {} times", prefs.use_count(id));
    if let Some(score) = &prompt.evaluation {
        print_score(score);
    }
    println!("\n{}", prompt.body);
    Ok(())
}

// ---------------------------------------------------------------------------
// Context and evaluation
// ---------------------------------------------------------------------------

async fn suggest_cmd(cfg: &Config, args: &ContextArgs, limit: Option<usize>) -> anyhow::Result<()> {
    let Some(ctx) = args.to_context()? else {
        anyhow::bail!("give at least --file, --selection or --diag to describe the context");
    };
    let store = open_store(cfg).await?;
    let prefs = preferences(cfg)?.load()?;
    let limit = limit.unwrap_or(cfg.suggestions.max_results);

    println!(
        "{} Suggestions for {} context in {} ({}{})\n",
        LOGO,
        ctx.kind.name(),
        ctx.file_name(),
        ctx.language,
        ctx.project_type
            .map(|p| format!(", {} project", p.as_str()))
            .unwrap_or_default()
    );

    let ranked = relevance::suggest(store.tree(), &ctx, &prefs, limit);
    if ranked.is_empty() {
        println!("  No prompt matches this context");
        return Ok(());
    }
    for s in ranked {
        println!("  {:>3}  {:<6} {}", s.score, s.prompt.id, s.prompt.label);
    }
    Ok(())
}

async fn evaluate_cmd(cfg: &Config, id: Option<String>, text: Option<String>) -> anyhow::Result<()> {
    let text = match (id, text) {
        (_, Some(t)) => t,
        (Some(id), None) => {
            let store = open_store(cfg).await?;
            let prompt = store
                .prompt(&id)
                .ok_or_else(|| ShelfError::NotFound(id.clone()))?;
            prompt.body.clone()
        }
        (None, None) => anyhow::bail!("give a prompt id or --text"),
    };

    let Some(evaluator) = build_evaluator(cfg) else {
        anyhow::bail!(
            "evaluation is disabled: set evaluator.api_key (or PROMPTSHELF_EVALUATOR_API_KEY)"
        );
    };
    let score = evaluate_or_fallback(
        evaluator.as_ref(),
        &text,
        Duration::from_secs(cfg.evaluator.timeout_secs),
    )
    .await;
    print_score(&score);
    Ok(())
}

// ---------------------------------------------------------------------------
// Sharing and menus
// ---------------------------------------------------------------------------

async fn submit_cmd(cfg: &Config, id: &str, open: bool, copy: bool) -> anyhow::Result<()> {
    let store = open_store(cfg).await?;
    let message = submission::compose(&store, id, &cfg.submission)?;
    let url = message.mailto()?;

    println!("{}", message.as_text());
    println!("\n  mailto: {}", url);

    if copy {
        clipboard_sink(&cfg.output)?.deliver(&message.as_text()).await?;
        println!("  ✅ Copied to clipboard");
    }
    if open {
        submission::open_url(&url).await?;
        println!("  ✅ Opened in mail client");
    }
    Ok(())
}

fn chat_commands_cmd(cfg: &Config) {
    println!("{} Chat commands\n", LOGO);
    if cfg.output.chat_commands.is_empty() {
        println!("  None configured. Add entries under output.chat_commands in the config.");
        return;
    }
    for (name, command) in &cfg.output.chat_commands {
        println!("  {:<16} {}", name, command);
    }
    println!("\n  Use with: promptshelf use <id> --to chat:<name>");
}

async fn quick_cmd(cfg: &Config, to: &str) -> anyhow::Result<()> {
    let store = open_store(cfg).await?;
    let prefs = preferences(cfg)?.load()?;

    let mut choices: Vec<String> = existing_favorites(&prefs, |id| store.prompt(id).is_some());
    for id in &prefs.recent {
        if store.prompt(id).is_some() && !choices.contains(id) {
            choices.push(id.clone());
        }
    }
    if choices.is_empty() {
        println!("  No favorites or recent prompts yet. Try `promptshelf browse`.");
        return Ok(());
    }

    println!("{} Quick actions\n", LOGO);
    for (n, id) in choices.iter().enumerate() {
        let label = store.prompt(id).map(|p| p.label.as_str()).unwrap_or("");
        let star = if prefs.is_favorite(id) { "★" } else { " " };
        println!("  {:>2}. {} {:<6} {}", n + 1, star, id, label);
    }
    println!();

    let answer = ask("Number", None)?;
    let picked = answer
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| choices.get(i))
        .ok_or_else(|| ShelfError::InvalidInput(format!("'{}' is not on the list", answer)))?;

    deliver(cfg, &store, picked, None, &HashMap::new(), to).await
}

async fn browse_cmd(cfg: &Config, to: &str) -> anyhow::Result<()> {
    let store = open_store(cfg).await?;
    let prefs = preferences(cfg)?;
    let picked = promptshelf::tui::run(store.tree().clone(), &prefs)?;
    match picked {
        Some(id) => deliver(cfg, &store, &id, None, &HashMap::new(), to).await,
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Setup commands
// ---------------------------------------------------------------------------

async fn init_cmd(cfg: &Config, force: bool) -> anyhow::Result<()> {
    println!("{} PromptShelf Init — Setting up your prompt library\n", LOGO);

    let config_path = Config::default_path()?;
    if !config_path.exists() {
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&config_path, serde_json::to_string_pretty(&Config::default())?)?;
        println!("  ✅ Config created at {}", config_path.display());
    } else {
        println!("  ⏭️  Config already exists at {}", config_path.display());
    }

    let system_path = cfg.system_prompts_path()?;
    if system_path.exists() && !force {
        println!(
            "  ⏭️  System prompts already exist at {} (use --force to replace)",
            system_path.display()
        );
    } else {
        let bundled = PromptDocument::bundled()?;
        bundled.write(&system_path).await?;
        println!(
            "  ✅ {} system prompts installed at {}",
            bundled.prompt_count(),
            system_path.display()
        );
    }

    // Creates the user file when missing.
    let store = open_store(cfg).await?;
    println!("  ✅ User prompts at {}", store.paths().user.display());
    println!("\nNext: `promptshelf list` or `promptshelf browse`");
    Ok(())
}

async fn status_cmd(cfg: &Config) {
    println!("{} PromptShelf v{} Status\n", LOGO, promptshelf::VERSION);

    let config_path = Config::default_path().unwrap_or_default();
    if config_path.exists() {
        println!("  Config:    ✅ {}", config_path.display());
    } else {
        println!("  Config:    ❌ Not found (run 'promptshelf init')");
    }

    match cfg.data_dir() {
        Ok(dir) if dir.exists() => println!("  Data:      ✅ {}", dir.display()),
        Ok(dir) => println!("  Data:      ❌ {} (not created)", dir.display()),
        Err(_) => println!("  Data:      ❌ Could not resolve path"),
    }

    match open_store(cfg).await {
        Ok(store) => {
            let tree = store.tree();
            let system = system_prompt_count(tree);
            println!(
                "  Prompts:   {} system, {} user",
                system,
                tree.prompt_count() - system
            );
        }
        Err(e) => println!("  Prompts:   ❌ {}", e),
    }

    if cfg.evaluation_active() {
        println!("  Evaluator: ✅ {} (key configured)", cfg.evaluator.model);
    } else if !cfg.evaluator.enabled {
        println!("  Evaluator: ⏸  Disabled");
    } else {
        println!("  Evaluator: ❌ No API key found");
    }
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn system_prompt_count(tree: &PromptTree) -> usize {
    tree.prompts()
        .iter()
        .filter(|p| tree.kind_of(&p.id) == Some(CategoryKind::System))
        .count()
}

fn print_tree(tree: &PromptTree, favorites: &[String]) {
    for category in tree.categories() {
        let lock = if category.kind.is_mutable() { "" } else { " 🔒" };
        println!("{} {}{}", category.id, category.label, lock);
        let groups = tree.children(&category.id);
        if category.kind == CategoryKind::User && tree.prompts_under(&category.id) == 0 {
            println!("    (empty, add one with `promptshelf add`)");
        }
        for group in groups {
            println!("  {} {}", group.id(), group.label());
            for entry in tree.children(group.id()) {
                let Entry::Prompt(prompt) = entry else {
                    continue;
                };
                let star = if favorites.contains(&prompt.id) { " ★" } else { "" };
                let badge = prompt
                    .evaluation
                    .as_ref()
                    .map(|e| format!("  [{}]", e.badge()))
                    .unwrap_or_default();
                println!("    {:<6} {}{}{}", prompt.id, prompt.label, star, badge);
            }
        }
    }
}

fn print_flat<'a>(tree: &PromptTree, ids: impl Iterator<Item = &'a str>, empty: &str) {
    let mut shown = 0;
    for id in ids {
        if let Some(prompt) = tree.prompt(id) {
            println!("  {:<6} {}", prompt.id, prompt.label);
            shown += 1;
        }
    }
    if shown == 0 {
        println!("  {}", empty);
    }
}

fn print_score(score: &PromptScore) {
    let note = if score.is_fallback() { " (fallback)" } else { "" };
    println!("  Score:     {}{}", score.badge(), note);
    println!(
        "             clarity {}  specificity {}  context {}  efficiency {}  relevance {}",
        score.clarity, score.specificity, score.context, score.efficiency, score.relevance
    );
    for s in &score.suggestions {
        println!("             - {}", s);
    }
}
