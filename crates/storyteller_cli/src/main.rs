//! Storyteller command line host.
//!
//! Drives `storyteller_core` against a SQLite file: list and create
//! stories, edit bodies and intents, request continuations and rewrites
//! from the canned provider, and export to Markdown or plain text.
//!
//! Usage:
//!   storyteller --db stories.sqlite3 new --title "Night Ferry"
//!   storyteller write <ID> --text "## Night Ferry" --story-intent "a crossing"
//!   storyteller continue <ID>
//!   storyteller rewrite <ID> --start 0 --end 12 --instruction "past tense" --apply
//!   storyteller export <ID> --format md --out-dir ./exports

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use storyteller_core::{
    export_file_name, init_logging_from_config, open_db, CannedProvider, Clock, CoreConfig,
    Document, DocumentId, DocumentStore, EditableSurface, EditorSession, ExportFormat,
    ProviderRegistry, RewriteOutcome, SqliteDocumentStore, SqlitePreferencesRepository,
    SystemClock, TreeSurface,
};

/// Local story editor backed by SQLite.
#[derive(Parser, Debug)]
#[command(name = "storyteller")]
#[command(about = "Write, continue and rewrite stories stored in a local SQLite file")]
#[command(version)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stories, most recently modified first
    List,
    /// Create an empty story and print its id
    New {
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Print a story body
    Show {
        id: DocumentId,
        /// Print the frontmatter envelope instead of the bare body
        #[arg(long)]
        markdown: bool,
    },
    /// Replace or extend a story body and intents, then save
    Write {
        id: DocumentId,
        /// New text; read from stdin when omitted
        #[arg(long)]
        text: Option<String>,
        /// Append instead of replacing the body
        #[arg(long)]
        append: bool,
        #[arg(long)]
        story_intent: Option<String>,
        #[arg(long)]
        chapter_intent: Option<String>,
    },
    /// Append a suggested next paragraph
    Continue { id: DocumentId },
    /// Propose (and optionally apply) a rewrite of a character range
    Rewrite {
        id: DocumentId,
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
        #[arg(long)]
        instruction: String,
        /// Apply the proposal and save
        #[arg(long)]
        apply: bool,
    },
    /// Export a story to a file or stdout
    Export {
        id: DocumentId,
        #[arg(long, value_enum, default_value_t = Format::Md)]
        format: Format,
        /// Directory to write `<title>.<ext>` into; stdout when omitted
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Md,
    Txt,
}

impl From<Format> for ExportFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::Md => ExportFormat::Markdown,
            Format::Txt => ExportFormat::PlainText,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging_from_config(&config).context("failed to start logging")?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let store = SqliteDocumentStore::try_new(&conn)?;
    info!(
        "event=cli_start module=cli status=ok command={}",
        command_name(&args.command)
    );

    match args.command {
        Command::List => {
            for doc in store.list()? {
                println!("{}\t{}\t{}", doc.id, doc.last_modified, doc.title);
            }
        }
        Command::New { title } => {
            let doc = store.create(&title)?;
            println!("{}", doc.id);
        }
        Command::Show { id, markdown } => {
            let doc = require(&store, id)?;
            if markdown {
                print!("{}", ExportFormat::Markdown.render(&doc));
            } else {
                print!("{}", doc.body);
            }
        }
        Command::Write {
            id,
            text,
            append,
            story_intent,
            chapter_intent,
        } => {
            let text = match text {
                Some(text) => text,
                None => read_stdin()?,
            };
            let mut session = open_session(&store, id, &config)?;
            let now = SystemClock.now_ms();
            let surface = session.surface_mut();
            if append {
                let end = surface.text_len();
                surface.place_caret_at(end);
                surface.insert_at_caret(&text);
            } else {
                surface.set_text(&text);
            }
            session.on_surface_input(now);
            if let Some(value) = story_intent {
                session.set_story_intent(value, now);
            }
            if let Some(value) = chapter_intent {
                session.set_chapter_intent(value, now);
            }
            let saved = session.flush(&store)?;
            if let Some(saved) = saved {
                println!("saved {} \"{}\"", saved.id, saved.title);
            }
        }
        Command::Continue { id } => {
            let registry = ProviderRegistry::with_active(Arc::new(CannedProvider::new()))?;
            let preferences = SqlitePreferencesRepository::try_new(&conn)?;
            let mut session = open_session(&store, id, &config)?;
            let end = session.surface().text_len();
            session.surface_mut().place_caret_at(end);

            let outcome =
                session.continue_story(&registry, &preferences, SystemClock.now_ms())?;
            session.flush(&store)?;
            println!("{}", outcome.inserted.trim_start());
            if outcome.show_tip {
                eprintln!("tip: place the caret after a finished paragraph to get another suggestion");
            }
        }
        Command::Rewrite {
            id,
            start,
            end,
            instruction,
            apply,
        } => {
            if start >= end {
                bail!("--start must be smaller than --end");
            }
            let registry = ProviderRegistry::with_active(Arc::new(CannedProvider::new()))?;
            let mut session = open_session(&store, id, &config)?;
            let surface = session.surface_mut();
            let len = surface.text_len();
            if end > len {
                bail!("--end {end} is past the end of the story ({len} characters)");
            }
            let from = surface.place_caret_at(start);
            let to = surface.place_caret_at(end);
            surface.select(from, to)?;
            session.on_selection_change();

            let proposal = session.propose_rewrite(&instruction, &registry)?;
            println!("- {}", proposal.original);
            println!("+ {}", proposal.replacement);
            if apply {
                match session.accept_rewrite(SystemClock.now_ms())? {
                    RewriteOutcome::Applied { .. } => {
                        session.flush(&store)?;
                        println!("applied");
                    }
                    RewriteOutcome::Discarded => println!("discarded: text changed"),
                }
            }
        }
        Command::Export {
            id,
            format,
            out_dir,
        } => {
            let doc = require(&store, id)?;
            let format = ExportFormat::from(format);
            let rendered = format.render(&doc);
            match out_dir {
                Some(dir) => {
                    let path = dir.join(export_file_name(&doc.title, format));
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("{}", path.display());
                }
                None => print!("{rendered}"),
            }
        }
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<CoreConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str::<CoreConfig>(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => CoreConfig::default(),
    };
    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn require<D: DocumentStore>(store: &D, id: DocumentId) -> Result<Document> {
    match store.get(id)? {
        Some(doc) => Ok(doc),
        None => bail!("no story with id {id}"),
    }
}

fn open_session<D: DocumentStore>(
    store: &D,
    id: DocumentId,
    config: &CoreConfig,
) -> Result<EditorSession<TreeSurface>> {
    let doc = require(store, id)?;
    Ok(EditorSession::with_document(
        doc,
        TreeSurface::new(),
        config,
    )?)
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    Ok(text)
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::List => "list",
        Command::New { .. } => "new",
        Command::Show { .. } => "show",
        Command::Write { .. } => "write",
        Command::Continue { .. } => "continue",
        Command::Rewrite { .. } => "rewrite",
        Command::Export { .. } => "export",
    }
}
