use std::path::PathBuf;

use clap::{Parser, Subcommand};

use studyvault::Category;
use studyvault::store::{Chronotype, TaskType};
use studyvault::taxonomy::{ResourceKind, Subject};

#[derive(Parser)]
#[command(name = "studyvault")]
#[command(about = "Local study vault: uploads, syllabus and study progress", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// Data directory (default: $STUDYVAULT_DATA_DIR or ./.studyvault)
    #[arg(long, global = true)]
    pub(crate) data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Upload a file into a chapter (text is extracted before it is stored).
    Upload {
        path: PathBuf,
        #[arg(short, long)]
        chapter: String,
        #[arg(long, value_parser = parse_category, default_value = "Notes")]
        category: Category,
        /// Mime type override (guessed from the extension otherwise)
        #[arg(long)]
        mime: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// List files stored under a chapter.
    Files {
        chapter: String,
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        /// Only files whose name contains this text
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Delete a stored file by id (deleting a missing id is not an error).
    Delete { id: String },

    /// Find chapters by name.
    Search {
        term: String,
        #[arg(long)]
        json: bool,
    },

    /// Print the syllabus hierarchy.
    Chapters {
        #[arg(long, value_parser = parse_subject)]
        subject: Option<Subject>,
    },

    /// Show one chapter with its resource links and stored files.
    Chapter {
        id: String,
        #[arg(long)]
        json: bool,
    },

    /// Add a chapter under a unit (the unit is created if missing).
    AddChapter {
        #[arg(value_parser = parse_subject)]
        subject: Subject,
        unit: String,
        name: String,
    },

    /// Attach a resource link to a chapter.
    Link {
        chapter: String,
        file_name: String,
        #[arg(long, value_parser = parse_resource_kind, default_value = "Notes")]
        kind: ResourceKind,
    },

    /// Log a study session and earn XP.
    Log {
        subject: String,
        minutes: u32,
        #[arg(long)]
        task_completed: bool,
        /// Self-assessed accuracy, 0-100
        #[arg(long, default_value_t = 0.0)]
        accuracy: f64,
    },

    /// Toggle completion of a routine task by position.
    Toggle { index: usize },

    /// Add a task to today's routine.
    AddTask {
        /// Start time, zero-padded HH:MM
        start: String,
        end: String,
        activity: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, value_parser = parse_task_type, default_value = "Study")]
        kind: TaskType,
        #[arg(long, default_value = "Manual entry")]
        description: String,
    },

    /// Change settings; omitted options keep their values.
    Settings {
        #[arg(long)]
        wake_up: Option<String>,
        #[arg(long)]
        daily_goal: Option<u32>,
        #[arg(long)]
        dark_mode: Option<bool>,
        #[arg(long, value_parser = parse_chronotype)]
        chronotype: Option<Chronotype>,
    },

    /// Show progress: XP, level, streak and routine completion.
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Print the chapter text handed to the content analyzer.
    Analyze {
        chapter: String,
        /// Byte limit (default: configured analysis_char_limit)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show or change the stored configuration.
    Config {
        #[arg(long)]
        flush_every: Option<usize>,
        #[arg(long)]
        analysis_char_limit: Option<usize>,
        #[arg(long)]
        log_filter: Option<String>,
    },
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::parse(s).ok_or_else(|| {
        let names: Vec<_> = Category::ALL.iter().map(Category::as_str).collect();
        format!("unknown category '{s}' (expected one of {})", names.join(", "))
    })
}

fn parse_subject(s: &str) -> Result<Subject, String> {
    Subject::parse(s).ok_or_else(|| format!("unknown subject '{s}'"))
}

fn parse_resource_kind(s: &str) -> Result<ResourceKind, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown resource kind '{s}' (NCERT_PDF, Notes, PYQ, Formula_Sheet)"))
}

fn parse_task_type(s: &str) -> Result<TaskType, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown task type '{s}' (Study, Break, Revision, MockTest)"))
}

fn parse_chronotype(s: &str) -> Result<Chronotype, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown chronotype '{s}' (EarlyBird, NightOwl)"))
}
