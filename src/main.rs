mod cli;
mod render;

use std::fs;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use studyvault::config::{self, AppConfig};
use studyvault::store::{SettingsPatch, Task};
use studyvault::taxonomy::ResourceLink;
use studyvault::{
    JsonStore, Library, StudyStore, TaxonomyIndex, UploadRequest, Vault, XpCredit, extract,
};

use cli::{Cli, Command};

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_state(config: &AppConfig) -> JsonStore {
    JsonStore::new(config.state_dir())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let data_dir = config::resolve_data_dir(cli.data_dir);
    let config = config::load_config(&data_dir);
    init_logging(&config);

    match cli.command {
        Command::Upload {
            path,
            chapter,
            category,
            mime,
            json,
        } => {
            let bytes = fs::read(&path)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let file_type =
                mime.unwrap_or_else(|| extract::mime_from_file_name(&file_name).to_string());

            let taxonomy = TaxonomyIndex::load(&open_state(&config))?;
            if taxonomy.find_chapter(&chapter).is_none() {
                tracing::warn!(chapter = %chapter, "chapter is not in the syllabus; storing anyway");
            }

            let vault = Vault::open(&config.database_path())?;
            let outcome = studyvault::upload(
                &vault,
                UploadRequest {
                    chapter_id: chapter,
                    category,
                    file_name,
                    file_type,
                    bytes,
                },
            )
            .await?;

            if json {
                return print_json(&outcome.file);
            }
            println!("Stored {} ({})", outcome.file.id, outcome.file.file_name);
            if outcome.extraction_failed {
                println!("Text extraction failed; the file is stored without searchable text.");
            }
            Ok(())
        }

        Command::Files {
            chapter,
            category,
            name,
            json,
        } => {
            let taxonomy = TaxonomyIndex::load(&open_state(&config))?;
            let vault = Vault::open(&config.database_path())?;
            let files = Library::new(&taxonomy, &vault)
                .chapter_files(&chapter, category, name.as_deref())
                .await?;
            if json {
                return print_json(&files);
            }
            render::files(&files);
            Ok(())
        }

        Command::Delete { id } => {
            let vault = Vault::open(&config.database_path())?;
            if vault.delete(&id).await? {
                println!("Deleted {id}");
            } else {
                println!("Nothing stored under {id}");
            }
            Ok(())
        }

        Command::Search { term, json } => {
            let taxonomy = TaxonomyIndex::load(&open_state(&config))?;
            let hits = taxonomy.search(&term);
            if json {
                return print_json(&hits);
            }
            render::matches(&hits);
            Ok(())
        }

        Command::Chapters { subject } => {
            let taxonomy = TaxonomyIndex::load(&open_state(&config))?;
            for tree in taxonomy.subjects() {
                if subject.is_none_or(|s| s == tree.subject) {
                    render::tree(tree);
                }
            }
            Ok(())
        }

        Command::Chapter { id, json } => {
            let taxonomy = TaxonomyIndex::load(&open_state(&config))?;
            let vault = Vault::open(&config.database_path())?;
            let Some(detail) = Library::new(&taxonomy, &vault).chapter_detail(&id).await? else {
                eprintln!("Unknown chapter: {id}");
                std::process::exit(2);
            };
            if json {
                return print_json(&detail);
            }
            render::detail(&detail);
            Ok(())
        }

        Command::AddChapter {
            subject,
            unit,
            name,
        } => {
            let state = open_state(&config);
            let mut taxonomy = TaxonomyIndex::load(&state)?;
            match taxonomy.add_chapter(subject, &unit, &name) {
                Some(id) => {
                    taxonomy.persist(&state)?;
                    println!("Added {id}");
                }
                None => println!("No class level exists for {subject}"),
            }
            Ok(())
        }

        Command::Link {
            chapter,
            file_name,
            kind,
        } => {
            let state = open_state(&config);
            let mut taxonomy = TaxonomyIndex::load(&state)?;
            let link = ResourceLink {
                file_name,
                file_type: kind,
                upload_date: Utc::now().to_rfc3339(),
            };
            if taxonomy.append_resource(&chapter, link) {
                taxonomy.persist(&state)?;
                println!("Linked to {chapter}");
            } else {
                println!("Unknown chapter: {chapter}");
            }
            Ok(())
        }

        Command::Log {
            subject,
            minutes,
            task_completed,
            accuracy,
        } => {
            let mut store = StudyStore::load(open_state(&config), config.flush_every)?;
            let gain = store.add_log_with_credit(
                &subject,
                minutes,
                XpCredit {
                    task_completed,
                    accuracy_percent: accuracy,
                },
            )?;
            store.flush()?;
            println!("+{gain} XP (level {})", store.study_level());
            Ok(())
        }

        Command::Toggle { index } => {
            let mut store = StudyStore::load(open_state(&config), config.flush_every)?;
            match store.toggle_task(index)? {
                Some(done) => println!("Task {index} {}", if done { "completed" } else { "reopened" }),
                None => println!("No task at position {index}"),
            }
            store.flush()?;
            Ok(())
        }

        Command::AddTask {
            start,
            end,
            activity,
            subject,
            kind,
            description,
        } => {
            let mut store = StudyStore::load(open_state(&config), config.flush_every)?;
            store.add_task(Task {
                time_start: start,
                time_end: end,
                activity,
                subject,
                kind,
                description,
                completed: false,
                xp_awarded: false,
            })?;
            store.flush()?;
            println!("{} tasks in routine", store.snapshot().daily_routine.len());
            Ok(())
        }

        Command::Settings {
            wake_up,
            daily_goal,
            dark_mode,
            chronotype,
        } => {
            let mut store = StudyStore::load(open_state(&config), config.flush_every)?;
            let patch = SettingsPatch {
                wake_up_time: wake_up,
                daily_goal,
                dark_mode,
                chronotype,
            };
            if patch != SettingsPatch::default() {
                store.update_settings(patch)?;
                store.flush()?;
            }
            print_json(&store.snapshot().settings)
        }

        Command::Status { json } => {
            let store = StudyStore::load(open_state(&config), config.flush_every)?;
            let view = store.view();
            if json {
                return print_json(&view);
            }
            render::status(&view);
            Ok(())
        }

        Command::Analyze { chapter, limit } => {
            let taxonomy = TaxonomyIndex::load(&open_state(&config))?;
            let vault = Vault::open(&config.database_path())?;
            let limit = limit.unwrap_or(config.analysis_char_limit);
            let text = Library::new(&taxonomy, &vault)
                .analysis_text(&chapter, limit)
                .await?;
            if text.is_empty() {
                println!("No extracted text for {chapter}.");
            } else {
                println!("{text}");
            }
            Ok(())
        }

        Command::Config {
            flush_every,
            analysis_char_limit,
            log_filter,
        } => {
            let changed =
                flush_every.is_some() || analysis_char_limit.is_some() || log_filter.is_some();
            let mut updated = config.clone();
            if let Some(n) = flush_every {
                updated.flush_every = n.max(1);
            }
            if let Some(n) = analysis_char_limit {
                updated.analysis_char_limit = n;
            }
            if let Some(filter) = log_filter {
                updated.log_filter = filter;
            }
            if changed {
                config::save_config(&updated)?;
            }
            print_json(&updated)
        }
    }
}
