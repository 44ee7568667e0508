//! # CLI Layer
//!
//! This module is **one possible UI client** for folio, not the application itself.
//!
//! The CLI layer is the **only** place that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: shell arguments become typed commands via clap
//! 2. **Context Setup**: `folioapp::init::initialize` resolves the data dir and config
//! 3. **API Dispatch**: one `FolioApi` call per command
//! 4. **Output**: `CmdResult` sections rendered by `render.rs`, or JSON with `--json`
//!
//! Running `folio` with no command shows the resume being edited.
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. The level comes from `FOLIO_LOG`
//! (an `EnvFilter` directive such as `folioapp=debug`), defaulting to `warn`, or
//! `debug` with `--verbose`.
//!
//! ## Module Structure
//!
//! - `setup`: argument definitions
//! - `render`: output formatting

mod render;
pub mod setup;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use folioapp::api::FolioApi;
use folioapp::commands::edit::Edit;
use folioapp::commands::CmdResult;
use folioapp::init::initialize;
use folioapp::model::{Education, Experience};
use folioapp::store::FsBackend;
use render::{
    print_backups, print_documents, print_draft, print_drain, print_history, print_messages,
    print_paths, print_preferences, print_status,
};
use setup::{
    BackupCommands, Cli, Commands, EduCommands, EduFields, ExpCommands, ExpFields,
    HistoryCommands, PrefsCommands, SkillCommands, SyncCommands,
};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FOLIO_LOG";

/// What to print after a command ran.
#[derive(Debug, Clone, Copy)]
enum View {
    Messages,
    Draft,
    Documents,
    History,
    Backups,
    Status,
    Preferences,
    Sync,
}

struct AppContext {
    api: FolioApi<FsBackend>,
    json: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = initialize(cli.data_dir.clone())?;
    let mut ctx = AppContext {
        api: ctx.api,
        json: cli.json,
    };

    let outcome = dispatch(&mut ctx, cli.command);
    // Pending debounced edits must land before the process exits.
    ctx.api.close();
    let (result, view) = outcome?;
    output(&ctx, &result, view)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn dispatch(ctx: &mut AppContext, command: Option<Commands>) -> Result<(CmdResult, View)> {
    let api = &mut ctx.api;
    let outcome = match command.unwrap_or(Commands::Show) {
        Commands::New { template } => (api.new_document(template.as_deref())?, View::Messages),
        Commands::Show => (api.show()?, View::Draft),
        Commands::Set { field, value } => {
            (api.set_personal(&field, &value.join(" "))?, View::Messages)
        }
        Commands::Exp(cmd) => (handle_exp(api, cmd)?, View::Messages),
        Commands::Edu(cmd) => (handle_edu(api, cmd)?, View::Messages),
        Commands::Skill(cmd) => (handle_skill(api, cmd)?, View::Messages),
        Commands::Save { name, tags } => (api.save(name.as_deref(), &tags)?, View::Messages),
        Commands::Open { selector } => (api.open_document(&selector)?, View::Messages),
        Commands::List { tag } => (api.list_documents(tag.as_deref())?, View::Documents),
        Commands::Delete { selector } => (api.delete_document(&selector)?, View::Messages),
        Commands::Duplicate { selector } => (api.duplicate_document(&selector)?, View::Messages),
        Commands::Rename { selector, name } => {
            (api.rename_document(&selector, &name)?, View::Messages)
        }
        Commands::Tag {
            selector,
            add,
            remove,
        } => (api.tag_document(&selector, &add, &remove)?, View::Messages),
        Commands::Template { id } => (api.select_template(&id)?, View::Messages),
        Commands::Undo => (api.undo()?, View::Messages),
        Commands::Redo => (api.redo()?, View::Messages),
        Commands::Goto { index } => (api.go_to(index)?, View::Messages),
        Commands::History(args) => match args.action.unwrap_or(HistoryCommands::List) {
            HistoryCommands::List => (api.history()?, View::History),
            HistoryCommands::Clear => (api.clear_history()?, View::Messages),
            HistoryCommands::Export { path } => (api.export_history(&path)?, View::Messages),
            HistoryCommands::Import { path } => (api.import_history(&path)?, View::Messages),
        },
        Commands::Export { dir, gzip } => (api.export_bundle(&dir, gzip)?, View::Messages),
        Commands::Import { path } => (api.import_bundle(&path)?, View::Messages),
        Commands::Backup(cmd) => match cmd {
            BackupCommands::Create => (api.create_backup()?, View::Messages),
            BackupCommands::List => (api.list_backups()?, View::Backups),
            BackupCommands::Restore { selector } => {
                (api.restore_backup(&selector)?, View::Messages)
            }
            BackupCommands::Delete { selector } => (api.delete_backup(&selector)?, View::Messages),
        },
        Commands::Status => (api.status()?, View::Status),
        Commands::Sync(cmd) => match cmd {
            SyncCommands::Status => (api.sync_status()?, View::Messages),
            SyncCommands::Push => (api.sync_push()?, View::Sync),
        },
        Commands::Prefs(args) => match args.action.unwrap_or(PrefsCommands::Show) {
            PrefsCommands::Show => (api.preferences()?, View::Preferences),
            PrefsCommands::Set { key, value } => {
                (api.set_preference(&key, &value)?, View::Messages)
            }
        },
    };
    Ok(outcome)
}

fn handle_exp(api: &mut FolioApi<FsBackend>, cmd: ExpCommands) -> Result<CmdResult> {
    let result = match cmd {
        ExpCommands::Add {
            company,
            position,
            fields,
        } => {
            let mut entry = Experience::new(company, position);
            apply_exp_fields(&mut entry, fields);
            api.edit(&[Edit::AddExperience(entry)])?
        }
        ExpCommands::Update {
            selector,
            company,
            position,
            fields,
        } => {
            let mut entry = api.find_experience(&selector)?;
            if let Some(company) = company {
                entry.company = company;
            }
            if let Some(position) = position {
                entry.position = position;
            }
            apply_exp_fields(&mut entry, fields);
            api.edit(&[Edit::UpdateExperience(entry)])?
        }
        ExpCommands::Rm { selector } => api.remove_experience(&selector)?,
        ExpCommands::Mv { selector, to } => api.move_experience(&selector, to)?,
    };
    Ok(result)
}

fn apply_exp_fields(entry: &mut Experience, fields: ExpFields) {
    if let Some(location) = fields.location {
        entry.location = location;
    }
    if let Some(start) = fields.start {
        entry.start_date = start;
    }
    if fields.current {
        entry.current = true;
        entry.end_date = None;
    } else if let Some(end) = fields.end {
        entry.current = false;
        entry.end_date = Some(end);
    }
    if let Some(description) = fields.description {
        entry.description = description;
    }
    entry.highlights.extend(fields.highlights);
}

fn handle_edu(api: &mut FolioApi<FsBackend>, cmd: EduCommands) -> Result<CmdResult> {
    let result = match cmd {
        EduCommands::Add {
            institution,
            degree,
            fields,
        } => {
            let mut entry = Education::new(institution, degree);
            apply_edu_fields(&mut entry, fields);
            api.edit(&[Edit::AddEducation(entry)])?
        }
        EduCommands::Update {
            selector,
            institution,
            degree,
            fields,
        } => {
            let mut entry = api.find_education(&selector)?;
            if let Some(institution) = institution {
                entry.institution = institution;
            }
            if let Some(degree) = degree {
                entry.degree = degree;
            }
            apply_edu_fields(&mut entry, fields);
            api.edit(&[Edit::UpdateEducation(entry)])?
        }
        EduCommands::Rm { selector } => api.remove_education(&selector)?,
        EduCommands::Mv { selector, to } => api.move_education(&selector, to)?,
    };
    Ok(result)
}

fn apply_edu_fields(entry: &mut Education, fields: EduFields) {
    if let Some(field) = fields.field {
        entry.field = field;
    }
    if let Some(start) = fields.start {
        entry.start_date = start;
    }
    if let Some(end) = fields.end {
        entry.end_date = Some(end);
    }
    if let Some(gpa) = fields.gpa {
        entry.gpa = Some(gpa);
    }
}

fn handle_skill(api: &mut FolioApi<FsBackend>, cmd: SkillCommands) -> Result<CmdResult> {
    let result = match cmd {
        SkillCommands::Add { skills } => {
            let edits: Vec<Edit> = skills.into_iter().map(Edit::AddSkill).collect();
            api.edit(&edits)?
        }
        SkillCommands::Rm { selector } => api.remove_skill(&selector)?,
        SkillCommands::Mv { selector, to } => api.move_skill(&selector, to)?,
    };
    Ok(result)
}

fn output(ctx: &AppContext, result: &CmdResult, view: View) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let now = Utc::now();
    match view {
        View::Messages => {}
        View::Draft => {
            if let Some(draft) = &result.draft {
                let name = draft
                    .document_id
                    .as_deref()
                    .and_then(|id| ctx.api.session().documents.get(id))
                    .map(|doc| doc.name);
                print_draft(draft, name.as_deref());
            }
        }
        View::Documents => {
            let editing = ctx.api.session().draft().document_id.as_deref();
            print_documents(&result.documents, editing, now);
        }
        View::History => {
            if let Some(history) = &result.history {
                print_history(history, now);
            }
        }
        View::Backups => print_backups(&result.backups, now),
        View::Status => {
            if let Some(status) = &result.status {
                print_status(status, now);
            }
            print_paths(&result.paths);
        }
        View::Preferences => {
            if let Some(prefs) = &result.preferences {
                print_preferences(prefs);
            }
        }
        View::Sync => {
            if let Some(report) = &result.sync {
                print_drain(report);
            }
        }
    }
    print_messages(&result.messages);
    Ok(())
}
