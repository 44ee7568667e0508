use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "folio",
    bin_name = "folio",
    version,
    disable_help_subcommand = true,
    after_help = "Data lives in the OS data directory unless --data-dir or FOLIO_DATA_DIR says otherwise.\nSettings are read from folio.toml in that directory."
)]
#[command(about = "Resume editor with undo history and rotating backups", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Use this data directory
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true, help_heading = "Options")]
    pub json: bool,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a new blank resume
    #[command(display_order = 1)]
    New {
        /// Template to use (defaults to the preferred template)
        #[arg(long, short)]
        template: Option<String>,
    },

    /// Show the resume being edited
    #[command(display_order = 2)]
    Show,

    /// Set a personal-info field (name, email, phone, location, website, summary)
    #[command(display_order = 3)]
    Set {
        field: String,

        /// Value words (joined with spaces)
        #[arg(trailing_var_arg = true, required = true)]
        value: Vec<String>,
    },

    /// Edit experience entries
    #[command(subcommand, display_order = 4)]
    Exp(ExpCommands),

    /// Edit education entries
    #[command(subcommand, display_order = 5)]
    Edu(EduCommands),

    /// Edit skills
    #[command(subcommand, display_order = 6)]
    Skill(SkillCommands),

    /// Save the resume as a document
    #[command(display_order = 10)]
    Save {
        /// Document name (defaults to the current name, or one derived from the resume)
        name: Option<String>,

        /// Tag the document
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
    },

    /// Open a saved document for editing
    #[command(display_order = 11)]
    Open {
        /// Name, id, position in the list (`2` or `#2`) or id prefix
        selector: String,
    },

    /// List saved documents
    #[command(alias = "ls", display_order = 12)]
    List {
        /// Only documents with this tag
        #[arg(long, short)]
        tag: Option<String>,
    },

    /// Delete a saved document and its history
    #[command(alias = "rm", display_order = 13)]
    Delete { selector: String },

    /// Copy a saved document
    #[command(display_order = 14)]
    Duplicate { selector: String },

    /// Rename a saved document
    #[command(display_order = 15)]
    Rename { selector: String, name: String },

    /// Add or remove tags on a saved document
    #[command(display_order = 16)]
    Tag {
        selector: String,

        #[arg(long)]
        add: Vec<String>,

        #[arg(long)]
        remove: Vec<String>,
    },

    /// Select the template for the resume being edited
    #[command(display_order = 17)]
    Template { id: String },

    /// Undo the last change
    #[command(display_order = 20)]
    Undo,

    /// Redo the last undone change
    #[command(display_order = 21)]
    Redo,

    /// Jump to a history entry (index as shown by `folio history`)
    #[command(display_order = 22)]
    Goto { index: usize },

    /// Show or manage the edit history
    #[command(display_order = 23)]
    History(HistoryArgs),

    /// Export everything to a bundle file
    #[command(display_order = 30)]
    Export {
        /// Directory to write the bundle into
        #[arg(long, short, default_value = ".")]
        dir: PathBuf,

        /// Compress the bundle with gzip
        #[arg(long, short = 'z')]
        gzip: bool,
    },

    /// Import a bundle file (plain or gzip)
    #[command(display_order = 31)]
    Import { path: PathBuf },

    /// Manage rotating backups
    #[command(subcommand, display_order = 32)]
    Backup(BackupCommands),

    /// Storage usage and state
    #[command(display_order = 40)]
    Status,

    /// Sync queue state and push
    #[command(subcommand, display_order = 41)]
    Sync(SyncCommands),

    /// Show or change preferences
    #[command(display_order = 42)]
    Prefs(PrefsArgs),
}

#[derive(Subcommand, Debug)]
pub enum ExpCommands {
    /// Add an experience entry
    Add {
        company: String,
        position: String,
        #[command(flatten)]
        fields: ExpFields,
    },

    /// Change fields of an experience entry
    Update {
        /// Position in the list or id prefix
        selector: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        position: Option<String>,

        #[command(flatten)]
        fields: ExpFields,
    },

    /// Remove an experience entry
    Rm { selector: String },

    /// Move an experience entry to a position
    Mv { selector: String, to: usize },
}

#[derive(Args, Debug, Default)]
pub struct ExpFields {
    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long, conflicts_with = "current")]
    pub end: Option<String>,

    /// Still working here
    #[arg(long)]
    pub current: bool,

    #[arg(long)]
    pub description: Option<String>,

    /// Add a highlight (repeatable)
    #[arg(long = "highlight")]
    pub highlights: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum EduCommands {
    /// Add an education entry
    Add {
        institution: String,
        degree: String,
        #[command(flatten)]
        fields: EduFields,
    },

    /// Change fields of an education entry
    Update {
        selector: String,

        #[arg(long)]
        institution: Option<String>,

        #[arg(long)]
        degree: Option<String>,

        #[command(flatten)]
        fields: EduFields,
    },

    /// Remove an education entry
    Rm { selector: String },

    /// Move an education entry to a position
    Mv { selector: String, to: usize },
}

#[derive(Args, Debug, Default)]
pub struct EduFields {
    /// Field of study
    #[arg(long)]
    pub field: Option<String>,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    #[arg(long)]
    pub gpa: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SkillCommands {
    /// Add one or more skills
    Add {
        #[arg(required = true)]
        skills: Vec<String>,
    },

    /// Remove a skill by position or name
    Rm { selector: String },

    /// Move a skill to a position
    Mv { selector: String, to: usize },
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub action: Option<HistoryCommands>,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List history entries (default)
    List,

    /// Drop the history, keeping the resume as it is
    Clear,

    /// Write the history log to a file
    Export { path: PathBuf },

    /// Replace the history log with one read from a file
    Import { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Take a backup now
    Create,

    /// List backups, newest first
    #[command(alias = "ls")]
    List,

    /// Restore a backup by position or key
    Restore { selector: String },

    /// Delete a backup by position or key
    #[command(alias = "rm")]
    Delete { selector: String },
}

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Show the sync queue state
    Status,

    /// Push every stored value through the sync transport
    Push,
}

#[derive(Args, Debug)]
pub struct PrefsArgs {
    #[command(subcommand)]
    pub action: Option<PrefsCommands>,
}

#[derive(Subcommand, Debug)]
pub enum PrefsCommands {
    /// Show preferences (default)
    Show,

    /// Change a preference (theme, auto-save, default-template, page-size)
    Set { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_set_joins_value_words() {
        let cli = Cli::parse_from(["folio", "set", "summary", "Builds", "things"]);
        match cli.command {
            Some(Commands::Set { field, value }) => {
                assert_eq!(field, "summary");
                assert_eq!(value.join(" "), "Builds things");
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["folio", "list", "--data-dir", "/tmp/x", "--json"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(cli.json);
    }

    #[test]
    fn test_history_defaults_to_list() {
        let cli = Cli::parse_from(["folio", "history"]);
        assert!(matches!(
            cli.command,
            Some(Commands::History(HistoryArgs { action: None }))
        ));
    }

    #[test]
    fn test_exp_add_with_fields() {
        let cli = Cli::parse_from([
            "folio",
            "exp",
            "add",
            "Acme",
            "Engineer",
            "--start",
            "2020-01",
            "--current",
            "--highlight",
            "Shipped",
            "--highlight",
            "Led",
        ]);
        match cli.command {
            Some(Commands::Exp(ExpCommands::Add {
                company,
                position,
                fields,
            })) => {
                assert_eq!(company, "Acme");
                assert_eq!(position, "Engineer");
                assert!(fields.current);
                assert_eq!(fields.highlights, vec!["Shipped", "Led"]);
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }
}
