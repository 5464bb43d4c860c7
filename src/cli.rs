use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::metadata::{PKG_DESCRIPTION, PKG_VERSION};
use crate::settings::JiraSettings;
use crate::types::VacationType;

#[derive(Parser, Debug, Clone)]
#[command(name = "roadmap")]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: CommandArguments,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the roadmap for a quarter
    Init(InitArgs),
    /// Show the plan and who works on what in a week
    Status {
        /// Week id (defaults to the current week, or W1)
        #[arg(long)]
        week: Option<String>,
    },
    /// List the weeks of the plan
    Weeks,
    /// Move the plan to another quarter, dropping assignments to vanished weeks
    Quarter {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        quarter: u8,
        year: i32,
    },
    /// Manage team members
    #[command(subcommand)]
    Member(MemberCommand),
    /// Manage tasks and their weekly assignments
    #[command(subcommand)]
    Task(TaskCommand),
    /// Personal todo lists
    #[command(subcommand)]
    Todo(TodoCommand),
    /// Write the full roadmap as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load a roadmap export, a bare configuration or a legacy task array
    Import { input: PathBuf },
    /// Delete the configuration and all tasks
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Import epics and users from Jira
    #[command(subcommand)]
    Jira(JiraCommand),
    /// Open an interactive config editor for settings.json
    Config,
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Quarter 1-4 (defaults to the current one)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub quarter: Option<u8>,
    /// Year (defaults to the current one)
    #[arg(short, long)]
    pub year: Option<i32>,
    /// Team member name, repeatable (defaults to the built-in roster)
    #[arg(long = "member")]
    pub members: Vec<String>,
    /// Project name used as a track, repeatable
    #[arg(long = "project")]
    pub projects: Vec<String>,
    /// Replace an existing roadmap
    #[arg(long)]
    pub force: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MemberCommand {
    Add {
        name: String,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        nationality: Option<String>,
        #[arg(long)]
        seniority: Option<String>,
    },
    List,
    /// Remove a member and unassign them everywhere
    Remove {
        /// Member id or name
        member: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Record time off
    Vacation {
        member: String,
        start: NaiveDate,
        end: NaiveDate,
        #[arg(long, value_enum, default_value_t = VacationKind::Vacation)]
        kind: VacationKind,
        #[arg(long)]
        description: Option<String>,
    },
    /// Add a goal
    Goal {
        member: String,
        objective: String,
        #[arg(long)]
        track: Option<String>,
        #[arg(long)]
        due: Option<NaiveDate>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VacationKind {
    Vacation,
    License,
}

impl From<VacationKind> for VacationType {
    fn from(kind: VacationKind) -> Self {
        match kind {
            VacationKind::Vacation => VacationType::Vacation,
            VacationKind::License => VacationType::License,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct TaskFields {
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub track: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub size: Option<String>,
    #[arg(long = "type")]
    pub task_type: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    Add {
        name: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    List {
        /// Only tasks assigned to this member
        #[arg(long)]
        member: Option<String>,
        /// Show assignees of this week
        #[arg(long)]
        week: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
        /// New position in the task order (0 = first)
        #[arg(long)]
        position: Option<usize>,
    },
    Remove {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Assign {
        task: String,
        week: String,
        member: String,
    },
    Unassign {
        task: String,
        week: String,
        member: String,
    },
    Comment {
        task: String,
        text: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TodoCommand {
    /// Create a todo list
    ListAdd {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    Add {
        /// List id or name
        list: String,
        text: String,
    },
    Done {
        id: String,
        /// Mark as not done
        #[arg(long)]
        undo: bool,
    },
    List {
        /// List id or name (all lists when omitted)
        list: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum JiraCommand {
    /// Verify the credentials
    Check,
    /// List the board's epics
    Epics,
    /// Import epics (pick interactively unless keys or --all are given)
    Import {
        keys: Vec<String>,
        #[arg(long, conflicts_with = "keys")]
        all: bool,
    },
    /// Import the board's assignable users as team members
    Users,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CommandArguments {
    /// Directory holding the roadmap documents
    #[arg(long, global = true, env = "ROADMAP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Settings file
    #[arg(long, global = true, env = "ROADMAP_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Jira site, e.g. acme.atlassian.net
    #[arg(long, global = true, env = "JIRA_DOMAIN")]
    pub jira_domain: Option<String>,

    /// Jira account email
    #[arg(long, global = true, env = "JIRA_EMAIL")]
    pub jira_email: Option<String>,

    /// Jira API token
    #[arg(long, global = true, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub jira_api_token: Option<String>,

    /// Jira board id
    #[arg(long, global = true, env = "JIRA_BOARD_ID")]
    pub jira_board_id: Option<u64>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl CommandArguments {
    pub fn jira_overrides(&self) -> JiraSettings {
        JiraSettings {
            domain: self.jira_domain.clone(),
            email: self.jira_email.clone(),
            api_token: self.jira_api_token.clone(),
            board_id: self.jira_board_id,
        }
    }

    /// Validate CLI/environment-derived arguments.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(domain) = &self.jira_domain {
            if domain.trim().is_empty() || domain.contains(char::is_whitespace) {
                return Err(format!("Invalid JIRA_DOMAIN '{domain}'"));
            }
        }
        if let Some(email) = &self.jira_email {
            if !email.contains('@') {
                return Err(format!("Invalid JIRA_EMAIL '{email}'"));
            }
        }
        if self
            .data_dir
            .as_ref()
            .is_some_and(|d| d.as_os_str().is_empty())
        {
            return Err("ROADMAP_DATA_DIR cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "roadmap", "--data-dir", "/tmp/rm", "task", "assign", "T1", "W3", "Alex",
        ])
        .unwrap();
        assert_eq!(cli.global.data_dir, Some(PathBuf::from("/tmp/rm")));
        assert!(matches!(
            cli.command,
            Command::Task(TaskCommand::Assign { ref week, .. }) if week == "W3"
        ));

        let cli = Cli::try_parse_from([
            "roadmap", "member", "vacation", "Sam", "2025-10-06", "2025-10-10", "--kind", "license",
        ])
        .unwrap();
        let Command::Member(MemberCommand::Vacation { kind, start, .. }) = cli.command else {
            panic!("expected member vacation");
        };
        assert_eq!(kind, VacationKind::License);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 10, 6).unwrap());
    }

    #[test]
    fn quarter_is_range_checked() {
        assert!(Cli::try_parse_from(["roadmap", "init", "--quarter", "5"]).is_err());
        assert!(Cli::try_parse_from(["roadmap", "quarter", "0", "2026"]).is_err());
    }

    #[test]
    fn validate_rejects_malformed_jira_values() {
        let mut args = CommandArguments::default();
        assert!(args.validate().is_ok());
        args.jira_domain = Some("acme atlassian".into());
        assert!(args.validate().is_err());
        args.jira_domain = Some("acme.atlassian.net".into());
        args.jira_email = Some("nobody".into());
        assert!(args.validate().is_err());
    }
}
