//! Command dispatch for the `roadmap` binary.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use colored::Colorize;
use dialoguer::{Confirm, Input, MultiSelect, Password};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{
    Cli, Command, InitArgs, JiraCommand, MemberCommand, TaskCommand, TaskFields, TodoCommand,
};
use crate::defaults::palette_color;
use crate::error::{ServiceError, ServiceResult};
use crate::jira::{Epic, JiraApi, JiraClient, JiraImporter, validate_epic_key};
use crate::metadata::{PKG_NAME, PKG_VERSION};
use crate::roadmap::Roadmap;
use crate::settings::Settings;
use crate::storage::FileStore;
use crate::types::{RoadmapConfig, TaskUpdate, TaxonomyOverrides, TeamMember};
use crate::weeks::quarter_of;

type FileRoadmap = Roadmap<FileStore>;

pub async fn run(cli: Cli) -> ServiceResult<()> {
    cli.global.validate().map_err(ServiceError::FromString)?;
    let settings_path = cli
        .global
        .settings
        .clone()
        .or_else(Settings::default_path)
        .ok_or_else(|| ServiceError::FromString("No config directory available; pass --settings".into()))?;

    match cli.command {
        Command::Version => {
            println!("{PKG_NAME} {PKG_VERSION}");
            return Ok(());
        }
        Command::Config => return edit_settings(&settings_path),
        _ => {}
    }

    let mut settings = Settings::load(&settings_path)?;
    settings.apply_overrides(cli.global.data_dir.clone(), cli.global.jira_overrides());
    let data_dir = settings.data_dir()?;
    tracing::debug!(data_dir = %data_dir.display(), "opening roadmap");
    let mut roadmap = Roadmap::open_dir(&data_dir);

    match cli.command {
        Command::Init(args) => init(&mut roadmap, args),
        Command::Status { week } => status(&roadmap, week),
        Command::Weeks => weeks(&roadmap),
        Command::Quarter { quarter, year } => {
            let pruned = roadmap.change_quarter(quarter, year)?;
            ok(format!("Plan moved to Q{quarter} {year}"));
            if pruned > 0 {
                warn(format!("{pruned} assignment(s) pointed at weeks that no longer exist and were dropped"));
            }
            Ok(())
        }
        Command::Member(cmd) => member(&mut roadmap, cmd),
        Command::Task(cmd) => task(&mut roadmap, cmd),
        Command::Todo(cmd) => todo(&mut roadmap, cmd),
        Command::Export { output } => export(&roadmap, output.as_deref()),
        Command::Import { input } => import(&mut roadmap, &input),
        Command::Reset { yes } => {
            if yes || confirm("Delete the roadmap configuration and all tasks?")? {
                roadmap.reset();
                ok("Roadmap reset");
            }
            Ok(())
        }
        Command::Jira(cmd) => jira(&mut roadmap, &settings, cmd).await,
        Command::Version | Command::Config => Ok(()),
    }
}

fn ok(message: impl std::fmt::Display) {
    println!("{} {}", "OK".green().bold(), message);
}

fn warn(message: impl std::fmt::Display) {
    eprintln!("{} {}", "Warning:".yellow().bold(), message);
}

fn rejected(message: impl Into<String>) -> ServiceError {
    ServiceError::FromString(message.into())
}

fn confirm(prompt: &str) -> ServiceResult<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

fn require_config(roadmap: &FileRoadmap) -> ServiceResult<&RoadmapConfig> {
    roadmap.config.config().ok_or(ServiceError::NotInitialized)
}

fn member_id(roadmap: &FileRoadmap, reference: &str) -> ServiceResult<String> {
    roadmap
        .config
        .resolve_member(reference)
        .map(|m| m.id.clone())
        .ok_or_else(|| rejected(format!("No team member '{reference}'")))
}

fn member_name(roadmap: &FileRoadmap, id: &str) -> String {
    roadmap
        .config
        .member_by_id(id)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| id.to_string())
}

/// The week containing today, when it is part of the plan.
fn current_week(config: &RoadmapConfig, today: NaiveDate) -> Option<String> {
    config
        .weeks
        .iter()
        .find(|w| {
            w.monday(config.year)
                .is_some_and(|monday| monday <= today && today < monday + Duration::days(7))
        })
        .map(|w| w.id.clone())
}

fn init(roadmap: &mut FileRoadmap, args: InitArgs) -> ServiceResult<()> {
    if roadmap.config.has_unreadable_document() && !args.force {
        return Err(rejected(
            "The stored roadmap could not be read; pass --force to replace it",
        ));
    }
    if roadmap.config.is_initialized() {
        if !args.force {
            return Err(rejected("A roadmap already exists; pass --force to replace it"));
        }
        roadmap.reset();
    }
    let today = Utc::now().date_naive();
    let quarter = args.quarter.unwrap_or_else(|| quarter_of(today));
    let year = args.year.unwrap_or_else(|| today.year());
    let members = (!args.members.is_empty()).then(|| {
        args.members
            .iter()
            .enumerate()
            .map(|(i, name)| TeamMember::new(name.trim(), palette_color(i)))
            .collect()
    });
    let projects = (!args.projects.is_empty()).then_some(args.projects);

    let config = roadmap
        .config
        .initialize(quarter, year, members, projects, TaxonomyOverrides::default())?;
    ok(format!(
        "Roadmap for Q{} {} with {} weeks and {} team members",
        config.quarter,
        config.year,
        config.weeks.len(),
        config.team_members.len()
    ));
    Ok(())
}

fn status(roadmap: &FileRoadmap, week: Option<String>) -> ServiceResult<()> {
    let config = require_config(roadmap)?;
    let week_id = week
        .or_else(|| current_week(config, Utc::now().date_naive()))
        .or_else(|| config.weeks.first().map(|w| w.id.clone()))
        .ok_or_else(|| rejected("The plan has no weeks"))?;
    let Some(week) = config.week(&week_id) else {
        return Err(rejected(format!("No week '{week_id}' in the plan")));
    };

    println!(
        "{} Q{} {}  ({} weeks, {} tasks, {} members)",
        "Roadmap:".cyan().bold(),
        config.quarter,
        config.year,
        config.weeks.len(),
        roadmap.tasks.len(),
        config.team_members.len()
    );
    if roadmap.tasks.unreadable_len() > 0 {
        warn(format!(
            "{} stored task(s) could not be read; they are kept on disk",
            roadmap.tasks.unreadable_len()
        ));
    }
    println!("\n{} {} ({} {})", "Week".bold(), week.id, week.date, week.month);

    let away: Vec<&str> = roadmap
        .config
        .members_away(&week.id)
        .iter()
        .map(|m| m.id.as_str())
        .collect();
    for (member, count) in roadmap.workload(&week.id) {
        let load = match count {
            0 => "free".dimmed().to_string(),
            1 => "1 task".to_string(),
            n => format!("{n} tasks").yellow().to_string(),
        };
        let note = if away.contains(&member.id.as_str()) {
            " (away)".red().to_string()
        } else {
            String::new()
        };
        println!("   {:<20} {}{}", member.name, load, note);
    }
    Ok(())
}

fn weeks(roadmap: &FileRoadmap) -> ServiceResult<()> {
    let config = require_config(roadmap)?;
    let mut month: &str = "";
    for week in &config.weeks {
        if week.month != month {
            month = week.month.as_str();
            println!("\n{}", month.cyan().bold());
        }
        let away: Vec<String> = roadmap
            .config
            .members_away(&week.id)
            .iter()
            .map(|m| m.name.clone())
            .collect();
        if away.is_empty() {
            println!("   {:<4} {}", week.id, week.date);
        } else {
            println!("   {:<4} {}  {} {}", week.id, week.date, "away:".dimmed(), away.join(", "));
        }
    }
    Ok(())
}

fn member(roadmap: &mut FileRoadmap, cmd: MemberCommand) -> ServiceResult<()> {
    require_config(roadmap)?;
    match cmd {
        MemberCommand::Add {
            name,
            color,
            nationality,
            seniority,
        } => {
            let color = color.unwrap_or_else(|| {
                palette_color(roadmap.config.team_members().len()).to_string()
            });
            let mut member = TeamMember::new(name.trim(), color);
            member.nationality = nationality;
            member.seniority = seniority;
            let id = roadmap
                .config
                .add_team_member(member)
                .ok_or_else(|| rejected(format!("Could not add '{name}'; the name may already be taken")))?;
            ok(format!("Added {name} ({id})"));
        }
        MemberCommand::List => {
            for member in roadmap.config.team_members() {
                let tasks = roadmap.tasks.tasks_for_member(&member.id).len();
                let open_goals = member.goals.iter().filter(|g| !g.completed).count();
                let jira = if member.jira_account_id.is_some() { " jira" } else { "" };
                println!(
                    "{:<20} {}  tasks: {}  vacations: {}  open goals: {}{}",
                    member.name.bold(),
                    member.id.dimmed(),
                    tasks,
                    member.vacations.len(),
                    open_goals,
                    jira.cyan()
                );
            }
        }
        MemberCommand::Remove { member, yes } => {
            let id = member_id(roadmap, &member)?;
            let name = member_name(roadmap, &id);
            let tasks = roadmap.tasks.tasks_for_member(&id).len();
            let prompt = format!("Remove {name} and unassign them from {tasks} task(s)?");
            if yes || confirm(&prompt)? {
                roadmap.remove_team_member(&id);
                ok(format!("Removed {name}"));
            }
        }
        MemberCommand::Vacation {
            member,
            start,
            end,
            kind,
            description,
        } => {
            let id = member_id(roadmap, &member)?;
            roadmap
                .config
                .add_vacation(&id, start, end, description, kind.into())
                .ok_or_else(|| rejected("A vacation cannot end before it starts"))?;
            ok(format!("{} is away {start} to {end}", member_name(roadmap, &id)));
        }
        MemberCommand::Goal {
            member,
            objective,
            track,
            due,
        } => {
            let id = member_id(roadmap, &member)?;
            roadmap
                .config
                .add_goal(&id, objective, track, due)
                .ok_or_else(|| rejected("Could not add the goal"))?;
            ok(format!("Goal added for {}", member_name(roadmap, &id)));
        }
    }
    Ok(())
}

/// Warns about values that are not part of the configured taxonomy.
/// They are still stored; the taxonomy is advisory.
fn check_fields(config: &RoadmapConfig, fields: &TaskFields) {
    let lists = [
        ("priority", &fields.priority, &config.priorities),
        ("track", &fields.track, &config.tracks),
        ("status", &fields.status, &config.statuses),
        ("size", &fields.size, &config.sizes),
        ("type", &fields.task_type, &config.types),
    ];
    for (what, value, items) in lists {
        if let Some(value) = value {
            if !items.iter().any(|i| i.name == *value) {
                warn(format!("'{value}' is not a configured {what}"));
            }
        }
    }
}

fn task_update(name: Option<String>, fields: TaskFields) -> TaskUpdate {
    TaskUpdate {
        name,
        priority: fields.priority,
        track: fields.track,
        status: fields.status,
        size: fields.size,
        task_type: fields.task_type,
        ..TaskUpdate::default()
    }
}

fn task(roadmap: &mut FileRoadmap, cmd: TaskCommand) -> ServiceResult<()> {
    let config = require_config(roadmap)?;
    match cmd {
        TaskCommand::Add { name, fields } => {
            check_fields(config, &fields);
            let id = roadmap
                .create_task(name.clone(), task_update(None, fields))
                .ok_or_else(|| rejected("Could not add the task"))?;
            ok(format!("Added {name} ({id})"));
        }
        TaskCommand::List { member, week } => {
            let tasks = match &member {
                Some(reference) => {
                    let id = member_id(roadmap, reference)?;
                    let mut tasks = roadmap.tasks.tasks_for_member(&id);
                    tasks.sort_by_key(|t| t.order);
                    tasks
                }
                None => roadmap.tasks.tasks_sorted(),
            };
            for task in tasks {
                let jira = task.jira_epic_key.as_deref().unwrap_or("");
                println!(
                    "{:>3}. {}  {} | {} | {} | {} {}  {}",
                    task.order,
                    task.name.bold(),
                    task.track,
                    task.status,
                    task.priority,
                    task.size,
                    jira.cyan(),
                    task.id.dimmed()
                );
                if let Some(week) = &week {
                    let names: Vec<String> = task
                        .assignees(week)
                        .iter()
                        .map(|id| member_name(roadmap, id))
                        .collect();
                    if !names.is_empty() {
                        println!("      {} {}", format!("{week}:").dimmed(), names.join(", "));
                    }
                }
            }
        }
        TaskCommand::Update {
            id,
            name,
            fields,
            position,
        } => {
            check_fields(config, &fields);
            if !roadmap.tasks.update_task(&id, task_update(name, fields)) {
                return Err(rejected(format!("No task '{id}'")));
            }
            if let Some(position) = position {
                roadmap.tasks.move_task(&id, position);
            }
            ok(format!("Updated {id}"));
        }
        TaskCommand::Remove { ids } => {
            let removed = roadmap.tasks.remove_tasks(&ids);
            if removed < ids.len() {
                warn(format!("{} id(s) did not match a task", ids.len() - removed));
            }
            ok(format!("Removed {removed} task(s)"));
        }
        TaskCommand::Assign { task, week, member } => {
            if !roadmap.assign(&task, &week, &member) {
                return Err(rejected(format!(
                    "Could not assign {member} to {task} in {week}; check the ids or whether they are already assigned"
                )));
            }
            ok(format!("{member} works on {task} in {week}"));
        }
        TaskCommand::Unassign { task, week, member } => {
            if !roadmap.unassign(&task, &week, &member) {
                return Err(rejected(format!("{member} is not assigned to {task} in {week}")));
            }
            ok(format!("{member} unassigned from {task} in {week}"));
        }
        TaskCommand::Comment { task, text } => {
            if !roadmap.tasks.add_comment(&task, text, None) {
                return Err(rejected(format!("No task '{task}'")));
            }
            ok("Comment added");
        }
    }
    Ok(())
}

fn find_list(roadmap: &FileRoadmap, reference: &str) -> ServiceResult<String> {
    roadmap
        .todos
        .lists()
        .iter()
        .find(|l| l.id == reference || l.name.eq_ignore_ascii_case(reference))
        .map(|l| l.id.clone())
        .ok_or_else(|| rejected(format!("No todo list '{reference}'")))
}

fn todo(roadmap: &mut FileRoadmap, cmd: TodoCommand) -> ServiceResult<()> {
    match cmd {
        TodoCommand::ListAdd { name, color } => {
            let id = roadmap
                .todos
                .create_list(name.clone(), color)
                .ok_or_else(|| rejected("A todo list needs a name"))?;
            ok(format!("Created {name} ({id})"));
        }
        TodoCommand::Add { list, text } => {
            let list_id = find_list(roadmap, &list)?;
            let id = roadmap
                .todos
                .add_todo(&list_id, text)
                .ok_or_else(|| rejected("Could not add the todo"))?;
            ok(format!("Added {id}"));
        }
        TodoCommand::Done { id, undo } => {
            if !roadmap.todos.set_completed(&id, !undo) {
                return Err(rejected(format!("No todo '{id}'")));
            }
            ok(if undo { "Reopened" } else { "Done" });
        }
        TodoCommand::List { list } => {
            let ids = match list {
                Some(reference) => vec![find_list(roadmap, &reference)?],
                None => roadmap.todos.lists().iter().map(|l| l.id.clone()).collect(),
            };
            for id in ids {
                let Some(list) = roadmap.todos.list(&id) else {
                    continue;
                };
                println!("{}", list.name.cyan().bold());
                for todo in roadmap.todos.todos_in(&id) {
                    let mark = if todo.completed {
                        "[x]".green()
                    } else {
                        "[ ]".normal()
                    };
                    println!("   {} {}  {}", mark, todo.text, todo.id.dimmed());
                }
            }
        }
    }
    Ok(())
}

fn export(roadmap: &FileRoadmap, output: Option<&Path>) -> ServiceResult<()> {
    let file = roadmap.export_file().ok_or(ServiceError::NotInitialized)?;
    let json = serde_json::to_string_pretty(&file)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            ok(format!(
                "Exported {} task(s) to {}",
                file.tasks.len(),
                path.display()
            ));
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn import(roadmap: &mut FileRoadmap, input: &Path) -> ServiceResult<()> {
    let raw: Value = serde_json::from_str(&fs::read_to_string(input)?)?;
    let report = roadmap.import_file(&raw);
    if report.config.used_default {
        warn("The file carried no usable configuration; a fresh roadmap for the current quarter was created");
    }
    if !report.config.migration.applied.is_empty() {
        println!(
            "   migrated: {}",
            report.config.migration.applied.join(", ").dimmed()
        );
    }
    if report.pruned > 0 {
        warn(format!(
            "{} assignment(s) pointed at weeks outside the imported plan and were dropped",
            report.pruned
        ));
    }
    ok(format!(
        "Imported {:?} document: {} task(s), {} todo(s)",
        report.shape,
        report.tasks.map_or("no".to_string(), |n| n.to_string()),
        report.todos.map_or("no".to_string(), |n| n.to_string()),
    ));
    Ok(())
}

async fn jira(roadmap: &mut FileRoadmap, settings: &Settings, cmd: JiraCommand) -> ServiceResult<()> {
    let credentials = settings.jira.credentials()?;
    let client = JiraClient::new(&credentials);

    if let JiraCommand::Check = cmd {
        let me = client.myself().await?;
        ok(format!("Connected to {} as {}", client.base_url(), me.display_name));
        return Ok(());
    }

    let board_id = settings.jira.board_id()?;
    let importer =
        JiraImporter::new(&client, credentials.domain.clone()).with_story_delay(settings.story_delay());

    match cmd {
        JiraCommand::Check => {}
        JiraCommand::Epics => {
            for epic in importer.list_epics(board_id).await? {
                print_epic(roadmap, &epic);
            }
        }
        JiraCommand::Import { keys, all } => {
            require_config(roadmap)?;
            for key in &keys {
                validate_epic_key(key)?;
            }
            let epics = importer.list_epics(board_id).await?;
            let selection = select_epics(roadmap, epics, &keys, all)?;
            if selection.is_empty() {
                warn("No epics selected");
                return Ok(());
            }
            let summary = importer
                .import_epics(board_id, &selection, &roadmap.config, &mut roadmap.tasks)
                .await?;
            ok(format!(
                "{} task(s) created, {} updated, {} stories",
                summary.created, summary.updated, summary.stories
            ));
        }
        JiraCommand::Users => {
            let summary = importer
                .import_users(board_id, &mut roadmap.config, &mut roadmap.user_mappings)
                .await?;
            ok(format!(
                "{} member(s) created, {} updated, {} linked by name",
                summary.created, summary.updated, summary.linked
            ));
        }
    }
    Ok(())
}

fn print_epic(roadmap: &FileRoadmap, epic: &Epic) {
    let imported = roadmap.tasks.get_task_by_jira_key(&epic.key).is_some();
    println!(
        "{:<12} {}{}{}",
        epic.key.cyan(),
        epic.summary,
        if epic.done { " (done)".dimmed().to_string() } else { String::new() },
        if imported { " [imported]".green().to_string() } else { String::new() }
    );
}

fn select_epics(roadmap: &FileRoadmap, epics: Vec<Epic>, keys: &[String], all: bool) -> ServiceResult<Vec<Epic>> {
    if all {
        return Ok(epics);
    }
    if !keys.is_empty() {
        if let Some(missing) = keys.iter().find(|k| !epics.iter().any(|e| &e.key == *k)) {
            return Err(rejected(format!("Epic {missing} is not on the board")));
        }
        return Ok(epics.into_iter().filter(|e| keys.contains(&e.key)).collect());
    }

    let labels: Vec<String> = epics
        .iter()
        .map(|e| format!("{}  {}", e.key, e.summary))
        .collect();
    let defaults: Vec<bool> = epics
        .iter()
        .map(|e| roadmap.tasks.get_task_by_jira_key(&e.key).is_some())
        .collect();
    let picked = MultiSelect::new()
        .with_prompt("Epics to import (space to toggle, enter to confirm)")
        .items(&labels)
        .defaults(&defaults)
        .interact()?;
    Ok(picked.into_iter().filter_map(|i| epics.get(i).cloned()).collect())
}

/// Interactive editor for the settings file. Only the file is edited;
/// environment overrides are left out on purpose so they are not persisted.
fn edit_settings(path: &Path) -> ServiceResult<()> {
    let mut settings = Settings::load(path)?;
    println!("{} {}", "Config:".cyan().bold(), path.display());

    let data_dir: String = Input::new()
        .with_prompt("Data directory (empty for the default)")
        .with_initial_text(
            settings
                .data_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        )
        .allow_empty(true)
        .interact_text()?;
    settings.data_dir = (!data_dir.trim().is_empty()).then(|| PathBuf::from(data_dir.trim()));

    settings.jira.domain = prompt_optional("Jira domain", settings.jira.domain.take())?;
    settings.jira.email = prompt_optional("Jira email", settings.jira.email.take())?;

    let token = Password::new()
        .with_prompt("Jira API token (empty keeps the current one)")
        .allow_empty_password(true)
        .interact()?;
    if !token.is_empty() {
        settings.jira.api_token = Some(token);
    }

    let board: String = Input::new()
        .with_prompt("Jira board id")
        .with_initial_text(settings.jira.board_id.map(|b| b.to_string()).unwrap_or_default())
        .allow_empty(true)
        .validate_with(|v: &String| -> Result<(), &str> {
            if v.trim().is_empty() || v.trim().parse::<u64>().is_ok() {
                Ok(())
            } else {
                Err("board id must be a number")
            }
        })
        .interact_text()?;
    settings.jira.board_id = board.trim().parse().ok();

    settings.story_delay_ms = Input::new()
        .with_prompt("Pause between story requests (ms)")
        .default(settings.story_delay_ms)
        .interact_text()?;

    settings.save(path)?;
    ok(format!("Saved {}", path.display()));
    Ok(())
}

fn prompt_optional(prompt: &str, current: Option<String>) -> ServiceResult<Option<String>> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .with_initial_text(current.unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_roadmap(dir: &TempDir) -> FileRoadmap {
        let mut roadmap = Roadmap::open_dir(dir.path());
        init(
            &mut roadmap,
            InitArgs {
                quarter: Some(4),
                year: Some(2025),
                members: vec!["Ana".into(), "Ben".into()],
                projects: vec!["Payments".into()],
                force: false,
            },
        )
        .unwrap();
        roadmap
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let mut roadmap = file_roadmap(&dir);
        let again = InitArgs {
            quarter: Some(1),
            year: Some(2026),
            members: vec![],
            projects: vec![],
            force: false,
        };
        assert!(init(&mut roadmap, again.clone()).is_err());
        init(&mut roadmap, InitArgs { force: true, ..again }).unwrap();
        assert_eq!(roadmap.config.config().unwrap().quarter, 1);
    }

    #[test]
    fn init_does_not_overwrite_an_unreadable_roadmap() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("roadmap-config.json"), "{ truncated").unwrap();
        let mut roadmap = Roadmap::open_dir(dir.path());
        let args = InitArgs {
            quarter: Some(4),
            year: Some(2025),
            members: vec!["Ana".into(), "ana".into()],
            projects: vec![],
            force: false,
        };
        assert!(init(&mut roadmap, args.clone()).is_err());
        assert_eq!(
            fs::read_to_string(dir.path().join("roadmap-config.json")).unwrap(),
            "{ truncated"
        );

        init(&mut roadmap, InitArgs { force: true, ..args }).unwrap();
        assert_eq!(roadmap.config.team_members().len(), 1);
    }

    #[test]
    fn current_week_is_found_by_monday() {
        let dir = TempDir::new().unwrap();
        let roadmap = file_roadmap(&dir);
        let config = roadmap.config.config().unwrap();
        let wednesday = NaiveDate::from_ymd_opt(2025, 10, 8).unwrap();
        assert_eq!(current_week(config, wednesday).as_deref(), Some("W1"));
        let before = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        assert_eq!(current_week(config, before), None);
    }

    #[test]
    fn task_commands_round_trip_through_files() {
        let dir = TempDir::new().unwrap();
        let mut roadmap = file_roadmap(&dir);
        task(
            &mut roadmap,
            TaskCommand::Add {
                name: "Ledger".into(),
                fields: TaskFields {
                    priority: Some("High".into()),
                    ..TaskFields::default()
                },
            },
        )
        .unwrap();
        let id = roadmap.tasks.tasks()[0].id.clone();
        task(
            &mut roadmap,
            TaskCommand::Assign {
                task: id.clone(),
                week: "W2".into(),
                member: "ana".into(),
            },
        )
        .unwrap();
        assert!(
            task(
                &mut roadmap,
                TaskCommand::Assign {
                    task: id.clone(),
                    week: "W40".into(),
                    member: "Ana".into(),
                },
            )
            .is_err()
        );

        let reopened = Roadmap::open_dir(dir.path());
        let stored = reopened.tasks.get_task_by_id(&id).unwrap();
        assert_eq!(stored.priority, "High");
        assert_eq!(stored.track, "Payments");
        let ana = reopened.config.member_by_name("Ana").unwrap();
        assert_eq!(stored.assignees("W2"), [ana.id.clone()]);
    }

    #[test]
    fn export_and_import_files() {
        let dir = TempDir::new().unwrap();
        let roadmap = file_roadmap(&dir);
        let out = dir.path().join("export.json");
        export(&roadmap, Some(&out)).unwrap();

        let other = TempDir::new().unwrap();
        let mut target = Roadmap::open_dir(other.path());
        import(&mut target, &out).unwrap();
        assert!(
            target
                .config
                .config()
                .unwrap()
                .same_plan(roadmap.config.config().unwrap())
        );
    }

    #[test]
    fn todo_lists_are_found_by_name() {
        let dir = TempDir::new().unwrap();
        let mut roadmap = file_roadmap(&dir);
        todo(
            &mut roadmap,
            TodoCommand::ListAdd {
                name: "Inbox".into(),
                color: None,
            },
        )
        .unwrap();
        todo(
            &mut roadmap,
            TodoCommand::Add {
                list: "inbox".into(),
                text: "call vendor".into(),
            },
        )
        .unwrap();
        assert_eq!(roadmap.todos.todos().len(), 1);
        assert!(
            todo(
                &mut roadmap,
                TodoCommand::Add {
                    list: "missing".into(),
                    text: "x".into(),
                },
            )
            .is_err()
        );
    }
}
