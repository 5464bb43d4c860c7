//! The roadmap as a whole: configuration, tasks, todos and Jira account links
//! sharing one storage backend, plus the operations that span more than one
//! of them.

use serde_json::Value;
use std::path::Path;

use crate::config_store::{ConfigImport, ConfigStore};
use crate::error::{ServiceError, ServiceResult};
use crate::jira::UserMappings;
use crate::storage::{FileStore, KeyValueStore, Persistence};
use crate::task_store::TaskStore;
use crate::todo_store::TodoStore;
use crate::transfer::{ExportFile, ImportBundle, ImportShape};
use crate::types::{Task, TaskUpdate, TeamMember};

/// What an import changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportReport {
    pub shape: ImportShape,
    pub config: ConfigImport,
    /// Number of tasks now stored, when the document carried tasks.
    pub tasks: Option<usize>,
    pub todos: Option<usize>,
    /// Tasks whose assignees were rewritten from member names to ids.
    pub relinked: usize,
    /// Week assignments dropped because their week is not in the imported plan.
    pub pruned: usize,
}

pub struct Roadmap<S: KeyValueStore> {
    pub config: ConfigStore<S>,
    pub tasks: TaskStore<S>,
    pub todos: TodoStore<S>,
    pub user_mappings: UserMappings<S>,
}

impl Roadmap<FileStore> {
    pub fn open_dir(dir: impl AsRef<Path>) -> Self {
        Self::open(Persistence::new(FileStore::new(dir)))
    }
}

impl<S: KeyValueStore> Roadmap<S> {
    /// Loads and migrates every store, then rewrites any assignee still
    /// stored as a member name.
    pub fn open(persistence: Persistence<S>) -> Self {
        let mut roadmap = Self {
            config: ConfigStore::load(persistence.clone()),
            tasks: TaskStore::load(persistence.clone()),
            todos: TodoStore::load(persistence.clone()),
            user_mappings: UserMappings::load(persistence),
        };
        let relinked = roadmap.link_assignees();
        if relinked > 0 {
            tracing::info!(tasks = relinked, "rewrote member names in assignments to ids");
        }
        roadmap
    }

    /// Replaces assignees that match a member name with that member's id.
    /// Unknown references are left alone.
    pub fn link_assignees(&mut self) -> usize {
        if !self.config.is_initialized() {
            return 0;
        }
        let config = &self.config;
        self.tasks.rewrite_assignees(|assignee| {
            let id = match config.member_by_id(assignee) {
                Some(member) => member.id.clone(),
                None => config
                    .member_by_name(assignee)
                    .map(|m| m.id.clone())
                    .unwrap_or_else(|| assignee.to_string()),
            };
            Some(id)
        })
    }

    /// Full export document, or `None` before initialization.
    pub fn export_file(&self) -> Option<ExportFile> {
        let export = self.config.export_config()?;
        Some(
            export
                .with_tasks(self.tasks.tasks_sorted().into_iter().cloned().collect())
                .with_todos(self.todos.lists().to_vec(), self.todos.todos().to_vec()),
        )
    }

    /// Imports any of the accepted document shapes. Tasks and todos are
    /// replaced only when the document carries them.
    pub fn import_file(&mut self, raw: &Value) -> ImportReport {
        let bundle = ImportBundle::parse(raw);
        let config = self.config.apply_import(&bundle);

        let tasks = bundle.tasks.map(|tasks| {
            self.tasks.replace_tasks(tasks);
            self.tasks.len()
        });

        let todos = if bundle.todo_lists.is_some() || bundle.todos.is_some() {
            let lists = bundle
                .todo_lists
                .unwrap_or_else(|| self.todos.lists().to_vec());
            let todos = bundle.todos.unwrap_or_else(|| self.todos.todos().to_vec());
            self.todos.replace_all(lists, todos);
            Some(self.todos.todos().len())
        } else {
            None
        };

        let relinked = self.link_assignees();
        let pruned = match self.config.config().map(|c| c.weeks.clone()) {
            Some(weeks) => self.tasks.prune_assignments(&weeks),
            None => 0,
        };

        ImportReport {
            shape: bundle.shape,
            config,
            tasks,
            todos,
            relinked,
            pruned,
        }
    }

    /// Moves the plan to another quarter. Returns how many week assignments
    /// fell outside the new week list and were dropped.
    pub fn change_quarter(&mut self, quarter: u8, year: i32) -> ServiceResult<usize> {
        if !self.config.set_quarter(quarter, year)? {
            return Err(ServiceError::NotInitialized);
        }
        let weeks = self
            .config
            .config()
            .map(|c| c.weeks.clone())
            .unwrap_or_default();
        Ok(self.tasks.prune_assignments(&weeks))
    }

    /// New task filled in from the configured defaults, appended at the end.
    pub fn create_task(&mut self, name: impl Into<String>, overrides: TaskUpdate) -> Option<String> {
        let Some(config) = self.config.config() else {
            tracing::warn!("cannot create a task before initialization");
            return None;
        };
        let mut task = Task::new(name, &config.defaults);
        task.order = self.tasks.next_order();
        overrides.apply_to(&mut task);
        let id = task.id.clone();
        self.tasks.add_task(task).then_some(id)
    }

    /// Assigns a member (by id or name) to a task for one week of the plan.
    pub fn assign(&mut self, task_id: &str, week_id: &str, member: &str) -> bool {
        let Some(member_id) = self.checked_member(week_id, member) else {
            return false;
        };
        self.tasks.assign(task_id, week_id, &member_id)
    }

    pub fn unassign(&mut self, task_id: &str, week_id: &str, member: &str) -> bool {
        let member_id = self
            .config
            .resolve_member(member)
            .map(|m| m.id.clone())
            .unwrap_or_else(|| member.to_string());
        self.tasks.unassign(task_id, week_id, &member_id)
    }

    /// Removes the member and every reference to them.
    pub fn remove_team_member(&mut self, member: &str) -> bool {
        let Some(id) = self.config.resolve_member(member).map(|m| m.id.clone()) else {
            tracing::warn!(member, "team member not found");
            return false;
        };
        if !self.config.remove_team_member(&id) {
            return false;
        }
        let touched = self.tasks.remove_member_references(&id);
        self.user_mappings.unlink_member(&id);
        tracing::info!(member_id = %id, tasks = touched, "removed team member");
        true
    }

    /// Number of tasks each member is assigned to in a week.
    pub fn workload(&self, week_id: &str) -> Vec<(&TeamMember, usize)> {
        self.config
            .team_members()
            .iter()
            .map(|member| {
                let count = self
                    .tasks
                    .tasks()
                    .iter()
                    .filter(|t| t.assignees(week_id).iter().any(|a| *a == member.id))
                    .count();
                (member, count)
            })
            .collect()
    }

    /// Drops the configuration, all tasks and the Jira account links.
    /// Todo lists are personal and survive.
    pub fn reset(&mut self) {
        self.config.reset_config();
        self.tasks.replace_tasks(Vec::new());
        self.user_mappings.clear();
    }

    fn checked_member(&self, week_id: &str, member: &str) -> Option<String> {
        let config = self.config.config()?;
        if config.week(week_id).is_none() {
            tracing::warn!(week_id, "week is not part of the current plan");
            return None;
        }
        match self.config.resolve_member(member) {
            Some(m) => Some(m.id.clone()),
            None => {
                tracing::warn!(member, "team member not found");
                None
            }
        }
    }
}
