//! Epic and user import.
//!
//! Epics are listed first so the caller can pick which ones to import. Story
//! fetches for the picked epics then run one at a time with a fixed pause in
//! between. Nothing is written to the stores until every fetch has succeeded,
//! so a failed request leaves the roadmap as it was.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Duration;

use super::JiraApi;
use super::mapping::UserMappings;
use super::types::{Epic, JiraUser, Story};
use crate::config_store::ConfigStore;
use crate::defaults;
use crate::error::{ServiceError, ServiceResult};
use crate::storage::KeyValueStore;
use crate::task_store::TaskStore;
use crate::types::{RoadmapConfig, Task, TaskUpdate, TeamMember, TeamMemberUpdate};

pub const DEFAULT_STORY_DELAY: Duration = Duration::from_millis(200);

static EPIC_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*-[0-9]+$").expect("epic key pattern"));

pub fn validate_epic_key(key: &str) -> ServiceResult<()> {
    if EPIC_KEY.is_match(key) {
        Ok(())
    } else {
        Err(ServiceError::InvalidEpicKey(key.to_string()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EpicImportSummary {
    pub created: usize,
    pub updated: usize,
    pub stories: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserImportSummary {
    pub created: usize,
    pub updated: usize,
    pub linked: usize,
}

pub struct JiraImporter<'a, A: JiraApi> {
    api: &'a A,
    domain: String,
    story_delay: Duration,
}

impl<'a, A: JiraApi> JiraImporter<'a, A> {
    pub fn new(api: &'a A, domain: impl Into<String>) -> Self {
        Self {
            api,
            domain: domain.into(),
            story_delay: DEFAULT_STORY_DELAY,
        }
    }

    pub fn with_story_delay(mut self, delay: Duration) -> Self {
        self.story_delay = delay;
        self
    }

    pub async fn list_epics(&self, board_id: u64) -> ServiceResult<Vec<Epic>> {
        let epics = self.api.fetch_epics(board_id).await?;
        tracing::info!(board_id, count = epics.len(), "fetched epics");
        Ok(epics)
    }

    /// Stories of each selected epic, in selection order.
    pub async fn fetch_stories(&self, selection: &[Epic]) -> ServiceResult<Vec<Vec<Story>>> {
        for epic in selection {
            validate_epic_key(&epic.key)?;
        }
        let mut all = Vec::with_capacity(selection.len());
        for (i, epic) in selection.iter().enumerate() {
            if i > 0 && !self.story_delay.is_zero() {
                tokio::time::sleep(self.story_delay).await;
            }
            let stories = self.api.fetch_stories(&epic.key, &self.domain).await?;
            tracing::debug!(epic = %epic.key, count = stories.len(), "fetched stories");
            all.push(stories);
        }
        Ok(all)
    }

    /// Imports the selected epics as tasks. Tasks already carrying an epic's
    /// key are refreshed in place; the rest are created with the configured
    /// task defaults.
    pub async fn import_epics<S: KeyValueStore>(
        &self,
        board_id: u64,
        selection: &[Epic],
        config: &ConfigStore<S>,
        tasks: &mut TaskStore<S>,
    ) -> ServiceResult<EpicImportSummary> {
        let config = config.config().ok_or(ServiceError::NotInitialized)?;
        let stories = self.fetch_stories(selection).await?;
        let summary = apply_epics(board_id, selection, stories, config, tasks);
        tracing::info!(
            created = summary.created,
            updated = summary.updated,
            stories = summary.stories,
            "epic import finished"
        );
        Ok(summary)
    }

    /// Imports the board's assignable users as team members.
    pub async fn import_users<S: KeyValueStore>(
        &self,
        board_id: u64,
        config: &mut ConfigStore<S>,
        mappings: &mut UserMappings<S>,
    ) -> ServiceResult<UserImportSummary> {
        if !config.is_initialized() {
            return Err(ServiceError::NotInitialized);
        }
        let users = self.api.fetch_users(board_id).await?;
        let summary = apply_users(users, config, mappings);
        tracing::info!(
            created = summary.created,
            updated = summary.updated,
            linked = summary.linked,
            "user import finished"
        );
        Ok(summary)
    }
}

/// Status used for epics Jira reports as done: a status named "Done" if the
/// taxonomy has one, otherwise the last configured status.
fn done_status(config: &RoadmapConfig) -> Option<String> {
    config
        .statuses
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case("done") || s.id == "done")
        .or_else(|| config.statuses.last())
        .map(|s| s.name.clone())
}

fn apply_epics<S: KeyValueStore>(
    board_id: u64,
    selection: &[Epic],
    stories: Vec<Vec<Story>>,
    config: &RoadmapConfig,
    tasks: &mut TaskStore<S>,
) -> EpicImportSummary {
    let mut summary = EpicImportSummary::default();
    let done = done_status(config);
    let mut order = tasks.next_order();
    let mut new_tasks = Vec::new();

    for (epic, stories) in selection.iter().zip(stories) {
        summary.stories += stories.len();
        let subtasks: Vec<_> = stories.iter().map(Story::to_subtask).collect();
        let status = if epic.done { done.clone() } else { None };

        if let Some(existing) = tasks.get_task_by_jira_key(&epic.key) {
            let id = existing.id.clone();
            let update = TaskUpdate {
                name: Some(epic.summary.clone()),
                status,
                jira_subtasks: Some(subtasks),
                jira_board_id: Some(Some(board_id)),
                ..TaskUpdate::default()
            };
            if tasks.update_task(&id, update) {
                summary.updated += 1;
            }
            continue;
        }

        let mut task = Task::new(epic.summary.clone(), &config.defaults);
        if let Some(status) = status {
            task.status = status;
        }
        task.order = order;
        order += 1;
        task.jira_epic_key = Some(epic.key.clone());
        task.jira_subtasks = subtasks;
        task.jira_board_id = Some(board_id);
        new_tasks.push(task);
    }

    if !new_tasks.is_empty() {
        summary.created = tasks.add_tasks(new_tasks).added;
    }
    summary
}

fn apply_users<S: KeyValueStore>(
    users: Vec<JiraUser>,
    config: &mut ConfigStore<S>,
    mappings: &mut UserMappings<S>,
) -> UserImportSummary {
    let mut summary = UserImportSummary::default();

    for user in users {
        let known = mappings
            .member_for(&user.account_id)
            .and_then(|id| config.member_by_id(id))
            .or_else(|| {
                config
                    .team_members()
                    .iter()
                    .find(|m| m.jira_account_id.as_deref() == Some(user.account_id.as_str()))
            })
            .map(|m| m.id.clone());

        let linked_by_name = known.is_none();
        // A member already tied to another account is never taken over by name.
        let target = known.or_else(|| {
            config
                .member_by_name(&user.display_name)
                .filter(|m| {
                    m.jira_account_id
                        .as_deref()
                        .is_none_or(|account| account == user.account_id)
                })
                .map(|m| m.id.clone())
        });

        match target {
            Some(member_id) => {
                let update = TeamMemberUpdate {
                    avatar_url: user.avatar_url.clone().map(Some),
                    jira_account_id: Some(Some(user.account_id.clone())),
                    ..TeamMemberUpdate::default()
                };
                if config.update_team_member(&member_id, update) {
                    mappings.link(&user.account_id, &member_id);
                    if linked_by_name {
                        summary.linked += 1;
                    } else {
                        summary.updated += 1;
                    }
                }
            }
            None => {
                let color = defaults::palette_color(config.team_members().len());
                let mut member = TeamMember::new(free_name(config, &user.display_name), color);
                member.avatar_url = user.avatar_url.clone();
                member.jira_account_id = Some(user.account_id.clone());
                if let Some(member_id) = config.add_team_member(member) {
                    mappings.link(&user.account_id, &member_id);
                    summary.created += 1;
                }
            }
        }
    }
    summary
}

/// `name`, or `name (2)`, `name (3)`, ... when a member already uses it.
fn free_name<S: KeyValueStore>(config: &ConfigStore<S>, name: &str) -> String {
    if config.member_by_name(name).is_none() {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{name} ({n})"))
        .find(|candidate| config.member_by_name(candidate).is_none())
        .unwrap_or_else(|| name.to_string())
}
