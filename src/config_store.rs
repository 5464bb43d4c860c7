//! Roadmap configuration store.
//!
//! Owns the single [`RoadmapConfig`] of a storage namespace: quarter and
//! weeks, the team roster with vacations and goals, and the task taxonomy.
//! Every mutation bumps `lastModified` and is written through immediately.

use chrono::{Datelike, NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::defaults;
use crate::error::ServiceResult;
use crate::migration::{MigrationReport, migrate_config};
use crate::storage::{CONFIG_KEY, KeyValueStore, Persistence};
use crate::transfer::{ExportFile, ImportBundle, ImportShape};
use crate::types::{
    Comment, ConfigUpdate, Goal, GoalUpdate, RoadmapConfig, TaxonomyOverrides, TeamMember,
    TeamMemberUpdate, Vacation, VacationType,
};
use crate::weeks::{generate_weeks, quarter_of, validate_quarter};

/// Outcome of [`ConfigStore::import_config`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigImport {
    pub shape: ImportShape,
    pub migration: MigrationReport,
    /// The input carried no usable configuration and a fresh one was created.
    pub used_default: bool,
}

/// Builds a configuration without touching any store.
pub fn new_config(
    quarter: u8,
    year: i32,
    team_members: Option<Vec<TeamMember>>,
    projects: Option<Vec<String>>,
    taxonomy: TaxonomyOverrides,
) -> ServiceResult<RoadmapConfig> {
    validate_quarter(quarter)?;
    let weeks = generate_weeks(quarter, year)?;

    let team_members = match team_members.map(unique_members) {
        Some(members) if !members.is_empty() => members,
        _ => defaults::team_members(),
    };
    let tracks = match projects {
        Some(projects) if projects.iter().any(|p| !p.trim().is_empty()) => {
            defaults::tracks_from_projects(&projects)
        }
        _ => defaults::tracks(),
    };
    let task_defaults = taxonomy
        .defaults
        .unwrap_or_else(|| defaults::task_defaults(&tracks));

    let now = Utc::now();
    Ok(RoadmapConfig {
        quarter,
        year,
        weeks,
        team_members,
        tracks,
        priorities: taxonomy.priorities.unwrap_or_else(defaults::priorities),
        statuses: taxonomy.statuses.unwrap_or_else(defaults::statuses),
        types: taxonomy.types.unwrap_or_else(defaults::types),
        sizes: taxonomy.sizes.unwrap_or_else(defaults::sizes),
        defaults: task_defaults,
        created_at: now,
        last_modified: now,
    })
}

/// Drops members with a blank or repeated (case-insensitive) name and gives
/// every survivor a distinct id.
fn unique_members(members: Vec<TeamMember>) -> Vec<TeamMember> {
    let mut kept: Vec<TeamMember> = Vec::with_capacity(members.len());
    for mut member in members {
        if member.name.trim().is_empty() {
            tracing::warn!("skipping team member without a name");
            continue;
        }
        if kept.iter().any(|m| same_name(&m.name, &member.name)) {
            tracing::warn!(name = %member.name, "skipping duplicate team member name");
            continue;
        }
        if member.id.is_empty() || kept.iter().any(|m| m.id == member.id) {
            member.id = ulid::Ulid::new().to_string();
        }
        kept.push(member);
    }
    kept
}

fn index_members(config: &RoadmapConfig) -> HashMap<String, usize> {
    config
        .team_members
        .iter()
        .enumerate()
        .map(|(i, m)| (m.id.clone(), i))
        .collect()
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

pub struct ConfigStore<S: KeyValueStore> {
    persistence: Persistence<S>,
    config: Option<RoadmapConfig>,
    member_index: HashMap<String, usize>,
    last_migration: MigrationReport,
    unreadable: bool,
}

impl<S: KeyValueStore> ConfigStore<S> {
    /// Loads the stored configuration, migrating and re-persisting it when
    /// an older shape is found.
    pub fn load(persistence: Persistence<S>) -> Self {
        let mut store = Self {
            persistence,
            config: None,
            member_index: HashMap::new(),
            last_migration: MigrationReport::default(),
            unreadable: false,
        };
        store.reload();
        store
    }

    pub fn reload(&mut self) -> &MigrationReport {
        self.config = None;
        self.last_migration = MigrationReport::default();
        self.unreadable = false;

        if let Some(mut doc) = self.persistence.get_raw(CONFIG_KEY) {
            let report = migrate_config(&mut doc);
            match serde_json::from_value::<RoadmapConfig>(doc) {
                Ok(config) => {
                    self.config = Some(config);
                    if report.updated {
                        self.persist();
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stored roadmap configuration is unusable, ignoring it");
                    self.unreadable = true;
                }
            }
            self.last_migration = report;
        } else {
            // Present but not JSON.
            self.unreadable = self
                .persistence
                .backend()
                .read(CONFIG_KEY)
                .is_ok_and(|content| content.is_some());
        }
        self.reindex();
        &self.last_migration
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// A configuration document is stored but could not be decoded. It stays
    /// on disk until something installs a new configuration.
    pub fn has_unreadable_document(&self) -> bool {
        self.unreadable
    }

    pub fn config(&self) -> Option<&RoadmapConfig> {
        self.config.as_ref()
    }

    pub fn last_migration(&self) -> &MigrationReport {
        &self.last_migration
    }

    pub fn initialize(
        &mut self,
        quarter: u8,
        year: i32,
        team_members: Option<Vec<TeamMember>>,
        projects: Option<Vec<String>>,
        taxonomy: TaxonomyOverrides,
    ) -> ServiceResult<&RoadmapConfig> {
        let config = new_config(quarter, year, team_members, projects, taxonomy)?;
        tracing::info!(quarter, year, weeks = config.weeks.len(), "initialized roadmap");
        Ok(self.install(config))
    }

    /// Shallow merge into the current configuration. No-op before initialization.
    pub fn update_config(&mut self, update: ConfigUpdate) -> bool {
        self.mutate("update_config", |config| {
            if let Some(v) = update.quarter {
                config.quarter = v;
            }
            if let Some(v) = update.year {
                config.year = v;
            }
            if let Some(v) = update.weeks {
                config.weeks = v;
            }
            if let Some(v) = update.team_members {
                config.team_members = v;
            }
            if let Some(v) = update.tracks {
                config.tracks = v;
            }
            if let Some(v) = update.priorities {
                config.priorities = v;
            }
            if let Some(v) = update.statuses {
                config.statuses = v;
            }
            if let Some(v) = update.types {
                config.types = v;
            }
            if let Some(v) = update.sizes {
                config.sizes = v;
            }
            if let Some(v) = update.defaults {
                config.defaults = v;
            }
            true
        })
    }

    /// Moves the plan to another quarter and regenerates its weeks.
    /// Returns `Ok(false)` when there is no configuration yet.
    pub fn set_quarter(&mut self, quarter: u8, year: i32) -> ServiceResult<bool> {
        let weeks = generate_weeks(quarter, year)?;
        Ok(self.mutate("set_quarter", |config| {
            config.quarter = quarter;
            config.year = year;
            config.weeks = weeks;
            true
        }))
    }

    /// Accepts an export bundle, a bare configuration, or anything else
    /// (which yields a fresh configuration for the current quarter).
    pub fn import_config(&mut self, raw: &Value) -> ConfigImport {
        let bundle = ImportBundle::parse(raw);
        self.apply_import(&bundle)
    }

    pub fn apply_import(&mut self, bundle: &ImportBundle) -> ConfigImport {
        let mut result = ConfigImport {
            shape: bundle.shape,
            migration: MigrationReport::default(),
            used_default: false,
        };

        if let Some(doc) = &bundle.config {
            let mut doc = doc.clone();
            result.migration = migrate_config(&mut doc);
            match serde_json::from_value::<RoadmapConfig>(doc) {
                Ok(mut config) => {
                    config.last_modified = Utc::now();
                    tracing::info!(shape = ?bundle.shape, quarter = config.quarter, year = config.year, "imported configuration");
                    self.install(config);
                    return result;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "imported configuration is unusable, falling back to defaults");
                }
            }
        } else if bundle.shape == ImportShape::LegacyTasks && self.config.is_some() {
            tracing::info!("legacy task-only import keeps the current configuration");
            return result;
        }

        let today = Utc::now().date_naive();
        if let Ok(config) = new_config(
            quarter_of(today),
            today.year(),
            None,
            None,
            TaxonomyOverrides::default(),
        ) {
            self.install(config);
        }
        result.used_default = true;
        result
    }

    /// Snapshot for export. Tasks and todos are left empty for the caller to fill in.
    pub fn export_config(&self) -> Option<ExportFile> {
        self.config.as_ref().map(|c| ExportFile::new(c.clone()))
    }

    pub fn reset_config(&mut self) {
        self.persistence.remove(CONFIG_KEY);
        self.config = None;
        self.member_index.clear();
        self.unreadable = false;
        tracing::info!("roadmap configuration reset");
    }

    pub fn member_by_id(&self, id: &str) -> Option<&TeamMember> {
        let index = *self.member_index.get(id)?;
        self.config.as_ref()?.team_members.get(index)
    }

    pub fn member_by_name(&self, name: &str) -> Option<&TeamMember> {
        self.config
            .as_ref()?
            .team_members
            .iter()
            .find(|m| same_name(&m.name, name))
    }

    /// Looks a member up by id first, then by (legacy) name.
    pub fn resolve_member(&self, reference: &str) -> Option<&TeamMember> {
        self.member_by_id(reference)
            .or_else(|| self.member_by_name(reference))
    }

    pub fn team_members(&self) -> &[TeamMember] {
        self.config
            .as_ref()
            .map(|c| c.team_members.as_slice())
            .unwrap_or(&[])
    }

    /// Adds a member and returns its id. Names are unique (case-insensitive).
    pub fn add_team_member(&mut self, mut member: TeamMember) -> Option<String> {
        if member.name.trim().is_empty() {
            tracing::warn!("team member name is empty");
            return None;
        }
        if member.id.is_empty() {
            member.id = ulid::Ulid::new().to_string();
        }
        let id = member.id.clone();
        let added = self.mutate("add_team_member", |config| {
            if config.team_members.iter().any(|m| same_name(&m.name, &member.name)) {
                tracing::warn!(name = %member.name, "team member name already exists");
                return false;
            }
            if config.team_members.iter().any(|m| m.id == member.id) {
                tracing::warn!(id = %member.id, "team member id already exists");
                return false;
            }
            config.team_members.push(member);
            true
        });
        added.then_some(id)
    }

    pub fn update_team_member(&mut self, id: &str, update: TeamMemberUpdate) -> bool {
        self.mutate("update_team_member", |config| {
            let Some(index) = config.team_members.iter().position(|m| m.id == id) else {
                tracing::warn!(id, "team member not found");
                return false;
            };
            if let Some(name) = &update.name {
                let clash = config
                    .team_members
                    .iter()
                    .enumerate()
                    .any(|(i, m)| i != index && same_name(&m.name, name));
                if name.trim().is_empty() || clash {
                    tracing::warn!(id, name = %name, "rename rejected");
                    return false;
                }
            }
            let member = &mut config.team_members[index];
            if let Some(v) = update.name {
                member.name = v;
            }
            if let Some(v) = update.color {
                member.color = v;
            }
            if let Some(v) = update.nationality {
                member.nationality = v;
            }
            if let Some(v) = update.seniority {
                member.seniority = v;
            }
            if let Some(v) = update.avatar_url {
                member.avatar_url = v;
            }
            if let Some(v) = update.jira_account_id {
                member.jira_account_id = v;
            }
            true
        })
    }

    pub fn remove_team_member(&mut self, id: &str) -> bool {
        self.mutate("remove_team_member", |config| {
            let before = config.team_members.len();
            config.team_members.retain(|m| m.id != id);
            if config.team_members.len() == before {
                tracing::warn!(id, "team member not found");
                return false;
            }
            true
        })
    }

    pub fn add_vacation(
        &mut self,
        member_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        description: Option<String>,
        kind: VacationType,
    ) -> Option<String> {
        if end_date < start_date {
            tracing::warn!(member_id, %start_date, %end_date, "vacation ends before it starts");
            return None;
        }
        let vacation = Vacation {
            id: ulid::Ulid::new().to_string(),
            start_date,
            end_date,
            description,
            kind,
        };
        let id = vacation.id.clone();
        self.with_member(member_id, "add_vacation", |member| {
            member.vacations.push(vacation);
            true
        })
        .then_some(id)
    }

    pub fn remove_vacation(&mut self, member_id: &str, vacation_id: &str) -> bool {
        self.with_member(member_id, "remove_vacation", |member| {
            let before = member.vacations.len();
            member.vacations.retain(|v| v.id != vacation_id);
            member.vacations.len() != before
        })
    }

    /// Members with a vacation overlapping the given week.
    pub fn members_away(&self, week_id: &str) -> Vec<&TeamMember> {
        let Some(config) = &self.config else {
            return Vec::new();
        };
        let Some(monday) = config.week(week_id).and_then(|w| w.monday(config.year)) else {
            return Vec::new();
        };
        config
            .team_members
            .iter()
            .filter(|m| m.vacations.iter().any(|v| v.overlaps_week(monday)))
            .collect()
    }

    pub fn add_goal(
        &mut self,
        member_id: &str,
        objective: impl Into<String>,
        track: Option<String>,
        due_date: Option<NaiveDate>,
    ) -> Option<String> {
        let goal = Goal {
            id: ulid::Ulid::new().to_string(),
            objective: objective.into(),
            rating: None,
            next_step: None,
            track,
            completed: false,
            created_at: Utc::now(),
            due_date,
        };
        let id = goal.id.clone();
        self.with_member(member_id, "add_goal", |member| {
            member.goals.push(goal);
            true
        })
        .then_some(id)
    }

    pub fn update_goal(&mut self, member_id: &str, goal_id: &str, update: GoalUpdate) -> bool {
        self.with_member(member_id, "update_goal", |member| {
            let Some(goal) = member.goals.iter_mut().find(|g| g.id == goal_id) else {
                return false;
            };
            if let Some(v) = update.objective {
                goal.objective = v;
            }
            if let Some(v) = update.rating {
                goal.rating = v;
            }
            if let Some(v) = update.next_step {
                goal.next_step = v;
            }
            if let Some(v) = update.track {
                goal.track = v;
            }
            if let Some(v) = update.completed {
                goal.completed = v;
            }
            if let Some(v) = update.due_date {
                goal.due_date = v;
            }
            true
        })
    }

    pub fn set_goal_completed(&mut self, member_id: &str, goal_id: &str, completed: bool) -> bool {
        self.update_goal(
            member_id,
            goal_id,
            GoalUpdate {
                completed: Some(completed),
                ..GoalUpdate::default()
            },
        )
    }

    pub fn remove_goal(&mut self, member_id: &str, goal_id: &str) -> bool {
        self.with_member(member_id, "remove_goal", |member| {
            let before = member.goals.len();
            member.goals.retain(|g| g.id != goal_id);
            member.goals.len() != before
        })
    }

    pub fn add_member_comment(
        &mut self,
        member_id: &str,
        text: impl Into<String>,
        author: Option<String>,
    ) -> bool {
        let comment = Comment {
            id: ulid::Ulid::new().to_string(),
            text: text.into(),
            author,
            created_at: Utc::now(),
        };
        self.with_member(member_id, "add_member_comment", |member| {
            member.comments.push(comment);
            true
        })
    }

    fn install(&mut self, config: RoadmapConfig) -> &RoadmapConfig {
        self.persistence.set(CONFIG_KEY, &config);
        self.member_index = index_members(&config);
        self.unreadable = false;
        self.config.insert(config)
    }

    fn mutate<F>(&mut self, op: &'static str, f: F) -> bool
    where
        F: FnOnce(&mut RoadmapConfig) -> bool,
    {
        let Some(config) = self.config.as_mut() else {
            tracing::warn!(op, "no roadmap configuration loaded");
            return false;
        };
        if !f(config) {
            return false;
        }
        config.last_modified = Utc::now();
        self.reindex();
        self.persist();
        tracing::debug!(op, "configuration updated");
        true
    }

    fn with_member<F>(&mut self, member_id: &str, op: &'static str, f: F) -> bool
    where
        F: FnOnce(&mut TeamMember) -> bool,
    {
        self.mutate(op, |config| {
            match config.team_members.iter_mut().find(|m| m.id == member_id) {
                Some(member) => f(member),
                None => {
                    tracing::warn!(op, member_id, "team member not found");
                    false
                }
            }
        })
    }

    fn reindex(&mut self) {
        self.member_index = self.config.as_ref().map(index_members).unwrap_or_default();
    }

    fn persist(&self) -> bool {
        match &self.config {
            Some(config) => self.persistence.set(CONFIG_KEY, config),
            None => false,
        }
    }
}
