//! Load-time structural migrations for stored documents.
//!
//! Migrations run on the raw JSON every time a document is loaded. Each step
//! only rewrites when it finds the old or incomplete shape, so running the
//! chain on migrated data changes nothing.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::defaults;
use crate::types::{TaskDefaults, TaxonomyItem};
use crate::weeks::generate_weeks;

pub struct Migration {
    /// Stable identifier, reported when the step rewrites something.
    pub id: &'static str,
    pub description: &'static str,
    pub up: fn(&mut Value) -> bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub updated: bool,
    pub applied: Vec<&'static str>,
}

pub fn config_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "members.from-strings",
            description: "Turn plain name strings into team member objects",
            up: members_from_strings,
        },
        Migration {
            id: "members.ids",
            description: "Give every team member a stable id",
            up: member_ids,
        },
        Migration {
            id: "goals.canonical",
            description: "Rewrite simple goals (description/extraMiles) into the canonical shape",
            up: canonical_goals,
        },
        Migration {
            id: "dates.date-only",
            description: "Cut date-time strings in vacations and goal due dates down to the date",
            up: date_only,
        },
        Migration {
            id: "taxonomy.tracks",
            description: "Default or normalize the track list",
            up: |doc| taxonomy(doc, "tracks", defaults::tracks),
        },
        Migration {
            id: "taxonomy.priorities",
            description: "Default or normalize the priority list",
            up: |doc| taxonomy(doc, "priorities", defaults::priorities),
        },
        Migration {
            id: "taxonomy.statuses",
            description: "Default or normalize the status list",
            up: |doc| taxonomy(doc, "statuses", defaults::statuses),
        },
        Migration {
            id: "taxonomy.types",
            description: "Default or normalize the type list",
            up: |doc| taxonomy(doc, "types", defaults::types),
        },
        Migration {
            id: "taxonomy.sizes",
            description: "Default or normalize the size list",
            up: |doc| taxonomy(doc, "sizes", defaults::sizes),
        },
        Migration {
            id: "defaults.task",
            description: "Add per-field task defaults",
            up: task_defaults,
        },
        Migration {
            id: "weeks.regenerate",
            description: "Rebuild a missing week list from quarter and year",
            up: regenerate_weeks,
        },
        Migration {
            id: "timestamps.backfill",
            description: "Stamp createdAt/lastModified when absent",
            up: config_timestamps,
        },
    ]
}

pub fn task_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "tasks.created-at",
            description: "Stamp createdAt on tasks that lack it",
            up: task_created_at,
        },
        Migration {
            id: "tasks.order",
            description: "Give unordered tasks their position as sort key",
            up: task_order,
        },
        Migration {
            id: "tasks.sparse-assignments",
            description: "Drop week assignment entries without assignees",
            up: sparse_assignments,
        },
    ]
}

pub fn run(doc: &mut Value, migrations: &[Migration]) -> MigrationReport {
    let mut report = MigrationReport::default();
    for migration in migrations {
        if (migration.up)(doc) {
            tracing::info!(migration = migration.id, "{}", migration.description);
            report.applied.push(migration.id);
        }
    }
    report.updated = !report.applied.is_empty();
    report
}

pub fn migrate_config(doc: &mut Value) -> MigrationReport {
    run(doc, &config_migrations())
}

/// Task migrations plus a backfill of missing taxonomy fields from `defaults`.
pub fn migrate_tasks(doc: &mut Value, defaults: &TaskDefaults) -> MigrationReport {
    let mut report = run(doc, &task_migrations());
    if task_fields(doc, defaults) {
        tracing::info!(migration = "tasks.field-defaults", "Fill missing task fields from the task defaults");
        report.applied.push("tasks.field-defaults");
        report.updated = true;
    }
    report
}

/// Task defaults of a stored (possibly unmigrated) configuration document,
/// or the built-ins when there is none.
pub fn stored_task_defaults(config: Option<&Value>) -> TaskDefaults {
    let Some(config) = config else {
        return defaults::task_defaults(&defaults::tracks());
    };
    if let Some(stored) = config
        .get("defaults")
        .cloned()
        .and_then(|d| serde_json::from_value(d).ok())
    {
        return stored;
    }
    let tracks: Vec<TaxonomyItem> = config
        .get("tracks")
        .cloned()
        .and_then(|t| serde_json::from_value(t).ok())
        .unwrap_or_else(defaults::tracks);
    defaults::task_defaults(&tracks)
}

fn members_from_strings(doc: &mut Value) -> bool {
    let Some(obj) = doc.as_object_mut() else {
        return false;
    };
    match obj.get_mut("teamMembers") {
        Some(Value::Array(members)) => {
            let mut changed = false;
            for (i, member) in members.iter_mut().enumerate() {
                if let Value::String(name) = member {
                    *member = json!({ "name": name.clone(), "color": defaults::palette_color(i) });
                    changed = true;
                }
            }
            changed
        }
        _ => {
            let roster = serde_json::to_value(defaults::team_members()).unwrap_or(Value::Null);
            obj.insert("teamMembers".to_string(), roster);
            true
        }
    }
}

fn member_ids(doc: &mut Value) -> bool {
    let Some(members) = doc.get_mut("teamMembers").and_then(Value::as_array_mut) else {
        return false;
    };
    let mut changed = false;
    for (i, member) in members.iter_mut().enumerate() {
        let Some(m) = member.as_object_mut() else {
            continue;
        };
        let has_id = m
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.is_empty());
        if !has_id {
            m.insert("id".into(), json!(ulid::Ulid::new().to_string()));
            changed = true;
        }
        if !m.get("color").is_some_and(Value::is_string) {
            m.insert("color".into(), json!(defaults::palette_color(i)));
            changed = true;
        }
    }
    changed
}

fn canonical_goal(goal: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    if !goal.contains_key("objective") {
        let objective = goal.remove("description").unwrap_or_else(|| json!(""));
        goal.insert("objective".into(), objective);
        changed = true;
    } else if goal.contains_key("description") {
        goal.remove("description");
        changed = true;
    }
    if let Some(extra) = goal.remove("extraMiles") {
        if !goal.contains_key("nextStep") && !extra.is_null() {
            goal.insert("nextStep".into(), extra);
        }
        changed = true;
    }
    if !goal.get("id").is_some_and(Value::is_string) {
        goal.insert("id".into(), json!(ulid::Ulid::new().to_string()));
        changed = true;
    }
    if !goal.contains_key("createdAt") {
        goal.insert("createdAt".into(), json!(Utc::now()));
        changed = true;
    }
    changed
}

fn canonical_goals(doc: &mut Value) -> bool {
    let Some(members) = doc.get_mut("teamMembers").and_then(Value::as_array_mut) else {
        return false;
    };
    let mut changed = false;
    for member in members.iter_mut() {
        let Some(goals) = member.get_mut("goals").and_then(Value::as_array_mut) else {
            continue;
        };
        for goal in goals.iter_mut().filter_map(Value::as_object_mut) {
            changed |= canonical_goal(goal);
        }
    }
    changed
}

fn taxonomy(
    doc: &mut Value,
    field: &str,
    fallback: fn() -> Vec<crate::types::TaxonomyItem>,
) -> bool {
    let Some(obj) = doc.as_object_mut() else {
        return false;
    };
    match obj.get_mut(field) {
        Some(Value::Array(entries)) => {
            let mut changed = false;
            for (i, entry) in entries.iter_mut().enumerate() {
                if let Value::String(name) = entry {
                    *entry = json!({
                        "id": defaults::slugify(name),
                        "name": name.clone(),
                        "color": defaults::palette_color(i),
                    });
                    changed = true;
                }
            }
            changed
        }
        _ => {
            obj.insert(
                field.to_string(),
                serde_json::to_value(fallback()).unwrap_or(Value::Null),
            );
            true
        }
    }
}

fn task_defaults(doc: &mut Value) -> bool {
    let Some(obj) = doc.as_object_mut() else {
        return false;
    };
    if obj.get("defaults").is_some_and(Value::is_object) {
        return false;
    }
    let tracks: Vec<TaxonomyItem> = obj
        .get("tracks")
        .cloned()
        .and_then(|t| serde_json::from_value(t).ok())
        .unwrap_or_default();
    let defaults = serde_json::to_value(defaults::task_defaults(&tracks)).unwrap_or(Value::Null);
    obj.insert("defaults".into(), defaults);
    true
}

fn regenerate_weeks(doc: &mut Value) -> bool {
    let Some(obj) = doc.as_object_mut() else {
        return false;
    };
    let present = obj
        .get("weeks")
        .and_then(Value::as_array)
        .is_some_and(|w| !w.is_empty());
    if present {
        return false;
    }
    let quarter = obj
        .get("quarter")
        .and_then(Value::as_u64)
        .and_then(|q| u8::try_from(q).ok());
    let year = obj
        .get("year")
        .and_then(Value::as_i64)
        .and_then(|y| i32::try_from(y).ok());
    let (Some(quarter), Some(year)) = (quarter, year) else {
        return false;
    };
    let Ok(weeks) = generate_weeks(quarter, year) else {
        return false;
    };
    obj.insert(
        "weeks".into(),
        serde_json::to_value(weeks).unwrap_or(Value::Null),
    );
    true
}

fn config_timestamps(doc: &mut Value) -> bool {
    let Some(obj) = doc.as_object_mut() else {
        return false;
    };
    let mut changed = false;
    for field in ["createdAt", "lastModified"] {
        if !obj.get(field).is_some_and(Value::is_string) {
            obj.insert(field.into(), json!(Utc::now()));
            changed = true;
        }
    }
    changed
}

fn task_created_at(doc: &mut Value) -> bool {
    let Some(tasks) = doc.as_array_mut() else {
        return false;
    };
    let mut changed = false;
    for task in tasks.iter_mut().filter_map(Value::as_object_mut) {
        if !task.get("createdAt").is_some_and(Value::is_string) {
            task.insert("createdAt".into(), json!(Utc::now()));
            changed = true;
        }
    }
    changed
}

fn task_order(doc: &mut Value) -> bool {
    let Some(tasks) = doc.as_array_mut() else {
        return false;
    };
    let mut changed = false;
    for (i, task) in tasks.iter_mut().enumerate() {
        let Some(task) = task.as_object_mut() else {
            continue;
        };
        if !task.get("order").is_some_and(Value::is_i64) {
            // Fractional orders written by older versions are truncated.
            let order = task
                .get("order")
                .and_then(Value::as_f64)
                .map(|o| o as i64)
                .unwrap_or(i as i64);
            task.insert("order".into(), json!(order));
            changed = true;
        }
    }
    changed
}

/// `2025-10-08T00:00:00.000Z` becomes `2025-10-08`.
fn date_only(doc: &mut Value) -> bool {
    let Some(members) = doc.get_mut("teamMembers").and_then(Value::as_array_mut) else {
        return false;
    };
    let lists: [(&str, &[&str]); 2] = [("vacations", &["startDate", "endDate"]), ("goals", &["dueDate"])];
    let mut changed = false;
    for member in members.iter_mut() {
        for (list, fields) in lists {
            let Some(items) = member.get_mut(list).and_then(Value::as_array_mut) else {
                continue;
            };
            for item in items.iter_mut().filter_map(Value::as_object_mut) {
                for field in fields {
                    if let Some(Value::String(date)) = item.get_mut(*field) {
                        if date.len() > 10 && date.as_bytes()[10] == b'T' {
                            date.truncate(10);
                            changed = true;
                        }
                    }
                }
            }
        }
    }
    changed
}

fn task_fields(doc: &mut Value, defaults: &TaskDefaults) -> bool {
    let Some(tasks) = doc.as_array_mut() else {
        return false;
    };
    let fields = [
        ("priority", &defaults.priority),
        ("track", &defaults.track),
        ("status", &defaults.status),
        ("size", &defaults.size),
        ("type", &defaults.task_type),
    ];
    let mut changed = false;
    for task in tasks.iter_mut().filter_map(Value::as_object_mut) {
        for (field, value) in fields {
            if !task.get(field).is_some_and(Value::is_string) {
                task.insert(field.into(), json!(value));
                changed = true;
            }
        }
    }
    changed
}

fn sparse_assignments(doc: &mut Value) -> bool {
    let Some(tasks) = doc.as_array_mut() else {
        return false;
    };
    let mut changed = false;
    for task in tasks.iter_mut() {
        let Some(assignments) = task.get_mut("assignments").and_then(Value::as_array_mut) else {
            continue;
        };
        let before = assignments.len();
        assignments.retain(|a| {
            a.get("assignees")
                .and_then(Value::as_array)
                .is_some_and(|list| !list.is_empty())
        });
        changed |= assignments.len() != before;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoadmapConfig;

    fn legacy_config() -> Value {
        json!({
            "quarter": 1,
            "year": 2026,
            "teamMembers": [
                "Dana",
                {
                    "name": "Eli",
                    "color": "#000000",
                    "goals": [
                        { "id": "g1", "description": "Ship search", "extraMiles": "Mentor", "completed": false, "createdAt": "2025-12-01T00:00:00Z" }
                    ]
                }
            ],
            "tracks": ["Search", "Billing"]
        })
    }

    #[test]
    fn legacy_document_becomes_loadable() {
        let mut doc = legacy_config();
        let report = migrate_config(&mut doc);
        assert!(report.updated);
        assert!(report.applied.contains(&"members.from-strings"));
        assert!(report.applied.contains(&"goals.canonical"));
        assert!(report.applied.contains(&"weeks.regenerate"));

        let config: RoadmapConfig = serde_json::from_value(doc).unwrap();
        assert_eq!(config.team_members[0].name, "Dana");
        assert!(!config.team_members[0].id.is_empty());
        assert_eq!(config.tracks[1].id, "billing");
        assert_eq!(config.defaults.track, "Search");
        assert_eq!(config.weeks.len(), 13);
        let goal = &config.team_members[1].goals[0];
        assert_eq!(goal.objective, "Ship search");
        assert_eq!(goal.next_step.as_deref(), Some("Mentor"));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut doc = legacy_config();
        migrate_config(&mut doc);
        let snapshot = doc.clone();

        let report = migrate_config(&mut doc);
        assert!(!report.updated);
        assert!(report.applied.is_empty());
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn missing_taxonomies_get_defaults() {
        let mut doc = json!({ "quarter": 2, "year": 2024, "teamMembers": [] });
        migrate_config(&mut doc);
        let config: RoadmapConfig = serde_json::from_value(doc).unwrap();
        assert_eq!(config.priorities, defaults::priorities());
        assert_eq!(config.statuses, defaults::statuses());
        assert_eq!(config.types, defaults::types());
        assert_eq!(config.sizes, defaults::sizes());
        assert_eq!(config.tracks, defaults::tracks());
        assert!(config.team_members.is_empty());
    }

    #[test]
    fn timestamp_dates_become_plain_dates() {
        let mut doc = legacy_config();
        doc["teamMembers"] = json!([{
            "id": "m1",
            "name": "Ana",
            "color": "#000",
            "vacations": [{
                "id": "v1",
                "startDate": "2025-10-08T00:00:00.000Z",
                "endDate": "2025-10-10T00:00:00.000Z",
                "type": "vacation"
            }]
        }]);
        let report = migrate_config(&mut doc);
        assert!(report.applied.contains(&"dates.date-only"));
        assert_eq!(doc["teamMembers"][0]["vacations"][0]["startDate"], "2025-10-08");

        let config: RoadmapConfig = serde_json::from_value(doc).unwrap();
        let vacation = &config.team_members[0].vacations[0];
        assert_eq!(vacation.end_date.to_string(), "2025-10-10");
    }

    #[test]
    fn out_of_range_quarter_does_not_wrap() {
        let mut doc = json!({ "quarter": 257, "year": 2025 });
        assert!(!regenerate_weeks(&mut doc));
        assert!(doc.get("weeks").is_none());
    }

    #[test]
    fn stored_defaults_fill_incomplete_tasks() {
        let config = json!({
            "defaults": {
                "priority": "Low",
                "track": "Payments",
                "status": "Backlog",
                "size": "S",
                "type": "Bug"
            }
        });
        let defaults = stored_task_defaults(Some(&config));
        let mut doc = json!([{ "id": "a", "name": "Ledger", "priority": "High" }]);
        migrate_tasks(&mut doc, &defaults);
        assert_eq!(doc[0]["priority"], "High");
        assert_eq!(doc[0]["track"], "Payments");
        assert_eq!(doc[0]["size"], "S");
    }

    #[test]
    fn task_migrations_are_idempotent() {
        let mut doc = json!([
            { "id": "a", "order": 2.0, "assignments": [ { "weekId": "W1", "assignees": [] }, { "weekId": "W2", "assignees": ["m"] } ] },
            { "id": "b" }
        ]);
        let defaults = stored_task_defaults(None);
        let report = migrate_tasks(&mut doc, &defaults);
        assert_eq!(
            report.applied,
            vec![
                "tasks.created-at",
                "tasks.order",
                "tasks.sparse-assignments",
                "tasks.field-defaults"
            ]
        );
        assert_eq!(doc[0]["order"], 2);
        assert_eq!(doc[1]["order"], 1);
        assert_eq!(doc[0]["assignments"].as_array().unwrap().len(), 1);
        assert_eq!(doc[1]["size"], "M");
        assert_eq!(doc[1]["type"], "Feature");

        assert!(!migrate_tasks(&mut doc, &defaults).updated);
    }
}
