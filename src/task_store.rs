//! Task collection store.
//!
//! Holds every roadmap task in one vector mirrored to persistence after each
//! mutation. Operations never fail: rejections and no-ops are reported
//! through the return value and logged.

use std::collections::HashSet;

use chrono::Utc;

use serde_json::Value;

use crate::migration::{migrate_tasks, stored_task_defaults};
use crate::storage::{CONFIG_KEY, KeyValueStore, Persistence, TASKS_KEY};
use crate::types::{AddTasksResult, Comment, Task, TaskPatch, TaskUpdate, Week};

pub struct TaskStore<S: KeyValueStore> {
    persistence: Persistence<S>,
    tasks: Vec<Task>,
    /// Stored entries that do not decode. Written back after the readable
    /// tasks so a mutation never drops them.
    unreadable: Vec<Value>,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn load(persistence: Persistence<S>) -> Self {
        let mut store = Self {
            persistence,
            tasks: Vec::new(),
            unreadable: Vec::new(),
        };
        store.reload();
        store
    }

    /// Missing taxonomy fields are filled from the stored configuration's
    /// task defaults before decoding. Each entry is decoded on its own.
    pub fn reload(&mut self) {
        self.tasks = Vec::new();
        self.unreadable = Vec::new();
        let Some(mut doc) = self.persistence.get_raw(TASKS_KEY) else {
            return;
        };
        let defaults = stored_task_defaults(self.persistence.get_raw(CONFIG_KEY).as_ref());
        let report = migrate_tasks(&mut doc, &defaults);
        let Value::Array(entries) = doc else {
            tracing::warn!("stored tasks are not a list, keeping the document aside");
            self.unreadable.push(doc);
            return;
        };
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Task>(entry.clone()) {
                Ok(task) => self.tasks.push(task),
                Err(e) => {
                    tracing::warn!(index, error = %e, "stored task is unreadable, keeping it aside");
                    self.unreadable.push(entry);
                }
            }
        }
        tracing::info!(
            count = self.tasks.len(),
            unreadable = self.unreadable.len(),
            "loaded tasks"
        );
        if report.updated {
            self.persist();
        }
    }

    /// Number of stored entries that could not be read as tasks.
    pub fn unreadable_len(&self) -> usize {
        self.unreadable.len()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get_task_by_id(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_task_by_jira_key(&self, key: &str) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|t| t.jira_epic_key.as_deref() == Some(key))
    }

    /// Appends `task` unless its id, or its Jira epic key, is already taken.
    pub fn add_task(&mut self, task: Task) -> bool {
        if let Some(reason) = self.conflict(&task) {
            tracing::warn!(task_id = %task.id, "{reason}");
            return false;
        }
        tracing::debug!(task_id = %task.id, "task added");
        self.tasks.push(task);
        self.persist();
        true
    }

    /// Adds what it can. Uniqueness is checked against the stored tasks and
    /// against earlier entries of the same batch.
    pub fn add_tasks(&mut self, tasks: Vec<Task>) -> AddTasksResult {
        let mut result = AddTasksResult::default();
        let mut ids: HashSet<String> = self.tasks.iter().map(|t| t.id.clone()).collect();
        let mut keys: HashSet<String> = self
            .tasks
            .iter()
            .filter_map(|t| t.jira_epic_key.clone())
            .collect();

        let mut accepted = Vec::with_capacity(tasks.len());
        for task in tasks {
            if ids.contains(&task.id) {
                result.skipped += 1;
                result.errors.push(format!("duplicate task id '{}'", task.id));
                continue;
            }
            if let Some(key) = &task.jira_epic_key {
                if keys.contains(key) {
                    result.skipped += 1;
                    result
                        .errors
                        .push(format!("Jira epic {key} is already linked (task '{}')", task.id));
                    continue;
                }
                keys.insert(key.clone());
            }
            ids.insert(task.id.clone());
            accepted.push(task);
        }

        result.added = accepted.len();
        if !result.errors.is_empty() {
            tracing::warn!(skipped = result.skipped, errors = ?result.errors, "some tasks were skipped");
        }
        if !accepted.is_empty() {
            self.tasks.extend(accepted);
            self.persist();
        }
        result
    }

    pub fn update_task(&mut self, id: &str, updates: TaskUpdate) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            tracing::warn!(task_id = id, "update skipped, task not found");
            return false;
        };
        updates.apply_to(task);
        self.persist();
        true
    }

    /// Applies each patch by id and returns how many matched.
    pub fn update_tasks(&mut self, patches: Vec<TaskPatch>) -> usize {
        let mut matched = 0;
        for patch in patches {
            match self.tasks.iter_mut().find(|t| t.id == patch.id) {
                Some(task) => {
                    patch.updates.apply_to(task);
                    matched += 1;
                }
                None => tracing::debug!(task_id = %patch.id, "bulk update ignores unknown task"),
            }
        }
        if matched > 0 {
            self.persist();
        }
        matched
    }

    pub fn remove_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            tracing::warn!(task_id = id, "remove skipped, task not found");
            return false;
        }
        self.persist();
        true
    }

    pub fn remove_tasks(&mut self, ids: &[String]) -> usize {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.tasks.len();
        self.tasks.retain(|t| !wanted.contains(t.id.as_str()));
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    /// Overwrites the whole collection, unreadable entries included, without
    /// validation. Used by file imports and reset.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        tracing::info!(count = tasks.len(), "replacing all tasks");
        self.tasks = tasks;
        self.unreadable.clear();
        self.persist();
    }

    /// Sort key one past the current maximum.
    pub fn next_order(&self) -> i64 {
        self.tasks.iter().map(|t| t.order).max().map_or(0, |o| o + 1)
    }

    pub fn tasks_sorted(&self) -> Vec<&Task> {
        let mut sorted: Vec<&Task> = self.tasks.iter().collect();
        sorted.sort_by(|a, b| a.order.cmp(&b.order).then(a.created_at.cmp(&b.created_at)));
        sorted
    }

    /// Moves a task to `position` in sorted order and renumbers the rest densely.
    pub fn move_task(&mut self, id: &str, position: usize) -> bool {
        let mut ids: Vec<String> = self.tasks_sorted().iter().map(|t| t.id.clone()).collect();
        let Some(current) = ids.iter().position(|t| t == id) else {
            tracing::warn!(task_id = id, "move skipped, task not found");
            return false;
        };
        let moved = ids.remove(current);
        ids.insert(position.min(ids.len()), moved);
        for task in &mut self.tasks {
            if let Some(order) = ids.iter().position(|t| *t == task.id) {
                task.order = order as i64;
            }
        }
        self.persist();
        true
    }

    pub fn assign(&mut self, task_id: &str, week_id: &str, member_id: &str) -> bool {
        self.with_task(task_id, "assign", |task| task.assign(week_id, member_id))
    }

    pub fn unassign(&mut self, task_id: &str, week_id: &str, member_id: &str) -> bool {
        self.with_task(task_id, "unassign", |task| task.unassign(week_id, member_id))
    }

    pub fn add_comment(&mut self, task_id: &str, text: impl Into<String>, author: Option<String>) -> bool {
        let comment = Comment {
            id: ulid::Ulid::new().to_string(),
            text: text.into(),
            author,
            created_at: Utc::now(),
        };
        self.with_task(task_id, "add_comment", |task| {
            task.comments.push(comment);
            true
        })
    }

    pub fn tasks_for_member(&self, member_id: &str) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_assigned(member_id)).collect()
    }

    /// Drops assignments to weeks that are not in `weeks`. Returns the number
    /// of week entries removed.
    pub fn prune_assignments(&mut self, weeks: &[Week]) -> usize {
        let known: HashSet<&str> = weeks.iter().map(|w| w.id.as_str()).collect();
        let mut removed = 0;
        for task in &mut self.tasks {
            let before = task.assignments.len();
            task.assignments.retain(|a| known.contains(a.week_id.as_str()));
            removed += before - task.assignments.len();
        }
        if removed > 0 {
            tracing::info!(removed, "pruned assignments to weeks outside the plan");
            self.persist();
        }
        removed
    }

    /// Removes a member from every assignment. Returns the number of tasks touched.
    pub fn remove_member_references(&mut self, member_id: &str) -> usize {
        self.rewrite_assignees(|assignee| (assignee != member_id).then(|| assignee.to_string()))
    }

    /// Maps every assignee through `f`; `None` drops the assignee. Returns the
    /// number of tasks that changed.
    pub fn rewrite_assignees<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut touched = 0;
        for task in &mut self.tasks {
            let before = task.assignments.clone();
            for entry in &mut task.assignments {
                let mut seen = HashSet::new();
                entry.assignees = entry
                    .assignees
                    .iter()
                    .filter_map(|a| f(a.as_str()))
                    .filter(|a| seen.insert(a.clone()))
                    .collect();
            }
            task.assignments.retain(|a| !a.assignees.is_empty());
            if task.assignments != before {
                touched += 1;
            }
        }
        if touched > 0 {
            self.persist();
        }
        touched
    }

    fn with_task<F>(&mut self, task_id: &str, op: &'static str, f: F) -> bool
    where
        F: FnOnce(&mut Task) -> bool,
    {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            tracing::warn!(op, task_id, "task not found");
            return false;
        };
        if !f(task) {
            return false;
        }
        self.persist();
        true
    }

    fn conflict(&self, task: &Task) -> Option<String> {
        if self.tasks.iter().any(|t| t.id == task.id) {
            return Some(format!("duplicate task id '{}'", task.id));
        }
        let key = task.jira_epic_key.as_deref()?;
        self.get_task_by_jira_key(key)
            .map(|other| format!("Jira epic {key} is already linked to task '{}'", other.id))
    }

    fn persist(&self) -> bool {
        if self.unreadable.is_empty() {
            return self.persistence.set(TASKS_KEY, &self.tasks);
        }
        let mut doc = Vec::with_capacity(self.tasks.len() + self.unreadable.len());
        for task in &self.tasks {
            match serde_json::to_value(task) {
                Ok(value) => doc.push(value),
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "failed to serialize task");
                    return false;
                }
            }
        }
        doc.extend(self.unreadable.iter().cloned());
        self.persistence.set(TASKS_KEY, &doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::{TaskDefaults, WeekAssignment};

    fn defaults() -> TaskDefaults {
        TaskDefaults {
            priority: "Medium".into(),
            track: "Product".into(),
            status: "To Do".into(),
            size: "M".into(),
            task_type: "Feature".into(),
        }
    }

    fn task(id: &str) -> Task {
        let mut t = Task::new(format!("Task {id}"), &defaults());
        t.id = id.to_string();
        t
    }

    fn epic_task(id: &str, key: &str) -> Task {
        let mut t = task(id);
        t.jira_epic_key = Some(key.to_string());
        t
    }

    fn store() -> TaskStore<MemoryStore> {
        TaskStore::load(Persistence::new(MemoryStore::new()))
    }

    #[test]
    fn damaged_entries_do_not_take_the_collection_down() {
        let persistence = Persistence::new(MemoryStore::new());
        persistence.set(
            CONFIG_KEY,
            &serde_json::json!({ "defaults": {
                "priority": "Medium", "track": "Payments", "status": "To Do", "size": "S", "type": "Feature"
            }}),
        );
        let complete = serde_json::to_value(task("a")).unwrap();
        let mut sizeless = serde_json::to_value(task("b")).unwrap();
        sizeless.as_object_mut().unwrap().remove("size");
        let broken = serde_json::json!({ "id": "c", "name": 42 });
        persistence.set(TASKS_KEY, &vec![complete, sizeless, broken]);

        let mut store = TaskStore::load(persistence.clone());
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_task_by_id("b").unwrap().size, "S");
        assert_eq!(store.unreadable_len(), 1);

        assert!(store.add_task(task("d")));
        let stored: Vec<Value> = persistence.get(TASKS_KEY, Vec::new());
        let ids: Vec<&str> = stored.iter().filter_map(|t| t["id"].as_str()).collect();
        assert_eq!(ids, ["a", "b", "d", "c"]);
        assert_eq!(stored[3]["name"], 42);

        let reopened = TaskStore::load(persistence);
        assert_eq!(reopened.len(), 3);
        assert_eq!(reopened.unreadable_len(), 1);
    }

    #[test]
    fn add_task_rejects_duplicate_id() {
        let mut store = store();
        assert!(store.add_task(task("a")));
        assert!(!store.add_task(task("a")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_task_rejects_duplicate_jira_key() {
        let mut store = store();
        assert!(store.add_task(epic_task("a", "ROAD-1")));
        assert!(!store.add_task(epic_task("b", "ROAD-1")));
        assert!(store.add_task(epic_task("c", "ROAD-2")));
        assert!(store.add_task(task("d")));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn add_tasks_checks_within_the_batch() {
        let mut store = store();
        let mut first = task("x");
        first.name = "first".into();
        let mut second = task("x");
        second.name = "second".into();

        let result = store.add_tasks(vec![first, second]);
        assert_eq!(result.added, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(store.get_task_by_id("x").unwrap().name, "first");
    }

    #[test]
    fn add_tasks_skips_shared_epic_key() {
        let mut store = store();
        let result = store.add_tasks(vec![
            epic_task("1", "ROAD-7"),
            epic_task("2", "ROAD-7"),
            task("3"),
        ]);
        assert_eq!(result.added, 2);
        assert_eq!(result.skipped, 1);
        assert!(store.get_task_by_id("2").is_none());
    }

    #[test]
    fn add_tasks_checks_existing_collection() {
        let mut store = store();
        store.add_task(epic_task("old", "ROAD-1"));
        let result = store.add_tasks(vec![task("old"), epic_task("new", "ROAD-1"), task("ok")]);
        assert_eq!(result.added, 1);
        assert_eq!(result.skipped, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn update_missing_task_leaves_state_untouched() {
        let mut store = store();
        store.add_task(task("a"));
        let before = store.tasks().to_vec();

        let update = || TaskUpdate {
            name: Some("renamed".into()),
            ..TaskUpdate::default()
        };
        assert!(!store.update_task("zzz", update()));
        assert!(!store.update_task("zzz", update()));
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn update_merges_fields() {
        let mut store = store();
        store.add_task(task("a"));
        assert!(store.update_task(
            "a",
            TaskUpdate {
                status: Some("Done".into()),
                jira_epic_key: Some(Some("ROAD-9".into())),
                ..TaskUpdate::default()
            }
        ));
        let t = store.get_task_by_id("a").unwrap();
        assert_eq!(t.status, "Done");
        assert_eq!(t.priority, "Medium");
        assert_eq!(store.get_task_by_jira_key("ROAD-9").unwrap().id, "a");
    }

    #[test]
    fn bulk_update_counts_matches() {
        let mut store = store();
        store.add_tasks(vec![task("a"), task("b")]);
        let patch = |id: &str| TaskPatch {
            id: id.to_string(),
            updates: TaskUpdate {
                size: Some("XL".into()),
                ..TaskUpdate::default()
            },
        };
        assert_eq!(store.update_tasks(vec![patch("a"), patch("nope"), patch("b")]), 2);
        assert!(store.tasks().iter().all(|t| t.size == "XL"));
    }

    #[test]
    fn remove_is_tolerant() {
        let mut store = store();
        store.add_tasks(vec![task("a"), task("b"), task("c")]);
        assert!(store.remove_task("a"));
        assert!(!store.remove_task("a"));
        assert_eq!(store.remove_tasks(&["b".into(), "missing".into()]), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_tasks_skips_validation() {
        let mut store = store();
        store.replace_tasks(vec![task("dup"), task("dup")]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn mutations_are_persisted() {
        let persistence = Persistence::new(MemoryStore::new());
        let mut store = TaskStore::load(persistence.clone());
        store.add_task(task("a"));
        store.assign("a", "W2", "m1");

        let reloaded = TaskStore::load(persistence);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get_task_by_id("a").unwrap().assignees("W2"), ["m1".to_string()]);
    }

    #[test]
    fn ordering_and_moves() {
        let mut store = store();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let mut t = task(id);
            t.order = i as i64;
            store.add_task(t);
        }
        assert_eq!(store.next_order(), 3);
        assert!(store.move_task("c", 0));
        let ids: Vec<&str> = store.tasks_sorted().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
        assert!(!store.move_task("zz", 0));
    }

    #[test]
    fn assignments_follow_members_and_weeks() {
        let mut store = store();
        store.add_task(task("a"));
        assert!(store.assign("a", "W1", "m1"));
        assert!(store.assign("a", "W2", "m2"));
        assert!(!store.assign("missing", "W1", "m1"));
        assert_eq!(store.tasks_for_member("m2").len(), 1);

        let weeks = vec![Week {
            id: "W1".into(),
            date: "06-10".into(),
            month: "October".into(),
        }];
        assert_eq!(store.prune_assignments(&weeks), 1);
        assert!(store.tasks_for_member("m2").is_empty());

        assert_eq!(store.remove_member_references("m1"), 1);
        assert!(store.get_task_by_id("a").unwrap().assignments.is_empty());
    }

    #[test]
    fn rewrite_assignees_deduplicates() {
        let mut store = store();
        let mut t = task("a");
        t.assignments = vec![WeekAssignment {
            week_id: "W1".into(),
            assignees: vec!["Ana".into(), "ana-id".into()],
        }];
        store.add_task(t);
        let touched = store.rewrite_assignees(|a| Some(if a == "Ana" { "ana-id".into() } else { a.into() }));
        assert_eq!(touched, 1);
        assert_eq!(store.get_task_by_id("a").unwrap().assignees("W1"), ["ana-id".to_string()]);
    }

    #[test]
    fn comments_on_tasks() {
        let mut store = store();
        store.add_task(task("a"));
        assert!(store.add_comment("a", "blocked on API", None));
        assert!(!store.add_comment("b", "nope", None));
        assert_eq!(store.get_task_by_id("a").unwrap().comments.len(), 1);
    }
}
