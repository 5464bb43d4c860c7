//! Export file format and tolerant import parsing.
//!
//! Three historical shapes are accepted on import: the full export bundle
//! `{ config, tasks, todoLists, todos, exportedAt, version }`, a bare
//! configuration object, and a bare array of tasks. Anything else is
//! reported as [`ImportShape::Unrecognized`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::migration::{migrate_tasks, stored_task_defaults};
use crate::types::{RoadmapConfig, Task, TaskDefaults, Todo, TodoList};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub config: RoadmapConfig,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub todo_lists: Vec<TodoList>,
    #[serde(default)]
    pub todos: Vec<Todo>,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl ExportFile {
    pub fn new(config: RoadmapConfig) -> Self {
        Self {
            config,
            tasks: Vec::new(),
            todo_lists: Vec::new(),
            todos: Vec::new(),
            exported_at: Utc::now(),
            version: crate::metadata::EXPORT_FORMAT_VERSION.to_string(),
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_todos(mut self, lists: Vec<TodoList>, todos: Vec<Todo>) -> Self {
        self.todo_lists = lists;
        self.todos = todos;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportShape {
    Bundle,
    BareConfig,
    LegacyTasks,
    Unrecognized,
}

/// An import document split into its parts. The config stays raw so it can
/// go through the load-time migrations before being decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportBundle {
    pub shape: ImportShape,
    pub config: Option<Value>,
    pub tasks: Option<Vec<Task>>,
    pub todo_lists: Option<Vec<TodoList>>,
    pub todos: Option<Vec<Todo>>,
}

const CONFIG_MARKERS: &[&str] = &["quarter", "weeks", "teamMembers"];

impl ImportBundle {
    pub fn parse(raw: &Value) -> Self {
        match raw {
            Value::Object(map) if map.get("config").is_some_and(Value::is_object) => Self {
                shape: ImportShape::Bundle,
                config: map.get("config").cloned(),
                tasks: map
                    .get("tasks")
                    .map(|t| decode_tasks(t, &stored_task_defaults(map.get("config")))),
                todo_lists: map.get("todoLists").map(|t| decode_each(t, "todo list")),
                todos: map.get("todos").map(|t| decode_each(t, "todo")),
            },
            Value::Object(map) if CONFIG_MARKERS.iter().any(|k| map.contains_key(*k)) => Self {
                shape: ImportShape::BareConfig,
                config: Some(raw.clone()),
                ..Self::empty(ImportShape::BareConfig)
            },
            Value::Array(_) => Self {
                tasks: Some(decode_tasks(raw, &stored_task_defaults(None))),
                ..Self::empty(ImportShape::LegacyTasks)
            },
            _ => {
                tracing::warn!("import document has an unrecognized shape");
                Self::empty(ImportShape::Unrecognized)
            }
        }
    }

    fn empty(shape: ImportShape) -> Self {
        Self {
            shape,
            config: None,
            tasks: None,
            todo_lists: None,
            todos: None,
        }
    }
}

fn decode_tasks(value: &Value, defaults: &TaskDefaults) -> Vec<Task> {
    let mut value = value.clone();
    migrate_tasks(&mut value, defaults);
    decode_each(&value, "task")
}

/// Decodes array entries one by one, skipping (and logging) the ones that do not fit.
fn decode_each<T: DeserializeOwned>(value: &Value, what: &str) -> Vec<T> {
    let Value::Array(items) = value.clone() else {
        tracing::warn!(what, "expected an array");
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(what, index = i, error = %e, "skipping undecodable entry");
                None
            }
        })
        .collect()
}
