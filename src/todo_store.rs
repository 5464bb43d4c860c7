use chrono::Utc;

use crate::storage::{KeyValueStore, Persistence, TODO_LISTS_KEY, TODOS_KEY};
use crate::types::{Todo, TodoList};

/// Personal TODO lists kept next to the roadmap.
pub struct TodoStore<S: KeyValueStore> {
    persistence: Persistence<S>,
    lists: Vec<TodoList>,
    todos: Vec<Todo>,
}

impl<S: KeyValueStore> TodoStore<S> {
    pub fn load(persistence: Persistence<S>) -> Self {
        let lists = persistence.get(TODO_LISTS_KEY, Vec::new());
        let todos = persistence.get(TODOS_KEY, Vec::new());
        Self {
            persistence,
            lists,
            todos,
        }
    }

    pub fn lists(&self) -> &[TodoList] {
        &self.lists
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn list(&self, id: &str) -> Option<&TodoList> {
        self.lists.iter().find(|l| l.id == id)
    }

    pub fn todos_in(&self, list_id: &str) -> Vec<&Todo> {
        self.todos.iter().filter(|t| t.list_id == list_id).collect()
    }

    pub fn create_list(&mut self, name: impl Into<String>, color: Option<String>) -> Option<String> {
        let name = name.into();
        if name.trim().is_empty() {
            tracing::warn!("todo list name is empty");
            return None;
        }
        let list = TodoList {
            id: ulid::Ulid::new().to_string(),
            name,
            color,
            created_at: Utc::now(),
        };
        let id = list.id.clone();
        self.lists.push(list);
        self.persist_lists();
        Some(id)
    }

    pub fn rename_list(&mut self, id: &str, name: impl Into<String>) -> bool {
        let name = name.into();
        let Some(list) = self.lists.iter_mut().find(|l| l.id == id) else {
            tracing::warn!(list_id = id, "todo list not found");
            return false;
        };
        if name.trim().is_empty() {
            return false;
        }
        list.name = name;
        self.persist_lists();
        true
    }

    /// Deletes the list together with its todos.
    pub fn delete_list(&mut self, id: &str) -> bool {
        let before = self.lists.len();
        self.lists.retain(|l| l.id != id);
        if self.lists.len() == before {
            tracing::warn!(list_id = id, "todo list not found");
            return false;
        }
        let todos_before = self.todos.len();
        self.todos.retain(|t| t.list_id != id);
        self.persist_lists();
        if self.todos.len() != todos_before {
            self.persist_todos();
        }
        true
    }

    pub fn add_todo(&mut self, list_id: &str, text: impl Into<String>) -> Option<String> {
        if self.list(list_id).is_none() {
            tracing::warn!(list_id, "cannot add todo to unknown list");
            return None;
        }
        let todo = Todo {
            id: ulid::Ulid::new().to_string(),
            list_id: list_id.to_string(),
            text: text.into(),
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        };
        let id = todo.id.clone();
        self.todos.push(todo);
        self.persist_todos();
        Some(id)
    }

    pub fn set_completed(&mut self, id: &str, completed: bool) -> bool {
        self.with_todo(id, |todo| {
            todo.completed = completed;
            todo.completed_at = completed.then(Utc::now);
        })
    }

    pub fn update_text(&mut self, id: &str, text: impl Into<String>) -> bool {
        let text = text.into();
        self.with_todo(id, |todo| todo.text = text)
    }

    pub fn remove_todo(&mut self, id: &str) -> bool {
        let before = self.todos.len();
        self.todos.retain(|t| t.id != id);
        if self.todos.len() == before {
            tracing::warn!(todo_id = id, "todo not found");
            return false;
        }
        self.persist_todos();
        true
    }

    /// Removes completed todos of one list and returns how many went away.
    pub fn clear_completed(&mut self, list_id: &str) -> usize {
        let before = self.todos.len();
        self.todos.retain(|t| !(t.list_id == list_id && t.completed));
        let removed = before - self.todos.len();
        if removed > 0 {
            self.persist_todos();
        }
        removed
    }

    pub fn replace_all(&mut self, lists: Vec<TodoList>, todos: Vec<Todo>) {
        self.lists = lists;
        self.todos = todos;
        self.persist_lists();
        self.persist_todos();
    }

    fn with_todo<F: FnOnce(&mut Todo)>(&mut self, id: &str, f: F) -> bool {
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            tracing::warn!(todo_id = id, "todo not found");
            return false;
        };
        f(todo);
        self.persist_todos();
        true
    }

    fn persist_lists(&self) -> bool {
        self.persistence.set(TODO_LISTS_KEY, &self.lists)
    }

    fn persist_todos(&self) -> bool {
        self.persistence.set(TODOS_KEY, &self.todos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn todo_lifecycle_is_persisted() {
        let persistence = Persistence::new(MemoryStore::new());
        let mut store = TodoStore::load(persistence.clone());

        let list = store.create_list("Release prep", None).unwrap();
        let a = store.add_todo(&list, "Draft notes").unwrap();
        let b = store.add_todo(&list, "Tag build").unwrap();
        assert!(store.add_todo("ghost", "nope").is_none());

        assert!(store.set_completed(&a, true));
        assert!(store.update_text(&b, "Tag release build"));
        assert_eq!(store.clear_completed(&list), 1);

        let reloaded = TodoStore::load(persistence);
        let remaining = reloaded.todos_in(&list);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "Tag release build");
        assert!(!remaining[0].completed);
    }

    #[test]
    fn completion_stamps_time() {
        let mut store = TodoStore::load(Persistence::new(MemoryStore::new()));
        let list = store.create_list("Inbox", Some("#fff".into())).unwrap();
        let id = store.add_todo(&list, "x").unwrap();
        store.set_completed(&id, true);
        assert!(store.todos()[0].completed_at.is_some());
        store.set_completed(&id, false);
        assert!(store.todos()[0].completed_at.is_none());
    }

    #[test]
    fn deleting_a_list_cascades() {
        let mut store = TodoStore::load(Persistence::new(MemoryStore::new()));
        let keep = store.create_list("Keep", None).unwrap();
        let gone = store.create_list("Drop", None).unwrap();
        store.add_todo(&keep, "a");
        store.add_todo(&gone, "b");

        assert!(store.delete_list(&gone));
        assert!(!store.delete_list(&gone));
        assert_eq!(store.todos().len(), 1);
        assert!(store.rename_list(&keep, "Kept"));
        assert!(!store.rename_list(&keep, "  "));
        assert!(store.create_list(" ", None).is_none());
    }
}
