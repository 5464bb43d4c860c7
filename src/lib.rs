//! Quarterly roadmap planning: a week grid per quarter, a team roster, tasks
//! assigned to members per week, and an optional Jira epic import.

pub mod cli;
pub mod config_store;
pub mod defaults;
pub mod error;
pub mod handler;
pub mod jira;
pub mod migration;
pub mod roadmap;
pub mod settings;
pub mod storage;
pub mod task_store;
pub mod todo_store;
pub mod transfer;
pub mod types;
pub mod weeks;

pub mod metadata {
    include!(concat!(env!("OUT_DIR"), "/pkg_info.rs"));
}

pub use error::{ServiceError, ServiceResult};
pub use roadmap::Roadmap;
pub use storage::{FileStore, KeyValueStore, MemoryStore, Persistence};
