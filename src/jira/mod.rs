//! Jira import: REST client, import orchestration and the account mapping store.

pub mod client;
pub mod import;
pub mod mapping;
pub mod types;

use std::future::Future;

use crate::error::ServiceResult;

pub use client::JiraClient;
pub use import::{
    DEFAULT_STORY_DELAY, EpicImportSummary, JiraImporter, UserImportSummary, validate_epic_key,
};
pub use mapping::UserMappings;
pub use types::{Epic, JiraCredentials, JiraUser, Story};

/// Remote operations the importer relies on. Every call may fail with a
/// transport or HTTP status error; nothing is retried.
pub trait JiraApi: Send + Sync {
    /// Account behind the configured credentials. Used to check the credentials.
    fn myself(&self) -> impl Future<Output = ServiceResult<JiraUser>> + Send;

    fn fetch_epics(&self, board_id: u64) -> impl Future<Output = ServiceResult<Vec<Epic>>> + Send;

    /// Child issues of an epic. `domain` is used to build browse links.
    fn fetch_stories(
        &self,
        epic_key: &str,
        domain: &str,
    ) -> impl Future<Output = ServiceResult<Vec<Story>>> + Send;

    fn fetch_users(&self, board_id: u64)
    -> impl Future<Output = ServiceResult<Vec<JiraUser>>> + Send;
}
