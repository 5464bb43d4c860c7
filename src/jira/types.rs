use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::JiraSubtask;

#[derive(Clone, PartialEq, Eq)]
pub struct JiraCredentials {
    pub domain: String,
    pub email: String,
    pub api_token: String,
}

impl JiraCredentials {
    pub fn new(
        domain: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            email: email.into(),
            api_token: api_token.into(),
        }
    }

    /// `https://<domain>` unless the domain already carries a scheme.
    pub fn base_url(&self) -> String {
        let domain = self.domain.trim().trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        }
    }

    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.email, self.api_token);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl std::fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("domain", &self.domain)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Epic {
    pub key: String,
    pub summary: String,
    pub done: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee_account_id: Option<String>,
    pub assignee_name: Option<String>,
    pub url: String,
}

impl Story {
    pub fn to_subtask(&self) -> JiraSubtask {
        JiraSubtask {
            key: self.key.clone(),
            summary: self.summary.clone(),
            status: self.status.clone(),
            assignee: self.assignee_name.clone(),
            url: Some(self.url.clone()),
        }
    }
}

/// Browse link of an issue on a Jira site given as a bare domain or a URL.
pub fn browse_url(domain: &str, key: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        format!("{domain}/browse/{key}")
    } else {
        format!("https://{domain}/browse/{key}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    pub account_id: String,
    pub display_name: String,
    pub email_address: Option<String>,
    pub avatar_url: Option<String>,
}

// Wire shapes of the Jira REST responses. Only the fields we read are declared.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EpicPage {
    #[serde(default)]
    pub values: Vec<WireEpic>,
    #[serde(default = "yes")]
    pub is_last: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireEpic {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub done: bool,
}

impl From<WireEpic> for Epic {
    fn from(wire: WireEpic) -> Self {
        let summary = wire
            .summary
            .filter(|s| !s.is_empty())
            .or(wire.name)
            .unwrap_or_else(|| wire.key.clone());
        Epic {
            key: wire.key,
            summary,
            done: wire.done,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchPage {
    #[serde(default)]
    pub issues: Vec<WireIssue>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireIssue {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: Option<WireStatus>,
    #[serde(default)]
    pub assignee: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStatus {
    pub name: String,
    #[serde(default)]
    pub status_category: Option<WireStatusCategory>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireStatusCategory {
    pub key: String,
}

impl WireIssue {
    pub fn into_story(self, domain: &str) -> Story {
        let (assignee_account_id, assignee_name) = match self.fields.assignee {
            Some(user) => (Some(user.account_id), Some(user.display_name)),
            None => (None, None),
        };
        Story {
            url: browse_url(domain, &self.key),
            key: self.key,
            summary: self.fields.summary,
            status: self.fields.status.map(|s| s.name).unwrap_or_default(),
            assignee_account_id,
            assignee_name,
        }
    }

    pub fn into_epic(self) -> Epic {
        let done = self
            .fields
            .status
            .as_ref()
            .and_then(|s| s.status_category.as_ref())
            .is_some_and(|c| c.key == "done");
        Epic {
            summary: if self.fields.summary.is_empty() {
                self.key.clone()
            } else {
                self.fields.summary
            },
            key: self.key,
            done,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireUser {
    pub account_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub avatar_urls: HashMap<String, String>,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default)]
    pub account_type: Option<String>,
}

impl WireUser {
    /// Apps and integrations show up as assignable users too.
    pub fn is_person(&self) -> bool {
        self.active && self.account_type.as_deref().is_none_or(|t| t == "atlassian")
    }
}

impl From<WireUser> for JiraUser {
    fn from(wire: WireUser) -> Self {
        let avatar_url = wire
            .avatar_urls
            .get("48x48")
            .or_else(|| wire.avatar_urls.values().next())
            .cloned();
        JiraUser {
            display_name: if wire.display_name.is_empty() {
                wire.account_id.clone()
            } else {
                wire.display_name
            },
            account_id: wire.account_id,
            email_address: wire.email_address,
            avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BoardInfo {
    #[serde(default)]
    pub location: Option<BoardLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BoardLocation {
    #[serde(default)]
    pub project_key: Option<String>,
}

fn yes() -> bool {
    true
}
