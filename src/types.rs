use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub id: String,
    /// Monday of the week as `dd-mm`.
    pub date: String,
    pub month: String,
}

impl Week {
    /// Calendar date of the week's Monday. Weeks never cross a year boundary
    /// because their Monday always falls inside the configured quarter.
    pub fn monday(&self, year: i32) -> Option<NaiveDate> {
        let (day, month) = self.date.split_once('-')?;
        NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyItem {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefaults {
    pub priority: String,
    pub track: String,
    pub status: String,
    pub size: String,
    #[serde(rename = "type")]
    pub task_type: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VacationType {
    Vacation,
    License,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vacation {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: VacationType,
}

impl Vacation {
    /// True when any day of the Monday-to-Sunday week starting at `monday` is covered.
    pub fn overlaps_week(&self, monday: NaiveDate) -> bool {
        let sunday = monday + chrono::Duration::days(6);
        self.start_date <= sunday && monday <= self.end_date
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalRating {
    Below,
    Meet,
    Above,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub objective: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<GoalRating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoalUpdate {
    pub objective: Option<String>,
    pub rating: Option<Option<GoalRating>>,
    pub next_step: Option<Option<String>>,
    pub track: Option<Option<String>>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<NaiveDate>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    /// Stable identifier referenced by task assignments. Names may change.
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seniority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vacations: Vec<Vacation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<Goal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira_account_id: Option<String>,
}

impl TeamMember {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.into(),
            color: color.into(),
            nationality: None,
            seniority: None,
            avatar_url: None,
            vacations: Vec::new(),
            comments: Vec::new(),
            goals: Vec::new(),
            jira_account_id: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TeamMemberUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub nationality: Option<Option<String>>,
    pub seniority: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub jira_account_id: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekAssignment {
    pub week_id: String,
    #[serde(default)]
    pub assignees: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraSubtask {
    pub key: String,
    pub summary: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub priority: String,
    pub track: String,
    pub status: String,
    pub size: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub order: i64,
    /// Sparse: weeks without assignees have no entry.
    #[serde(default)]
    pub assignments: Vec<WeekAssignment>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira_epic_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jira_subtasks: Vec<JiraSubtask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira_board_id: Option<u64>,
}

impl Task {
    /// Task with a fresh id, filled in from the configured defaults.
    pub fn new(name: impl Into<String>, defaults: &TaskDefaults) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.into(),
            priority: defaults.priority.clone(),
            track: defaults.track.clone(),
            status: defaults.status.clone(),
            size: defaults.size.clone(),
            task_type: defaults.task_type.clone(),
            order: 0,
            assignments: Vec::new(),
            created_at: Utc::now(),
            comments: Vec::new(),
            jira_epic_key: None,
            jira_subtasks: Vec::new(),
            jira_board_id: None,
        }
    }

    pub fn assignees(&self, week_id: &str) -> &[String] {
        self.assignments
            .iter()
            .find(|a| a.week_id == week_id)
            .map(|a| a.assignees.as_slice())
            .unwrap_or(&[])
    }

    /// Adds `member` to the week. Returns false when already assigned.
    pub fn assign(&mut self, week_id: &str, member: &str) -> bool {
        match self.assignments.iter_mut().find(|a| a.week_id == week_id) {
            Some(entry) if entry.assignees.iter().any(|m| m == member) => false,
            Some(entry) => {
                entry.assignees.push(member.to_string());
                true
            }
            None => {
                self.assignments.push(WeekAssignment {
                    week_id: week_id.to_string(),
                    assignees: vec![member.to_string()],
                });
                true
            }
        }
    }

    /// Removes `member` from the week, dropping the entry once empty.
    pub fn unassign(&mut self, week_id: &str, member: &str) -> bool {
        let Some(entry) = self.assignments.iter_mut().find(|a| a.week_id == week_id) else {
            return false;
        };
        let before = entry.assignees.len();
        entry.assignees.retain(|m| m != member);
        let removed = entry.assignees.len() != before;
        self.assignments.retain(|a| !a.assignees.is_empty());
        removed
    }

    pub fn is_assigned(&self, member: &str) -> bool {
        self.assignments
            .iter()
            .any(|a| a.assignees.iter().any(|m| m == member))
    }
}

/// Partial task update; `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub priority: Option<String>,
    pub track: Option<String>,
    pub status: Option<String>,
    pub size: Option<String>,
    pub task_type: Option<String>,
    pub order: Option<i64>,
    pub assignments: Option<Vec<WeekAssignment>>,
    pub comments: Option<Vec<Comment>>,
    pub jira_epic_key: Option<Option<String>>,
    pub jira_subtasks: Option<Vec<JiraSubtask>>,
    pub jira_board_id: Option<Option<u64>>,
}

impl TaskUpdate {
    pub fn apply_to(self, task: &mut Task) {
        if let Some(v) = self.name {
            task.name = v;
        }
        if let Some(v) = self.priority {
            task.priority = v;
        }
        if let Some(v) = self.track {
            task.track = v;
        }
        if let Some(v) = self.status {
            task.status = v;
        }
        if let Some(v) = self.size {
            task.size = v;
        }
        if let Some(v) = self.task_type {
            task.task_type = v;
        }
        if let Some(v) = self.order {
            task.order = v;
        }
        if let Some(v) = self.assignments {
            task.assignments = v;
        }
        if let Some(v) = self.comments {
            task.comments = v;
        }
        if let Some(v) = self.jira_epic_key {
            task.jira_epic_key = v;
        }
        if let Some(v) = self.jira_subtasks {
            task.jira_subtasks = v;
        }
        if let Some(v) = self.jira_board_id {
            task.jira_board_id = v;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskPatch {
    pub id: String,
    pub updates: TaskUpdate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AddTasksResult {
    pub added: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapConfig {
    pub quarter: u8,
    pub year: i32,
    pub weeks: Vec<Week>,
    pub team_members: Vec<TeamMember>,
    pub tracks: Vec<TaxonomyItem>,
    pub priorities: Vec<TaxonomyItem>,
    pub statuses: Vec<TaxonomyItem>,
    pub types: Vec<TaxonomyItem>,
    pub sizes: Vec<TaxonomyItem>,
    pub defaults: TaskDefaults,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl RoadmapConfig {
    pub fn week(&self, week_id: &str) -> Option<&Week> {
        self.weeks.iter().find(|w| w.id == week_id)
    }

    /// Same planning content, ignoring timestamps.
    pub fn same_plan(&self, other: &RoadmapConfig) -> bool {
        self.quarter == other.quarter
            && self.year == other.year
            && self.weeks == other.weeks
            && self.team_members == other.team_members
            && self.tracks == other.tracks
            && self.priorities == other.priorities
            && self.statuses == other.statuses
            && self.types == other.types
            && self.sizes == other.sizes
            && self.defaults == other.defaults
    }
}

/// Shallow partial update of the configuration root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub quarter: Option<u8>,
    pub year: Option<i32>,
    pub weeks: Option<Vec<Week>>,
    pub team_members: Option<Vec<TeamMember>>,
    pub tracks: Option<Vec<TaxonomyItem>>,
    pub priorities: Option<Vec<TaxonomyItem>>,
    pub statuses: Option<Vec<TaxonomyItem>>,
    pub types: Option<Vec<TaxonomyItem>>,
    pub sizes: Option<Vec<TaxonomyItem>>,
    pub defaults: Option<TaskDefaults>,
}

/// Taxonomy lists supplied at initialization; missing lists use the built-ins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaxonomyOverrides {
    pub priorities: Option<Vec<TaxonomyItem>>,
    pub statuses: Option<Vec<TaxonomyItem>>,
    pub types: Option<Vec<TaxonomyItem>>,
    pub sizes: Option<Vec<TaxonomyItem>>,
    pub defaults: Option<TaskDefaults>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub list_id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> TaskDefaults {
        TaskDefaults {
            priority: "Medium".into(),
            track: "Product".into(),
            status: "To Do".into(),
            size: "M".into(),
            task_type: "Feature".into(),
        }
    }

    #[test]
    fn task_uses_camel_case_wire_names() {
        let mut task = Task::new("Search", &defaults());
        task.jira_epic_key = Some("ROAD-1".into());
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["jiraEpicKey"], "ROAD-1");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("jiraSubtasks").is_none());
    }

    #[test]
    fn task_decodes_without_optional_fields() {
        let task: Task = serde_json::from_value(json!({
            "id": "t1",
            "name": "Legacy",
            "priority": "High",
            "track": "Platform",
            "status": "Done",
            "size": "S",
            "type": "Bug",
            "createdAt": "2024-01-02T03:04:05Z"
        }))
        .unwrap();
        assert_eq!(task.order, 0);
        assert!(task.assignments.is_empty());
        assert!(task.jira_epic_key.is_none());
    }

    #[test]
    fn assignments_are_sparse() {
        let mut task = Task::new("Grid", &defaults());
        assert!(task.assignees("W3").is_empty());

        assert!(task.assign("W3", "m1"));
        assert!(!task.assign("W3", "m1"));
        assert!(task.assign("W3", "m2"));
        assert_eq!(task.assignees("W3"), ["m1".to_string(), "m2".to_string()]);

        assert!(task.unassign("W3", "m1"));
        assert!(task.unassign("W3", "m2"));
        assert!(task.assignments.is_empty());
        assert!(!task.unassign("W3", "m2"));
    }

    #[test]
    fn vacation_week_overlap() {
        let vacation = Vacation {
            id: "v".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 10, 12).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 10, 14).unwrap(),
            description: None,
            kind: VacationType::Vacation,
        };
        let monday = |d| NaiveDate::from_ymd_opt(2025, 10, d).unwrap();
        assert!(vacation.overlaps_week(monday(6)));
        assert!(vacation.overlaps_week(monday(13)));
        assert!(!vacation.overlaps_week(monday(20)));
    }

    #[test]
    fn week_monday_parses_label() {
        let week = Week {
            id: "W1".into(),
            date: "06-10".into(),
            month: "October".into(),
        };
        assert_eq!(week.monday(2025), NaiveDate::from_ymd_opt(2025, 10, 6));
    }
}
