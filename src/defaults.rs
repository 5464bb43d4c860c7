//! Built-in roster and taxonomy used when nothing else is supplied.

use crate::types::{TaskDefaults, TaxonomyItem, TeamMember};

pub const PALETTE: &[&str] = &[
    "#4F46E5", "#0EA5E9", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#14B8A6",
];

pub const DEFAULT_MEMBER_NAMES: &[&str] = &["Alex", "Sam", "Jordan"];
pub const DEFAULT_TRACKS: &[&str] = &["Product", "Platform", "Maintenance"];

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Lowercase, dash-separated identifier derived from a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn items(entries: &[(&str, &str)]) -> Vec<TaxonomyItem> {
    entries
        .iter()
        .map(|(name, color)| TaxonomyItem {
            id: slugify(name),
            name: (*name).to_string(),
            color: (*color).to_string(),
        })
        .collect()
}

pub fn team_members() -> Vec<TeamMember> {
    DEFAULT_MEMBER_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| TeamMember::new(*name, palette_color(i)))
        .collect()
}

/// One track per project name, colored round-robin from the palette.
pub fn tracks_from_projects(projects: &[String]) -> Vec<TaxonomyItem> {
    projects
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(i, name)| TaxonomyItem {
            id: slugify(name),
            name: name.to_string(),
            color: palette_color(i).to_string(),
        })
        .collect()
}

pub fn tracks() -> Vec<TaxonomyItem> {
    let names: Vec<String> = DEFAULT_TRACKS.iter().map(|s| s.to_string()).collect();
    tracks_from_projects(&names)
}

pub fn priorities() -> Vec<TaxonomyItem> {
    items(&[
        ("Critical", "#DC2626"),
        ("High", "#F97316"),
        ("Medium", "#EAB308"),
        ("Low", "#22C55E"),
    ])
}

pub fn statuses() -> Vec<TaxonomyItem> {
    items(&[
        ("To Do", "#9CA3AF"),
        ("In Progress", "#3B82F6"),
        ("Blocked", "#EF4444"),
        ("Done", "#10B981"),
    ])
}

pub fn types() -> Vec<TaxonomyItem> {
    items(&[
        ("Feature", "#6366F1"),
        ("Bug", "#EF4444"),
        ("Tech Debt", "#F59E0B"),
        ("Research", "#06B6D4"),
    ])
}

pub fn sizes() -> Vec<TaxonomyItem> {
    items(&[
        ("XS", "#D1FAE5"),
        ("S", "#A7F3D0"),
        ("M", "#6EE7B7"),
        ("L", "#34D399"),
        ("XL", "#10B981"),
    ])
}

/// Task defaults pointing at the first sensible entry of each list.
pub fn task_defaults(tracks: &[TaxonomyItem]) -> TaskDefaults {
    TaskDefaults {
        priority: "Medium".to_string(),
        track: tracks
            .first()
            .map(|t| t.name.clone())
            .unwrap_or_else(|| DEFAULT_TRACKS[0].to_string()),
        status: "To Do".to_string(),
        size: "M".to_string(),
        task_type: "Feature".to_string(),
    }
}
