//! Domain types for the project → folder → list → task hierarchy.
//!
//! These are the normalized shapes the rest of the crate works with. The raw
//! wire shapes live in `api::types` and are converted here at the fetcher
//! boundary, so callers never see the service's alternate payload layouts.

use serde::{Deserialize, Serialize};

/// A member of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
  pub id: String,
  pub username: String,
}

/// Top of the hierarchy. Projects have no parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  pub id: String,
  pub name: String,
  /// Derived display text, e.g. "Members: 4".
  pub description: String,
  pub members: Vec<Member>,
  pub color: Option<String>,
}

/// A folder inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
  pub id: String,
  pub name: String,
  pub description: String,
  pub project_id: String,
  pub hidden: bool,
}

/// Status descriptor attached to a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListStatus {
  pub status: String,
  pub color: Option<String>,
  pub status_type: Option<String>,
}

/// A list inside a folder.
///
/// `project_id` is denormalized from the parent folder for convenience; it
/// must always agree with the owning folder's `project_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
  pub id: String,
  pub name: String,
  pub description: String,
  pub folder_id: String,
  pub project_id: String,
  pub status: Option<ListStatus>,
}

/// Priority descriptor attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
  pub label: String,
  pub color: Option<String>,
}

/// A task inside a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  pub id: String,
  pub name: String,
  pub description: String,
  pub list_id: String,
  pub status: String,
  pub priority: Option<Priority>,
  /// Due date in epoch milliseconds.
  pub due_date: Option<i64>,
}

/// The four entity types of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
  Project,
  Folder,
  List,
  Task,
}

impl std::fmt::Display for EntityKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      EntityKind::Project => "project",
      EntityKind::Folder => "folder",
      EntityKind::List => "list",
      EntityKind::Task => "task",
    };
    f.write_str(s)
  }
}

/// A `{type, id}` marker identifying an entity without holding its payload.
/// Navigation history is a bounded log of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
  pub kind: EntityKind,
  pub id: String,
}

impl EntityRef {
  pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
    Self {
      kind,
      id: id.into(),
    }
  }
}

// ============================================================================
// Create payloads
// ============================================================================

/// Payload for creating a folder. The service assigns the id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderDraft {
  pub name: String,
  pub hidden: bool,
}

/// Payload for creating a list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListDraft {
  pub name: String,
  pub description: String,
}

/// Payload for creating a task.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskDraft {
  pub name: String,
  pub description: String,
  pub priority: Option<Priority>,
  pub due_date: Option<i64>,
}
