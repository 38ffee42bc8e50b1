//! Serde-deserializable types matching the task service's responses.
//!
//! These are separate from the domain types so deserialization can absorb the
//! service's quirks — ids that arrive as strings or numbers, members that are
//! flat or nested under a `user` key, list envelopes with alternate key names
//! — while the domain types stay focused on application needs. Each
//! normalization documents its fallback order once and is tested against
//! every known shape variant.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{Folder, List, ListStatus, Member, Priority, Project, Task};

/// Deserialize an id that the service sends as either a string or a number.
fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  match Value::deserialize(deserializer)? {
    Value::String(s) => Ok(s),
    Value::Number(n) => Ok(n.to_string()),
    other => Err(serde::de::Error::custom(format!(
      "expected string or number id, got {}",
      other
    ))),
  }
}

/// Deserialize an epoch-milliseconds value sent as a number or a numeric
/// string. Absent and null both mean "no date".
fn opt_millis<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<Value>::deserialize(deserializer)? {
    None | Some(Value::Null) => Ok(None),
    Some(Value::Number(n)) => Ok(n.as_i64()),
    Some(Value::String(s)) => s
      .parse::<i64>()
      .map(Some)
      .map_err(|_| serde::de::Error::custom(format!("invalid epoch millis: {}", s))),
    Some(other) => Err(serde::de::Error::custom(format!(
      "expected epoch millis, got {}",
      other
    ))),
  }
}

// ============================================================================
// Common nested field types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub username: String,
}

/// Members arrive either flat (`{"id": .., "username": ..}`) or nested under
/// a `user` key. Checked in that order by the untagged match.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiMember {
  Flat(ApiUser),
  Nested { user: ApiUser },
}

impl ApiMember {
  fn into_member(self) -> Member {
    let user = match self {
      ApiMember::Flat(user) => user,
      ApiMember::Nested { user } => user,
    };
    Member {
      id: user.id,
      username: user.username,
    }
  }
}

/// Reference to a parent entity inside a single-entity payload.
#[derive(Debug, Deserialize)]
pub struct ApiRef {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProject {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub name: String,
  pub color: Option<String>,
  #[serde(default)]
  pub members: Vec<ApiMember>,
}

impl ApiProject {
  pub fn into_project(self) -> Project {
    let members: Vec<Member> = self.members.into_iter().map(ApiMember::into_member).collect();
    Project {
      id: self.id,
      name: self.name,
      description: format!("Members: {}", members.len()),
      members,
      color: self.color,
    }
  }
}

// ============================================================================
// Groups (the project-level grouping folders nest under)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiGroup {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
}

// ============================================================================
// Folders
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiFolder {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub name: String,
  #[serde(default, alias = "content")]
  pub description: String,
  #[serde(default)]
  pub hidden: bool,
  /// Owning project, present in single-entity payloads.
  #[serde(default, alias = "space")]
  pub project: Option<ApiRef>,
}

impl ApiFolder {
  /// Normalize a folder fetched through a project-scoped listing, where the
  /// owning project is known from the request rather than the payload.
  pub fn into_folder_in(self, project_id: &str) -> Folder {
    let project_id = self
      .project
      .map(|r| r.id)
      .unwrap_or_else(|| project_id.to_string());
    Folder {
      id: self.id,
      name: self.name,
      description: self.description,
      project_id,
      hidden: self.hidden,
    }
  }

  /// Normalize a folder from a single-entity payload, which must carry its
  /// owning project reference.
  pub fn try_into_folder(self) -> Result<Folder> {
    let project = self
      .project
      .ok_or_else(|| Error::upstream("folder payload missing project reference"))?;
    Ok(Folder {
      id: self.id,
      name: self.name,
      description: self.description,
      project_id: project.id,
      hidden: self.hidden,
    })
  }
}

// ============================================================================
// Lists
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiListStatus {
  pub status: String,
  pub color: Option<String>,
  #[serde(rename = "type")]
  pub status_type: Option<String>,
}

impl ApiListStatus {
  fn into_status(self) -> ListStatus {
    ListStatus {
      status: self.status,
      color: self.color,
      status_type: self.status_type,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiList {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub name: String,
  #[serde(default, alias = "content")]
  pub description: String,
  pub status: Option<ApiListStatus>,
  /// Owning folder, present in single-entity payloads.
  #[serde(default, alias = "category")]
  pub folder: Option<ApiRef>,
  /// Owning project, present in single-entity payloads.
  #[serde(default, alias = "space")]
  pub project: Option<ApiRef>,
}

impl ApiList {
  pub fn into_list_in(self, folder_id: &str, project_id: &str) -> List {
    let folder_id = self
      .folder
      .map(|r| r.id)
      .unwrap_or_else(|| folder_id.to_string());
    let project_id = self
      .project
      .map(|r| r.id)
      .unwrap_or_else(|| project_id.to_string());
    List {
      id: self.id,
      name: self.name,
      description: self.description,
      folder_id,
      project_id,
      status: self.status.map(ApiListStatus::into_status),
    }
  }

  pub fn try_into_list(self) -> Result<List> {
    let folder = self
      .folder
      .ok_or_else(|| Error::upstream("list payload missing folder reference"))?;
    let project = self
      .project
      .ok_or_else(|| Error::upstream("list payload missing project reference"))?;
    Ok(List {
      id: self.id,
      name: self.name,
      description: self.description,
      folder_id: folder.id,
      project_id: project.id,
      status: self.status.map(ApiListStatus::into_status),
    })
  }
}

// ============================================================================
// Tasks
// ============================================================================

/// Task status arrives as a bare string or as `{"status": "..", "color": ..}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiTaskStatus {
  Text(String),
  Object { status: String },
}

impl ApiTaskStatus {
  fn into_text(self) -> String {
    match self {
      ApiTaskStatus::Text(s) => s,
      ApiTaskStatus::Object { status } => status,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiPriority {
  #[serde(alias = "priority")]
  pub label: String,
  pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTask {
  #[serde(deserialize_with = "id_string")]
  pub id: String,
  pub name: String,
  #[serde(default, alias = "content")]
  pub description: String,
  pub status: Option<ApiTaskStatus>,
  pub priority: Option<ApiPriority>,
  #[serde(default, deserialize_with = "opt_millis")]
  pub due_date: Option<i64>,
  /// Owning list, present in single-entity payloads.
  #[serde(default)]
  pub list: Option<ApiRef>,
}

impl ApiTask {
  pub fn into_task_in(self, list_id: &str) -> Task {
    let list_id = self
      .list
      .map(|r| r.id)
      .unwrap_or_else(|| list_id.to_string());
    Task {
      id: self.id,
      name: self.name,
      description: self.description,
      list_id,
      status: self.status.map(ApiTaskStatus::into_text).unwrap_or_default(),
      priority: self.priority.map(|p| Priority {
        label: p.label,
        color: p.color,
      }),
      due_date: self.due_date,
    }
  }

  pub fn try_into_task(self) -> Result<Task> {
    let list = self
      .list
      .as_ref()
      .ok_or_else(|| Error::upstream("task payload missing list reference"))?;
    let list_id = list.id.clone();
    Ok(self.into_task_in(&list_id))
  }
}

// ============================================================================
// Envelope extraction
// ============================================================================

/// Pull a logical list out of a response payload. The service wraps lists
/// under endpoint-specific keys, with older deployments using legacy names
/// and some endpoints returning a bare array. Fallback order: the given keys
/// first (newest name first), then a bare top-level array.
fn list_payload<T: DeserializeOwned>(payload: Value, keys: &[&str]) -> Result<Vec<T>> {
  let inner = match payload {
    Value::Object(mut map) => match keys.iter().find_map(|k| map.remove(*k)) {
      Some(value) => value,
      None => {
        return Err(Error::upstream(format!(
          "unrecognized list payload, expected one of: {}",
          keys.join(", ")
        )))
      }
    },
    array @ Value::Array(_) => array,
    other => {
      return Err(Error::upstream(format!(
        "unrecognized list payload: {}",
        other
      )))
    }
  };
  serde_json::from_value(inner).map_err(Error::from)
}

/// Projects: `{"teams": [...]}`, legacy `{"projects": [...]}`, or bare array.
pub fn project_items(payload: Value) -> Result<Vec<ApiProject>> {
  list_payload(payload, &["teams", "projects"])
}

/// Groups: `{"spaces": [...]}`, legacy `{"groups": [...]}`, or bare array.
pub fn group_items(payload: Value) -> Result<Vec<ApiGroup>> {
  list_payload(payload, &["spaces", "groups"])
}

/// Folders: `{"folders": [...]}`, legacy `{"categories": [...]}`, or bare
/// array.
pub fn folder_items(payload: Value) -> Result<Vec<ApiFolder>> {
  list_payload(payload, &["folders", "categories"])
}

/// Lists: `{"lists": [...]}`, legacy `{"subcategories": [...]}`, or bare
/// array.
pub fn list_items(payload: Value) -> Result<Vec<ApiList>> {
  list_payload(payload, &["lists", "subcategories"])
}

/// Tasks: `{"tasks": [...]}` or bare array.
pub fn task_items(payload: Value) -> Result<Vec<ApiTask>> {
  list_payload(payload, &["tasks"])
}
