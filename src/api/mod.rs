//! Gateway to the remote task-tracking service.
//!
//! The service is treated as a black box behind [`TaskApi`]: four logical
//! read operations plus CRUD per entity type, all returning the normalized
//! domain shapes. The cache and the navigation machine only ever see this
//! trait, so tests substitute a scripted in-memory implementation.

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Folder, FolderDraft, List, ListDraft, Project, Task, TaskDraft};

pub use http::HttpApi;

#[async_trait]
pub trait TaskApi: Send + Sync {
  /// All projects visible to the authenticated user.
  async fn list_projects(&self) -> Result<Vec<Project>>;

  /// All folders under a project, flattened across the service's
  /// intermediate grouping level.
  async fn list_folders(&self, project_id: &str) -> Result<Vec<Folder>>;
  async fn get_folder(&self, id: &str) -> Result<Folder>;
  async fn create_folder(&self, project_id: &str, draft: &FolderDraft) -> Result<Folder>;
  async fn update_folder(&self, folder: &Folder) -> Result<Folder>;
  async fn delete_folder(&self, id: &str) -> Result<()>;

  async fn list_lists(&self, folder_id: &str) -> Result<Vec<List>>;
  async fn get_list(&self, id: &str) -> Result<List>;
  async fn create_list(&self, folder_id: &str, project_id: &str, draft: &ListDraft)
    -> Result<List>;
  async fn update_list(&self, list: &List) -> Result<List>;
  async fn delete_list(&self, id: &str) -> Result<()>;

  async fn list_tasks(&self, list_id: &str) -> Result<Vec<Task>>;
  async fn get_task(&self, id: &str) -> Result<Task>;
  async fn create_task(&self, list_id: &str, draft: &TaskDraft) -> Result<Task>;
  async fn update_task(&self, task: &Task) -> Result<Task>;
  async fn delete_task(&self, id: &str) -> Result<()>;
}
