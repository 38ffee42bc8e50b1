//! Cached task-service client: the entity fetchers.
//!
//! One read/write gateway per entity type, each resolving reads cache-first:
//! if the scope's freshness stamp is within the expiry window the in-memory
//! data is returned as-is; otherwise the remote service is called and the
//! result written back with `replace_all`, stamping the scope fresh. A fetch
//! that returns zero entities is still a cached fact, not a miss.
//!
//! Mutations call the service first and mirror success into the cache, so
//! the cache stays consistent without a full refetch. On any failure the
//! cache is left untouched and the error propagates.

use std::sync::Arc;

use crate::api::TaskApi;
use crate::cache::CacheStore;
use crate::error::{Error, Result};
use crate::types::{
  EntityKind, Folder, FolderDraft, List, ListDraft, Project, Task, TaskDraft,
};

/// Task-service client with transparent caching.
///
/// Cheap to clone; clones share the cache store and the underlying gateway.
#[derive(Clone)]
pub struct CachedClient {
  api: Arc<dyn TaskApi>,
  cache: CacheStore,
}

impl CachedClient {
  pub fn new(api: Arc<dyn TaskApi>, cache: CacheStore) -> Self {
    Self { api, cache }
  }

  /// The shared cache store, for invalidation and change subscriptions.
  pub fn cache(&self) -> &CacheStore {
    &self.cache
  }

  // ==========================================================================
  // Scope reads
  // ==========================================================================

  pub async fn get_projects(&self) -> Result<Vec<Project>> {
    if self.cache.projects_valid() {
      tracing::debug!("projects served from cache");
      return Ok(self.cache.projects());
    }

    tracing::debug!("projects stale or missing, fetching");
    let projects = self.api.list_projects().await?;
    self.cache.replace_projects(projects.clone());
    Ok(projects)
  }

  pub async fn get_folders(&self, project_id: &str) -> Result<Vec<Folder>> {
    if self.cache.folders_valid(project_id) {
      tracing::debug!(project_id, "folders served from cache");
      return Ok(self.cache.folders_in(project_id));
    }

    tracing::debug!(project_id, "folders stale or missing, fetching");
    let folders = self.api.list_folders(project_id).await?;
    self.cache.replace_folders(project_id, folders.clone());
    Ok(folders)
  }

  pub async fn get_lists(&self, folder_id: &str) -> Result<Vec<List>> {
    if self.cache.lists_valid(folder_id) {
      tracing::debug!(folder_id, "lists served from cache");
      return Ok(self.cache.lists_in(folder_id));
    }

    tracing::debug!(folder_id, "lists stale or missing, fetching");
    let mut lists = self.api.list_lists(folder_id).await?;

    // The folder-scoped endpoint may omit the denormalized project id; fill
    // it from the owning folder (fetched if not yet cached) so the hierarchy
    // invariant holds. A list never enters the cache without its project id.
    if lists.iter().any(|l| l.project_id.is_empty()) {
      let owner = self.folder(folder_id).await?;
      for list in lists.iter_mut().filter(|l| l.project_id.is_empty()) {
        list.project_id = owner.project_id.clone();
      }
    }

    self.cache.replace_lists(folder_id, lists.clone());
    Ok(lists)
  }

  pub async fn get_tasks(&self, list_id: &str) -> Result<Vec<Task>> {
    if self.cache.tasks_valid(list_id) {
      tracing::debug!(list_id, "tasks served from cache");
      return Ok(self.cache.tasks_in(list_id));
    }

    tracing::debug!(list_id, "tasks stale or missing, fetching");
    let tasks = self.api.list_tasks(list_id).await?;
    self.cache.replace_tasks(list_id, tasks.clone());
    Ok(tasks)
  }

  // ==========================================================================
  // By-id reads
  // ==========================================================================

  /// Resolve a project by id from the (flat, cached) project collection.
  pub async fn project(&self, id: &str) -> Result<Project> {
    self
      .get_projects()
      .await?
      .into_iter()
      .find(|p| p.id == id)
      .ok_or_else(|| Error::NotFound {
        kind: EntityKind::Project,
        id: id.to_string(),
      })
  }

  /// Resolve a folder by id: cached entry if present, otherwise a
  /// single-entity fetch that is then written into the cache.
  pub async fn folder(&self, id: &str) -> Result<Folder> {
    if let Some(folder) = self.cache.folder(id) {
      return Ok(folder);
    }
    let folder = self.api.get_folder(id).await?;
    self.cache.add_folder(folder.clone());
    Ok(folder)
  }

  pub async fn list(&self, id: &str) -> Result<List> {
    if let Some(list) = self.cache.list(id) {
      return Ok(list);
    }
    let list = self.api.get_list(id).await?;
    self.cache.add_list(list.clone());
    Ok(list)
  }

  pub async fn task(&self, id: &str) -> Result<Task> {
    if let Some(task) = self.cache.task(id) {
      return Ok(task);
    }
    let task = self.api.get_task(id).await?;
    self.cache.add_task(task.clone());
    Ok(task)
  }

  // ==========================================================================
  // Write-through mutations
  // ==========================================================================

  pub async fn create_folder(&self, project_id: &str, draft: &FolderDraft) -> Result<Folder> {
    let folder = self.api.create_folder(project_id, draft).await?;
    self.cache.add_folder(folder.clone());
    Ok(folder)
  }

  pub async fn update_folder(&self, folder: &Folder) -> Result<Folder> {
    let updated = self.api.update_folder(folder).await?;
    self.cache.update_folder(updated.clone());
    Ok(updated)
  }

  pub async fn delete_folder(&self, id: &str) -> Result<()> {
    self.api.delete_folder(id).await?;
    self.cache.delete_folder(id);
    Ok(())
  }

  pub async fn create_list(
    &self,
    folder_id: &str,
    project_id: &str,
    draft: &ListDraft,
  ) -> Result<List> {
    let list = self.api.create_list(folder_id, project_id, draft).await?;
    self.cache.add_list(list.clone());
    Ok(list)
  }

  pub async fn update_list(&self, list: &List) -> Result<List> {
    let updated = self.api.update_list(list).await?;
    self.cache.update_list(updated.clone());
    Ok(updated)
  }

  pub async fn delete_list(&self, id: &str) -> Result<()> {
    self.api.delete_list(id).await?;
    self.cache.delete_list(id);
    Ok(())
  }

  pub async fn create_task(&self, list_id: &str, draft: &TaskDraft) -> Result<Task> {
    let task = self.api.create_task(list_id, draft).await?;
    self.cache.add_task(task.clone());
    Ok(task)
  }

  pub async fn update_task(&self, task: &Task) -> Result<Task> {
    let updated = self.api.update_task(task).await?;
    self.cache.update_task(updated.clone());
    Ok(updated)
  }

  pub async fn delete_task(&self, id: &str) -> Result<()> {
    self.api.delete_task(id).await?;
    self.cache.delete_task(id);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::Clock;
  use crate::testutil::{folder, task, FakeApi, ManualClock};
  use chrono::Duration;

  fn client_with_clock() -> (CachedClient, Arc<FakeApi>, Arc<ManualClock>) {
    let api = FakeApi::with_fixture();
    let clock = Arc::new(ManualClock::new());
    let cache = CacheStore::with_clock(clock.clone() as Arc<dyn Clock>);
    (CachedClient::new(api.clone(), cache), api, clock)
  }

  #[tokio::test]
  async fn second_read_within_expiry_skips_network() {
    let (client, api, _clock) = client_with_clock();

    client.get_folders("P1").await.unwrap();
    client.get_folders("P1").await.unwrap();

    assert_eq!(api.calls("list_folders"), 1);
  }

  #[tokio::test]
  async fn expired_scope_refetches() {
    let (client, api, clock) = client_with_clock();

    client.get_tasks("L1").await.unwrap();
    clock.advance(Duration::minutes(6));
    client.get_tasks("L1").await.unwrap();

    assert_eq!(api.calls("list_tasks"), 2);
  }

  #[tokio::test]
  async fn empty_result_is_a_cached_fact() {
    let (client, api, _clock) = client_with_clock();

    // L-empty has no tasks; the empty list must still stamp the scope.
    let tasks = client.get_tasks("L-empty").await.unwrap();
    assert!(tasks.is_empty());
    assert!(client.cache().tasks_valid("L-empty"));

    client.get_tasks("L-empty").await.unwrap();
    assert_eq!(api.calls("list_tasks"), 1);
  }

  #[tokio::test]
  async fn fetch_failure_leaves_cache_untouched() {
    let (client, api, clock) = client_with_clock();

    client.get_folders("P1").await.unwrap();
    let before = client.cache().folders_in("P1");

    clock.advance(Duration::minutes(6));
    api.fail_kind(EntityKind::Folder);

    let err = client.get_folders("P1").await.unwrap_err();
    assert!(matches!(err, Error::UpstreamFetch { .. }));

    // Stale data is still there, and the scope was not re-stamped.
    assert_eq!(client.cache().folders_in("P1"), before);
    assert!(!client.cache().folders_valid("P1"));
  }

  #[tokio::test]
  async fn by_id_read_hits_cache_after_first_fetch() {
    let (client, api, _clock) = client_with_clock();

    client.folder("F1").await.unwrap();
    client.folder("F1").await.unwrap();

    assert_eq!(api.calls("get_folder"), 1);
  }

  #[tokio::test]
  async fn unknown_id_is_not_found() {
    let (client, _api, _clock) = client_with_clock();

    let err = client.project("missing").await.unwrap_err();
    assert!(err.is_not_found());

    let err = client.task("missing").await.unwrap_err();
    assert!(err.is_not_found());
  }

  #[tokio::test]
  async fn create_writes_through_to_cache() {
    let (client, _api, _clock) = client_with_clock();

    let draft = TaskDraft {
      name: "new task".to_string(),
      ..Default::default()
    };
    let created = client.create_task("L1", &draft).await.unwrap();

    assert_eq!(client.cache().task(&created.id).unwrap().name, "new task");
  }

  #[tokio::test]
  async fn update_replaces_cached_entry() {
    let (client, _api, _clock) = client_with_clock();

    let mut f = client.folder("F1").await.unwrap();
    f.name = "renamed".to_string();
    client.update_folder(&f).await.unwrap();

    assert_eq!(client.cache().folder("F1").unwrap().name, "renamed");
  }

  #[tokio::test]
  async fn delete_removes_cached_entry() {
    let (client, _api, _clock) = client_with_clock();

    client.get_tasks("L1").await.unwrap();
    assert!(client.cache().task("T1").is_some());

    client.delete_task("T1").await.unwrap();
    assert!(client.cache().task("T1").is_none());
  }

  #[tokio::test]
  async fn failed_mutation_leaves_cache_untouched() {
    let (client, api, _clock) = client_with_clock();

    client.get_folders("P1").await.unwrap();
    api.fail_kind(EntityKind::Folder);

    let f = folder("F1", "P1");
    assert!(client.update_folder(&f).await.is_err());
    assert!(client.delete_folder("F1").await.is_err());

    // Cached folder is the fixture one, untouched by the failed calls.
    assert!(client.cache().folder("F1").is_some());
  }

  #[tokio::test]
  async fn lists_inherit_project_id_from_cached_folder() {
    let (client, api, _clock) = client_with_clock();

    client.folder("F1").await.unwrap();
    api.strip_list_project_ids();

    let lists = client.get_lists("F1").await.unwrap();
    assert!(lists.iter().all(|l| l.project_id == "P1"));
  }

  #[tokio::test]
  async fn lists_inherit_project_id_when_folder_is_not_cached() {
    let (client, api, _clock) = client_with_clock();

    // Folder F1 was never fetched; the fetcher must resolve it itself
    // rather than cache lists with an empty project id.
    api.strip_list_project_ids();

    let lists = client.get_lists("F1").await.unwrap();
    assert!(lists.iter().all(|l| l.project_id == "P1"));
    assert!(client.cache().lists_in("F1").iter().all(|l| l.project_id == "P1"));
    assert_eq!(api.calls("get_folder"), 1);
  }

  #[tokio::test]
  async fn tasks_are_scoped_to_their_list() {
    let (client, _api, _clock) = client_with_clock();

    client.get_tasks("L1").await.unwrap();
    let other = client.get_tasks("L2").await.unwrap();

    assert!(!other.iter().any(|t| t.id == task("T1", "L1").id));
  }
}
