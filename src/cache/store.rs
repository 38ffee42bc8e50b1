//! In-memory, hierarchically scoped entity cache with freshness bookkeeping.
//!
//! One id-keyed map per entity type is the single source of truth; scoped
//! reads ("all folders of project X") are computed by filtering at read time,
//! so an entity is never stored twice. Freshness is tracked per scope: a
//! scope is valid iff a last-fetched timestamp exists for it and is younger
//! than the expiry window. The store never touches the network and never
//! fails — fetch failures are the fetchers' concern (`client` module).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::broadcast::{Broadcast, Subscription};
use crate::cache::clock::{Clock, SystemClock};
use crate::cache::traits::Entity;
use crate::types::{Folder, List, Project, Task};

/// Scope key used for the flat project collection, which has no parent.
const GLOBAL_SCOPE: &str = "*";

/// One entity type's storage: the id-keyed map plus per-scope fetch times.
/// Insertion order is preserved so scoped reads come back in server order.
struct Shelf<T> {
  items: IndexMap<String, T>,
  fetched: HashMap<String, DateTime<Utc>>,
}

impl<T: Entity> Shelf<T> {
  fn new() -> Self {
    Self {
      items: IndexMap::new(),
      fetched: HashMap::new(),
    }
  }

  fn is_valid(&self, scope: &str, now: DateTime<Utc>, expiry: Duration) -> bool {
    match self.fetched.get(scope) {
      Some(at) => now - *at < expiry,
      None => false,
    }
  }

  /// Replace every entry belonging to `scope` with `items` and stamp the
  /// scope as freshly fetched. Entries in other scopes are untouched.
  fn replace_all(&mut self, scope: &str, items: Vec<T>, now: DateTime<Utc>) {
    self.items.retain(|_, item| !in_scope(item, scope));
    let count = items.len();
    for item in items {
      self.items.insert(item.id().to_string(), item);
    }
    self.fetched.insert(scope.to_string(), now);
    tracing::trace!(kind = %T::kind(), scope, count, "scope replaced");
  }

  /// Forget the fetch timestamp for `scope`. Data stays in the map; the next
  /// read through a fetcher simply re-fetches.
  fn invalidate(&mut self, scope: &str) {
    self.fetched.remove(scope);
  }

  /// Insert or replace a single entry. Freshness timestamps are untouched.
  fn upsert(&mut self, item: T) {
    self.items.insert(item.id().to_string(), item);
  }

  fn remove(&mut self, id: &str) -> Option<T> {
    self.items.shift_remove(id)
  }

  fn get(&self, id: &str) -> Option<T> {
    self.items.get(id).cloned()
  }

  fn in_scope(&self, scope: &str) -> Vec<T> {
    self
      .items
      .values()
      .filter(|item| in_scope(*item, scope))
      .cloned()
      .collect()
  }

  fn all(&self) -> Vec<T> {
    self.items.values().cloned().collect()
  }

  fn reset(&mut self) {
    self.items.clear();
    self.fetched.clear();
  }
}

fn in_scope<T: Entity>(item: &T, scope: &str) -> bool {
  item.scope().unwrap_or(GLOBAL_SCOPE) == scope
}

struct Data {
  projects: Shelf<Project>,
  folders: Shelf<Folder>,
  lists: Shelf<List>,
  tasks: Shelf<Task>,
}

/// A full copy of the cache contents, published to subscribers on every
/// mutation. Entities are immutable snapshots; to change data, call the
/// appropriate store operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheSnapshot {
  pub projects: Vec<Project>,
  pub folders: Vec<Folder>,
  pub lists: Vec<List>,
  pub tasks: Vec<Task>,
}

/// The cache store. Cheap to clone; clones share the same underlying data,
/// matching the one-instance-per-session model.
pub struct CacheStore {
  data: Arc<Mutex<Data>>,
  clock: Arc<dyn Clock>,
  expiry: Duration,
  changes: Broadcast<CacheSnapshot>,
}

impl CacheStore {
  pub fn new() -> Self {
    Self::with_clock(Arc::new(SystemClock))
  }

  /// Build a store reading time from the given clock. Tests use this to
  /// advance simulated time past the expiry window.
  pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
    Self {
      data: Arc::new(Mutex::new(Data {
        projects: Shelf::new(),
        folders: Shelf::new(),
        lists: Shelf::new(),
        tasks: Shelf::new(),
      })),
      clock,
      expiry: Duration::minutes(5),
      changes: Broadcast::new(CacheSnapshot::default()),
    }
  }

  /// Override the freshness window (default 5 minutes).
  pub fn with_expiry(mut self, expiry: Duration) -> Self {
    self.expiry = expiry;
    self
  }

  /// Register a change listener. It fires once immediately with the current
  /// snapshot, then after every mutation.
  pub fn subscribe<F>(&self, listener: F) -> Subscription<CacheSnapshot>
  where
    F: Fn(&CacheSnapshot) + Send + Sync + 'static,
  {
    self.changes.subscribe(listener)
  }

  /// Copy of everything currently cached, regardless of freshness.
  pub fn snapshot(&self) -> CacheSnapshot {
    let data = self.lock();
    CacheSnapshot {
      projects: data.projects.all(),
      folders: data.folders.all(),
      lists: data.lists.all(),
      tasks: data.tasks.all(),
    }
  }

  /// Clear all entries and all freshness timestamps.
  pub fn reset(&self) {
    {
      let mut data = self.lock();
      data.projects.reset();
      data.folders.reset();
      data.lists.reset();
      data.tasks.reset();
    }
    self.notify();
  }

  // ==========================================================================
  // Projects (flat collection, no scope)
  // ==========================================================================

  pub fn projects_valid(&self) -> bool {
    let now = self.clock.now();
    self.lock().projects.is_valid(GLOBAL_SCOPE, now, self.expiry)
  }

  pub fn replace_projects(&self, items: Vec<Project>) {
    let now = self.clock.now();
    self.lock().projects.replace_all(GLOBAL_SCOPE, items, now);
    self.notify();
  }

  pub fn invalidate_projects(&self) {
    self.lock().projects.invalidate(GLOBAL_SCOPE);
    self.notify();
  }

  pub fn projects(&self) -> Vec<Project> {
    self.lock().projects.all()
  }

  pub fn project(&self, id: &str) -> Option<Project> {
    self.lock().projects.get(id)
  }

  pub fn add_project(&self, project: Project) {
    self.lock().projects.upsert(project);
    self.notify();
  }

  /// Replace a project in place. Inserts if the id is not yet known.
  pub fn update_project(&self, project: Project) {
    self.add_project(project);
  }

  /// Remove a project by id. A no-op if the id is not cached.
  pub fn delete_project(&self, id: &str) -> Option<Project> {
    let removed = self.lock().projects.remove(id);
    if removed.is_some() {
      self.notify();
    }
    removed
  }

  // ==========================================================================
  // Folders (scoped by project id)
  // ==========================================================================

  pub fn folders_valid(&self, project_id: &str) -> bool {
    let now = self.clock.now();
    self.lock().folders.is_valid(project_id, now, self.expiry)
  }

  pub fn replace_folders(&self, project_id: &str, items: Vec<Folder>) {
    let now = self.clock.now();
    self.lock().folders.replace_all(project_id, items, now);
    self.notify();
  }

  pub fn invalidate_folders(&self, project_id: &str) {
    self.lock().folders.invalidate(project_id);
    self.notify();
  }

  pub fn folders_in(&self, project_id: &str) -> Vec<Folder> {
    self.lock().folders.in_scope(project_id)
  }

  pub fn folder(&self, id: &str) -> Option<Folder> {
    self.lock().folders.get(id)
  }

  pub fn add_folder(&self, folder: Folder) {
    self.lock().folders.upsert(folder);
    self.notify();
  }

  pub fn update_folder(&self, folder: Folder) {
    self.add_folder(folder);
  }

  pub fn delete_folder(&self, id: &str) -> Option<Folder> {
    let removed = self.lock().folders.remove(id);
    if removed.is_some() {
      self.notify();
    }
    removed
  }

  // ==========================================================================
  // Lists (scoped by folder id)
  // ==========================================================================

  pub fn lists_valid(&self, folder_id: &str) -> bool {
    let now = self.clock.now();
    self.lock().lists.is_valid(folder_id, now, self.expiry)
  }

  pub fn replace_lists(&self, folder_id: &str, items: Vec<List>) {
    let now = self.clock.now();
    self.lock().lists.replace_all(folder_id, items, now);
    self.notify();
  }

  pub fn invalidate_lists(&self, folder_id: &str) {
    self.lock().lists.invalidate(folder_id);
    self.notify();
  }

  pub fn lists_in(&self, folder_id: &str) -> Vec<List> {
    self.lock().lists.in_scope(folder_id)
  }

  pub fn list(&self, id: &str) -> Option<List> {
    self.lock().lists.get(id)
  }

  pub fn add_list(&self, list: List) {
    self.lock().lists.upsert(list);
    self.notify();
  }

  pub fn update_list(&self, list: List) {
    self.add_list(list);
  }

  pub fn delete_list(&self, id: &str) -> Option<List> {
    let removed = self.lock().lists.remove(id);
    if removed.is_some() {
      self.notify();
    }
    removed
  }

  // ==========================================================================
  // Tasks (scoped by list id)
  // ==========================================================================

  pub fn tasks_valid(&self, list_id: &str) -> bool {
    let now = self.clock.now();
    self.lock().tasks.is_valid(list_id, now, self.expiry)
  }

  pub fn replace_tasks(&self, list_id: &str, items: Vec<Task>) {
    let now = self.clock.now();
    self.lock().tasks.replace_all(list_id, items, now);
    self.notify();
  }

  pub fn invalidate_tasks(&self, list_id: &str) {
    self.lock().tasks.invalidate(list_id);
    self.notify();
  }

  pub fn tasks_in(&self, list_id: &str) -> Vec<Task> {
    self.lock().tasks.in_scope(list_id)
  }

  pub fn task(&self, id: &str) -> Option<Task> {
    self.lock().tasks.get(id)
  }

  pub fn add_task(&self, task: Task) {
    self.lock().tasks.upsert(task);
    self.notify();
  }

  pub fn update_task(&self, task: Task) {
    self.add_task(task);
  }

  pub fn delete_task(&self, id: &str) -> Option<Task> {
    let removed = self.lock().tasks.remove(id);
    if removed.is_some() {
      self.notify();
    }
    removed
  }

  // ==========================================================================
  // Internals
  // ==========================================================================

  // Recover from poisoning instead of failing: the store holds plain data
  // and has no invariants that survive only half a critical section.
  fn lock(&self) -> MutexGuard<'_, Data> {
    self.data.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn notify(&self) {
    self.changes.publish(self.snapshot());
  }
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new()
  }
}

impl Clone for CacheStore {
  fn clone(&self) -> Self {
    Self {
      data: Arc::clone(&self.data),
      clock: Arc::clone(&self.clock),
      expiry: self.expiry,
      changes: self.changes.clone(),
    }
  }
}
