//! Navigation state machine for the project → folder → list → task hierarchy.
//!
//! Tracks the user's current position as a strictly nested chain: a present
//! task implies a present list, folder and project. Each transition resolves
//! the target entity and its ancestors through the cached client, commits the
//! new position atomically (or not at all), and publishes the state.
//!
//! Failures never corrupt the position: the machine stays in its last
//! successfully-reached state and reports the error both as the rejected
//! operation and as a transient `error` value in the published state, which
//! the next successful transition clears.
//!
//! Transitions issued back-to-back without awaiting are not serialized here;
//! the later completion wins the state write. Callers that need strict
//! ordering must await each transition before issuing the next.

use crate::broadcast::{Broadcast, Subscription};
use crate::client::CachedClient;
use crate::error::{Error, Result};
use crate::types::{EntityKind, EntityRef, Folder, List, Project, Task};

/// Maximum number of navigation markers kept for `go_back`; oldest entries
/// are evicted first.
pub const HISTORY_LIMIT: usize = 50;

/// One element of the root-to-leaf breadcrumb trail.
#[derive(Debug, Clone, PartialEq)]
pub enum Crumb {
  Project(Project),
  Folder(Folder),
  List(List),
  Task(Task),
}

impl Crumb {
  pub fn kind(&self) -> EntityKind {
    match self {
      Crumb::Project(_) => EntityKind::Project,
      Crumb::Folder(_) => EntityKind::Folder,
      Crumb::List(_) => EntityKind::List,
      Crumb::Task(_) => EntityKind::Task,
    }
  }

  pub fn id(&self) -> &str {
    match self {
      Crumb::Project(p) => &p.id,
      Crumb::Folder(f) => &f.id,
      Crumb::List(l) => &l.id,
      Crumb::Task(t) => &t.id,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      Crumb::Project(p) => &p.name,
      Crumb::Folder(f) => &f.name,
      Crumb::List(l) => &l.name,
      Crumb::Task(t) => &t.name,
    }
  }
}

/// How deep into the hierarchy the machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
  Empty,
  AtProject,
  AtFolder,
  AtList,
  AtTask,
}

/// The published navigation state. Entities are immutable snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavState {
  pub project: Option<Project>,
  pub folder: Option<Folder>,
  pub list: Option<List>,
  pub task: Option<Task>,
  /// Root-to-leaf path for the current position.
  pub breadcrumbs: Vec<Crumb>,
  /// Bounded log of explicit navigations, distinct from breadcrumbs.
  pub history: Vec<EntityRef>,
  /// Error from the most recent failed transition, cleared by the next
  /// successful one. The rest of the state is the last-good position.
  pub error: Option<String>,
}

impl NavState {
  pub fn position(&self) -> Position {
    if self.task.is_some() {
      Position::AtTask
    } else if self.list.is_some() {
      Position::AtList
    } else if self.folder.is_some() {
      Position::AtFolder
    } else if self.project.is_some() {
      Position::AtProject
    } else {
      Position::Empty
    }
  }
}

/// The fully resolved target of a transition, built before any state is
/// mutated so a failure aborts without partial updates.
struct ResolvedPath {
  project: Project,
  folder: Option<Folder>,
  list: Option<List>,
  task: Option<Task>,
}

enum HistoryOp {
  /// An explicit navigation: append a marker, evicting the oldest past the
  /// limit.
  Push,
  /// A back-navigation: drop the departed position's marker.
  Pop,
}

/// The navigation state machine. One instance per session.
pub struct Navigator {
  client: CachedClient,
  state: NavState,
  changes: Broadcast<NavState>,
}

impl Navigator {
  pub fn new(client: CachedClient) -> Self {
    Self {
      client,
      state: NavState::default(),
      changes: Broadcast::new(NavState::default()),
    }
  }

  pub fn state(&self) -> &NavState {
    &self.state
  }

  /// Register a state listener. It fires once immediately with the current
  /// state, then after every transition (successful or failed).
  pub fn subscribe<F>(&self, listener: F) -> Subscription<NavState>
  where
    F: Fn(&NavState) + Send + Sync + 'static,
  {
    self.changes.subscribe(listener)
  }

  pub async fn goto_project(&mut self, id: &str) -> Result<()> {
    self.navigate(EntityKind::Project, id, HistoryOp::Push).await
  }

  pub async fn goto_folder(&mut self, id: &str) -> Result<()> {
    self.navigate(EntityKind::Folder, id, HistoryOp::Push).await
  }

  pub async fn goto_list(&mut self, id: &str) -> Result<()> {
    self.navigate(EntityKind::List, id, HistoryOp::Push).await
  }

  pub async fn goto_task(&mut self, id: &str) -> Result<()> {
    self.navigate(EntityKind::Task, id, HistoryOp::Push).await
  }

  /// Step back to the previous history entry, re-resolving its ancestors
  /// through the same rules as a forward navigation (so a back-navigation
  /// reflects any intervening cache updates). A no-op when there is nothing
  /// to go back to.
  pub async fn go_back(&mut self) -> Result<()> {
    if self.state.history.len() < 2 {
      return Ok(());
    }
    let target = self.state.history[self.state.history.len() - 2].clone();
    self.navigate(target.kind, &target.id, HistoryOp::Pop).await
  }

  /// Clear position, breadcrumbs and history. Also invoked on logout.
  pub fn reset(&mut self) {
    self.state = NavState::default();
    self.publish();
  }

  async fn navigate(&mut self, kind: EntityKind, id: &str, op: HistoryOp) -> Result<()> {
    match self.resolve(kind, id).await {
      Ok(path) => {
        self.commit(path, kind, id, op);
        Ok(())
      }
      Err(err) => {
        // Last-good position is retained; only the transient error changes.
        self.state.error = Some(err.to_string());
        self.publish();
        Err(err)
      }
    }
  }

  /// Fetch the target entity and resolve its ancestor chain. Errors on the
  /// target itself propagate as-is (`NotFound`, `UpstreamFetch`); an
  /// unresolvable ancestor becomes `MissingAncestor`.
  async fn resolve(&self, kind: EntityKind, id: &str) -> Result<ResolvedPath> {
    match kind {
      EntityKind::Project => {
        let project = self.client.project(id).await?;
        Ok(ResolvedPath {
          project,
          folder: None,
          list: None,
          task: None,
        })
      }
      EntityKind::Folder => {
        let folder = self.client.folder(id).await?;
        let project = self.resolve_project(&folder.project_id).await?;
        Ok(ResolvedPath {
          project,
          folder: Some(folder),
          list: None,
          task: None,
        })
      }
      EntityKind::List => {
        let list = self.client.list(id).await?;
        let folder = self.resolve_folder(&list.folder_id).await?;
        let project = self.resolve_project(&folder.project_id).await?;
        Ok(ResolvedPath {
          project,
          folder: Some(folder),
          list: Some(list),
          task: None,
        })
      }
      EntityKind::Task => {
        let task = self.client.task(id).await?;
        let list = self.resolve_list(&task.list_id).await?;
        let folder = self.resolve_folder(&list.folder_id).await?;
        let project = self.resolve_project(&folder.project_id).await?;
        Ok(ResolvedPath {
          project,
          folder: Some(folder),
          list: Some(list),
          task: Some(task),
        })
      }
    }
  }

  // Ancestor resolution prefers the currently-held entity when the id
  // matches: no redundant fetch, and a manually navigated-to ancestor stays
  // consistent with the user's idea of where they are even if slightly
  // stale.

  async fn resolve_project(&self, id: &str) -> Result<Project> {
    if let Some(project) = &self.state.project {
      if project.id == id {
        return Ok(project.clone());
      }
    }
    self
      .client
      .project(id)
      .await
      .map_err(|e| Error::missing_ancestor(EntityKind::Project, id, e))
  }

  async fn resolve_folder(&self, id: &str) -> Result<Folder> {
    if let Some(folder) = &self.state.folder {
      if folder.id == id {
        return Ok(folder.clone());
      }
    }
    self
      .client
      .folder(id)
      .await
      .map_err(|e| Error::missing_ancestor(EntityKind::Folder, id, e))
  }

  async fn resolve_list(&self, id: &str) -> Result<List> {
    if let Some(list) = &self.state.list {
      if list.id == id {
        return Ok(list.clone());
      }
    }
    self
      .client
      .list(id)
      .await
      .map_err(|e| Error::missing_ancestor(EntityKind::List, id, e))
  }

  /// Apply a fully resolved transition: position, breadcrumbs and history
  /// change together, the transient error clears, subscribers are notified.
  fn commit(&mut self, path: ResolvedPath, kind: EntityKind, id: &str, op: HistoryOp) {
    let mut breadcrumbs = vec![Crumb::Project(path.project.clone())];
    if let Some(folder) = &path.folder {
      breadcrumbs.push(Crumb::Folder(folder.clone()));
    }
    if let Some(list) = &path.list {
      breadcrumbs.push(Crumb::List(list.clone()));
    }
    if let Some(task) = &path.task {
      breadcrumbs.push(Crumb::Task(task.clone()));
    }

    self.state.project = Some(path.project);
    self.state.folder = path.folder;
    self.state.list = path.list;
    self.state.task = path.task;
    self.state.breadcrumbs = breadcrumbs;
    self.state.error = None;

    match op {
      HistoryOp::Push => {
        self.state.history.push(EntityRef::new(kind, id));
        if self.state.history.len() > HISTORY_LIMIT {
          let excess = self.state.history.len() - HISTORY_LIMIT;
          self.state.history.drain(..excess);
        }
      }
      HistoryOp::Pop => {
        self.state.history.pop();
      }
    }

    tracing::info!(%kind, id, "navigated");
    self.publish();
  }

  fn publish(&self) {
    self.changes.publish(self.state.clone());
  }
}
