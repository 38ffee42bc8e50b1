//! Core trait for entities held by the cache store.

use serde::{de::DeserializeOwned, Serialize};

use crate::types::{EntityKind, Folder, List, Project, Task};

/// Trait for entities that can be cached.
///
/// Storage is keyed by [`id`](Entity::id) alone — ids are unique within a
/// type across the whole cache. The [`scope`](Entity::scope) (parent id) is
/// used only for freshness bookkeeping and read-time filtering, never for
/// storage partitioning.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Unique identifier within this entity type.
  fn id(&self) -> &str;

  /// Owning scope: the parent id for folders/lists/tasks, `None` for
  /// projects (a flat, globally scoped collection).
  fn scope(&self) -> Option<&str>;

  /// Which of the four hierarchy levels this type occupies.
  fn kind() -> EntityKind;
}

impl Entity for Project {
  fn id(&self) -> &str {
    &self.id
  }

  fn scope(&self) -> Option<&str> {
    None
  }

  fn kind() -> EntityKind {
    EntityKind::Project
  }
}

impl Entity for Folder {
  fn id(&self) -> &str {
    &self.id
  }

  fn scope(&self) -> Option<&str> {
    Some(&self.project_id)
  }

  fn kind() -> EntityKind {
    EntityKind::Folder
  }
}

impl Entity for List {
  fn id(&self) -> &str {
    &self.id
  }

  fn scope(&self) -> Option<&str> {
    Some(&self.folder_id)
  }

  fn kind() -> EntityKind {
    EntityKind::List
  }
}

impl Entity for Task {
  fn id(&self) -> &str {
    &self.id
  }

  fn scope(&self) -> Option<&str> {
    Some(&self.list_id)
  }

  fn kind() -> EntityKind {
    EntityKind::Task
  }
}
