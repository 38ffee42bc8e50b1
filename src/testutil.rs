//! Shared test fixtures: a scripted in-memory task service, a manual clock
//! and entity constructors for the P1 → F1 → L1 → T1 hierarchy.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::api::TaskApi;
use crate::cache::Clock;
use crate::error::{Error, Result};
use crate::types::{
  EntityKind, Folder, FolderDraft, List, ListDraft, Project, Task, TaskDraft,
};

/// Clock whose time only moves when a test advances it.
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self {
      now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
    }
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap();
    *now += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}

pub fn project(id: &str) -> Project {
  Project {
    id: id.to_string(),
    name: format!("{} name", id),
    description: "Members: 0".to_string(),
    members: Vec::new(),
    color: None,
  }
}

pub fn folder(id: &str, project_id: &str) -> Folder {
  Folder {
    id: id.to_string(),
    name: format!("{} name", id),
    description: String::new(),
    project_id: project_id.to_string(),
    hidden: false,
  }
}

pub fn list(id: &str, folder_id: &str, project_id: &str) -> List {
  List {
    id: id.to_string(),
    name: format!("{} name", id),
    description: String::new(),
    folder_id: folder_id.to_string(),
    project_id: project_id.to_string(),
    status: None,
  }
}

pub fn task(id: &str, list_id: &str) -> Task {
  Task {
    id: id.to_string(),
    name: format!("{} name", id),
    description: String::new(),
    list_id: list_id.to_string(),
    status: "open".to_string(),
    priority: None,
    due_date: None,
  }
}

#[derive(Default)]
struct FakeData {
  projects: Vec<Project>,
  folders: Vec<Folder>,
  lists: Vec<List>,
  tasks: Vec<Task>,
  failing: HashSet<EntityKind>,
  calls: HashMap<&'static str, u32>,
  next_id: u32,
}

/// Scripted in-memory task service. Failures can be injected per entity
/// kind, and every call is counted so tests can assert on network traffic.
pub struct FakeApi {
  data: Mutex<FakeData>,
}

impl FakeApi {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      data: Mutex::new(FakeData::default()),
    })
  }

  /// A service seeded with P1 → F1 → {L1 → T1, L2 → T2} plus an empty
  /// second project P2.
  pub fn with_fixture() -> Arc<Self> {
    let api = Self::new();
    {
      let mut data = api.data.lock().unwrap();
      data.projects = vec![project("P1"), project("P2")];
      data.folders = vec![folder("F1", "P1"), folder("F2", "P1")];
      data.lists = vec![list("L1", "F1", "P1"), list("L2", "F1", "P1")];
      data.tasks = vec![task("T1", "L1"), task("T2", "L2")];
    }
    api
  }

  /// Make every call touching the given entity kind fail until cleared.
  pub fn fail_kind(&self, kind: EntityKind) {
    self.data.lock().unwrap().failing.insert(kind);
  }

  pub fn clear_failures(&self) {
    self.data.lock().unwrap().failing.clear();
  }

  /// Number of times the named operation was invoked.
  pub fn calls(&self, name: &str) -> u32 {
    *self.data.lock().unwrap().calls.get(name).unwrap_or(&0)
  }

  /// Blank out the denormalized project id on all lists, mimicking the
  /// folder-scoped endpoint omitting it.
  pub fn strip_list_project_ids(&self) {
    let mut data = self.data.lock().unwrap();
    for list in &mut data.lists {
      list.project_id = String::new();
    }
  }

  fn enter(&self, name: &'static str, kind: EntityKind) -> Result<()> {
    let mut data = self.data.lock().unwrap();
    *data.calls.entry(name).or_insert(0) += 1;
    if data.failing.contains(&kind) {
      return Err(Error::upstream(format!("scripted failure: {}", name)));
    }
    Ok(())
  }

  fn fresh_id(&self, prefix: &str) -> String {
    let mut data = self.data.lock().unwrap();
    data.next_id += 1;
    format!("{}-{}", prefix, data.next_id)
  }
}

#[async_trait]
impl TaskApi for FakeApi {
  async fn list_projects(&self) -> Result<Vec<Project>> {
    self.enter("list_projects", EntityKind::Project)?;
    Ok(self.data.lock().unwrap().projects.clone())
  }

  async fn list_folders(&self, project_id: &str) -> Result<Vec<Folder>> {
    self.enter("list_folders", EntityKind::Folder)?;
    let data = self.data.lock().unwrap();
    Ok(
      data
        .folders
        .iter()
        .filter(|f| f.project_id == project_id)
        .cloned()
        .collect(),
    )
  }

  async fn get_folder(&self, id: &str) -> Result<Folder> {
    self.enter("get_folder", EntityKind::Folder)?;
    let data = self.data.lock().unwrap();
    data
      .folders
      .iter()
      .find(|f| f.id == id)
      .cloned()
      .ok_or_else(|| Error::NotFound {
        kind: EntityKind::Folder,
        id: id.to_string(),
      })
  }

  async fn create_folder(&self, project_id: &str, draft: &FolderDraft) -> Result<Folder> {
    self.enter("create_folder", EntityKind::Folder)?;
    let created = Folder {
      id: self.fresh_id("folder"),
      name: draft.name.clone(),
      description: String::new(),
      project_id: project_id.to_string(),
      hidden: draft.hidden,
    };
    self.data.lock().unwrap().folders.push(created.clone());
    Ok(created)
  }

  async fn update_folder(&self, folder: &Folder) -> Result<Folder> {
    self.enter("update_folder", EntityKind::Folder)?;
    let mut data = self.data.lock().unwrap();
    for existing in &mut data.folders {
      if existing.id == folder.id {
        *existing = folder.clone();
        return Ok(folder.clone());
      }
    }
    Err(Error::NotFound {
      kind: EntityKind::Folder,
      id: folder.id.clone(),
    })
  }

  async fn delete_folder(&self, id: &str) -> Result<()> {
    self.enter("delete_folder", EntityKind::Folder)?;
    self.data.lock().unwrap().folders.retain(|f| f.id != id);
    Ok(())
  }

  async fn list_lists(&self, folder_id: &str) -> Result<Vec<List>> {
    self.enter("list_lists", EntityKind::List)?;
    let data = self.data.lock().unwrap();
    Ok(
      data
        .lists
        .iter()
        .filter(|l| l.folder_id == folder_id)
        .cloned()
        .collect(),
    )
  }

  async fn get_list(&self, id: &str) -> Result<List> {
    self.enter("get_list", EntityKind::List)?;
    let data = self.data.lock().unwrap();
    data
      .lists
      .iter()
      .find(|l| l.id == id)
      .cloned()
      .ok_or_else(|| Error::NotFound {
        kind: EntityKind::List,
        id: id.to_string(),
      })
  }

  async fn create_list(
    &self,
    folder_id: &str,
    project_id: &str,
    draft: &ListDraft,
  ) -> Result<List> {
    self.enter("create_list", EntityKind::List)?;
    let created = List {
      id: self.fresh_id("list"),
      name: draft.name.clone(),
      description: draft.description.clone(),
      folder_id: folder_id.to_string(),
      project_id: project_id.to_string(),
      status: None,
    };
    self.data.lock().unwrap().lists.push(created.clone());
    Ok(created)
  }

  async fn update_list(&self, list: &List) -> Result<List> {
    self.enter("update_list", EntityKind::List)?;
    let mut data = self.data.lock().unwrap();
    for existing in &mut data.lists {
      if existing.id == list.id {
        *existing = list.clone();
        return Ok(list.clone());
      }
    }
    Err(Error::NotFound {
      kind: EntityKind::List,
      id: list.id.clone(),
    })
  }

  async fn delete_list(&self, id: &str) -> Result<()> {
    self.enter("delete_list", EntityKind::List)?;
    self.data.lock().unwrap().lists.retain(|l| l.id != id);
    Ok(())
  }

  async fn list_tasks(&self, list_id: &str) -> Result<Vec<Task>> {
    self.enter("list_tasks", EntityKind::Task)?;
    let data = self.data.lock().unwrap();
    Ok(
      data
        .tasks
        .iter()
        .filter(|t| t.list_id == list_id)
        .cloned()
        .collect(),
    )
  }

  async fn get_task(&self, id: &str) -> Result<Task> {
    self.enter("get_task", EntityKind::Task)?;
    let data = self.data.lock().unwrap();
    data
      .tasks
      .iter()
      .find(|t| t.id == id)
      .cloned()
      .ok_or_else(|| Error::NotFound {
        kind: EntityKind::Task,
        id: id.to_string(),
      })
  }

  async fn create_task(&self, list_id: &str, draft: &TaskDraft) -> Result<Task> {
    self.enter("create_task", EntityKind::Task)?;
    let created = Task {
      id: self.fresh_id("task"),
      name: draft.name.clone(),
      description: draft.description.clone(),
      list_id: list_id.to_string(),
      status: "open".to_string(),
      priority: draft.priority.clone(),
      due_date: draft.due_date,
    };
    self.data.lock().unwrap().tasks.push(created.clone());
    Ok(created)
  }

  async fn update_task(&self, task: &Task) -> Result<Task> {
    self.enter("update_task", EntityKind::Task)?;
    let mut data = self.data.lock().unwrap();
    for existing in &mut data.tasks {
      if existing.id == task.id {
        *existing = task.clone();
        return Ok(task.clone());
      }
    }
    Err(Error::NotFound {
      kind: EntityKind::Task,
      id: task.id.clone(),
    })
  }

  async fn delete_task(&self, id: &str) -> Result<()> {
    self.enter("delete_task", EntityKind::Task)?;
    self.data.lock().unwrap().tasks.retain(|t| t.id != id);
    Ok(())
  }
}
