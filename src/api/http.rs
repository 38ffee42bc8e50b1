//! HTTP implementation of the task-service gateway.
//!
//! Authentication is a bearer token supplied by the [`TokenProvider`]
//! collaborator. A 401 response triggers the provider's refresh path and a
//! single retry of the same request; any further failure propagates.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use url::Url;

use crate::api::types::{
  folder_items, group_items, list_items, project_items, task_items, ApiFolder, ApiList, ApiTask,
};
use crate::api::TaskApi;
use crate::auth::TokenProvider;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{
  EntityKind, Folder, FolderDraft, List, ListDraft, Project, Task, TaskDraft,
};

/// Task service client over HTTP.
#[derive(Clone)]
pub struct HttpApi {
  http: reqwest::Client,
  base: Url,
  auth: Arc<dyn TokenProvider>,
}

impl HttpApi {
  pub fn new(config: &Config, auth: Arc<dyn TokenProvider>) -> Result<Self> {
    // A trailing slash makes Url::join treat the base as a directory.
    let mut url = config.api.url.clone();
    if !url.ends_with('/') {
      url.push('/');
    }
    let base =
      Url::parse(&url).map_err(|e| Error::Config(format!("invalid service URL {}: {}", url, e)))?;

    Ok(Self {
      http: reqwest::Client::new(),
      base,
      auth,
    })
  }

  async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<reqwest::Response> {
    let url = self
      .base
      .join(path)
      .map_err(|e| Error::upstream(format!("invalid endpoint {}: {}", path, e)))?;
    let token = self.auth.access_token().ok_or(Error::NotAuthenticated)?;

    let response = self.dispatch(method.clone(), url.clone(), &token, body).await?;
    if response.status() != StatusCode::UNAUTHORIZED {
      return Ok(response);
    }

    tracing::warn!(%path, "service returned 401, refreshing token and retrying once");
    let token = self.auth.refresh_token().await?;
    self.dispatch(method, url, &token, body).await
  }

  async fn dispatch(
    &self,
    method: Method,
    url: Url,
    token: &str,
    body: Option<&Value>,
  ) -> Result<reqwest::Response> {
    let mut request = self.http.request(method, url).bearer_auth(token);
    if let Some(body) = body {
      request = request.json(body);
    }
    Ok(request.send().await?)
  }

  /// Read the response body as JSON, mapping non-2xx statuses to errors.
  async fn expect_json(&self, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(Error::upstream(format!(
        "{}: {}",
        status,
        body.chars().take(200).collect::<String>()
      )));
    }
    Ok(response.json().await?)
  }

  async fn get_payload(&self, path: &str) -> Result<Value> {
    let response = self.send(Method::GET, path, None).await?;
    self.expect_json(response).await
  }

  /// GET a single entity, mapping 404 to `NotFound`.
  async fn get_entity(&self, path: &str, kind: EntityKind, id: &str) -> Result<Value> {
    let response = self.send(Method::GET, path, None).await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Err(Error::NotFound {
        kind,
        id: id.to_string(),
      });
    }
    self.expect_json(response).await
  }

  async fn write(&self, method: Method, path: &str, body: Value) -> Result<Value> {
    let response = self.send(method, path, Some(&body)).await?;
    self.expect_json(response).await
  }

  async fn delete(&self, path: &str) -> Result<()> {
    let response = self.send(Method::DELETE, path, None).await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(Error::upstream(format!(
        "{}: {}",
        status,
        body.chars().take(200).collect::<String>()
      )));
    }
    Ok(())
  }
}

#[async_trait]
impl TaskApi for HttpApi {
  async fn list_projects(&self) -> Result<Vec<Project>> {
    let payload = self.get_payload("team").await?;
    let projects = project_items(payload)?
      .into_iter()
      .map(|p| p.into_project())
      .collect();
    Ok(projects)
  }

  async fn list_folders(&self, project_id: &str) -> Result<Vec<Folder>> {
    // The service nests folders one level below a project-level grouping;
    // fetch the groups and flatten their folders into a single list. The
    // grouping is invisible to the cache and the navigation machine.
    let payload = self.get_payload(&format!("project/{}/space", project_id)).await?;
    let groups = group_items(payload)?;

    let mut folders = Vec::new();
    for group in groups {
      let payload = self.get_payload(&format!("space/{}/folder", group.id)).await?;
      folders.extend(
        folder_items(payload)?
          .into_iter()
          .map(|f| f.into_folder_in(project_id)),
      );
    }
    Ok(folders)
  }

  async fn get_folder(&self, id: &str) -> Result<Folder> {
    let payload = self
      .get_entity(&format!("folder/{}", id), EntityKind::Folder, id)
      .await?;
    let folder: ApiFolder = serde_json::from_value(payload)?;
    folder.try_into_folder()
  }

  async fn create_folder(&self, project_id: &str, draft: &FolderDraft) -> Result<Folder> {
    let payload = self
      .write(
        Method::POST,
        &format!("project/{}/folder", project_id),
        json!({ "name": draft.name, "hidden": draft.hidden }),
      )
      .await?;
    let folder: ApiFolder = serde_json::from_value(payload)?;
    Ok(folder.into_folder_in(project_id))
  }

  async fn update_folder(&self, folder: &Folder) -> Result<Folder> {
    let payload = self
      .write(
        Method::PUT,
        &format!("folder/{}", folder.id),
        json!({ "name": folder.name, "hidden": folder.hidden }),
      )
      .await?;
    let updated: ApiFolder = serde_json::from_value(payload)?;
    Ok(updated.into_folder_in(&folder.project_id))
  }

  async fn delete_folder(&self, id: &str) -> Result<()> {
    self.delete(&format!("folder/{}", id)).await
  }

  async fn list_lists(&self, folder_id: &str) -> Result<Vec<List>> {
    let payload = self.get_payload(&format!("folder/{}/list", folder_id)).await?;
    let lists = list_items(payload)?
      .into_iter()
      .map(|l| l.into_list_in(folder_id, ""))
      .collect();
    Ok(lists)
  }

  async fn get_list(&self, id: &str) -> Result<List> {
    let payload = self
      .get_entity(&format!("list/{}", id), EntityKind::List, id)
      .await?;
    let list: ApiList = serde_json::from_value(payload)?;
    list.try_into_list()
  }

  async fn create_list(
    &self,
    folder_id: &str,
    project_id: &str,
    draft: &ListDraft,
  ) -> Result<List> {
    let payload = self
      .write(
        Method::POST,
        &format!("folder/{}/list", folder_id),
        json!({ "name": draft.name, "content": draft.description }),
      )
      .await?;
    let list: ApiList = serde_json::from_value(payload)?;
    Ok(list.into_list_in(folder_id, project_id))
  }

  async fn update_list(&self, list: &List) -> Result<List> {
    let payload = self
      .write(
        Method::PUT,
        &format!("list/{}", list.id),
        json!({ "name": list.name, "content": list.description }),
      )
      .await?;
    let updated: ApiList = serde_json::from_value(payload)?;
    Ok(updated.into_list_in(&list.folder_id, &list.project_id))
  }

  async fn delete_list(&self, id: &str) -> Result<()> {
    self.delete(&format!("list/{}", id)).await
  }

  async fn list_tasks(&self, list_id: &str) -> Result<Vec<Task>> {
    let payload = self.get_payload(&format!("list/{}/task", list_id)).await?;
    let tasks = task_items(payload)?
      .into_iter()
      .map(|t| t.into_task_in(list_id))
      .collect();
    Ok(tasks)
  }

  async fn get_task(&self, id: &str) -> Result<Task> {
    let payload = self
      .get_entity(&format!("task/{}", id), EntityKind::Task, id)
      .await?;
    let task: ApiTask = serde_json::from_value(payload)?;
    task.try_into_task()
  }

  async fn create_task(&self, list_id: &str, draft: &TaskDraft) -> Result<Task> {
    let payload = self
      .write(
        Method::POST,
        &format!("list/{}/task", list_id),
        json!({
          "name": draft.name,
          "content": draft.description,
          "priority": draft.priority.as_ref().map(|p| p.label.clone()),
          "due_date": draft.due_date,
        }),
      )
      .await?;
    let task: ApiTask = serde_json::from_value(payload)?;
    Ok(task.into_task_in(list_id))
  }

  async fn update_task(&self, task: &Task) -> Result<Task> {
    let payload = self
      .write(
        Method::PUT,
        &format!("task/{}", task.id),
        json!({
          "name": task.name,
          "content": task.description,
          "status": task.status,
          "due_date": task.due_date,
        }),
      )
      .await?;
    let updated: ApiTask = serde_json::from_value(payload)?;
    Ok(updated.into_task_in(&task.list_id))
  }

  async fn delete_task(&self, id: &str) -> Result<()> {
    self.delete(&format!("task/{}", id)).await
  }
}
