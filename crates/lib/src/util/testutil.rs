//! Test utilities for stratus-lib.
//!
//! Helpers that lay out throwaway projects on disk, plus in-memory stand-ins
//! for the remote services.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::consts::DIGEST_METADATA_KEY;
use crate::execute::{ApplyError, Clock, StackApi, StackDescription, StackRequest, StackStatus, UpdateOutcome};
use crate::package::{ObjectStore, PackageError, RemoteObject};

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
  let path = root.join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

/// A minimal project with one python function under `hello/`.
pub fn hello_project(root: &Path) {
  write_file(
    root,
    "settings.yml",
    r#"
project: demo
default-region: eu-west-1
lambdas:
  hello:
    code: hello
    handler: main.handler
"#,
  );
  write_file(root, "hello/main.py", "def handler(event, context):\n    return event\n");
}

/// In-memory [`ObjectStore`] with versioned objects and call counters.
#[derive(Default)]
pub struct MemoryStore {
  state: Mutex<MemoryStoreState>,
}

#[derive(Default)]
struct MemoryStoreState {
  objects: HashMap<(String, String), (RemoteObject, Vec<u8>)>,
  next_version: u32,
  puts: usize,
  heads: usize,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Pretend `bucket/key` was uploaded earlier with `digest` as `version`.
  pub fn seed(&self, bucket: &str, key: &str, digest: &str, version: &str) {
    let object = RemoteObject {
      metadata: HashMap::from([(DIGEST_METADATA_KEY.to_string(), digest.to_string())]),
      version_id: Some(version.to_string()),
    };
    let mut state = self.state.lock().unwrap();
    state.objects.insert((bucket.to_string(), key.to_string()), (object, Vec::new()));
  }

  pub fn puts(&self) -> usize {
    self.state.lock().unwrap().puts
  }

  pub fn heads(&self) -> usize {
    self.state.lock().unwrap().heads
  }

  /// Bytes of the last upload of `bucket/key`.
  pub fn bytes(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
    let state = self.state.lock().unwrap();
    state
      .objects
      .get(&(bucket.to_string(), key.to_string()))
      .map(|(_, bytes)| bytes.clone())
  }
}

#[async_trait]
impl ObjectStore for MemoryStore {
  async fn head(&self, bucket: &str, key: &str) -> Result<Option<RemoteObject>, PackageError> {
    let mut state = self.state.lock().unwrap();
    state.heads += 1;
    Ok(
      state
        .objects
        .get(&(bucket.to_string(), key.to_string()))
        .map(|(object, _)| object.clone()),
    )
  }

  async fn put(
    &self,
    bucket: &str,
    key: &str,
    path: &Path,
    metadata: HashMap<String, String>,
  ) -> Result<Option<String>, PackageError> {
    let bytes = fs::read(path).map_err(|e| PackageError::io(path, e))?;
    let mut state = self.state.lock().unwrap();
    state.puts += 1;
    state.next_version += 1;
    let version_id = format!("v{}", state.next_version);
    let object = RemoteObject {
      metadata,
      version_id: Some(version_id.clone()),
    };
    state.objects.insert((bucket.to_string(), key.to_string()), (object, bytes));
    Ok(Some(version_id))
  }
}

/// Scripted [`StackApi`].
///
/// Each stack has a queue of statuses; `describe` pops one per call and keeps
/// returning the last. Every call is recorded as `"<operation> <stack>"`.
#[derive(Default)]
pub struct FakeStackApi {
  state: Mutex<FakeStacks>,
}

#[derive(Default)]
struct FakeStacks {
  scripts: HashMap<String, VecDeque<StackStatus>>,
  outputs: HashMap<String, BTreeMap<String, String>>,
  after_create: HashMap<String, Vec<StackStatus>>,
  after_delete: HashMap<String, Vec<StackStatus>>,
  unchanged: HashSet<String>,
  calls: Vec<String>,
  requests: Vec<StackRequest>,
}

impl FakeStackApi {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make `name` exist, walking through `statuses`.
  pub fn script(&self, name: &str, statuses: &[StackStatus]) {
    let mut state = self.state.lock().unwrap();
    state.scripts.insert(name.to_string(), statuses.iter().cloned().collect());
  }

  /// Outputs reported for `name`.
  pub fn set_outputs(&self, name: &str, outputs: &[(&str, &str)]) {
    let mut state = self.state.lock().unwrap();
    state.outputs.insert(
      name.to_string(),
      outputs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    );
  }

  /// Statuses `name` walks through once created.
  pub fn after_create(&self, name: &str, statuses: &[StackStatus]) {
    let mut state = self.state.lock().unwrap();
    state.after_create.insert(name.to_string(), statuses.to_vec());
  }

  /// Statuses `name` walks through once a delete is accepted. An empty list
  /// makes the stack disappear right away.
  pub fn after_delete(&self, name: &str, statuses: &[StackStatus]) {
    let mut state = self.state.lock().unwrap();
    state.after_delete.insert(name.to_string(), statuses.to_vec());
  }

  /// Updates of `name` report that there is nothing to do.
  pub fn no_changes(&self, name: &str) {
    self.state.lock().unwrap().unchanged.insert(name.to_string());
  }

  pub fn calls(&self) -> Vec<String> {
    self.state.lock().unwrap().calls.clone()
  }

  /// Calls other than `describe`.
  pub fn mutations(&self) -> Vec<String> {
    self
      .calls()
      .into_iter()
      .filter(|call| !call.starts_with("describe "))
      .collect()
  }

  pub fn requests(&self) -> Vec<StackRequest> {
    self.state.lock().unwrap().requests.clone()
  }
}

#[async_trait]
impl StackApi for FakeStackApi {
  async fn describe(&self, name: &str) -> Result<Option<StackDescription>, ApplyError> {
    let mut state = self.state.lock().unwrap();
    state.calls.push(format!("describe {name}"));
    let outputs = state.outputs.get(name).cloned().unwrap_or_default();
    let Some(script) = state.scripts.get_mut(name) else {
      return Ok(None);
    };
    let status = if script.len() > 1 {
      script.pop_front()
    } else {
      script.front().cloned()
    };
    Ok(status.map(|status| StackDescription {
      name: name.to_string(),
      status,
      status_reason: None,
      outputs,
    }))
  }

  async fn create(&self, request: &StackRequest) -> Result<(), ApplyError> {
    let mut state = self.state.lock().unwrap();
    state.calls.push(format!("create {}", request.name));
    state.requests.push(request.clone());
    let script = state
      .after_create
      .remove(&request.name)
      .unwrap_or_else(|| vec![StackStatus::CreateInProgress, StackStatus::CreateComplete]);
    state.scripts.insert(request.name.clone(), script.into());
    Ok(())
  }

  async fn update(&self, request: &StackRequest) -> Result<UpdateOutcome, ApplyError> {
    let mut state = self.state.lock().unwrap();
    state.calls.push(format!("update {}", request.name));
    state.requests.push(request.clone());
    if state.unchanged.contains(&request.name) {
      return Ok(UpdateOutcome::NoChanges);
    }
    state.scripts.insert(
      request.name.clone(),
      VecDeque::from([StackStatus::UpdateInProgress, StackStatus::UpdateComplete]),
    );
    Ok(UpdateOutcome::Updated)
  }

  async fn delete(&self, name: &str) -> Result<(), ApplyError> {
    let mut state = self.state.lock().unwrap();
    state.calls.push(format!("delete {name}"));
    let script = state
      .after_delete
      .remove(name)
      .unwrap_or_else(|| vec![StackStatus::DeleteInProgress, StackStatus::DeleteComplete]);
    if script.is_empty() {
      state.scripts.remove(name);
    } else {
      state.scripts.insert(name.to_string(), script.into());
    }
    Ok(())
  }
}

/// Clock whose `sleep` advances time instantly.
#[derive(Default)]
pub struct FakeClock {
  elapsed: Mutex<Duration>,
}

impl FakeClock {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Clock for FakeClock {
  fn now(&self) -> Duration {
    *self.elapsed.lock().unwrap()
  }

  async fn sleep(&self, duration: Duration) {
    *self.elapsed.lock().unwrap() += duration;
  }
}
