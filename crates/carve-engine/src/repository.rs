//! Persistence port for generated machines and contexts.
//!
//! An artifact is created empty, filled with [`ModelRepository::write`] and
//! becomes visible to [`ModelRepository::open`] once saved.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use carve_model::context::Context;
use carve_model::machine::Machine;

use crate::errors::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Machine,
    Context,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Machine => "machine",
            ArtifactKind::Context => "context",
        }
    }
}

/// Whether `name` can name a project or an artifact: non-empty, not `.` or
/// `..`, and free of path separators and control characters.
pub fn is_valid_artifact_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control())
}

/// Where an artifact lives: a project and a name unique within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactLocation {
    pub project: String,
    pub name: String,
}

impl ArtifactLocation {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactHandle {
    pub kind: ArtifactKind,
    pub location: ArtifactLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    Machine(Machine),
    Context(Context),
}

impl Artifact {
    /// A fresh artifact of `kind` with no children.
    pub fn empty(kind: ArtifactKind, name: &str) -> Self {
        match kind {
            ArtifactKind::Machine => Artifact::Machine(Machine::new(name)),
            ArtifactKind::Context => Artifact::Context(Context::new(name)),
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Machine(_) => ArtifactKind::Machine,
            Artifact::Context(_) => ArtifactKind::Context,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Artifact::Machine(m) => &m.name,
            Artifact::Context(c) => &c.name,
        }
    }

    fn renamed(mut self, name: &str) -> Self {
        match &mut self {
            Artifact::Machine(m) => m.name = name.to_string(),
            Artifact::Context(c) => c.name = name.to_string(),
        }
        self
    }
}

pub trait ModelRepository {
    /// Create a fresh artifact with no children, replacing any existing one
    /// at `location`.
    fn create_artifact(
        &mut self,
        kind: ArtifactKind,
        location: ArtifactLocation,
    ) -> Result<ArtifactHandle, RepositoryError>;

    /// Read a saved artifact.
    fn open(&self, location: &ArtifactLocation) -> Result<Artifact, RepositoryError>;

    /// Replace the content of a created, unsaved artifact.
    fn write(&mut self, handle: &ArtifactHandle, artifact: Artifact) -> Result<(), RepositoryError>;

    fn save(&mut self, handle: &ArtifactHandle) -> Result<(), RepositoryError>;

    /// Copy a saved artifact into `destination_project` under the same name.
    /// The copy is saved.
    fn copy(
        &mut self,
        handle: &ArtifactHandle,
        destination_project: &str,
    ) -> Result<ArtifactHandle, RepositoryError> {
        let artifact = self.open(&handle.location)?;
        check_kind(handle, &artifact)?;
        let target = self.create_artifact(
            handle.kind,
            ArtifactLocation::new(destination_project, handle.location.name.clone()),
        )?;
        self.write(&target, artifact)?;
        self.save(&target)?;
        Ok(target)
    }
}

fn check_kind(handle: &ArtifactHandle, artifact: &Artifact) -> Result<(), RepositoryError> {
    if artifact.kind() == handle.kind {
        Ok(())
    } else {
        Err(RepositoryError::WrongKind {
            name: handle.location.to_string(),
            expected: handle.kind.as_str(),
            found: artifact.kind().as_str(),
        })
    }
}

fn pending_slot<'a>(
    pending: &'a mut IndexMap<ArtifactHandle, Artifact>,
    handle: &ArtifactHandle,
) -> Result<&'a mut Artifact, RepositoryError> {
    pending
        .get_mut(handle)
        .ok_or_else(|| RepositoryError::NotCreated(handle.location.to_string()))
}

/// Keeps every artifact in memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    pending: IndexMap<ArtifactHandle, Artifact>,
    saved: IndexMap<ArtifactLocation, Artifact>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved artifacts in the order they were first saved.
    pub fn saved(&self) -> impl Iterator<Item = (&ArtifactLocation, &Artifact)> {
        self.saved.iter()
    }

    pub fn machine(&self, project: &str, name: &str) -> Option<&Machine> {
        match self.saved.get(&ArtifactLocation::new(project, name)) {
            Some(Artifact::Machine(m)) => Some(m),
            _ => None,
        }
    }

    pub fn context(&self, project: &str, name: &str) -> Option<&Context> {
        match self.saved.get(&ArtifactLocation::new(project, name)) {
            Some(Artifact::Context(c)) => Some(c),
            _ => None,
        }
    }

    pub fn is_pending(&self, handle: &ArtifactHandle) -> bool {
        self.pending.contains_key(handle)
    }
}

impl ModelRepository for InMemoryRepository {
    fn create_artifact(
        &mut self,
        kind: ArtifactKind,
        location: ArtifactLocation,
    ) -> Result<ArtifactHandle, RepositoryError> {
        self.saved.shift_remove(&location);
        let artifact = Artifact::empty(kind, &location.name);
        let handle = ArtifactHandle { kind, location };
        self.pending.insert(handle.clone(), artifact);
        Ok(handle)
    }

    fn open(&self, location: &ArtifactLocation) -> Result<Artifact, RepositoryError> {
        self.saved
            .get(location)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(location.to_string()))
    }

    fn write(&mut self, handle: &ArtifactHandle, artifact: Artifact) -> Result<(), RepositoryError> {
        check_kind(handle, &artifact)?;
        *pending_slot(&mut self.pending, handle)? = artifact.renamed(&handle.location.name);
        Ok(())
    }

    fn save(&mut self, handle: &ArtifactHandle) -> Result<(), RepositoryError> {
        let artifact = self
            .pending
            .shift_remove(handle)
            .ok_or_else(|| RepositoryError::NotCreated(handle.location.to_string()))?;
        self.saved.insert(handle.location.clone(), artifact);
        Ok(())
    }
}

/// Stores saved artifacts as pretty-printed JSON under a root directory:
/// `<root>/<project>/<name>.machine.json` or `.context.json`.
#[derive(Debug)]
pub struct DirectoryRepository {
    root: PathBuf,
    pending: IndexMap<ArtifactHandle, Artifact>,
}

impl DirectoryRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pending: IndexMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<project>/<name>.<kind>.json`. Names that could leave the
    /// root are refused.
    pub fn path_for(
        &self,
        kind: ArtifactKind,
        location: &ArtifactLocation,
    ) -> Result<PathBuf, RepositoryError> {
        for part in [&location.project, &location.name] {
            if !is_valid_artifact_name(part) {
                return Err(RepositoryError::InvalidName(part.clone()));
            }
        }
        Ok(self
            .root
            .join(&location.project)
            .join(format!("{}.{}.json", location.name, kind.as_str())))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> RepositoryError {
    let path = path.to_path_buf();
    move |source| RepositoryError::Io { path, source }
}

impl ModelRepository for DirectoryRepository {
    fn create_artifact(
        &mut self,
        kind: ArtifactKind,
        location: ArtifactLocation,
    ) -> Result<ArtifactHandle, RepositoryError> {
        let path = self.path_for(kind, &location)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&path)(e)),
        }
        let artifact = Artifact::empty(kind, &location.name);
        let handle = ArtifactHandle { kind, location };
        self.pending.insert(handle.clone(), artifact);
        Ok(handle)
    }

    fn open(&self, location: &ArtifactLocation) -> Result<Artifact, RepositoryError> {
        let path = [
            self.path_for(ArtifactKind::Machine, location)?,
            self.path_for(ArtifactKind::Context, location)?,
        ]
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| RepositoryError::NotFound(location.to_string()))?;
        let raw = fs::read_to_string(&path).map_err(io_error(&path))?;
        serde_json::from_str(&raw).map_err(|source| RepositoryError::Json { path, source })
    }

    fn write(&mut self, handle: &ArtifactHandle, artifact: Artifact) -> Result<(), RepositoryError> {
        check_kind(handle, &artifact)?;
        *pending_slot(&mut self.pending, handle)? = artifact.renamed(&handle.location.name);
        Ok(())
    }

    fn save(&mut self, handle: &ArtifactHandle) -> Result<(), RepositoryError> {
        let artifact = self
            .pending
            .get(handle)
            .ok_or_else(|| RepositoryError::NotCreated(handle.location.to_string()))?;
        let path = self.path_for(handle.kind, &handle.location)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_error(dir))?;
        }
        let json = serde_json::to_string_pretty(artifact).map_err(|source| RepositoryError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(io_error(&path))?;
        self.pending.shift_remove(handle);
        Ok(())
    }
}
