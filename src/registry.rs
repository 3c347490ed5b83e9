//! Output naming and registry
//!
//! Every artifact gets a fresh `{prefix}_{token}.{ext}` name under the
//! output root. Lookups go by bare name only and never leave the root.
//! Also home to the per-plan scratch workspace and the guard that removes
//! outputs of a plan that did not finish.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{KiruError, Result};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A file produced by a plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub name: String,
    pub path: PathBuf,
}

pub struct OutputRegistry {
    root: PathBuf,
    extension: String,
}

impl OutputRegistry {
    pub fn new<P: AsRef<Path>>(root: P, extension: &str) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            extension: extension.trim_start_matches('.').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a name that no artifact in the root uses yet.
    pub fn allocate(&self, prefix: &str) -> OutputArtifact {
        loop {
            let token = format!(
                "{}-{:04}",
                Utc::now().timestamp_millis(),
                SEQUENCE.fetch_add(1, Ordering::Relaxed)
            );
            let name = format!("{}_{}.{}", prefix, token, self.extension);
            let path = self.root.join(&name);
            if !path.exists() {
                return OutputArtifact { name, path };
            }
            debug!("Output name {} already taken, drawing another", name);
        }
    }

    /// Find an artifact by name.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let not_found = || KiruError::NotFound(format!("artifact not found: {}", name));

        if !is_plain_name(name) {
            return Err(not_found());
        }

        let path = self.root.join(name);
        if !path.is_file() {
            return Err(not_found());
        }

        // Symlinks inside the root must not lead out of it.
        let root = std::fs::canonicalize(&self.root).map_err(|_| not_found())?;
        let resolved = std::fs::canonicalize(&path).map_err(|_| not_found())?;
        if !resolved.starts_with(&root) {
            warn!("Refusing artifact {} resolving outside the output root", name);
            return Err(not_found());
        }

        Ok(resolved)
    }

    /// All artifacts currently in the root, sorted by name.
    pub async fn list(&self) -> Result<Vec<OutputArtifact>> {
        let mut artifacts = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if is_plain_name(&name) {
                artifacts.push(OutputArtifact { name, path: entry.path() });
            }
        }

        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(artifacts)
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        && matches!(Path::new(name).components().collect::<Vec<_>>().as_slice(), [Component::Normal(_)])
}

/// Scratch directory private to one plan, removed when dropped.
pub struct PlanWorkspace {
    id: Uuid,
    dir: TempDir,
}

impl PlanWorkspace {
    pub fn create<P: AsRef<Path>>(scratch_root: P) -> Result<Self> {
        let scratch_root = scratch_root.as_ref();
        std::fs::create_dir_all(scratch_root)?;

        let id = Uuid::new_v4();
        let dir = tempfile::Builder::new()
            .prefix(&format!("plan-{}-", id))
            .tempdir_in(scratch_root)?;
        debug!("Created plan workspace {}", dir.path().display());

        Ok(Self { id, dir })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Outputs written by an unfinished plan; deleted on drop unless committed.
#[derive(Default)]
pub struct PartialOutputs {
    paths: Vec<PathBuf>,
    committed: bool,
}

impl PartialOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a path before the step that writes it starts.
    pub fn track(&mut self, path: &Path) {
        self.paths.push(path.to_path_buf());
    }

    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PartialOutputs {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Discarded partial output {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to discard partial output {}: {}", path.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_allocated_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let registry = OutputRegistry::new(dir.path(), "mp4").unwrap();

        let names: HashSet<String> = (0..200).map(|_| registry.allocate("cut").name).collect();
        assert_eq!(names.len(), 200);
        assert!(names.iter().all(|n| n.starts_with("cut_") && n.ends_with(".mp4")));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("output");
        let registry = OutputRegistry::new(&root, "mp4").unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        for name in ["../secret.txt", "..", "/etc/passwd", "a/b.mp4", ".hidden", "", "..\\secret.txt"] {
            assert!(
                matches!(registry.resolve(name), Err(KiruError::NotFound(_))),
                "{} should not resolve",
                name
            );
        }
    }

    #[test]
    fn test_resolve_existing_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = OutputRegistry::new(dir.path(), "mp4").unwrap();
        let artifact = registry.allocate("muted");
        std::fs::write(&artifact.path, b"video").unwrap();

        let resolved = registry.resolve(&artifact.name).unwrap();
        assert_eq!(std::fs::read(resolved).unwrap(), b"video");
        assert!(matches!(registry.resolve("muted_0.mp4"), Err(KiruError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_out_of_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("output");
        let registry = OutputRegistry::new(&root, "mp4").unwrap();
        let outside = dir.path().join("outside.mp4");
        std::fs::write(&outside, b"x").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link.mp4")).unwrap();

        assert!(matches!(registry.resolve("link.mp4"), Err(KiruError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let registry = OutputRegistry::new(dir.path(), "mp4").unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let names: Vec<String> = registry.list().await.unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, ["a.mp4", "b.mp4"]);
    }

    #[test]
    fn test_partial_outputs_removed_unless_committed() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.mp4");
        let dropped = dir.path().join("dropped.mp4");
        std::fs::write(&kept, b"").unwrap();
        std::fs::write(&dropped, b"").unwrap();

        let mut guard = PartialOutputs::new();
        guard.track(&kept);
        guard.commit();
        assert!(kept.exists());

        let mut guard = PartialOutputs::new();
        guard.track(&dropped);
        guard.track(&dir.path().join("never-written.mp4"));
        drop(guard);
        assert!(!dropped.exists());
    }

    #[test]
    fn test_workspaces_are_distinct_and_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let first = PlanWorkspace::create(dir.path()).unwrap();
        let second = PlanWorkspace::create(dir.path()).unwrap();
        assert_ne!(first.path(), second.path());
        assert_ne!(first.id(), second.id());

        let path = first.path().to_path_buf();
        drop(first);
        assert!(!path.exists());
    }
}
