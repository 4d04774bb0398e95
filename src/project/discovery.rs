use super::config::{PROJECT_FILE_NAME, ProjectConfig};
use super::Project;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Maps a path to the project that owns it.
pub trait ProjectDiscovery: Send + Sync {
    fn get_project(&self, path: &Path) -> Option<Arc<Project>>;

    /// True if a change to `path` may change project definitions.
    fn is_project_file(&self, path: &Path) -> bool;

    /// Forget cached projects so the next lookup re-reads definitions.
    fn invalidate(&self);
}

/// Discovers projects by looking for a `codesnap.project` file, or a `.git`
/// directory, in `path` or any of its ancestors.
#[derive(Default)]
pub struct FileProjectDiscovery {
    projects: RwLock<FxHashMap<PathBuf, Arc<Project>>>,
}

impl FileProjectDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    fn load_project(root: &Path, project_file: Option<&Path>) -> Option<Arc<Project>> {
        let config = match project_file {
            Some(file) => match fs::read_to_string(file) {
                Ok(text) => ProjectConfig::parse(&text),
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "cannot read project file, using defaults");
                    ProjectConfig::default()
                }
            },
            None => ProjectConfig::default(),
        };
        match Project::from_config(root, &config) {
            Ok(project) => Some(Arc::new(project)),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "invalid project rules");
                None
            }
        }
    }
}

impl ProjectDiscovery for FileProjectDiscovery {
    fn get_project(&self, path: &Path) -> Option<Arc<Project>> {
        {
            let projects = self.projects.read();
            for ancestor in path.ancestors() {
                if let Some(project) = projects.get(ancestor) {
                    return Some(Arc::clone(project));
                }
            }
        }

        for ancestor in path.ancestors() {
            let project_file = ancestor.join(PROJECT_FILE_NAME);
            let found = if project_file.is_file() {
                Some(Self::load_project(ancestor, Some(&project_file)))
            } else if ancestor.join(".git").exists() {
                Some(Self::load_project(ancestor, None))
            } else {
                None
            };

            if let Some(project) = found {
                let project = project?;
                debug!(root = %ancestor.display(), "discovered project");
                let mut projects = self.projects.write();
                let entry = projects
                    .entry(ancestor.to_path_buf())
                    .or_insert_with(|| Arc::clone(&project));
                return Some(Arc::clone(entry));
            }
        }
        None
    }

    fn is_project_file(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| name == PROJECT_FILE_NAME)
            .unwrap_or(false)
    }

    fn invalidate(&self) {
        self.projects.write().clear();
    }
}
