//! Project registry
//!
//! Immutable lookup table of projects, built once at startup from the
//! `projects:` list of a YAML file and shared read-only by every handler.

use serde::Deserialize;
use shipyard_core::domain::Project;
use shipyard_core::domain::target::{DeploymentTarget, is_project_id};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Longest project id accepted; leaves room for `-{type}-{target}`
pub const MAX_PROJECT_ID_LEN: usize = 40;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid project file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("duplicate project id '{0}'")]
    Duplicate(String),

    #[error("invalid project '{id}': {reason}")]
    Invalid { id: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct ProjectsFile {
    #[serde(default)]
    projects: Vec<Project>,
}

/// All configured projects, keyed by id
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: HashMap<String, Project>,
}

impl ProjectRegistry {
    /// Loads the registry from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, RegistryError> {
        let file: ProjectsFile = serde_yaml::from_str(raw)?;
        Self::from_projects(file.projects)
    }

    /// Builds the registry, rejecting projects that could never be deployed
    pub fn from_projects(projects: Vec<Project>) -> Result<Self, RegistryError> {
        let mut map = HashMap::with_capacity(projects.len());

        for project in projects {
            validate(&project)?;
            if map.contains_key(&project.id) {
                return Err(RegistryError::Duplicate(project.id));
            }
            map.insert(project.id.clone(), project);
        }

        Ok(Self { projects: map })
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.get(id)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

fn validate(project: &Project) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::Invalid {
        id: project.id.clone(),
        reason,
    };

    if !is_project_id(&project.id, MAX_PROJECT_ID_LEN) {
        return Err(invalid(format!(
            "id must be lowercase alphanumerics and '-', at most {} characters, \
             without '-branch'/'-tag' segments",
            MAX_PROJECT_ID_LEN
        )));
    }

    if project.channel.is_empty() {
        return Err(invalid("channel cannot be empty".to_string()));
    }

    DeploymentTarget::production(project).map_err(|e| invalid(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECTS: &str = r#"
projects:
  - id: web
    name: Web Frontend
    url: https://web.example.com
    channel: C0WEB
    qa: [UQA1, UQA2]
    owners: [UOWN1]
  - id: api
    name: API
    url: https://api.example.com
    channel: C0API
"#;

    #[test]
    fn test_load_from_yaml() {
        let registry = ProjectRegistry::from_yaml_str(PROJECTS).unwrap();

        assert_eq!(registry.len(), 2);
        let web = registry.get("web").unwrap();
        assert_eq!(web.name, "Web Frontend");
        assert_eq!(web.qa, vec!["UQA1", "UQA2"]);
        assert_eq!(web.owners, vec!["UOWN1"]);

        let api = registry.get("api").unwrap();
        assert!(api.qa.is_empty());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, PROJECTS).unwrap();

        let registry = ProjectRegistry::load(&path).unwrap();
        assert_eq!(registry.len(), 2);

        assert!(matches!(
            ProjectRegistry::load(dir.path().join("absent.yml")),
            Err(RegistryError::Io { .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let raw = PROJECTS.replace("id: api", "id: web");
        assert!(matches!(
            ProjectRegistry::from_yaml_str(&raw),
            Err(RegistryError::Duplicate(id)) if id == "web"
        ));
    }

    #[test]
    fn test_invalid_projects_rejected() {
        let bad_id = PROJECTS.replace("id: api", "id: My_API");
        assert!(matches!(
            ProjectRegistry::from_yaml_str(&bad_id),
            Err(RegistryError::Invalid { .. })
        ));

        let bad_url = PROJECTS.replace("https://api.example.com", "api.example.com");
        assert!(matches!(
            ProjectRegistry::from_yaml_str(&bad_url),
            Err(RegistryError::Invalid { .. })
        ));

        let no_channel = PROJECTS.replace("channel: C0API", "channel: \"\"");
        assert!(matches!(
            ProjectRegistry::from_yaml_str(&no_channel),
            Err(RegistryError::Invalid { .. })
        ));
    }

    #[test]
    fn test_ids_that_could_shadow_staging_names_rejected() {
        for id in ["web-branch-main", "web-branch", "api-tag-v1", "api-tag"] {
            let raw = PROJECTS.replace("id: api", &format!("id: {}", id));
            assert!(
                matches!(
                    ProjectRegistry::from_yaml_str(&raw),
                    Err(RegistryError::Invalid { id: rejected, .. }) if rejected == id
                ),
                "{}",
                id
            );
        }

        let allowed = PROJECTS.replace("id: api", "id: web-branching");
        assert!(ProjectRegistry::from_yaml_str(&allowed).is_ok());
    }
}
