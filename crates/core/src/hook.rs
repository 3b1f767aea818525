//! Push webhook payload sent by the git host when an engagement's
//! backing repository changes.
//!
//! GitLab serializes these with snake_case keys, which matches the Rust
//! field names directly. Repositories live at
//! `{group}/{customer}/{project}/{repo}`, so the customer and project
//! names are recovered from the namespace path.

use serde::{Deserialize, Serialize};

/// A push event delivered to the hook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    #[serde(default)]
    pub project: HookProject,
    #[serde(default)]
    pub commits: Vec<HookCommit>,
}

/// The repository the push happened in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookProject {
    pub id: Option<i64>,
    pub name_with_namespace: Option<String>,
    pub path_with_namespace: Option<String>,
}

/// A single commit carried by a push event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookCommit {
    pub id: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
    pub url: Option<String>,
    pub author: Option<HookAuthor>,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Hook {
    /// True when any commit message contains any of the given fragments.
    pub fn contains_any_message(&self, fragments: &[String]) -> bool {
        self.commits.iter().any(|commit| {
            commit
                .message
                .as_deref()
                .is_some_and(|message| fragments.iter().any(|fragment| message.contains(fragment)))
        })
    }

    /// True when any commit added, modified, or removed the named file.
    pub fn did_file_change(&self, file_name: &str) -> bool {
        self.commits.iter().any(|commit| {
            commit.added.iter().any(|f| f == file_name)
                || commit.modified.iter().any(|f| f == file_name)
                || commit.removed.iter().any(|f| f == file_name)
        })
    }

    /// Recover candidate customer/project name pairs from the
    /// repository namespace, display form first, path form second.
    ///
    /// The trailing segment is the backing repository itself; the two
    /// segments before it identify the engagement. Callers try the
    /// candidates in order because stored names may match either form.
    /// Empty when the namespace is too shallow to carry both names.
    pub fn name_candidates(&self) -> Vec<(String, String)> {
        let mut candidates = Vec::new();
        for namespace in [
            self.project.name_with_namespace.as_deref(),
            self.project.path_with_namespace.as_deref(),
        ] {
            if let Some(pair) = namespace.and_then(split_namespace) {
                if !candidates.contains(&pair) {
                    candidates.push(pair);
                }
            }
        }
        candidates
    }
}

fn split_namespace(namespace: &str) -> Option<(String, String)> {
    let segments: Vec<&str> = namespace
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() < 3 {
        return None;
    }

    let customer = segments[segments.len() - 3].to_string();
    let project = segments[segments.len() - 2].to_string();
    Some((customer, project))
}
