use chrono::{DateTime, Utc};

/// A resource created in the external repository solely to be polled and then deleted.
///
/// Owned by the scenario that created it, tracked in its context, and handed to the cleanup
/// helper during teardown. Every name carries the run's millisecond timestamp suffix, so
/// concurrent runs against the same repository cannot collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientResource {
    Branch {
        name: String,
        created_at: DateTime<Utc>,
    },
    File {
        branch: String,
        path: String,
        /// Blob sha from the creating commit; the delete operation requires it
        sha: String,
        created_at: DateTime<Utc>,
    },
}

impl TransientResource {
    pub fn branch(name: impl Into<String>) -> Self {
        Self::Branch {
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    pub fn file(branch: impl Into<String>, path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self::File {
            branch: branch.into(),
            path: path.into(),
            sha: sha.into(),
            created_at: Utc::now(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TransientResource::Branch { name, .. } => format!("branch {name}"),
            TransientResource::File { branch, path, .. } => format!("file {path} on {branch}"),
        }
    }
}
