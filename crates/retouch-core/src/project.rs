//! Project and image-version types.
//!
//! A project roots one original image; every successful AI edit appends an
//! `ImageVersion` whose `parent_id` references its immediate predecessor,
//! forming a singly-linked chain. Exactly one version per project is the
//! root (`is_original = true`, `parent_id = None`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProjectId, UserId, VersionId};

/// An edit session rooted at one original image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// The project ID.
    pub id: ProjectId,

    /// The owning user.
    pub user_id: UserId,

    /// When the project was created.
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project for a user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: ProjectId::generate(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// One image in a project's edit lineage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageVersion {
    /// The version ID (ULID for chronological ordering).
    pub id: VersionId,

    /// The project this version belongs to.
    pub project_id: ProjectId,

    /// The immediate predecessor, `None` only for the root.
    pub parent_id: Option<VersionId>,

    /// Public URL of the stored image.
    pub image_ref: String,

    /// The prompt that produced this version (empty for the root).
    pub prompt: String,

    /// Optional named style applied by the edit.
    pub style: Option<String>,

    /// Whether this is the user-uploaded original.
    pub is_original: bool,

    /// When the version was created.
    pub created_at: DateTime<Utc>,
}

impl ImageVersion {
    /// Create the root version for a freshly created project.
    #[must_use]
    pub fn original(project_id: ProjectId, image_ref: String) -> Self {
        Self {
            id: VersionId::generate(),
            project_id,
            parent_id: None,
            image_ref,
            prompt: String::new(),
            style: None,
            is_original: true,
            created_at: Utc::now(),
        }
    }

    /// Create an edited version chained onto `parent`.
    #[must_use]
    pub fn edited(
        parent: &ImageVersion,
        image_ref: String,
        prompt: String,
        style: Option<String>,
    ) -> Self {
        Self {
            id: VersionId::generate(),
            project_id: parent.project_id,
            parent_id: Some(parent.id),
            image_ref,
            prompt,
            style,
            is_original: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_version_is_root() {
        let project = Project::new(UserId::generate());
        let root = ImageVersion::original(project.id, "https://img.example/a.png".into());

        assert!(root.is_original);
        assert!(root.parent_id.is_none());
        assert_eq!(root.project_id, project.id);
    }

    #[test]
    fn edited_version_chains_onto_parent() {
        let project = Project::new(UserId::generate());
        let root = ImageVersion::original(project.id, "https://img.example/a.png".into());
        let edited = ImageVersion::edited(
            &root,
            "https://img.example/b.png".into(),
            "make it watercolor".into(),
            Some("watercolor".into()),
        );

        assert!(!edited.is_original);
        assert_eq!(edited.parent_id, Some(root.id));
        assert_eq!(edited.project_id, project.id);
        assert_eq!(edited.style.as_deref(), Some("watercolor"));
    }
}
