use chrono::{DateTime, Utc};

use crate::model::ids::SourceId;

/// The content unit questions are generated from (a video, an article).
///
/// Only `created_at` matters to scheduling: it orders unseen questions so
/// that earlier material is introduced first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: SourceId,
    pub title: String,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Source {
    #[must_use]
    pub fn new(
        id: SourceId,
        title: impl Into<String>,
        url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            url,
            created_at,
        }
    }
}
