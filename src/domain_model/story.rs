use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STORY_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: StoryId,
    pub user_id: UserId,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Story {
    /// A story still waiting for the server to confirm it.
    pub fn is_pending(&self) -> bool {
        self.id.is_local()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStory {
    pub media_url: Option<String>,
    pub text: Option<String>,
}

impl NewStory {
    /// Blank fields collapse to `None`; `None` means there is nothing to publish.
    pub fn normalized(media_url: Option<&str>, text: Option<&str>) -> Option<Self> {
        let keep = |s: Option<&str>| s.filter(|v| !v.trim().is_empty()).map(str::to_owned);
        let story = NewStory {
            media_url: keep(media_url),
            text: keep(text),
        };
        if story.media_url.is_none() && story.text.is_none() {
            None
        } else {
            Some(story)
        }
    }
}
