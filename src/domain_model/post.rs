use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCounts {
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub comments: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub content: String,
    #[serde(default)]
    pub media_url: Option<String>,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "_count", default)]
    pub counts: PostCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LikeState {
    #[serde(default)]
    pub liked: bool,
}

#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub page: u32,
    pub total: u64,
}

impl PostPage {
    pub fn total_pages(&self, page_size: PageSize) -> u64 {
        let size = u64::from(page_size.0.max(1));
        self.total.div_ceil(size)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostContent {
    pub content: String,
}
