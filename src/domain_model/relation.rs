use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowStatus {
    Requested,
    Following,
    #[default]
    #[serde(other)]
    None,
}

impl fmt::Display for FollowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FollowStatus::None => "none",
            FollowStatus::Requested => "requested",
            FollowStatus::Following => "following",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FollowStatusResponse {
    #[serde(default)]
    pub status: FollowStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub id: RequestId,
    pub from: Author,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    Accept,
    Reject,
}

impl RequestDecision {
    pub fn as_path(&self) -> &'static str {
        match self {
            RequestDecision::Accept => "accept",
            RequestDecision::Reject => "reject",
        }
    }
}
