use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! entity_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(
                Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub i64);

            impl $name {
                /// Negative ids only ever come from local placeholders.
                pub fn is_local(&self) -> bool {
                    self.0 < 0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = std::num::ParseIntError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    s.parse::<i64>().map($name)
                }
            }
        )*
    };
}

entity_id!(
    UserId,
    PostId,
    CommentId,
    StoryId,
    MessageId,
    NotificationId,
    RequestId,
);

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Deserialize)]
pub struct PageSize(pub u16);

impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}
