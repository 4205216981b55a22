mod auth_service_impl;
mod message_service_impl;
mod notification_service_impl;
mod post_service_impl;
mod relationship_service_impl;
mod story_service_impl;
mod user_service_impl;

pub use auth_service_impl::*;
pub use message_service_impl::*;
pub use notification_service_impl::*;
pub use post_service_impl::*;
pub use relationship_service_impl::*;
pub use story_service_impl::*;
pub use user_service_impl::*;
