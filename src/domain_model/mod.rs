mod message;
mod notification;
mod post;
mod relation;
mod story;
mod stream;
mod theme;
mod token;
mod unit;
mod user;

pub use message::*;
pub use notification::*;
pub use post::*;
pub use relation::*;
pub use story::*;
pub use stream::*;
pub use theme::*;
pub use token::*;
pub use unit::*;
pub use user::*;
