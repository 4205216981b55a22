mod auth;
mod feed;
mod follow;
mod install;
mod messages;
mod notifications;
mod optimistic;
mod port;
mod profile;
mod requests;
mod stories;
mod theme;
mod toast;
mod users;

pub use auth::*;
pub use feed::*;
pub use follow::*;
pub use install::*;
pub use messages::*;
pub use notifications::*;
pub use optimistic::*;
pub use port::*;
pub use profile::*;
pub use requests::*;
pub use stories::*;
pub use theme::*;
pub use toast::*;
pub use users::*;
