use crate::domain_model::*;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "trohm", version, about = "Terminal client for the trohm social network")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    /// Answer yes to every confirmation.
    #[arg(long, short)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Login {
        email: String,
        password: String,
    },
    Register {
        username: String,
        email: String,
        password: String,
    },
    Logout,
    /// Who is signed in and when the access token expires.
    Status,
    Feed {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Publish a post, or edit/delete an existing one.
    Post {
        content: Option<String>,
        #[arg(long, conflicts_with = "delete")]
        edit: Option<PostId>,
        #[arg(long)]
        delete: Option<PostId>,
    },
    /// Toggle the like on a post.
    Like {
        post: PostId,
    },
    /// List comments on a post, or add one.
    Comment {
        post: PostId,
        content: Option<String>,
    },
    Stories,
    /// Publish a story, or delete one.
    Story {
        #[arg(long)]
        media: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, conflicts_with_all = ["media", "text"])]
        delete: Option<StoryId>,
    },
    /// List everyone, optionally filtered by username.
    Users {
        query: Option<String>,
    },
    Inbox,
    Thread {
        user: UserId,
    },
    Send {
        to: UserId,
        content: String,
    },
    Follow {
        user: UserId,
    },
    /// Unfollow, or withdraw a pending request.
    Unfollow {
        user: UserId,
    },
    Requests,
    Accept {
        request: RequestId,
    },
    Reject {
        request: RequestId,
    },
    Notifications {
        /// Mark this notification read.
        #[arg(long)]
        read: Option<NotificationId>,
    },
    /// Print realtime events until interrupted.
    Listen,
    Profile {
        user: UserId,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Show the theme, set it, or cycle to the next one.
    Theme {
        choice: Option<ThemeChoice>,
        #[arg(long, conflicts_with = "choice")]
        cycle: bool,
    },
}
