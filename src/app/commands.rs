use crate::app::*;
use crate::domain_model::*;
use crate::logger::*;
use crate::settings::Command;
use crate::state::*;
use chrono::Local;

/// Runs one CLI command against an initialized client.
pub async fn run_command(app: &App, command: Command) -> anyhow::Result<()> {
    let result = dispatch(app, command).await;
    flush_toasts(&app.toasts);
    result
}

async fn dispatch(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = app.auth.login(&Credentials { email, password }).await?;
            println!("signed in as {} (#{})", user.username, user.id);
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let registration = Registration {
                username,
                email,
                password,
            };
            let user = app.auth.register(&registration).await?;
            println!("welcome, {}", user.username);
        }
        Command::Logout => {
            app.auth.logout().await;
            println!("signed out");
        }
        Command::Status => status(app),
        Command::Feed { page } => {
            app.feed.load_page(page).await?;
            for post in app.feed.posts() {
                print_post(&post, app.feed.is_liked(post.id));
            }
            println!("page {} of {}", page.max(1), app.feed.total_pages().max(1));
        }
        Command::Post {
            content,
            edit,
            delete,
        } => match (delete, edit, content) {
            (Some(id), _, _) => app.feed.delete_post(id).await?,
            (None, Some(id), Some(content)) => app.feed.edit_post(id, &content).await?,
            (None, None, Some(content)) => {
                let post = app.feed.create_post(&content).await?;
                print_post(&post, false);
            }
            (None, _, None) => anyhow::bail!("nothing to post"),
        },
        Command::Like { post } => {
            app.feed.open_post(post).await?;
            let liked = app.feed.toggle_like(post).await?;
            println!("{}", if liked { "liked" } else { "unliked" });
        }
        Command::Comment { post, content } => match content {
            Some(content) => {
                app.feed.add_comment(post, &content).await?;
            }
            None => {
                for comment in app.feed.load_comments(post).await {
                    println!(
                        "{}  {}: {}",
                        comment.created_at.with_timezone(&Local).format("%m-%d %H:%M"),
                        comment.author.username,
                        comment.content
                    );
                }
            }
        },
        Command::Stories => {
            app.stories.load().await?;
            for story in app.stories.stories() {
                let who = story
                    .author
                    .as_ref()
                    .map(|a| a.username.clone())
                    .unwrap_or_else(|| story.user_id.to_string());
                let body = story
                    .text
                    .as_deref()
                    .or(story.media_url.as_deref())
                    .unwrap_or_default();
                println!("#{}  {who}: {body}", story.id);
            }
        }
        Command::Story {
            media,
            text,
            delete,
        } => match delete {
            Some(id) => app.stories.delete(id).await?,
            None => {
                let story = app
                    .stories
                    .publish(media.as_deref(), text.as_deref())
                    .await?;
                println!("story #{} expires {}", story.id, story.expires_at.with_timezone(&Local));
            }
        },
        Command::Users { query } => {
            app.users.load().await;
            let users = match query {
                Some(query) => app.users.search(&query),
                None => app.users.list(),
            };
            for user in users {
                println!(
                    "#{}  {}  {}",
                    user.id,
                    user.username,
                    user.bio.as_deref().unwrap_or_default()
                );
            }
        }
        Command::Inbox => {
            app.messages.load_inbox().await?;
            for (sender, thread) in app.messages.threads() {
                let unread = thread.iter().filter(|m| !m.read).count();
                if let Some(last) = thread.last() {
                    println!(
                        "{} (#{sender})  {} unread  last: {}",
                        last.sender.username, unread, last.content
                    );
                }
            }
        }
        Command::Thread { user } => {
            app.messages.select_thread(user).await?;
            print_thread(app);
        }
        Command::Send { to, content } => {
            app.messages.select_thread(to).await?;
            app.messages.send(to, &content).await?;
            print_thread(app);
        }
        Command::Follow { user } => {
            let status = app.follows.request(user).await?;
            println!("{status}");
        }
        Command::Unfollow { user } => {
            let status = match app.follows.refresh(user).await {
                FollowStatus::Requested => app.follows.cancel_request(user).await?,
                FollowStatus::Following => app.follows.unfollow(user).await?,
                FollowStatus::None => FollowStatus::None,
            };
            println!("{status}");
        }
        Command::Requests => {
            app.requests.load().await?;
            for request in app.requests.list() {
                println!(
                    "#{}  from {} (#{})",
                    request.id, request.from.username, request.from.id
                );
            }
        }
        Command::Accept { request } => {
            app.requests.load().await?;
            app.requests.accept(request).await?;
        }
        Command::Reject { request } => {
            app.requests.load().await?;
            app.requests.reject(request).await?;
        }
        Command::Notifications { read } => {
            app.notifications.load().await;
            if let Some(id) = read {
                app.notifications.mark_as_read(id).await;
            }
            for n in app.notifications.list() {
                let mark = if n.read { " " } else { "*" };
                println!("{mark} #{}  {}  {}", n.id, n.kind, n.created_at.with_timezone(&Local));
            }
            println!("{} unread", app.notifications.unread_count());
        }
        Command::Listen => listen(app).await?,
        Command::Profile {
            user,
            username,
            bio,
            avatar,
        } => {
            let current = app.profiles.load(user).await?;
            let mut update = ProfileUpdate::from(&current);
            if let Some(username) = username {
                update.username = username;
            }
            if let Some(bio) = bio {
                update.bio = bio;
            }
            if let Some(avatar) = avatar {
                update.avatar_url = avatar;
            }
            let saved = app.profiles.save(user, &update).await?;
            println!("{} (#{})", saved.username, saved.id);
        }
        Command::Theme { choice, cycle } => {
            let choice = match (choice, cycle) {
                (Some(choice), _) => {
                    app.theme.set(choice).await?;
                    choice
                }
                (None, true) => app.theme.cycle().await?,
                (None, false) => app.theme.choice(),
            };
            println!("{choice} ({:?})", app.theme.resolved());
        }
    }
    Ok(())
}

fn status(app: &App) {
    match app.auth.user() {
        Some(user) => println!("signed in as {} (#{})", user.username, user.id),
        None => println!("not signed in"),
    }
    let Some(token) = app.session.access_token() else {
        return;
    };
    match peek_claims(&token) {
        Ok(claims) => {
            if let Some(subject) = claims.subject() {
                println!("token subject: {subject}");
            }
            match claims.expires_at() {
                Some(at) => println!("token expires: {}", at.with_timezone(&Local)),
                None => println!("token has no expiry"),
            }
        }
        Err(e) => debug!(error = %e, "access token is not a readable jwt"),
    }
}

async fn listen(app: &App) -> anyhow::Result<()> {
    app.notifications.load().await;
    let mut listener = app.listen().await?;
    let mut seen = app.notifications.list().len();
    println!("listening, ctrl-c to stop");

    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(250));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut listener => {
                warn!("realtime connection ended");
                break;
            }
            _ = ticker.tick() => {
                let all = app.notifications.list();
                for n in all.iter().take(all.len().saturating_sub(seen)).rev() {
                    println!("* {}  {}", n.kind, n.payload.as_ref().map(|p| p.to_string()).unwrap_or_default());
                }
                seen = all.len();
                flush_toasts(&app.toasts);
            }
        }
    }
    Ok(())
}

fn print_post(post: &Post, liked: bool) {
    let heart = if liked { "♥" } else { "♡" };
    println!(
        "#{}  {}  {}\n    {}\n    {heart} {}  comments {}",
        post.id,
        post.author.username,
        post.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        post.content,
        post.counts.likes,
        post.counts.comments
    );
}

fn print_thread(app: &App) {
    let me = app.auth.user().map(|u| u.id);
    for m in app.messages.thread() {
        let who = if Some(m.sender.id) == me {
            "you"
        } else {
            m.sender.username.as_str()
        };
        let read = if m.read { " ✓" } else { "" };
        println!(
            "{}  {who}: {}{read}",
            m.created_at.with_timezone(&Local).format("%m-%d %H:%M"),
            m.content
        );
    }
}
