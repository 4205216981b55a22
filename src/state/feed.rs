use crate::application_port::PostService;
use crate::domain_model::*;
use crate::logger::*;
use crate::state::*;
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct FeedState {
    pub posts: Vec<Post>,
    pub liked: HashMap<PostId, bool>,
    pub comments: HashMap<PostId, Vec<Comment>>,
    pub page: u32,
    pub total: u64,
}

impl FeedState {
    fn post_mut(&mut self, id: PostId) -> Option<&mut Post> {
        self.posts.iter_mut().find(|p| p.id == id)
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }
}

/// One page of the home feed with likes and comments layered on top.
pub struct FeedView {
    posts: Arc<dyn PostService>,
    gate: ActionGate,
    confirm: Arc<dyn Confirm>,
    ids: Arc<LocalIdSource>,
    page_size: PageSize,
    state: StateCell<FeedState>,
    liking: PendingSet<PostId>,
    commenting: PendingSet<PostId>,
    posting: PendingSet<()>,
}

impl FeedView {
    pub fn new(
        posts: Arc<dyn PostService>,
        gate: ActionGate,
        confirm: Arc<dyn Confirm>,
        ids: Arc<LocalIdSource>,
    ) -> Self {
        FeedView {
            posts,
            gate,
            confirm,
            ids,
            page_size: PageSize::default(),
            state: StateCell::default(),
            liking: PendingSet::new(),
            commenting: PendingSet::new(),
            posting: PendingSet::new(),
        }
    }

    pub fn snapshot(&self) -> FeedState {
        self.state.snapshot()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state.read(|s| s.posts.clone())
    }

    pub fn is_liked(&self, post: PostId) -> bool {
        self.state
            .read(|s| s.liked.get(&post).copied().unwrap_or(false))
    }

    pub fn comments(&self, post: PostId) -> Option<Vec<Comment>> {
        self.state.read(|s| s.comments.get(&post).cloned())
    }

    pub fn total_pages(&self) -> u64 {
        let size = u64::from(self.page_size.0.max(1));
        self.state.read(|s| s.total.div_ceil(size))
    }

    pub fn is_like_pending(&self, post: PostId) -> bool {
        self.liking.is_pending(&post)
    }

    pub fn is_comment_pending(&self, post: PostId) -> bool {
        self.commenting.is_pending(&post)
    }

    pub async fn load_page(&self, page: u32) -> Result<(), ActionError> {
        let page = page.max(1);
        let result = self.posts.list(page, self.page_size).await;
        let loaded = self.gate.report(result, None, "Could not load posts")?;
        debug!(page, count = loaded.posts.len(), total = loaded.total, "feed page loaded");
        self.state.update(|s| {
            s.posts = loaded.posts;
            s.page = loaded.page;
            s.total = loaded.total;
            s.comments.clear();
            s.liked.clear();
        });
        if self.gate.auth().is_authenticated() {
            self.hydrate_likes().await;
        }
        Ok(())
    }

    /// Asks the backend which loaded posts the user likes. A failed lookup
    /// counts as not liked.
    pub async fn hydrate_likes(&self) {
        let ids: Vec<PostId> = self.state.read(|s| s.posts.iter().map(|p| p.id).collect());
        let lookups = ids.into_iter().map(|id| async move {
            let liked = match self.posts.liked(id).await {
                Ok(liked) => liked,
                Err(e) => {
                    debug!(post = %id, error = %e, "like state unavailable");
                    false
                }
            };
            (id, liked)
        });
        let liked: HashMap<PostId, bool> = join_all(lookups).await.into_iter().collect();
        self.state.update(|s| s.liked = liked);
    }

    pub async fn load_post(&self, id: PostId) -> Result<Post, ActionError> {
        let result = self.posts.get(id).await;
        let post = self.gate.report(result, None, "Could not load post")?;
        self.state.update(|s| {
            if let Some(slot) = s.post_mut(id) {
                *slot = post.clone();
            }
        });
        Ok(post)
    }

    /// Brings a single post into the view along with its like state.
    pub async fn open_post(&self, id: PostId) -> Result<Post, ActionError> {
        let post = self.load_post(id).await?;
        let liked = self.gate.auth().is_authenticated()
            && self.posts.liked(id).await.unwrap_or_else(|e| {
                debug!(post = %id, error = %e, "like state unavailable");
                false
            });
        self.state.update(|s| {
            if s.post(id).is_none() {
                s.posts.push(post.clone());
            }
            s.liked.insert(id, liked);
        });
        Ok(post)
    }

    /// Returns whether the post is liked afterwards.
    pub async fn toggle_like(&self, post: PostId) -> Result<bool, ActionError> {
        self.gate.require_user()?;
        let _pending = self.gate.begin(&self.liking, post)?;

        let was_liked = self.is_liked(post);
        let request = async {
            if was_liked {
                self.posts.unlike(post).await
            } else {
                self.posts.like(post).await
            }
        };

        let result = reconcile(
            &self.state,
            |s| {
                (
                    s.liked.get(&post).copied(),
                    s.post(post).map(|p| p.counts.likes),
                )
            },
            |s| {
                s.liked.insert(post, !was_liked);
                if let Some(p) = s.post_mut(post) {
                    p.counts.likes = if was_liked {
                        p.counts.likes.saturating_sub(1)
                    } else {
                        p.counts.likes + 1
                    };
                }
            },
            request,
            |_, ()| !was_liked,
            |s, (liked, likes)| {
                match liked {
                    Some(liked) => s.liked.insert(post, liked),
                    None => s.liked.remove(&post),
                };
                if let (Some(p), Some(likes)) = (s.post_mut(post), likes) {
                    p.counts.likes = likes;
                }
            },
        )
        .await;

        self.gate.report(result, None, "Could not update like")
    }

    /// Comments are fetched once per post; a failure leaves an empty list.
    pub async fn load_comments(&self, post: PostId) -> Vec<Comment> {
        let comments = match self.posts.comments(post).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(post = %post, error = %e, "fetch comments failed");
                Vec::new()
            }
        };
        self.state
            .update(|s| s.comments.insert(post, comments.clone()));
        comments
    }

    pub async fn add_comment(&self, post: PostId, content: &str) -> Result<Comment, ActionError> {
        let me = self.gate.require_user()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ActionError::EmptyContent);
        }
        let _pending = self.gate.begin(&self.commenting, post)?;

        let local_id = CommentId(self.ids.next());
        let placeholder = Comment {
            id: local_id,
            content: content.to_owned(),
            author: me.as_author(),
            created_at: Utc::now(),
        };

        let result = reconcile(
            &self.state,
            |s| (s.comments.get(&post).cloned(), s.post(post).map(|p| p.counts.comments)),
            |s| {
                s.comments.entry(post).or_default().insert(0, placeholder);
                if let Some(p) = s.post_mut(post) {
                    p.counts.comments += 1;
                }
            },
            self.posts.comment(post, content),
            |s, server: Comment| {
                let confirmed = Comment {
                    author: me.as_author(),
                    ..server
                };
                if let Some(slot) = s
                    .comments
                    .get_mut(&post)
                    .and_then(|list| list.iter_mut().find(|c| c.id == local_id))
                {
                    *slot = confirmed.clone();
                }
                confirmed
            },
            |s, (comments, count)| {
                match comments {
                    Some(comments) => s.comments.insert(post, comments),
                    None => s.comments.remove(&post),
                };
                if let (Some(p), Some(count)) = (s.post_mut(post), count) {
                    p.counts.comments = count;
                }
            },
        )
        .await;

        self.gate
            .report(result, Some("Comment sent"), "Could not send the comment")
    }

    pub async fn create_post(&self, content: &str) -> Result<Post, ActionError> {
        let me = self.gate.require_user()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ActionError::EmptyContent);
        }
        let _pending = self.gate.begin(&self.posting, ())?;

        let local_id = PostId(self.ids.next());
        let placeholder = Post {
            id: local_id,
            content: content.to_owned(),
            media_url: None,
            author: me.as_author(),
            created_at: Utc::now(),
            counts: PostCounts::default(),
        };

        let result = reconcile(
            &self.state,
            |_| (),
            |s| s.posts.insert(0, placeholder),
            self.posts.create(content),
            |s, server: Post| {
                if let Some(slot) = s.post_mut(local_id) {
                    *slot = server.clone();
                    s.total += 1;
                }
                server
            },
            |s, ()| s.posts.retain(|p| p.id != local_id),
        )
        .await;

        self.gate
            .report(result, Some("Post created"), "Could not create the post")
    }

    pub async fn edit_post(&self, post: PostId, content: &str) -> Result<(), ActionError> {
        self.gate.require_user()?;
        let content = content.trim();
        if content.is_empty() {
            self.gate.notify(Notice::error("Content cannot be empty"));
            return Err(ActionError::EmptyContent);
        }

        let result = self.posts.edit(post, content).await;
        self.gate
            .report(result, Some("Post updated"), "Could not update the post")?;
        self.state.update(|s| {
            if let Some(p) = s.post_mut(post) {
                p.content = content.to_owned();
            }
        });
        Ok(())
    }

    pub async fn delete_post(&self, post: PostId) -> Result<(), ActionError> {
        self.gate.require_user()?;
        if !self.confirm.confirm("Delete this post?").await {
            return Err(ActionError::Cancelled);
        }

        let result = self.posts.delete(post).await;
        self.gate
            .report(result, Some("Post deleted"), "Could not delete the post")?;
        self.state.update(|s| {
            s.posts.retain(|p| p.id != post);
            s.comments.remove(&post);
            s.liked.remove(&post);
            s.total = s.total.saturating_sub(1);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::RealPostService;
    use crate::client::*;
    use crate::testing::*;
    use tokio::sync::Notify;

    fn feed(h: &Harness, confirm: bool) -> FeedView {
        FeedView::new(
            Arc::new(RealPostService::new(h.client.clone())),
            h.gate(),
            Arc::new(AutoConfirm(confirm)),
            h.ids.clone(),
        )
    }

    fn seed(view: &FeedView, posts: Vec<Post>) {
        view.state.update(|s| {
            s.total = posts.len() as u64;
            s.posts = posts;
        });
    }

    #[tokio::test]
    async fn failed_like_reverts_count_and_flag() {
        let transport = Arc::new(ScriptedTransport::new(|req| {
            assert_eq!(req.method, Method::Post);
            json(500, serde_json::json!({}))
        }));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = feed(&h, true);
        seed(&view, vec![post(10, 3, 0)]);

        let err = view.toggle_like(PostId(10)).await.unwrap_err();

        assert!(matches!(err, ActionError::Api(ApiError::Server { .. })));
        assert!(!view.is_liked(PostId(10)));
        assert_eq!(view.posts()[0].counts.likes, 3);
        assert!(!view.is_like_pending(PostId(10)));
        assert_eq!(h.notices.last().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn unlike_never_goes_below_zero() {
        let transport = Arc::new(ScriptedTransport::new(|req| {
            assert_eq!(req.method, Method::Delete);
            json(204, serde_json::json!(null))
        }));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = feed(&h, true);
        seed(&view, vec![post(10, 0, 0)]);
        view.state.update(|s| s.liked.insert(PostId(10), true));

        assert!(!view.toggle_like(PostId(10)).await.unwrap());
        assert_eq!(view.posts()[0].counts.likes, 0);
    }

    #[tokio::test]
    async fn confirmed_comment_replaces_placeholder() {
        let transport = Arc::new(ScriptedTransport::new(|req| {
            assert_eq!(req.path, "/api/posts/10/comments");
            assert_eq!(req.body, Some(serde_json::json!({"content": "nice"})));
            json(
                201,
                serde_json::json!({
                    "id": 77,
                    "content": "nice",
                    "author": {"id": 999, "username": "someone-else"},
                    "createdAt": "2024-05-02T09:00:00Z"
                }),
            )
        }));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = feed(&h, true);
        seed(&view, vec![post(10, 0, 2)]);
        view.state
            .update(|s| s.comments.insert(PostId(10), Vec::new()));

        let comment = view.add_comment(PostId(10), "  nice ").await.unwrap();

        assert_eq!(comment.id, CommentId(77));
        assert_eq!(comment.author.username, "ana");
        let comments = view.comments(PostId(10)).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, CommentId(77));
        assert!(comments.iter().all(|c| !c.id.is_local()));
        assert_eq!(view.posts()[0].counts.comments, 3);
        assert_eq!(h.notices.last().unwrap(), Notice::success("Comment sent"));
    }

    #[tokio::test]
    async fn failed_comment_restores_list_and_count() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            json(400, serde_json::json!({"error": "Too long"}))
        }));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = feed(&h, true);
        seed(&view, vec![post(10, 0, 2)]);

        view.add_comment(PostId(10), "hello").await.unwrap_err();

        assert_eq!(view.comments(PostId(10)), None);
        assert_eq!(view.posts()[0].counts.comments, 2);
        assert_eq!(h.notices.last().unwrap(), Notice::error("Too long"));
    }

    #[tokio::test]
    async fn anonymous_actions_are_refused_before_any_request() {
        let transport = Arc::new(ScriptedTransport::new(|_| panic!("no request expected")));
        let h = signed_out(transport).await;
        let view = feed(&h, true);
        seed(&view, vec![post(10, 1, 0)]);

        assert!(matches!(
            view.toggle_like(PostId(10)).await,
            Err(ActionError::NotAuthenticated)
        ));
        assert!(matches!(
            view.add_comment(PostId(10), "hi").await,
            Err(ActionError::NotAuthenticated)
        ));
        let notice = h.notices.last().unwrap();
        assert!(notice.blocking);
        assert_eq!(notice.text, "You must be signed in");
    }

    #[tokio::test]
    async fn blank_post_is_refused_without_mutation() {
        let transport = Arc::new(ScriptedTransport::new(|_| panic!("no request expected")));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = feed(&h, true);

        assert!(matches!(
            view.create_post("   ").await,
            Err(ActionError::EmptyContent)
        ));
        assert!(view.posts().is_empty());
    }

    #[tokio::test]
    async fn created_post_takes_placeholder_slot() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            json(
                201,
                serde_json::json!({
                    "id": 50,
                    "content": "hello",
                    "author": {"id": 1, "username": "ana"},
                    "createdAt": "2024-05-02T09:00:00Z"
                }),
            )
        }));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = feed(&h, true);
        seed(&view, vec![post(10, 0, 0)]);

        view.create_post("hello").await.unwrap();

        let ids: Vec<_> = view.posts().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![PostId(50), PostId(10)]);
    }

    #[tokio::test]
    async fn post_confirmed_after_reload_leaves_total_alone() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(HeldTransport::new(gate.clone(), |_| {
            json(
                201,
                serde_json::json!({
                    "id": 50,
                    "content": "hello",
                    "author": {"id": 1, "username": "ana"},
                    "createdAt": "2024-05-02T09:00:00Z"
                }),
            )
        }));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = Arc::new(feed(&h, true));
        seed(&view, vec![post(10, 0, 0)]);

        let creating = tokio::spawn({
            let view = view.clone();
            async move { view.create_post("hello").await }
        });
        eventually(|| view.posts().len() == 2).await;
        seed(&view, vec![post(10, 0, 0)]);
        gate.notify_one();
        creating.await.unwrap().unwrap();

        assert_eq!(view.snapshot().total, 1);
        assert_eq!(view.posts().len(), 1);
    }

    #[tokio::test]
    async fn like_is_refused_while_the_first_is_pending() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(HeldTransport::new(gate.clone(), |req| {
            assert_eq!(req.method, Method::Post);
            json(200, serde_json::json!(null))
        }));
        let h = signed_in(transport.clone(), user(1, "ana")).await;
        let view = Arc::new(feed(&h, true));
        seed(&view, vec![post(10, 3, 0)]);

        let liking = tokio::spawn({
            let view = view.clone();
            async move { view.toggle_like(PostId(10)).await }
        });
        eventually(|| transport.held() == 1).await;
        assert!(view.is_like_pending(PostId(10)));

        assert!(matches!(
            view.toggle_like(PostId(10)).await,
            Err(ActionError::Pending)
        ));

        gate.notify_one();
        assert!(liking.await.unwrap().unwrap());
        assert!(!view.is_like_pending(PostId(10)));
        assert_eq!(transport.count("/api/posts/10/like"), 1);
        assert_eq!(view.posts()[0].counts.likes, 4);
    }

    #[tokio::test]
    async fn failed_post_leaves_no_placeholder() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Err(TransportError("offline".into()))
        }));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = feed(&h, true);
        seed(&view, vec![post(10, 0, 0)]);

        view.create_post("hello").await.unwrap_err();

        assert_eq!(view.posts().len(), 1);
        assert_eq!(
            h.notices.last().unwrap(),
            Notice::error("Could not create the post")
        );
    }

    #[tokio::test]
    async fn declined_delete_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::new(|_| panic!("no request expected")));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = feed(&h, false);
        seed(&view, vec![post(10, 0, 0)]);

        assert!(matches!(
            view.delete_post(PostId(10)).await,
            Err(ActionError::Cancelled)
        ));
        assert_eq!(view.posts().len(), 1);
    }

    #[tokio::test]
    async fn load_page_hydrates_likes() {
        let transport = Arc::new(ScriptedTransport::new(|req| match req.path.as_str() {
            "/api/posts" => {
                let mut response = json(
                    200,
                    serde_json::to_value(vec![post(1, 0, 0), post(2, 0, 0)]).unwrap(),
                )?;
                response.headers.push(("x-total-count".into(), "12".into()));
                Ok(response)
            }
            "/api/posts/1/like" => json(200, serde_json::json!({"liked": true})),
            _ => json(500, serde_json::json!({})),
        }));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = feed(&h, true);

        view.load_page(1).await.unwrap();

        assert!(view.is_liked(PostId(1)));
        assert!(!view.is_liked(PostId(2)));
        assert_eq!(view.total_pages(), 2);
    }

    #[tokio::test]
    async fn opened_post_joins_the_view_with_its_like_state() {
        let transport = Arc::new(ScriptedTransport::new(|req| match req.path.as_str() {
            "/api/posts/10" => json(200, serde_json::to_value(post(10, 5, 0)).unwrap()),
            "/api/posts/10/like" => json(200, serde_json::json!({"liked": true})),
            other => panic!("unexpected {other}"),
        }));
        let h = signed_in(transport, user(1, "ana")).await;
        let view = feed(&h, true);

        view.open_post(PostId(10)).await.unwrap();

        assert_eq!(view.posts().len(), 1);
        assert!(view.is_liked(PostId(10)));
    }
}
