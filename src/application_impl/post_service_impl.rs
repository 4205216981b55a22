use crate::application_port::PostService;
use crate::client::*;
use crate::domain_model::*;

pub struct RealPostService {
    client: ApiClient,
}

impl RealPostService {
    pub fn new(client: ApiClient) -> RealPostService {
        RealPostService { client }
    }
}

#[async_trait::async_trait]
impl PostService for RealPostService {
    async fn list(&self, page: u32, page_size: PageSize) -> Result<PostPage, ApiError> {
        let request = ApiRequest::get("/api/posts")
            .query("page", page)
            .query("limit", page_size.0);
        let response = self.client.execute(request).await?;
        let posts: Vec<Post> = response.json::<Option<Vec<Post>>>()?.unwrap_or_default();
        let total = response
            .header("x-total-count")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(posts.len() as u64);

        Ok(PostPage { posts, page, total })
    }

    async fn get(&self, post: PostId) -> Result<Post, ApiError> {
        self.client.get(&format!("/api/posts/{post}")).await
    }

    async fn create(&self, content: &str) -> Result<Post, ApiError> {
        let body = PostContent {
            content: content.to_owned(),
        };
        self.client.post("/api/posts", &body).await
    }

    async fn edit(&self, post: PostId, content: &str) -> Result<(), ApiError> {
        let body = PostContent {
            content: content.to_owned(),
        };
        let request = ApiRequest::put(format!("/api/posts/{post}")).json(&body)?;
        self.client.execute(request).await?;
        Ok(())
    }

    async fn delete(&self, post: PostId) -> Result<(), ApiError> {
        self.client.delete(&format!("/api/posts/{post}")).await
    }

    async fn liked(&self, post: PostId) -> Result<bool, ApiError> {
        let state: Option<LikeState> = self.client.get(&format!("/api/posts/{post}/like")).await?;
        Ok(state.unwrap_or_default().liked)
    }

    async fn like(&self, post: PostId) -> Result<(), ApiError> {
        self.client.post_empty(&format!("/api/posts/{post}/like")).await
    }

    async fn unlike(&self, post: PostId) -> Result<(), ApiError> {
        self.client.delete(&format!("/api/posts/{post}/like")).await
    }

    async fn comments(&self, post: PostId) -> Result<Vec<Comment>, ApiError> {
        let comments: Option<Vec<Comment>> =
            self.client.get(&format!("/api/posts/{post}/comments")).await?;
        Ok(comments.unwrap_or_default())
    }

    async fn comment(&self, post: PostId, content: &str) -> Result<Comment, ApiError> {
        let body = PostContent {
            content: content.to_owned(),
        };
        self.client
            .post(&format!("/api/posts/{post}/comments"), &body)
            .await
    }
}
