use crate::client::ApiError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait PostService: Send + Sync {
    async fn list(&self, page: u32, page_size: PageSize) -> Result<PostPage, ApiError>;
    async fn get(&self, post: PostId) -> Result<Post, ApiError>;
    async fn create(&self, content: &str) -> Result<Post, ApiError>;
    async fn edit(&self, post: PostId, content: &str) -> Result<(), ApiError>;
    async fn delete(&self, post: PostId) -> Result<(), ApiError>;
    async fn liked(&self, post: PostId) -> Result<bool, ApiError>;
    async fn like(&self, post: PostId) -> Result<(), ApiError>;
    async fn unlike(&self, post: PostId) -> Result<(), ApiError>;
    async fn comments(&self, post: PostId) -> Result<Vec<Comment>, ApiError>;
    async fn comment(&self, post: PostId, content: &str) -> Result<Comment, ApiError>;
}
