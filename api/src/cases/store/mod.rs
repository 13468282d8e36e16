use std::time::Duration;

use async_trait::async_trait;

use super::models::comment::{Comment, NewComment};

#[cfg(test)]
pub mod memory;
pub mod pg;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("could not get a database connection: {0}")]
    Pool(String),

    #[error("post {0} does not exist")]
    MissingPost(i32),

    #[error(transparent)]
    Query(#[from] diesel::result::Error),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// One page worth of comments for a post, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentQuery {
    pub post_id: i32,
    /// The page starts at this comment, inclusive.
    pub cursor: Option<i32>,
    pub take: i64,
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Whether the post comments are attached to exists.
    async fn exists(&self, post_id: i32) -> Result<bool, StoreError>;

    async fn create(&self, comment: NewComment) -> Result<Comment, StoreError>;

    /// Comments of `query.post_id` ordered by creation time descending, with
    /// ties broken by id descending, starting at the cursor comment. A cursor
    /// that does not name a comment of the post yields no comments.
    async fn find_page(&self, query: CommentQuery) -> Result<Vec<Comment>, StoreError>;
}
