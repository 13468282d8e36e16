use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::{CommentQuery, CommentStore, StoreError};
use crate::cases::models::comment::{Comment, NewComment};

/// Comment store kept in memory, mirroring the ordering and cursor rules of
/// the Postgres store.
#[derive(Default)]
pub struct MemoryCommentStore {
    posts: Mutex<HashSet<i32>>,
    comments: Mutex<Vec<Comment>>,
    deleted_before_insert: Mutex<HashSet<i32>>,
    create_calls: AtomicUsize,
}

impl MemoryCommentStore {
    pub fn with_posts(posts: impl IntoIterator<Item = i32>) -> Self {
        Self {
            posts: Mutex::new(posts.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Deletes `post_id` right before the next insert into it, after any
    /// existence check has already seen the post.
    pub fn delete_post_before_insert(&self, post_id: i32) {
        self.deleted_before_insert.lock().unwrap().insert(post_id);
    }

    /// Inserts a comment with a fixed creation time, bypassing `create`.
    pub fn seed(&self, post_id: i32, content: &str, created_at: NaiveDateTime) -> Comment {
        let mut comments = self.comments.lock().unwrap();
        let comment = Comment {
            id: comments.len() as i32 + 1,
            content: content.into(),
            author_name: "Gato Sabio".into(),
            post_id,
            created_at,
        };
        comments.push(comment.clone());
        comment
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.comments.lock().unwrap().len()
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn exists(&self, post_id: i32) -> Result<bool, StoreError> {
        Ok(self.posts.lock().unwrap().contains(&post_id))
    }

    async fn create(&self, comment: NewComment) -> Result<Comment, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self
            .deleted_before_insert
            .lock()
            .unwrap()
            .remove(&comment.post_id)
        {
            self.posts.lock().unwrap().remove(&comment.post_id);
        }

        // stands in for the foreign key on `comments.post_id`
        if !self.posts.lock().unwrap().contains(&comment.post_id) {
            return Err(StoreError::MissingPost(comment.post_id));
        }

        let mut comments = self.comments.lock().unwrap();
        let created = Comment {
            id: comments.len() as i32 + 1,
            content: comment.content,
            author_name: comment.author_name,
            post_id: comment.post_id,
            created_at: chrono::Utc::now().naive_utc(),
        };
        comments.push(created.clone());
        Ok(created)
    }

    async fn find_page(&self, query: CommentQuery) -> Result<Vec<Comment>, StoreError> {
        let mut for_post: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.post_id == query.post_id)
            .cloned()
            .collect();
        for_post.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let start = match query.cursor {
            Some(cursor) => match for_post.iter().position(|c| c.id == cursor) {
                Some(at) => at,
                None => return Ok(vec![]),
            },
            None => 0,
        };

        Ok(for_post
            .into_iter()
            .skip(start)
            .take(query.take.max(0) as usize)
            .collect())
    }
}
