use async_trait::async_trait;
use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::{
    AsyncPgConnection, RunQueryDsl,
    pooled_connection::deadpool::{Object, Pool},
};

use super::{CommentQuery, CommentStore, StoreError};
use crate::{
    cases::models::comment::{Comment, NewComment},
    schema::{comments, posts},
};

pub type PgPool = Pool<AsyncPgConnection>;

pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<Object<AsyncPgConnection>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn exists(&self, post_id: i32) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;

        let exists = diesel::select(diesel::dsl::exists(
            posts::table.filter(posts::id.eq(post_id)),
        ))
        .get_result::<bool>(&mut conn)
        .await?;

        Ok(exists)
    }

    async fn create(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let mut conn = self.conn().await?;
        let post_id = comment.post_id;

        diesel::insert_into(comments::table)
            .values(&comment)
            .returning(Comment::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|e| match e {
                // the post got deleted between the existence check and the insert
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                    StoreError::MissingPost(post_id)
                }
                e => e.into(),
            })
    }

    async fn find_page(&self, query: CommentQuery) -> Result<Vec<Comment>, StoreError> {
        let mut conn = self.conn().await?;

        let mut page = comments::table
            .filter(comments::post_id.eq(query.post_id))
            .order((comments::created_at.desc(), comments::id.desc()))
            .limit(query.take)
            .select(Comment::as_select())
            .into_boxed();

        if let Some(cursor) = query.cursor {
            let anchor = comments::table
                .filter(comments::id.eq(cursor))
                .filter(comments::post_id.eq(query.post_id))
                .select(comments::created_at)
                .first::<chrono::NaiveDateTime>(&mut conn)
                .await
                .optional()?;

            let Some(anchor_created_at) = anchor else {
                return Ok(vec![]);
            };

            page = page.filter(
                comments::created_at.lt(anchor_created_at).or(comments::created_at
                    .eq(anchor_created_at)
                    .and(comments::id.le(cursor))),
            );
        }

        Ok(page.load(&mut conn).await?)
    }
}
