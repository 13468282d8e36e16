use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use super::{CommentError, CommentService, PAGE_SIZE, parse_id};
use crate::{App, cases::models::comment::Comment, cases::store::CommentQuery, error::AppError};

#[derive(Deserialize)]
pub struct Queries {
    cursor: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub comments: Vec<Comment>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<i32>,
}

pub async fn get_comments(
    State(ctx): State<App>,
    Path(id): Path<String>,
    Query(q): Query<Queries>,
) -> Result<Json<CommentPage>, AppError> {
    // an empty `?cursor=` means the first page
    let cursor = match q.cursor.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_id(raw)?),
        _ => None,
    };

    Ok(Json(ctx.comments.list(&id, cursor).await?))
}

impl CommentService {
    /// Newest-first page of a post's comments, starting at `cursor`.
    ///
    /// One extra comment is fetched to learn whether another page exists. Its
    /// id becomes `next_cursor`, so the next page starts with it.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        post_id: &str,
        cursor: Option<i32>,
    ) -> Result<CommentPage, CommentError> {
        let post_id = parse_id(post_id)?;

        let mut comments = self
            .with_timeout(self.store.find_page(CommentQuery {
                post_id,
                cursor,
                take: PAGE_SIZE as i64 + 1,
            }))
            .await?;

        let next_cursor = if comments.len() > PAGE_SIZE {
            comments.truncate(PAGE_SIZE + 1);
            comments.pop().map(|c| c.id)
        } else {
            None
        };

        Ok(CommentPage {
            comments,
            next_cursor,
        })
    }
}
