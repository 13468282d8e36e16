use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::{CommentError, CommentService, MAX_CONTENT_CHARS, parse_id};
use crate::{
    App,
    cases::models::comment::{Comment, NewComment},
    error::AppError,
    real_ip::ClientIdentifier,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSubmission {
    content: Option<String>,
    cf_turnstile_response: Option<String>,
}

#[derive(Serialize)]
pub struct CreatedComment {
    comment: Comment,
}

#[debug_handler]
pub async fn create_comment(
    State(ctx): State<App>,
    Path(id): Path<String>,
    ClientIdentifier(client): ClientIdentifier,
    submission: Result<crate::json::Json<CommentSubmission>, AppError>,
) -> Result<(StatusCode, Json<CreatedComment>), AppError> {
    let post_id = ctx.comments.admit(&id, &client)?;

    // a malformed body is only reported once the attempt has been counted
    let crate::json::Json(submission) = submission?;

    let comment = ctx
        .comments
        .publish(
            post_id,
            submission.content.as_deref(),
            submission.cf_turnstile_response.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(CreatedComment { comment })))
}

impl CommentService {
    /// First stage of a submission: validates the post id and counts the
    /// attempt against the client's rate limit. Runs before the request body
    /// is looked at.
    pub fn admit(&self, post_id: &str, client_identifier: &str) -> Result<i32, CommentError> {
        let post_id = parse_id(post_id)?;

        if !self.limiter.check_and_consume(client_identifier) {
            tracing::info!(post_id, client = %client_identifier, "Comment rejected by the rate limiter");
            return Err(CommentError::RateLimited);
        }

        Ok(post_id)
    }

    /// Validates and stores an anonymous comment for an admitted request.
    ///
    /// Checks run in a fixed order and stop at the first failure: empty
    /// content, captcha, content length, parent post. A request rejected here
    /// has already counted against the rate limit.
    #[tracing::instrument(skip(self, content, verification_token))]
    pub async fn publish(
        &self,
        post_id: i32,
        content: Option<&str>,
        verification_token: Option<&str>,
    ) -> Result<Comment, CommentError> {
        let content = content.map(str::trim).unwrap_or_default();
        if content.is_empty() {
            return Err(CommentError::EmptyContent);
        }

        self.gate.verify(verification_token).await?;

        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(CommentError::ContentTooLong);
        }

        if !self.with_timeout(self.store.exists(post_id)).await? {
            return Err(CommentError::PostNotFound);
        }

        let new_comment = NewComment {
            content: content.to_string(),
            author_name: self.names.generate(),
            post_id,
        };

        // a post deleted since the existence check surfaces as `PostNotFound`
        let comment = self.with_timeout(self.store.create(new_comment)).await?;
        tracing::debug!(comment_id = comment.id, "Comment created");

        Ok(comment)
    }
}
