pub mod anon_name;
pub mod create;
pub mod get;

use std::{sync::Arc, time::Duration};

use axum::http::StatusCode;

use self::anon_name::AnonymousNameGenerator;
use super::store::{CommentStore, StoreError};
use crate::{
    error::{ApiRequestError, AppError, ServerError},
    rate_limit::RateLimiter,
    turnstile::{VerificationError, VerificationGate},
};

pub const MAX_CONTENT_CHARS: usize = 500;
pub const PAGE_SIZE: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum CommentError {
    #[error("ID inválido")]
    InvalidId,

    #[error("Has publicado demasiados comentarios. Intenta de nuevo en un minuto.")]
    RateLimited,

    #[error("El contenido del comentario es requerido")]
    EmptyContent,

    #[error("El comentario no puede exceder los {MAX_CONTENT_CHARS} caracteres")]
    ContentTooLong,

    #[error("Por favor, completa el captcha de seguridad.")]
    MissingToken,

    #[error("Captcha inválido. Por favor intenta recargando la página.")]
    InvalidToken,

    #[error("captcha verification failed: {0}")]
    VerificationServiceError(reqwest::Error),

    #[error("El post no existe")]
    PostNotFound,

    #[error("persistence failed: {0}")]
    PersistenceError(StoreError),

    #[error("unexpected error: {0}")]
    UnexpectedError(String),
}

impl ApiRequestError for CommentError {
    fn status_code(&self) -> StatusCode {
        match self {
            CommentError::InvalidId
            | CommentError::EmptyContent
            | CommentError::ContentTooLong
            | CommentError::MissingToken
            | CommentError::InvalidToken => StatusCode::BAD_REQUEST,
            CommentError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            CommentError::PostNotFound => StatusCode::NOT_FOUND,
            CommentError::VerificationServiceError(_)
            | CommentError::PersistenceError(_)
            | CommentError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CommentError::InvalidId => "INVALID_ID",
            CommentError::RateLimited => "RATE_LIMITED",
            CommentError::EmptyContent => "EMPTY_CONTENT",
            CommentError::ContentTooLong => "CONTENT_TOO_LONG",
            CommentError::MissingToken => "CAPTCHA_MISSING",
            CommentError::InvalidToken => "CAPTCHA_INVALID",
            CommentError::PostNotFound => "POST_NOT_FOUND",
            CommentError::VerificationServiceError(_)
            | CommentError::PersistenceError(_)
            | CommentError::UnexpectedError(_) => "SERVER_ERR",
        }
    }
}

impl From<VerificationError> for CommentError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::MissingToken => CommentError::MissingToken,
            VerificationError::InvalidToken => CommentError::InvalidToken,
            VerificationError::ServiceError(e) => CommentError::VerificationServiceError(e),
        }
    }
}

impl From<StoreError> for CommentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MissingPost(_) => CommentError::PostNotFound,
            e => CommentError::PersistenceError(e),
        }
    }
}

impl From<CommentError> for AppError {
    fn from(e: CommentError) -> Self {
        match e {
            CommentError::VerificationServiceError(e) => {
                AppError::server(ServerError::Verification(e))
            }
            CommentError::PersistenceError(e) => AppError::server(ServerError::Store(e)),
            CommentError::UnexpectedError(e) => AppError::server(ServerError::Unexpected(e)),
            e => AppError::from_request_error(&e),
        }
    }
}

/// Parses a path or query id. Only positive integers name rows.
pub fn parse_id(raw: &str) -> Result<i32, CommentError> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CommentError::InvalidId),
    }
}

/// Everything the comment endpoints need: the store plus the abuse
/// mitigation in front of it.
pub struct CommentService {
    store: Arc<dyn CommentStore>,
    limiter: Arc<dyn RateLimiter>,
    gate: Arc<dyn VerificationGate>,
    names: AnonymousNameGenerator,
    store_timeout: Duration,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn CommentStore>,
        limiter: Arc<dyn RateLimiter>,
        gate: Arc<dyn VerificationGate>,
        names: AnonymousNameGenerator,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            limiter,
            gate,
            names,
            store_timeout,
        }
    }

    async fn with_timeout<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))?
    }
}
