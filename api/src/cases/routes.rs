use axum::{Router, routing::get};

use crate::App;

use super::comment::{create::create_comment, get::get_comments};

pub fn route() -> Router<App> {
    Router::<App>::new().route("/{id}/comments", get(get_comments).post(create_comment))
}
