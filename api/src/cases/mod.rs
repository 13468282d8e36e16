pub mod comment;
pub mod models;
pub mod routes;
pub mod store;
