pub mod auth;
pub mod clinical;
