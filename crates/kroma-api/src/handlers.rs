//! Request handlers.

pub mod health;
pub mod projects;
pub mod scenes;
pub mod users;

pub use health::*;
