//! Persistence layer: user records and refresh tokens in SQLite.

pub mod users;
pub mod refresh;

pub use users::{SqliteStore, UserStore};
pub use refresh::RefreshTokenStore;
