//! Storage engine for userbase
//!
//! A single JSON document holding every user record.

mod users;

pub use users::UserStore;
