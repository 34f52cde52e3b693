pub mod events;
pub mod merge;
pub mod models;

pub use merge::{Record, merge_records};
pub use models::{Message, Perspective, User};
