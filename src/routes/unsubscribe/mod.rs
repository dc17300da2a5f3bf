//! src/routes/unsubscribe/mod.rs

mod get;
mod post;

pub use get::{unsubscribe_form, TurnstileSiteKey};
pub use post::{unsubscribe, UnsubscribeError};
