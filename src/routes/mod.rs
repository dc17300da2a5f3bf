//! src/routes/mod.rs

mod health_check;
mod home;
mod lead_magnet;
mod payload;
mod send_email;
mod subscriptions;
mod unsubscribe;

pub use health_check::*;
pub use home::*;
pub use lead_magnet::*;
pub use payload::*;
pub use send_email::*;
pub use subscriptions::*;
pub use unsubscribe::*;
