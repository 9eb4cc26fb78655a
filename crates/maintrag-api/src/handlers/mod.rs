mod ask;
mod health;
mod sessions;

pub use ask::handle_ask;
pub use health::health_check;
pub use sessions::{ask_in_session, create_session, delete_session, reset_session};
