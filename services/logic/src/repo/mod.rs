pub mod inbox;
pub mod messages;
pub mod outbox;
pub mod read_position;
pub mod sessions;
