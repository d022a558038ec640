pub mod inbox;
pub mod members;
