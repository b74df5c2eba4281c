pub mod sessions;
pub mod stats;
pub mod tasks;
pub mod users;
