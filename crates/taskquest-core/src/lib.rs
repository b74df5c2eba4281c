pub mod error;
pub mod stats;
pub mod task;
pub mod user;

pub use error::QuestError;
pub use stats::{Profile, UserStats};
pub use task::{Completion, Difficulty, Task, TaskKind, TaskType};
pub use user::{Credentials, Session, SignUp, User};
