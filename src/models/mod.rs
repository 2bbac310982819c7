pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskCategory, TaskChanges, TaskPage};
pub use user::{NewUser, ProfileChanges, Role, User, UserResponse};
