pub mod projects;
pub mod subtasks;
pub mod tasks;
