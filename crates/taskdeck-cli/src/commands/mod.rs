pub mod conversations;
pub mod demo;
pub mod tasks;
pub mod watch;
