pub mod color;
pub mod events;
pub mod fanout;
pub mod handler;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
