#![forbid(unsafe_code)]

mod config;
mod connection;
mod dispatcher;
pub mod handler;
mod server;

pub use config::Config;
pub use connection::Connection;
pub use dispatcher::{Dispatched, Dispatcher};
pub use handler::handle_connection;
pub use server::{Server, restore};
