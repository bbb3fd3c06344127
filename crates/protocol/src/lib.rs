#![forbid(unsafe_code)]

mod command;
mod parse;
mod reply;

pub use command::{Arity, Command, CommandKind};
pub use parse::Parse;
pub use reply::Reply;
