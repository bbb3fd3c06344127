#![forbid(unsafe_code)]

pub mod aof;
mod db;
mod entry;

pub use aof::{Aof, FsyncPolicy, replay};
pub use db::{Db, MAX_TTL_SECS};
