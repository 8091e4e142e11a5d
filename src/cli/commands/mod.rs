//! Subcommands of the `platformer-q` binary

pub mod evaluate;
pub mod export;
pub mod inspect;
pub mod train;
