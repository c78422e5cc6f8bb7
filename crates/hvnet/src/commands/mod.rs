//! Command handlers.

pub mod config_cmd;
pub mod man;
pub mod map;
pub mod plan;
pub mod prompt;
pub mod util;
