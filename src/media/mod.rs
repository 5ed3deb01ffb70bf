// Media-transcoder integration: argument-vector construction and the
// up-front duration probe. Execution itself goes through the process
// supervisor; everything in this module is data and one synchronous query.

pub mod commands;
pub mod probe;

pub use commands::{MediaCommand, MediaCommandBuilder};
pub use probe::probe_duration;
