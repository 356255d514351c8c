//! srpc CLI library: the command implementations behind the `srpc` binary,
//! exposed so they can be exercised without spawning a process.

pub mod commands;
