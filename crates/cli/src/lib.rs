//! ADSM CLI library: subcommands of the `adsm` binary

pub mod commands;
