//! # CLI Command Implementations
//!
//! One module per `ctt` subcommand. Each has an `Args` struct derived with
//! `clap` and an `execute` function that calls into the `ctt` library and
//! turns its errors into hinted, user-facing messages.

pub mod render;
pub mod temporal;
