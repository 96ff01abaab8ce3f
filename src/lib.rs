//! # Particle Sandbox
//!
//! Headless front end for the particle engine: a fixed-timestep driver that
//! turns user commands into simulation calls.

pub mod driver;

pub use driver::{Command, Driver};
