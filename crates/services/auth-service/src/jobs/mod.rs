//! Background jobs.

mod sweeper;

pub use sweeper::{run_sweep_loop, sweep_once};
