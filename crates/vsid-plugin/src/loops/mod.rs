//! Background loops.

pub mod scheduler;
