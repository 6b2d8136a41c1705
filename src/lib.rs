//! Traffic Flow Simulation Library
//!
//! A tick-driven traffic simulation that runs headless, either stepped by a
//! host or on a background thread.

pub mod simulation;
