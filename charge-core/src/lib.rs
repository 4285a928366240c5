#![no_std]

// Shared logic for the charge-line monitor.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and by keeping every state machine generic over a
// monotonic instant supplied by the caller.

pub mod debounce;
pub mod flap;
pub mod indicator;
pub mod mode;
pub mod monitor;
pub mod notify;
pub mod state;
