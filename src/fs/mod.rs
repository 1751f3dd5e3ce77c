//! Filesystem primitives for agentlock.
//!
//! Every lease mutation goes through this module so that a concurrently
//! racing agent never observes a partially written record.

pub mod atomic;

pub use atomic::atomic_write;
