//! # drc-host: DRC gamepad host service
//!
//! Runs a [`drc_core::Streamer`] against a real gamepad, applies the
//! configured device settings, and logs controller input as it changes.
//! Useful for checking the link before wiring up a video source.

pub mod config;
pub mod service;
