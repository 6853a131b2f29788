//! Thread Relay - Message-dispatch core for multi-turn assistant conversations
//!
//! This crate routes commands, events, and queries through a statically-wired
//! handler registry, and models conversations as turn-based aggregates whose
//! state changes emit the events the dispatch loop distributes.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
