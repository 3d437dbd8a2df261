//! Bluetooth Module
//!
//! Provides the BLE protocol used to collect status from NB2 amplifiers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    DiscoveryService                      │
//! │   (scan → drain → sessions → clear, one cycle a time)    │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼──────────────┐
//!         │             │              │
//!         ▼             ▼              ▼
//! ┌────────────┐  ┌────────────┐  ┌──────────┐
//! │  Registry  │  │ Session    │  │ Protocol │
//! │            │  │ Controller │  │          │
//! │ - filter   │  │ - GATT     │  │ - UUIDs  │
//! │ - dedup    │  │   reads    │  │ - scripts│
//! │            │  │ - commands │  │ - codec  │
//! └────────────┘  └─────┬──────┘  └──────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │ BleTransport  │ (WinRT on Windows, mock in tests)
//!               └───────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - GATT identifiers and command frames
//! - [`codec`] - Binary register decoding
//! - [`transport`] - Transport capability interface
//! - [`executor`] - Command script execution
//! - [`connection`] - Per-peer session controller
//! - [`outcome`] - Session result records
//! - [`service`] - Discovery cycle coordinator

pub mod codec;
pub mod connection;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod protocol;
pub mod service;
pub mod transport;

#[cfg(windows)]
pub mod scanner;
#[cfg(windows)]
pub mod winrt;

#[cfg(test)]
pub mod mock;

// Re-export main service for convenience
pub use service::{DiscoveryConfig, DiscoveryService};
