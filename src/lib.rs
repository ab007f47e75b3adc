//! # presslog - durable button-event logging for embedded devices
//!
//! `presslog` watches a handful of digital inputs (buttons), turns each
//! press into a timestamped line in a date-rotated log file, mirrors the
//! same line to an MQTT topic, and serves the log files over a tiny HTTP
//! interface. It also records why the device booted and wipes all logs when
//! a configured pair of buttons is held together.
//!
//! The library is `no_std` by default and allocation-free. Everything the
//! agent needs from the board is a trait:
//!
//! | Collaborator        | Trait                                   | Stock implementations                |
//! |---------------------|-----------------------------------------|--------------------------------------|
//! | input pins          | [`input::InputPins`]                    | board-specific                       |
//! | wall clock          | [`clock::ClockProvider`]                | [`clock::UnixClock`], `SystemClock`  |
//! | persistent store    | [`storage::FileStore`]                  | [`storage::MemStore`], `DirStore`    |
//! | publish/subscribe   | [`forward::ChannelClient`]              | [`network::application::mqtt::MqttChannel`] |
//! | network join state  | [`network::Connectivity`]               | [`network::AlwaysConnected`]         |
//! | TCP client / server | [`network::Connect`], [`network::Bind`] | `TcpConnector`, `TcpListener`        |
//! | reset cause         | [`boot::ResetSource`]                   | [`boot::FixedReset`]                 |
//!
//! ## Event pipeline
//!
//! 1. [`input::InputMonitor`] samples every line once per tick and emits one
//!    event per transition to the active level.
//! 2. [`clock::TimestampResolver`] stamps it, or substitutes `unknown-time`.
//! 3. [`logbook::LogStore`] appends `<timestamp> <label>` to
//!    `log-<YYYY-MM-DD>.txt` (or `log-unknown.txt`).
//! 4. [`forward::ForwardingChannel`] publishes the same line if connected,
//!    and drops it otherwise.
//!
//! [`agent::Agent`] wires these together with the
//! [`trigger::BulkClearTrigger`], the [`boot::BootRecorder`] and the
//! [`retrieval`] HTTP handlers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use presslog::agent::{Agent, Parts};
//! use presslog::config::AgentConfig;
//!
//! let config = AgentConfig::from_json(include_str!("presslog.json"))?;
//! let mut agent = Agent::new(&config, Parts { pins, clock, store, channel, network })?;
//! agent.start(&mut reset_source, uptime_ms())?;
//!
//! loop {
//!     let report = agent.tick(uptime_ms());
//!     agent.serve(&mut listener)?;
//!     delay_ms(config.tick_interval_ms);
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `std`: host adapters (`DirStore`, `SystemClock`, `TcpConnector`,
//!   `TcpListener`)
//! - `defmt`: diagnostics through `defmt` instead of being compiled out

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Network abstraction layer: connection traits, MQTT client, HTTP server
/// side and host TCP adapters.
pub mod network;

/// Persistent store abstraction with RAM and directory backends.
pub mod storage;

pub mod agent;
pub mod boot;
pub mod clock;
pub mod config;
pub mod event;
pub mod forward;
pub mod input;
pub mod logbook;
pub mod retrieval;
pub mod trigger;
