//! SafeWalk library: portable proximity engine for a personal-safety app.
//!
//! Answers two questions about a location fix: is the user inside a known
//! unsafe hotspot, and which police stations, hospitals or pharmacies are
//! closest. All geometry, ranking, search glue and protocol logic lives
//! here with no platform dependencies, testable on any host with
//! `cargo test`. Platform shells (the mobile app, the `safewalk-host`
//! companion) supply location, place search, the dialer and alert delivery
//! through the traits in [`provider`].
//!
//! Modules:
//! - `geo`, `hotspot`, `nearby`, `format`: distance math, geofencing,
//!   ranking and labels.
//! - `search`, `session`, `dialer`: nearby lookup flow and calling.
//! - `defaults`, `protocol`, `bridge`: reference data, JSON wire types and
//!   NDJSON framing.
//!
//! `no_std`, no allocator.

#![cfg_attr(not(test), no_std)]

pub mod bridge;
pub mod defaults;
pub mod dialer;
pub mod format;
pub mod geo;
pub mod hotspot;
pub mod nearby;
pub mod protocol;
pub mod provider;
pub mod search;
pub mod session;
