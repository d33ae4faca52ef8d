//! Common utilities and types shared across The Dash components.

#![warn(clippy::pedantic)]

/// Module for identity token structure (segments, header, claims)
pub mod jwt;

/// Module for the current-time capability
pub mod clock;
