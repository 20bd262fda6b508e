//! Booking scheduling and conflict-resolution engine for a
//! consultation-booking platform.
//!
//! The engine decides whether a requested time slot for a consultant is
//! available, reserves it with a time-limited hold, and guarantees that two
//! concurrent clients are never granted the same slot. Working hours and
//! holidays come from the read-only [`calendar::CalendarSource`] port;
//! service durations from the [`catalog::BookableCatalog`] port; lifecycle
//! events go out through [`notify::NotifyHub`] for the notification/chat
//! layer to react to.

pub mod calendar;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod journal;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod sweeper;

pub use engine::{BookingError, Engine};
pub use config::EngineConfig;
