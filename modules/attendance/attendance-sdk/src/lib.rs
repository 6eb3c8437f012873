//! Attendance SDK
//!
//! This crate provides the public contract for talking to the attendance
//! backend: the people and attendance API traits, their wire models, and
//! the client-layer error taxonomy.
//!
//! ## API Traits
//!
//! - `PeopleApi` - list, search, fetch and create people
//! - `AttendanceApi` - per-date attendance records, marking and statistics
//!
//! ## Usage
//!
//! ```ignore
//! use attendance_sdk::{PeopleApi, ErrorCode};
//!
//! match people.search("dupont").await {
//!     Ok(found) => println!("{} match(es)", found.len()),
//!     Err(e) if e.code == ErrorCode::NetworkError => eprintln!("offline"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod error;
pub mod models;

// API traits
pub use api::{AttendanceApi, PeopleApi};

// Error types
pub use error::{ApiError, ErrorCode};

// Models
pub use models::{AttendanceRecord, AttendanceStats, NewPerson, Person};
