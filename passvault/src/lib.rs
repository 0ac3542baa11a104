//! Core of a remote secret vault: bearer tokens that bind calls to a user,
//! a per-call authorization gate, and the pipeline that turns a typed secret
//! into an encrypted row and back.
//!
//! Transport and persistence stay outside this crate; they plug in through
//! [`auth::Metadata`] and the repository traits in [`storage`].

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod secrets;
pub mod service;
pub mod storage;
pub mod telemetry;

pub use error::{Code, ServiceError};
