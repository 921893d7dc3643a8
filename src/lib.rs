//! Kiwoom Bridge - a session-bound OAuth token gateway for the Kiwoom
//! brokerage REST API.
//!
//! This library manages the token lifecycle behind the gateway: acquiring,
//! persisting, validating and revoking a brokerage access token tied to an
//! HTTP session.

pub mod api;
pub mod config;
pub mod models;
pub mod services;
