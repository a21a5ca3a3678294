//! # QC Station Core Library
//!
//! Library behind the `qc-station` command-line front end. It reads
//! measurements from serial instruments, checks them against the acceptable
//! ranges configured per order, stages them for review and commits them to the
//! shared SQLite database with gap-free per-order serial numbers.
//!
//! ## Crate Structure
//!
//! - **`auth`**: password hashing, login and the role gate.
//! - **`capture`**: the capture pipeline (range lookup, validation, serial
//!   sequencing, staging and confirmed commit) around a `CaptureSession`.
//! - **`config`**: figment-based configuration (`config/qc_station.toml` plus
//!   `QC_STATION_*` environment overrides).
//! - **`error`**: the `thiserror` error enums for each layer and the top-level `QcError`.
//! - **`instrument`**: the `Instrument` / `Connector` link traits with serial,
//!   scripted, simulated and async implementations.
//! - **`logging`**: `tracing-subscriber` initialisation.
//! - **`model`**: orders, parameter specs, measurements, users and roles.
//! - **`report`**: filtered measurement reports as table, JSON or CSV.
//! - **`store`**: the SQLite store, one short-lived connection per operation.
//! - **`validation`**: small validators shared by configuration and the CLI.

pub mod auth;
pub mod capture;
pub mod config;
pub mod error;
pub mod instrument;
pub mod logging;
pub mod model;
pub mod report;
pub mod store;
pub mod validation;
