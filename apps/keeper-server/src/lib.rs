// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keeper - Multi-user Encrypted Secret Vault
//!
//! Stores passwords, text notes, payment cards and files for many users.
//! Each user owns an isolated namespace of tables in an embedded ACID
//! database; sensitive fields are sealed with AES-256-GCM before they are
//! written, and files move through a bounded relay instead of memory.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Account passwords and signed session cookies
//! - `client` - HTTP client for the vault API
//! - `dispatch` - Envelope validation and routing to the record store
//! - `storage` - redb tables, per-user namespaces, sealed records
//! - `transfer` - Streaming upload and download pipeline

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod crypto;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
pub mod transfer;
