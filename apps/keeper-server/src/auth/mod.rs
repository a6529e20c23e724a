// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Login/password accounts with signed session cookies.
//!
//! ## Auth Flow
//!
//! 1. Client calls `/register` or `/login` with `{login, password}`
//! 2. Server verifies (or creates) the Argon2 hash and sets
//!    `keeper_session=<token>`
//! 3. Every other route runs the [`Auth`] extractor, which verifies the
//!    token MAC and expiry and yields the user id
//!
//! The storage core only ever sees the resolved user id.

pub mod error;
pub mod extractor;
pub mod password;
pub mod session;

pub use error::AuthError;
pub use extractor::{Auth, AuthenticatedUser};
pub use password::{hash_password, verify_password};
pub use session::{SessionManager, SESSION_COOKIE};
