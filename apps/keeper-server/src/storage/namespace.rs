// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-user storage namespaces.
//!
//! A namespace is the table-name prefix owning one user's four
//! sub-collections. It is derived from the user id through an allow-list
//! transform, so nothing user-controlled ever reaches a table name verbatim:
//!
//! - ASCII alphanumerics pass through
//! - `_` becomes `__`
//! - every other byte becomes `_HH` (uppercase hex)
//!
//! The mapping is injective: distinct ids always yield distinct namespaces.

use std::fmt;

use crate::models::RecordKind;

/// Prefix of every namespace name.
pub const NAMESPACE_PREFIX: &str = "id";

/// Sanitized storage scope of a single user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Derive the namespace owned by `user_id`.
    pub fn for_user(user_id: &str) -> Self {
        let mut name = String::with_capacity(NAMESPACE_PREFIX.len() + user_id.len() * 3);
        name.push_str(NAMESPACE_PREFIX);
        for byte in user_id.bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => name.push(byte as char),
                b'_' => name.push_str("__"),
                other => {
                    name.push('_');
                    name.push_str(&format!("{other:02X}"));
                }
            }
        }
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Table holding this namespace's records of `kind`.
    ///
    /// Returns `None` for [`RecordKind::Unknown`], which has no table.
    pub fn table(&self, kind: RecordKind) -> Option<String> {
        match kind {
            RecordKind::Unknown => None,
            stored => Some(format!("{}.{}", self.0, stored.as_str())),
        }
    }

    /// All four sub-collection table names.
    pub fn tables(&self) -> [(RecordKind, String); 4] {
        RecordKind::STORED.map(|kind| (kind, format!("{}.{}", self.0, kind.as_str())))
    }

    /// Associated data binding a sealed field to its row.
    pub fn aad(&self, kind: RecordKind, name: &str) -> Vec<u8> {
        format!("{}/{}/{}", self.0, kind.as_str(), name).into_bytes()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
