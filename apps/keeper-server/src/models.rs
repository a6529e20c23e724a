// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wire and storage shapes shared by the server and the client.
//!
//! Every secret travels inside an [`Envelope`]: a kind tag plus an opaque
//! payload holding the JSON of the matching payload struct. The payload is
//! carried as a base64 string in JSON bodies.

use std::fmt;

use base64ct::{Base64, Encoding};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

// =============================================================================
// Record kinds
// =============================================================================

/// Discriminator selecting the payload shape of an envelope.
///
/// Unrecognized strings deserialize to `Unknown`, which every operation
/// treats as a terminal no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Password,
    Text,
    Card,
    Binary,
    #[serde(other)]
    Unknown,
}

impl RecordKind {
    /// Kinds that own a sub-collection in every namespace.
    pub const STORED: [RecordKind; 4] = [
        RecordKind::Password,
        RecordKind::Text,
        RecordKind::Card,
        RecordKind::Binary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Password => "password",
            RecordKind::Text => "text",
            RecordKind::Card => "card",
            RecordKind::Binary => "binary",
            RecordKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// Generic `(kind, payload)` wrapper used by every secret operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// Base64 of the JSON-encoded payload for `kind`.
    #[serde(default, with = "base64_payload")]
    #[schema(value_type = String, format = Byte)]
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Empty envelope returned for unrecognized kinds.
    pub fn unknown() -> Self {
        Self {
            kind: RecordKind::Unknown,
            payload: Vec::new(),
        }
    }

    /// Serialize `payload` and wrap it under `kind`.
    pub fn wrap<T: Serialize>(kind: RecordKind, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind,
            payload: serde_json::to_vec(payload)?,
        })
    }

    /// Deserialize the payload as `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

mod base64_payload {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            Some(s) => Base64::decode_vec(&s).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Login/password pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PasswordPayload {
    pub name: String,
    #[serde(default)]
    pub password: String,
}

/// Free-form text note.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TextPayload {
    pub name: String,
    #[serde(default)]
    pub text: String,
}

/// Payment card. Only the CVV is sealed at rest.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CardPayload {
    pub name: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub cvv: String,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub year: String,
}

/// Reference to an uploaded file. The stored path stays on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BinaryPayload {
    pub name: String,
}

/// Minimal payload used to address a record by name in a Get request.
#[derive(Debug, Clone, Deserialize)]
pub struct NameOnly {
    pub name: String,
}

// Secret-bearing payloads never print their secret fields.

impl fmt::Debug for PasswordPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordPayload")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for TextPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextPayload")
            .field("name", &self.name)
            .field("text", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for CardPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardPayload")
            .field("name", &self.name)
            .field("number", &"<redacted>")
            .field("cvv", &"<redacted>")
            .field("month", &self.month)
            .field("year", &self.year)
            .finish()
    }
}

// =============================================================================
// Catalog and account shapes
// =============================================================================

/// Payload-free catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Summary {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub name: String,
}

/// Body of `/register` and `/login`.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}
