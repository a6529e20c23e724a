// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Envelope dispatch.
//!
//! Every operation switches on the envelope kind, decodes the matching
//! payload, validates it and hands it to the encrypted field store. An
//! `unknown` kind is a terminal no-op that answers with an empty `unknown`
//! envelope.
//!
//! Validation always runs before storage is touched: an invalid card never
//! reaches a table.

use chrono::{Datelike, Utc};
use serde::de::DeserializeOwned;

use crate::crypto::FieldCipher;
use crate::error::{VaultError, VaultResult};
use crate::models::{
    CardPayload, Envelope, NameOnly, PasswordPayload, RecordKind, Summary, TextPayload,
};
use crate::storage::records::StoredFile;
use crate::storage::{Catalog, SecretRecord, SecretStore, VaultDatabase};

/// Longest accepted record name, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Result of a Get: an envelope, or a file to stream back.
#[derive(Debug)]
pub enum Retrieved {
    Envelope(Envelope),
    File(StoredFile),
}

pub struct Dispatcher<'a> {
    store: SecretStore<'a>,
    catalog: Catalog<'a>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(db: &'a VaultDatabase, cipher: &'a FieldCipher) -> Self {
        Self {
            store: SecretStore::new(db, cipher),
            catalog: Catalog::new(db),
        }
    }

    /// Validate and store the record in `envelope`.
    ///
    /// Returns an empty envelope of the stored kind, or an empty `unknown`
    /// envelope when the kind is not recognized.
    pub fn put(&self, user_id: &str, envelope: &Envelope) -> VaultResult<Envelope> {
        match envelope.kind {
            RecordKind::Password => {
                let record: PasswordPayload = decode(envelope)?;
                validate_password(&record)?;
                self.store_record(user_id, &record)?;
            }
            RecordKind::Text => {
                let record: TextPayload = decode(envelope)?;
                validate_text(&record)?;
                self.store_record(user_id, &record)?;
            }
            RecordKind::Card => {
                let mut record: CardPayload = decode(envelope)?;
                validate_card(&mut record)?;
                self.store_record(user_id, &record)?;
            }
            RecordKind::Binary => {
                return Err(VaultError::validation(
                    "binary records are uploaded through /put/binary",
                ));
            }
            RecordKind::Unknown => {
                tracing::debug!(user_id = %user_id, "Put with unknown kind ignored");
                return Ok(Envelope::unknown());
            }
        }

        Ok(Envelope {
            kind: envelope.kind,
            payload: Vec::new(),
        })
    }

    /// Look up the record named in `envelope`.
    pub fn get(&self, user_id: &str, envelope: &Envelope) -> VaultResult<Retrieved> {
        let kind = envelope.kind;
        if kind == RecordKind::Unknown {
            tracing::debug!(user_id = %user_id, "Get with unknown kind ignored");
            return Ok(Retrieved::Envelope(Envelope::unknown()));
        }

        let NameOnly { name } = decode(envelope)?;
        validate_name(&name)?;

        let wrapped = match kind {
            RecordKind::Password => self.load::<PasswordPayload>(user_id, &name)?,
            RecordKind::Text => self.load::<TextPayload>(user_id, &name)?,
            RecordKind::Card => self.load::<CardPayload>(user_id, &name)?,
            RecordKind::Binary => {
                let file = self.fetch::<StoredFile>(user_id, &name)?;
                return Ok(Retrieved::File(file));
            }
            RecordKind::Unknown => Envelope::unknown(),
        };
        Ok(Retrieved::Envelope(wrapped))
    }

    /// Payload-free summaries of every stored record.
    pub fn list(&self, user_id: &str) -> VaultResult<Vec<Summary>> {
        self.catalog.list(user_id).map_err(|e| {
            tracing::warn!(user_id = %user_id, error = %e, "List failed");
            e.into()
        })
    }

    fn store_record<R: SecretRecord>(&self, user_id: &str, record: &R) -> VaultResult<()> {
        self.store.put(user_id, record).map_err(|e| {
            tracing::debug!(user_id = %user_id, kind = %R::KIND, error = %e, "Put failed");
            e.into()
        })
    }

    fn fetch<R: SecretRecord>(&self, user_id: &str, name: &str) -> VaultResult<R> {
        self.store.get(user_id, name).map_err(|e| {
            tracing::debug!(user_id = %user_id, kind = %R::KIND, error = %e, "Get failed");
            e.into()
        })
    }

    fn load<R>(&self, user_id: &str, name: &str) -> VaultResult<Envelope>
    where
        R: SecretRecord + serde::Serialize,
    {
        let record = self.fetch::<R>(user_id, name)?;
        Envelope::wrap(R::KIND, &record)
            .map_err(|e| VaultError::Internal(format!("encode {} payload: {e}", R::KIND)))
    }
}

fn decode<T: DeserializeOwned>(envelope: &Envelope) -> VaultResult<T> {
    envelope
        .decode()
        .map_err(|e| VaultError::validation(format!("malformed {} payload: {e}", envelope.kind)))
}

// =============================================================================
// Validation
// =============================================================================

/// Non-empty, at most [`MAX_NAME_LEN`] characters, no control characters.
pub fn validate_name(name: &str) -> VaultResult<()> {
    if name.is_empty() {
        return Err(VaultError::validation("name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(VaultError::validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(VaultError::validation(
            "name must not contain control characters",
        ));
    }
    Ok(())
}

fn validate_password(record: &PasswordPayload) -> VaultResult<()> {
    validate_name(&record.name)?;
    if record.password.is_empty() {
        return Err(VaultError::validation("password must not be empty"));
    }
    Ok(())
}

fn validate_text(record: &TextPayload) -> VaultResult<()> {
    validate_name(&record.name)?;
    if record.text.is_empty() {
        return Err(VaultError::validation("text must not be empty"));
    }
    Ok(())
}

/// Validate a card and normalize its number to bare digits.
fn validate_card(record: &mut CardPayload) -> VaultResult<()> {
    validate_name(&record.name)?;

    let number: String = record
        .number
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();
    if !(12..=19).contains(&number.len()) || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VaultError::validation("card number must be 12-19 digits"));
    }
    if !luhn_valid(&number) {
        return Err(VaultError::validation("card number fails checksum"));
    }

    let cvv = record.cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VaultError::validation("cvv must be 3 or 4 digits"));
    }

    let month: u32 = parse_digits(record.month.trim())
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| VaultError::validation("month must be 1-12"))?;

    let year_str = record.year.trim();
    let year = match (year_str.len(), parse_digits(year_str)) {
        (2, Some(yy)) => 2000 + yy as i32,
        (4, Some(yyyy)) => yyyy as i32,
        _ => return Err(VaultError::validation("year must be 2 or 4 digits")),
    };

    let today = Utc::now().date_naive();
    if (year, month) < (today.year(), today.month()) {
        return Err(VaultError::validation("card has expired"));
    }

    record.number = number;
    record.cvv = cvv.to_string();
    Ok(())
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Luhn mod-10 checksum over an all-digit string.
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, b) in digits.bytes().rev().enumerate() {
        let mut d = u32::from(b - b'0');
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}
