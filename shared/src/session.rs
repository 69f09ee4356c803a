//! In-memory session state: profile, trusted contacts, watch status and the
//! emergency history. Everything lives for the lifetime of the process only.
//!
//! The store is held by the [`crate::Model`] and only changes through the
//! named actions below. Actions validate before touching state, so a failed
//! action leaves the store as it was.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::info;

use crate::countdown::PinCode;
use crate::{AppError, ContactId, ErrorKind, LogEntryId, DEFAULT_HEART_RATE_BPM};

pub const NEAREST_STATION_LABEL: &str = "Nearest Station";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactError {
    #[error("You can add at most {max} trusted contacts")]
    LimitReached { max: usize },

    #[error("This phone number is already in your contacts")]
    DuplicatePhone { phone: String },

    #[error("Contact {field} is required")]
    MissingField { field: &'static str },

    #[error("Contact not found")]
    NotFound { id: ContactId },
}

impl From<ContactError> for AppError {
    fn from(e: ContactError) -> Self {
        let kind = match &e {
            ContactError::LimitReached { .. } => ErrorKind::LimitReached,
            ContactError::DuplicatePhone { .. } => ErrorKind::Conflict,
            ContactError::MissingField { .. } => ErrorKind::Validation,
            ContactError::NotFound { .. } => ErrorKind::NotFound,
        };
        let err = AppError::new(kind, e.to_string());
        match e {
            ContactError::DuplicatePhone { phone } => err.with_context("phone", phone),
            ContactError::NotFound { id } => err.with_context("contact_id", id.0),
            _ => err,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    /// Station staff. Nothing in the app signs in as admin yet; the shell
    /// hides admin screens unless `ProfileView::is_admin` is set.
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub phone: String,
    pub age: u8,
    pub gender: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStatus {
    pub connected: bool,
    pub heart_rate_bpm: u16,
    pub motion_active: bool,
    pub mic_active: bool,
}

impl Default for WatchStatus {
    fn default() -> Self {
        Self {
            connected: true,
            heart_rate_bpm: DEFAULT_HEART_RATE_BPM,
            motion_active: true,
            mic_active: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Hi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyStatus {
    Sent,
    Cancelled,
}

/// A past emergency. Built once, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyLogEntry {
    id: LogEntryId,
    date: String,
    time: String,
    location: String,
    station: String,
    status: EmergencyStatus,
}

impl EmergencyLogEntry {
    #[must_use]
    pub fn new(
        id: LogEntryId,
        date: impl Into<String>,
        time: impl Into<String>,
        location: impl Into<String>,
        station: impl Into<String>,
        status: EmergencyStatus,
    ) -> Self {
        Self {
            id,
            date: date.into(),
            time: time.into(),
            location: location.into(),
            station: station.into(),
            status,
        }
    }

    /// Stamps a new entry with the wall clock shifted by `utc_offset_minutes`.
    #[must_use]
    pub fn at(
        now_ms: u64,
        utc_offset_minutes: i32,
        location: impl Into<String>,
        station: impl Into<String>,
        status: EmergencyStatus,
    ) -> Self {
        let (date, time) = format_log_timestamp(now_ms, utc_offset_minutes);
        Self::new(LogEntryId::generate(), date, time, location, station, status)
    }

    #[must_use]
    pub fn id(&self) -> &LogEntryId {
        &self.id
    }

    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    #[must_use]
    pub fn time(&self) -> &str {
        &self.time
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn station(&self) -> &str {
        &self.station
    }

    #[must_use]
    pub const fn status(&self) -> EmergencyStatus {
        self.status
    }
}

/// `("YYYY-MM-DD", "HH:MM")` for a unix millisecond timestamp.
#[must_use]
pub fn format_log_timestamp(now_ms: u64, utc_offset_minutes: i32) -> (String, String) {
    let utc = i64::try_from(now_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_default();
    let offset = utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    let local = utc.with_timezone(&offset);
    (
        local.format("%Y-%m-%d").to_string(),
        local.format("%H:%M").to_string(),
    )
}

#[must_use]
pub fn sample_history() -> Vec<EmergencyLogEntry> {
    vec![
        EmergencyLogEntry::new(
            LogEntryId::new("1"),
            "2026-02-15",
            "23:45",
            "Connaught Place, Delhi",
            "CP Police Station",
            EmergencyStatus::Sent,
        ),
        EmergencyLogEntry::new(
            LogEntryId::new("2"),
            "2026-02-10",
            "21:30",
            "MG Road, Bangalore",
            "MG Road Station",
            EmergencyStatus::Cancelled,
        ),
    ]
}

#[derive(Debug, Default)]
pub struct SessionStore {
    user: Option<UserProfile>,
    pin: Option<PinCode>,
    contacts: Vec<Contact>,
    watch: WatchStatus,
    language: Language,
    emergency_logs: VecDeque<EmergencyLogEntry>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_history(history: impl IntoIterator<Item = EmergencyLogEntry>) -> Self {
        Self {
            emergency_logs: history.into_iter().collect(),
            ..Self::default()
        }
    }

    // --- accessors ---

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn pin(&self) -> Option<&PinCode> {
        self.pin.as_ref()
    }

    #[must_use]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    #[must_use]
    pub const fn watch(&self) -> WatchStatus {
        self.watch
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Newest first.
    pub fn emergency_logs(&self) -> impl Iterator<Item = &EmergencyLogEntry> {
        self.emergency_logs.iter()
    }

    #[must_use]
    pub fn emergency_log_count(&self) -> usize {
        self.emergency_logs.len()
    }

    // --- actions ---

    pub fn login(&mut self, user: UserProfile, pin: Option<PinCode>) {
        info!(role = ?user.role, "user signed in");
        self.user = Some(user);
        if pin.is_some() {
            self.pin = pin;
        }
    }

    pub fn logout(&mut self) {
        info!("user signed out");
        self.user = None;
        self.pin = None;
        self.contacts.clear();
    }

    pub fn add_contact(
        &mut self,
        name: &str,
        phone: &str,
        max_contacts: usize,
    ) -> Result<&Contact, ContactError> {
        let name = name.trim();
        let phone = phone.trim();

        if self.contacts.len() >= max_contacts {
            return Err(ContactError::LimitReached { max: max_contacts });
        }
        if name.is_empty() {
            return Err(ContactError::MissingField { field: "name" });
        }
        if phone.is_empty() {
            return Err(ContactError::MissingField { field: "phone" });
        }
        if self.contacts.iter().any(|c| c.phone == phone) {
            return Err(ContactError::DuplicatePhone {
                phone: phone.to_string(),
            });
        }

        let index = self.contacts.len();
        self.contacts.push(Contact {
            id: ContactId::generate(),
            name: name.to_string(),
            phone: phone.to_string(),
        });
        Ok(&self.contacts[index])
    }

    pub fn remove_contact(&mut self, id: &ContactId) -> Result<Contact, ContactError> {
        let index = self
            .contacts
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| ContactError::NotFound { id: id.clone() })?;
        Ok(self.contacts.remove(index))
    }

    pub fn set_watch_connected(&mut self, connected: bool) {
        self.watch.connected = connected;
    }

    pub fn report_vitals(&mut self, heart_rate_bpm: u16, motion_active: bool, mic_active: bool) {
        self.watch.heart_rate_bpm = heart_rate_bpm;
        self.watch.motion_active = motion_active;
        self.watch.mic_active = mic_active;
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn add_emergency_log(&mut self, entry: EmergencyLogEntry) {
        info!(id = %entry.id, status = ?entry.status, "emergency logged");
        self.emergency_logs.push_front(entry);
    }
}
