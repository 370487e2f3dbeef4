//! Session-owned photo slots
//!
//! Uploads may finish out of order. Every run takes a [`Ticket`] before it
//! starts and only a run newer than the last applied one may write the
//! current-photo slot, so a slow early upload can never replace a later one.

use parking_lot::Mutex;

use crate::error::ValidationError;
use crate::image::{Normalized, NormalizedPhoto, Normalizer, Surface};
use crate::source::{self, PhotoReference};
use crate::upload::RawUpload;

/// Sequence number handed out when a pipeline run starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    /// Stored as the current photo, URL override cleared
    Applied(Normalized),
    /// A newer upload already landed, the result was dropped
    Stale(Normalized),
}

impl Commit {
    pub fn is_applied(&self) -> bool {
        matches!(self, Commit::Applied(_))
    }
}

#[derive(Debug, Default)]
struct Slots {
    photo: Option<NormalizedPhoto>,
    url_override: String,
    issued: u64,
    applied: u64,
}

#[derive(Debug, Default)]
pub struct Session {
    slots: Mutex<Slots>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket {
        let mut slots = self.slots.lock();
        slots.issued += 1;
        Ticket(slots.issued)
    }

    pub fn commit(&self, ticket: Ticket, normalized: Normalized) -> Commit {
        let mut slots = self.slots.lock();
        if ticket.0 <= slots.applied {
            log::debug!(
                "Dropping upload #{} ({} already applied)",
                ticket.0,
                slots.applied
            );
            return Commit::Stale(normalized);
        }

        slots.applied = ticket.0;
        slots.photo = Some(normalized.photo.clone());
        slots.url_override.clear();
        log::debug!("Applied upload #{}", ticket.0);
        Commit::Applied(normalized)
    }

    /// Run one upload and commit it. Failures leave both slots untouched.
    pub fn upload<S: Surface>(
        &self,
        raw: &RawUpload,
        normalizer: &Normalizer<S>,
    ) -> Result<Commit, ValidationError> {
        let ticket = self.begin();
        let normalized = normalizer.run(raw).inspect_err(|e| {
            log::warn!("Upload #{} rejected: {e}", ticket.0);
        })?;
        Ok(self.commit(ticket, normalized))
    }

    pub fn set_url_override(&self, url: impl Into<String>) {
        self.slots.lock().url_override = url.into();
    }

    pub fn clear_url_override(&self) {
        self.slots.lock().url_override.clear();
    }

    pub fn url_override(&self) -> String {
        self.slots.lock().url_override.clone()
    }

    pub fn current_photo(&self) -> Option<NormalizedPhoto> {
        self.slots.lock().photo.clone()
    }

    pub fn photo_reference(&self, fallback_default: &str) -> PhotoReference {
        let slots = self.slots.lock();
        source::resolve(slots.photo.as_ref(), &slots.url_override, fallback_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageFormat, Masking};
    use crate::PhotoConfig;

    const PLACEHOLDER: &str = "placeholder.png";

    fn normalized(tag: u8) -> Normalized {
        Normalized {
            photo: NormalizedPhoto {
                data: vec![tag],
                format: ImageFormat::Jpeg { quality: 70 },
                width: 92,
                height: 92,
            },
            masking: Masking::Rounded,
        }
    }

    #[test]
    fn empty_session_uses_placeholder() {
        let session = Session::new();
        assert_eq!(
            session.photo_reference(PLACEHOLDER),
            PhotoReference::Default(PLACEHOLDER.to_string())
        );
    }

    #[test]
    fn later_ticket_wins_regardless_of_completion_order() {
        let session = Session::new();
        let first = session.begin();
        let second = session.begin();

        assert!(session.commit(second, normalized(2)).is_applied());
        assert!(!session.commit(first, normalized(1)).is_applied());
        assert_eq!(session.current_photo().unwrap().data, vec![2]);
    }

    #[test]
    fn in_order_completions_all_apply() {
        let session = Session::new();
        let first = session.begin();
        let second = session.begin();

        assert!(session.commit(first, normalized(1)).is_applied());
        assert!(session.commit(second, normalized(2)).is_applied());
        assert_eq!(session.current_photo().unwrap().data, vec![2]);
    }

    #[test]
    fn url_overrides_existing_upload_until_next_upload() {
        let session = Session::new();
        let ticket = session.begin();
        session.commit(ticket, normalized(1));

        session.set_url_override("https://example.com/me.png");
        assert_eq!(
            session.photo_reference(PLACEHOLDER),
            PhotoReference::RemoteUrl("https://example.com/me.png".to_string())
        );

        let ticket = session.begin();
        session.commit(ticket, normalized(2));
        assert_eq!(session.url_override(), "");
        assert_eq!(
            session.photo_reference(PLACEHOLDER),
            PhotoReference::Upload(normalized(2).photo)
        );
    }

    #[test]
    fn stale_commit_keeps_url_override() {
        let session = Session::new();
        let old = session.begin();
        let new = session.begin();
        session.commit(new, normalized(2));
        session.set_url_override("https://example.com/me.png");

        session.commit(old, normalized(1));
        assert_eq!(session.url_override(), "https://example.com/me.png");
    }

    #[test]
    fn rejected_upload_changes_nothing() {
        let session = Session::new();
        let ticket = session.begin();
        session.commit(ticket, normalized(1));
        session.set_url_override("https://example.com/me.png");

        let normalizer = Normalizer::new(PhotoConfig::default());
        let too_big = RawUpload::new(vec![0; 600 * 1024], Some("image/png".to_string()));
        let err = session.upload(&too_big, &normalizer).unwrap_err();

        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
        assert_eq!(session.current_photo().unwrap().data, vec![1]);
        assert_eq!(session.url_override(), "https://example.com/me.png");
    }

    #[test]
    fn clearing_the_override_restores_the_upload() {
        let session = Session::new();
        let ticket = session.begin();
        session.commit(ticket, normalized(1));
        session.set_url_override("https://example.com/me.png");
        session.clear_url_override();

        assert_eq!(
            session.photo_reference(PLACEHOLDER),
            PhotoReference::Upload(normalized(1).photo)
        );
    }
}
