//! Error types for the Imprint core.
//!
//! Every failure path maps to a distinct variant so a boundary layer can
//! translate outcomes deterministically. [`ImprintError::kind`] exposes the
//! category (input, conflict, policy, transport, state) for that mapping.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::fingerprint::ContentHash;
use crate::ledger::AccountId;
use crate::license::TemplateId;

#[derive(Debug, Error)]
pub enum ImprintError {
    /// The payload could not be decoded as an image.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// License terms failed validation before reaching the ledger.
    #[error("malformed license terms: {0}")]
    MalformedTerms(String),

    /// A record for this content hash already exists on the ownership ledger.
    #[error("content {content_hash} is already registered")]
    AlreadyRegistered { content_hash: ContentHash },

    /// The similarity index already holds a different signature for this hash.
    #[error("conflicting signature for indexed content {content_hash}")]
    ConflictingSignature { content_hash: ContentHash },

    /// A different owner's content is within the infringement threshold.
    /// Carries the matched record so an external policy layer can adjudicate.
    #[error("potential infringement of {matched} (owner {owner}, similarity {score:.3})")]
    PotentialInfringement {
        matched: ContentHash,
        owner: AccountId,
        score: f64,
    },

    /// No content record exists for this hash.
    #[error("no registered content for {0}")]
    UnknownContent(ContentHash),

    /// The caller is not the registered owner of the content.
    #[error("{caller} is not the registered owner of {content_hash}")]
    NotOwner {
        content_hash: ContentHash,
        caller: AccountId,
    },

    #[error("no license template {template_id} for content {content_hash}")]
    TemplateNotFound {
        content_hash: ContentHash,
        template_id: TemplateId,
    },

    #[error("no license for {licensee} under template {template_id} of {content_hash}")]
    LicenseNotFound {
        content_hash: ContentHash,
        template_id: TemplateId,
        licensee: AccountId,
    },

    /// The license's validity window has passed; no royalty accrual.
    #[error("license expired at {expired_at}")]
    LicenseExpired { expired_at: DateTime<Utc> },

    #[error("insufficient payment: fee is {required}, offered {offered}")]
    InsufficientPayment { required: u64, offered: u64 },

    /// An exclusive template already has an active (non-expired) license.
    #[error("exclusive template {template_id} of {content_hash} already has an active license")]
    ExclusivityViolation {
        content_hash: ContentHash,
        template_id: TemplateId,
    },

    /// Transport failure talking to the ledger. Reads are safe to retry.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// The ledger's own invariant check refused the write.
    #[error("ledger rejected write: {0}")]
    LedgerRejected(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error category, mirroring the handling policy for each class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected synchronously, never retried.
    Input,
    /// Definitive decision, not retried.
    Conflict,
    /// Surfaced with the matching record for external adjudication.
    Policy,
    /// Safe to retry reads with backoff; write retry is the caller's call.
    Transport,
    /// Definitive rejection reflecting the state machine.
    State,
    /// Local fault (I/O, serialization).
    Internal,
}

impl ImprintError {
    /// Category of this error, for deterministic boundary-layer translation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidContent(_) | Self::MalformedTerms(_) => ErrorKind::Input,
            Self::AlreadyRegistered { .. }
            | Self::ConflictingSignature { .. }
            | Self::ExclusivityViolation { .. }
            | Self::LedgerRejected(_) => ErrorKind::Conflict,
            Self::PotentialInfringement { .. } => ErrorKind::Policy,
            Self::LedgerUnavailable(_) => ErrorKind::Transport,
            Self::UnknownContent(_)
            | Self::NotOwner { .. }
            | Self::TemplateNotFound { .. }
            | Self::LicenseNotFound { .. }
            | Self::LicenseExpired { .. }
            | Self::InsufficientPayment { .. } => ErrorKind::State,
            Self::Serialization(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Whether a read-path retry with backoff is safe for this error.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

pub type Result<T> = std::result::Result<T, ImprintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_retryable() {
        let err = ImprintError::LedgerUnavailable("timeout".into());
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_conflict_errors_are_not_retryable() {
        let err = ImprintError::LedgerRejected("duplicate key".into());
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_state_errors_are_definitive() {
        let err = ImprintError::InsufficientPayment {
            required: 100,
            offered: 50,
        };
        assert_eq!(err.kind(), ErrorKind::State);
        assert!(!err.is_retryable());
    }
}
