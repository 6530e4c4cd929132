//! Job failures and their retry classification.

use cadence_core::TenantId;

use crate::shop_store::StoreError;

use super::runner::EnqueueError;

/// Failure of a call to the commerce platform or another remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote call failed with status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("no session found for tenant {0}")]
    SessionNotFound(TenantId),
    #[error("remote transport error: {0}")]
    Transport(String),
    #[error("remote call returned user errors: {}", .0.join("; "))]
    UserErrors(Vec<String>),
}

impl RemoteError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("invalid job parameters: {0}")]
    InvalidParameters(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("follow-up enqueue failed: {0}")]
    Enqueue(#[source] Box<EnqueueError>),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<EnqueueError> for JobError {
    fn from(err: EnqueueError) -> Self {
        JobError::Enqueue(Box::new(err))
    }
}

/// What a failed `perform` means for redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A remote state retries cannot fix (revoked scope, lapsed billing, gone, locked).
    PermanentRemoteFailure,
    /// Rate limiting; a later attempt may succeed.
    TransientRemoteFailure,
    /// The tenant's session or credentials no longer exist.
    TenantDisconnected,
    /// Anything else. Treated like a transient failure.
    Unclassified,
}

impl FailureKind {
    /// Whether `run` resolves after logging instead of propagating.
    pub fn is_swallowed(self) -> bool {
        matches!(
            self,
            FailureKind::PermanentRemoteFailure | FailureKind::TenantDisconnected
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::PermanentRemoteFailure => "permanent_remote_failure",
            FailureKind::TransientRemoteFailure => "transient_remote_failure",
            FailureKind::TenantDisconnected => "tenant_disconnected",
            FailureKind::Unclassified => "unclassified",
        }
    }
}

/// Map a job failure to its retry decision.
///
/// Collaborators that report through `anyhow` are classified by the
/// [`RemoteError`] they carry, if any.
pub fn classify(err: &JobError) -> FailureKind {
    match err {
        JobError::Remote(remote) => classify_remote(remote),
        JobError::Other(other) => other
            .downcast_ref::<RemoteError>()
            .map_or(FailureKind::Unclassified, classify_remote),
        JobError::InvalidParameters(_) | JobError::Store(_) | JobError::Enqueue(_) => {
            FailureKind::Unclassified
        }
    }
}

fn classify_remote(err: &RemoteError) -> FailureKind {
    match err {
        RemoteError::Http { status, .. } => match status {
            401 | 402 | 403 | 404 | 423 => FailureKind::PermanentRemoteFailure,
            429 => FailureKind::TransientRemoteFailure,
            _ => FailureKind::Unclassified,
        },
        RemoteError::SessionNotFound(_) => FailureKind::TenantDisconnected,
        RemoteError::Transport(_) | RemoteError::UserErrors(_) => FailureKind::Unclassified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("shop.myshopify.com").unwrap()
    }

    #[test]
    fn permanent_statuses_are_swallowed() {
        for status in [401, 402, 403, 404, 423] {
            let kind = classify(&RemoteError::http(status, "nope").into());
            assert_eq!(kind, FailureKind::PermanentRemoteFailure, "status {status}");
            assert!(kind.is_swallowed());
        }
    }

    #[test]
    fn rate_limit_propagates() {
        let kind = classify(&RemoteError::http(429, "slow down").into());
        assert_eq!(kind, FailureKind::TransientRemoteFailure);
        assert!(!kind.is_swallowed());
    }

    #[test]
    fn missing_session_means_disconnected() {
        let kind = classify(&RemoteError::SessionNotFound(tenant()).into());
        assert_eq!(kind, FailureKind::TenantDisconnected);
        assert!(kind.is_swallowed());
    }

    #[test]
    fn unknown_failures_propagate() {
        for err in [
            JobError::Other(anyhow::anyhow!("boom")),
            RemoteError::http(500, "oops").into(),
            RemoteError::Transport("reset".into()).into(),
            JobError::InvalidParameters("bad".into()),
        ] {
            assert_eq!(classify(&err), FailureKind::Unclassified);
            assert!(!classify(&err).is_swallowed());
        }
    }

    #[test]
    fn remote_error_inside_anyhow_is_recognized() {
        let err = JobError::Other(anyhow::Error::new(RemoteError::http(403, "scope revoked")));
        assert_eq!(classify(&err), FailureKind::PermanentRemoteFailure);
    }
}
