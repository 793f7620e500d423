//! Per-kind translation between local snapshots and remote models

use crate::diagnostic::Diagnostics;
use crate::error::TranslationError;

/// Converts one entity kind between its local snapshot and remote model
///
/// Implementations hold no state; every method is a pure function of its
/// arguments.
pub trait EntityMapper: Send + Sync {
    /// Desired/persisted snapshot shape
    type Local: Clone + Default;
    /// Remote representation
    type Remote;

    /// Copy remote values into `local`
    ///
    /// Never fails hard. Partial or surprising remote data is reported as
    /// warnings.
    fn hydrate(&self, remote: &Self::Remote, local: &mut Self::Local) -> Diagnostics;

    /// Build the remote request for `desired`
    ///
    /// `persisted` supplies identifiers absent from `desired`; on create it is
    /// `Local::default()`.
    fn materialize(
        &self,
        persisted: &Self::Local,
        desired: &Self::Local,
    ) -> Result<Self::Remote, TranslationError>;

    /// Check `desired` and inject defaults
    ///
    /// `persisted` is `None` on create. Any error diagnostic aborts the
    /// operation before a remote call.
    fn validate(&self, persisted: Option<&Self::Local>, desired: &mut Self::Local) -> Diagnostics;

    /// Copy write-only values from `persisted` when an update was skipped
    fn carry_forward(&self, _persisted: &Self::Local, _desired: &mut Self::Local) {}
}
