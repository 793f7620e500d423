//! # Declarative
//!
//! A generic lifecycle engine for entities kept in sync with a remote system.
//!
//! The caller supplies a desired snapshot (and, for update and delete, the
//! last persisted one). The engine validates it, translates it to the remote
//! model, performs at most one remote write for the entity plus one write and
//! one read for its children, and returns the snapshot to persist.
//!
//! ## Core Concepts
//!
//! - **Field**: a snapshot attribute that is unset, unknown or known
//! - **EntityMapper**: per-kind translation, validation and defaulting
//! - **ChildCollection**: an ordered, id-keyed child list owned by a parent
//! - **EntityKind**: the remote operations of one kind
//! - **Lifecycle**: create/read/update/delete written once for every kind
//!
//! ## Sentinel
//!
//! Some kinds have no remote record to read, update or delete (for example a
//! value that is only ever encrypted). Their operations return
//! [`RemoteError::Stateless`], which the engine treats as a defined success
//! path instead of a failure:
//!
//! - read keeps the persisted snapshot without a diagnostic
//! - update keeps write-only values via [`EntityMapper::carry_forward`] and
//!   raises one warning
//! - delete succeeds without a diagnostic
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Lifecycle, Persist};
//!
//! let engine = Lifecycle::new(&ConfigurationKind::default(), &client);
//! let outcome = engine.create(&desired);
//!
//! for diagnostic in &outcome.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! if let Persist::Write(snapshot) = outcome.persist {
//!     state.store(address, snapshot);
//! }
//! ```

pub mod children;
pub mod diagnostic;
pub mod error;
pub mod field;
pub mod lifecycle;
pub mod mapper;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use children::{
    ChildCollection, NestedCollection, PendingWrite, SortOrder, compute_sort_order, extract,
    reconcile, to_remote,
};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::{RemoteError, RemoteResult, TranslationError};
pub use field::Field;
pub use lifecycle::{EntityKind, Lifecycle, LocalOf, Outcome, Persist, RemoteOf};
pub use mapper::EntityMapper;
