//! Generic create/read/update/delete orchestration
//!
//! [`Lifecycle`] is written once and instantiated per entity kind. It runs
//! validation and translation through the kind's [`EntityMapper`], calls the
//! remote through the kind's [`EntityKind`] operations, hands nested children
//! to the kind's [`NestedCollection`], and returns the snapshot to persist.
//! It holds no state between calls.

use crate::children::{NestedCollection, PendingWrite};
use crate::diagnostic::Diagnostics;
use crate::error::{RemoteResult, TranslationError};
use crate::mapper::EntityMapper;
use log::{debug, info};

/// Snapshot type of a kind
pub type LocalOf<K> = <<K as EntityKind>::Mapper as EntityMapper>::Local;
/// Remote model of a kind
pub type RemoteOf<K> = <<K as EntityKind>::Mapper as EntityMapper>::Remote;

/// Remote operations and translation for one entity kind
pub trait EntityKind: Send + Sync {
    type Mapper: EntityMapper;
    /// Remote API handle passed to every operation
    type Client: ?Sized;

    /// Kind name used in addresses and messages (e.g. `configuration`)
    fn name(&self) -> &'static str;

    fn mapper(&self) -> &Self::Mapper;

    /// Child collection owned by this kind, if any
    fn nested(&self) -> Option<&dyn NestedCollection<LocalOf<Self>, Self::Client>> {
        None
    }

    fn create(&self, client: &Self::Client, request: RemoteOf<Self>) -> RemoteResult<RemoteOf<Self>>;

    fn read(&self, client: &Self::Client, persisted: &LocalOf<Self>) -> RemoteResult<RemoteOf<Self>>;

    fn update(
        &self,
        client: &Self::Client,
        persisted: &LocalOf<Self>,
        request: RemoteOf<Self>,
    ) -> RemoteResult<RemoteOf<Self>>;

    fn delete(&self, client: &Self::Client, persisted: &LocalOf<Self>) -> RemoteResult<()>;
}

/// What the caller should do with its stored snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Persist<L> {
    /// Store this snapshot
    Write(L),
    /// Drop the stored snapshot
    Remove,
    /// Leave the stored snapshot as it was
    Keep,
}

/// Result of one lifecycle call
#[derive(Debug, Clone)]
pub struct Outcome<L> {
    pub persist: Persist<L>,
    pub diagnostics: Diagnostics,
}

impl<L> Outcome<L> {
    pub fn write(snapshot: L, diagnostics: Diagnostics) -> Self {
        Self {
            persist: Persist::Write(snapshot),
            diagnostics,
        }
    }

    pub fn remove(diagnostics: Diagnostics) -> Self {
        Self {
            persist: Persist::Remove,
            diagnostics,
        }
    }

    pub fn keep(diagnostics: Diagnostics) -> Self {
        Self {
            persist: Persist::Keep,
            diagnostics,
        }
    }

    /// Whether the call finished without an error diagnostic
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_error()
    }

    /// The snapshot to store, if the call produced one
    pub fn snapshot(&self) -> Option<&L> {
        match &self.persist {
            Persist::Write(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// Map the stored snapshot, keeping diagnostics
    pub fn map<U>(self, f: impl FnOnce(L) -> U) -> Outcome<U> {
        let persist = match self.persist {
            Persist::Write(snapshot) => Persist::Write(f(snapshot)),
            Persist::Remove => Persist::Remove,
            Persist::Keep => Persist::Keep,
        };
        Outcome {
            persist,
            diagnostics: self.diagnostics,
        }
    }
}

type Translated<'a, K> = (
    RemoteOf<K>,
    Option<Box<dyn PendingWrite<LocalOf<K>, <K as EntityKind>::Client> + 'a>>,
);

/// Lifecycle engine bound to one kind and one remote client
pub struct Lifecycle<'a, K: EntityKind> {
    kind: &'a K,
    client: &'a K::Client,
    nested: Option<&'a dyn NestedCollection<LocalOf<K>, K::Client>>,
}

impl<'a, K: EntityKind> Lifecycle<'a, K> {
    pub fn new(kind: &'a K, client: &'a K::Client) -> Self {
        Self {
            kind,
            client,
            nested: kind.nested(),
        }
    }

    /// Create the remote entity for `desired`
    pub fn create(&self, desired: &LocalOf<K>) -> Outcome<LocalOf<K>> {
        let name = self.kind.name();
        debug!("Starting {name} create");

        let mut plan = desired.clone();
        let mut diagnostics = self.kind.mapper().validate(None, &mut plan);
        if diagnostics.has_error() {
            return Outcome::keep(diagnostics);
        }

        let (request, pending) = match self.translate(&LocalOf::<K>::default(), &plan, None) {
            Ok(translated) => translated,
            Err(err) => {
                diagnostics.add_error(
                    format!("Error creating {name}"),
                    format!("Could not translate {name}: {err}"),
                );
                return Outcome::keep(diagnostics);
            }
        };

        let response = match self.kind.create(self.client, request) {
            Ok(response) => response,
            Err(err) => {
                diagnostics.add_error(
                    format!("Error creating {name}"),
                    format!("Could not create {name}: {err}"),
                );
                return Outcome::keep(diagnostics);
            }
        };

        self.finish(&response, pending, None, &mut plan, &mut diagnostics, "creating");

        debug!("Completed {name} create");
        Outcome::write(plan, diagnostics)
    }

    /// Refresh `persisted` from the remote
    pub fn read(&self, persisted: &LocalOf<K>) -> Outcome<LocalOf<K>> {
        let name = self.kind.name();
        debug!("Starting {name} read");

        let mut state = persisted.clone();
        let mut diagnostics = Diagnostics::new();

        match self.kind.read(self.client, &state) {
            Ok(response) => {
                diagnostics.append(self.kind.mapper().hydrate(&response, &mut state));
                if !diagnostics.has_error()
                    && let Some(nested) = self.nested
                {
                    match nested.refresh(self.client, &mut state) {
                        Ok(child_diagnostics) => diagnostics.append(child_diagnostics),
                        Err(err) => diagnostics.add_error(
                            format!("Error reading {name}"),
                            format!("Could not list {name} children: {err}"),
                        ),
                    }
                }
            }
            Err(err) if err.is_sentinel() => {
                info!("{name} has no remote record, keeping persisted values");
            }
            Err(err) => {
                diagnostics.add_error(
                    format!("Error reading {name}"),
                    format!("Could not read {name}: {err}"),
                );
                return Outcome::keep(diagnostics);
            }
        }

        debug!("Completed {name} read");
        Outcome::write(state, diagnostics)
    }

    /// Move the remote entity from `persisted` to `desired`
    pub fn update(&self, persisted: &LocalOf<K>, desired: &LocalOf<K>) -> Outcome<LocalOf<K>> {
        let name = self.kind.name();
        debug!("Starting {name} update");

        let mut plan = desired.clone();
        let mut diagnostics = self.kind.mapper().validate(Some(persisted), &mut plan);
        if diagnostics.has_error() {
            return Outcome::keep(diagnostics);
        }

        let (request, pending) = match self.translate(persisted, &plan, Some(persisted)) {
            Ok(translated) => translated,
            Err(err) => {
                diagnostics.add_error(
                    format!("Error updating {name}"),
                    format!("Could not translate {name}: {err}"),
                );
                return Outcome::keep(diagnostics);
            }
        };

        match self.kind.update(self.client, persisted, request) {
            Ok(response) => {
                self.finish(
                    &response,
                    pending,
                    Some(persisted),
                    &mut plan,
                    &mut diagnostics,
                    "updating",
                );
            }
            Err(err) if err.is_sentinel() => {
                info!("{name} has no remote record, skipping update");
                self.kind.mapper().carry_forward(persisted, &mut plan);
                diagnostics.add_warning(
                    format!("Skipped {name} update"),
                    format!("The remote has nothing to update for this {name}; previously persisted values were kept"),
                );
            }
            Err(err) => {
                diagnostics.add_error(
                    format!("Error updating {name}"),
                    format!("Could not update {name}: {err}"),
                );
                return Outcome::keep(diagnostics);
            }
        }

        debug!("Completed {name} update");
        Outcome::write(plan, diagnostics)
    }

    /// Delete the remote entity behind `persisted`
    pub fn delete(&self, persisted: &LocalOf<K>) -> Outcome<LocalOf<K>> {
        let name = self.kind.name();
        debug!("Starting {name} delete");

        let mut diagnostics = Diagnostics::new();
        match self.kind.delete(self.client, persisted) {
            Ok(()) => {}
            Err(err) if err.is_sentinel() => {
                info!("{name} has no remote record, nothing to delete");
            }
            Err(err) => {
                diagnostics.add_error(
                    format!("Error deleting {name}"),
                    format!("Could not delete {name}: {err}"),
                );
                return Outcome::keep(diagnostics);
            }
        }

        debug!("Completed {name} delete");
        Outcome::remove(diagnostics)
    }

    fn translate(
        &self,
        persisted: &LocalOf<K>,
        desired: &LocalOf<K>,
        prior: Option<&LocalOf<K>>,
    ) -> Result<Translated<'a, K>, TranslationError> {
        let pending = match self.nested {
            Some(nested) => nested.prepare(desired, prior)?,
            None => None,
        };
        let request = self.kind.mapper().materialize(persisted, desired)?;
        Ok((request, pending))
    }

    /// Hydrate the entity response, then write and merge children
    ///
    /// A children failure leaves `plan` hydrated with the parent and its
    /// collection back at `prior`'s, so the caller persists only what the
    /// remote confirmed and the next plan still sees the missing children.
    fn finish(
        &self,
        response: &RemoteOf<K>,
        pending: Option<Box<dyn PendingWrite<LocalOf<K>, K::Client> + 'a>>,
        prior: Option<&LocalOf<K>>,
        plan: &mut LocalOf<K>,
        diagnostics: &mut Diagnostics,
        verb: &str,
    ) {
        let name = self.kind.name();

        diagnostics.append(self.kind.mapper().hydrate(response, plan));
        if diagnostics.has_error() {
            return;
        }

        if let Some(pending) = pending {
            match pending.commit(self.client, plan) {
                Ok(child_diagnostics) => diagnostics.append(child_diagnostics),
                Err(err) => {
                    if let Some(nested) = self.nested {
                        nested.restore(plan, prior);
                    }
                    diagnostics.add_error(
                        format!("Error {verb} {name}"),
                        format!("Could not write {name} children: {err}"),
                    );
                }
            }
        }
    }
}
