//! Ordered child collections owned by a parent snapshot
//!
//! A parent (for example a configuration) owns an ordered list of children
//! (its rows). The user's order is kept across remote round-trips: children
//! the parent already knew keep their position, children the remote reports
//! for the first time are appended in remote order.

use crate::diagnostic::Diagnostics;
use crate::error::{RemoteResult, TranslationError};
use crate::field::Field;
use std::collections::HashMap;

/// Ordered identifiers of assigned children, sent to the remote after a write
pub type SortOrder = Vec<String>;

/// Describes how one kind stores, translates and writes its children
pub trait ChildCollection: Send + Sync {
    type Parent;
    type Child: Clone;
    type Remote: 'static;
    type Client: ?Sized;

    fn collection<'p>(&self, parent: &'p Self::Parent) -> &'p Field<Vec<Self::Child>>;

    fn collection_mut<'p>(&self, parent: &'p mut Self::Parent)
    -> &'p mut Field<Vec<Self::Child>>;

    /// Assigned identifier, `None` while the child is pending creation
    fn child_id<'c>(&self, child: &'c Self::Child) -> Option<&'c str>;

    fn remote_id(&self, remote: &Self::Remote) -> String;

    /// Build the remote request for one child, keeping its identifier
    fn materialize_child(&self, child: &Self::Child) -> Result<Self::Remote, TranslationError>;

    fn hydrate_child(&self, remote: &Self::Remote) -> Self::Child;

    /// Make the remote children match `children`, then apply `sort_order`
    /// when it is not empty
    fn replace(
        &self,
        client: &Self::Client,
        parent: &Self::Parent,
        children: Vec<Self::Remote>,
        sort_order: &[String],
    ) -> RemoteResult<()>;

    fn list(&self, client: &Self::Client, parent: &Self::Parent)
    -> RemoteResult<Vec<Self::Remote>>;
}

/// The parent's children, or `None` when the collection is unset or unknown
///
/// An explicitly empty collection yields `Some(vec![])`.
pub fn extract<H>(handler: &H, parent: &H::Parent) -> Option<Vec<H::Child>>
where
    H: ChildCollection + ?Sized,
{
    handler.collection(parent).as_known().cloned()
}

/// Translate children to remote requests in order
pub fn to_remote<H>(handler: &H, children: &[H::Child]) -> Result<Vec<H::Remote>, TranslationError>
where
    H: ChildCollection + ?Sized,
{
    children
        .iter()
        .map(|child| handler.materialize_child(child))
        .collect()
}

/// Ordered identifiers to send after a write
///
/// Empty when children were removed (`desired` shorter than `persisted`);
/// the remote keeps its own order then. Otherwise the assigned identifiers of
/// `desired` in order, skipping pending children.
pub fn compute_sort_order<H>(handler: &H, desired: &[H::Child], persisted: &[H::Child]) -> SortOrder
where
    H: ChildCollection + ?Sized,
{
    if desired.len() < persisted.len() {
        return SortOrder::new();
    }

    desired
        .iter()
        .filter_map(|child| handler.child_id(child))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Merge the remote children into the parent's collection
///
/// Children the parent already lists keep their position and take the remote
/// values. Remote children the parent did not list are appended in remote
/// order. Prior children missing from the remote are dropped.
pub fn reconcile<H>(handler: &H, parent: &mut H::Parent, remote: Vec<H::Remote>) -> Diagnostics
where
    H: ChildCollection + ?Sized,
{
    let mut diagnostics = Diagnostics::new();

    let mut order = Vec::with_capacity(remote.len());
    let mut by_id = HashMap::with_capacity(remote.len());
    for child in remote {
        let id = handler.remote_id(&child);
        if by_id.contains_key(&id) {
            diagnostics.add_warning(
                "Duplicate child identifier",
                format!("Remote listed `{id}` more than once; keeping the first entry"),
            );
            continue;
        }
        order.push(id.clone());
        by_id.insert(id, child);
    }

    if order.is_empty() && handler.collection(parent).is_unset() {
        return diagnostics;
    }

    let mut merged = Vec::with_capacity(order.len());
    if let Some(prior) = handler.collection(parent).as_known() {
        for child in prior {
            let survivor = handler.child_id(child).and_then(|id| by_id.remove(id));
            if let Some(remote) = survivor {
                merged.push(handler.hydrate_child(&remote));
            }
        }
    }
    for id in &order {
        if let Some(remote) = by_id.remove(id) {
            merged.push(handler.hydrate_child(&remote));
        }
    }

    *handler.collection_mut(parent) = Field::Known(merged);
    diagnostics
}

/// Engine-facing view of a kind's children
///
/// Type-erases [`ChildCollection`] so [`crate::EntityKind::nested`] can hand
/// the lifecycle engine a trait object.
pub trait NestedCollection<P, C: ?Sized>: Send + Sync {
    /// Translate the desired children before any remote call
    ///
    /// `None` when the desired collection is unset or unknown, meaning the
    /// children are left untouched.
    fn prepare<'s>(
        &'s self,
        desired: &P,
        persisted: Option<&P>,
    ) -> Result<Option<Box<dyn PendingWrite<P, C> + 's>>, TranslationError>;

    /// List the remote children and merge them into `parent`
    fn refresh(&self, client: &C, parent: &mut P) -> RemoteResult<Diagnostics>;

    /// Put back the children the remote last confirmed
    ///
    /// Used after a failed write: `parent` takes the collection of
    /// `persisted`, or becomes unset when there is none.
    fn restore(&self, parent: &mut P, persisted: Option<&P>);
}

/// Translated children waiting to be written after the parent
pub trait PendingWrite<P, C: ?Sized> {
    /// Replace the remote children, list them back and merge into `parent`
    fn commit(self: Box<Self>, client: &C, parent: &mut P) -> RemoteResult<Diagnostics>;
}

struct Pending<'h, H: ChildCollection> {
    handler: &'h H,
    children: Vec<H::Remote>,
    sort_order: SortOrder,
}

impl<H: ChildCollection> PendingWrite<H::Parent, H::Client> for Pending<'_, H> {
    fn commit(
        self: Box<Self>,
        client: &H::Client,
        parent: &mut H::Parent,
    ) -> RemoteResult<Diagnostics> {
        let Self {
            handler,
            children,
            sort_order,
        } = *self;

        log::debug!(
            "Writing {} children (sort order: {} ids)",
            children.len(),
            sort_order.len()
        );
        handler.replace(client, parent, children, &sort_order)?;
        NestedCollection::refresh(handler, client, parent)
    }
}

impl<H: ChildCollection> NestedCollection<H::Parent, H::Client> for H {
    fn prepare<'s>(
        &'s self,
        desired: &H::Parent,
        persisted: Option<&H::Parent>,
    ) -> Result<Option<Box<dyn PendingWrite<H::Parent, H::Client> + 's>>, TranslationError> {
        let Some(wanted) = extract(self, desired) else {
            return Ok(None);
        };
        let previous = persisted
            .and_then(|parent| extract(self, parent))
            .unwrap_or_default();

        let children = to_remote(self, &wanted)?;
        let sort_order = compute_sort_order(self, &wanted, &previous);

        Ok(Some(Box::new(Pending {
            handler: self,
            children,
            sort_order,
        })))
    }

    fn refresh(&self, client: &H::Client, parent: &mut H::Parent) -> RemoteResult<Diagnostics> {
        let remote = self.list(client, parent)?;
        Ok(reconcile(self, parent, remote))
    }

    fn restore(&self, parent: &mut H::Parent, persisted: Option<&H::Parent>) {
        *self.collection_mut(parent) = persisted
            .map(|prior| self.collection(prior).clone())
            .unwrap_or(Field::Unset);
    }
}
