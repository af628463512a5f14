//! Materialized rows exposed by views.

use super::scope::Scope;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;
use rdb_core::{Result, RowHandle, Value};
use rdb_reactive::{Observable, ObservableList, SubscriptionSet};

/// One field of a `ViewRow`.
#[derive(Clone)]
pub enum ViewField {
    /// A plain column, kept in sync with the source row.
    Value(Observable<Value>),
    /// A single-reference join.
    Ref(Observable<Option<ViewRow>>),
    /// A multi-reference or reverse join.
    List(ObservableList<ViewRow>),
}

impl ViewField {
    pub fn as_value(&self) -> Option<&Observable<Value>> {
        match self {
            ViewField::Value(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Observable<Option<ViewRow>>> {
        match self {
            ViewField::Ref(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ObservableList<ViewRow>> {
        match self {
            ViewField::List(list) => Some(list),
            _ => None,
        }
    }
}

impl fmt::Debug for ViewField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewField::Value(cell) => cell.with(|v| f.debug_tuple("Value").field(v).finish()),
            ViewField::Ref(cell) => cell.with(|row| {
                f.debug_tuple("Ref")
                    .field(&row.as_ref().map(ViewRow::id))
                    .finish()
            }),
            ViewField::List(list) => f.debug_tuple("List").field(&list.len()).finish(),
        }
    }
}

/// Subscriptions and nested projections owned by one join field.
#[derive(Clone, Default)]
pub(crate) struct JoinParts {
    pub(crate) subscriptions: SubscriptionSet,
    pub(crate) scope: Scope,
}

impl JoinParts {
    /// Cancels the join's subscriptions and disposes its nested projections.
    ///
    /// Every nested row is disposed even if one fails; the first error is returned.
    pub(crate) fn release(&self) -> Result<()> {
        self.subscriptions.cancel_all();
        let mut outcome = Ok(());
        for row in self.scope.drain() {
            let disposed = row.dispose();
            if outcome.is_ok() {
                outcome = disposed;
            }
        }
        outcome
    }

    /// Releases a join whose field was never attached.
    pub(crate) fn discard(&self) {
        if let Err(error) = self.release() {
            tracing::warn!(%error, "failed to dispose partial join");
        }
    }
}

/// Fields and resources gathered while projecting one row.
#[derive(Default)]
pub(crate) struct Parts {
    pub(crate) fields: Vec<(String, ViewField)>,
    pub(crate) subscriptions: SubscriptionSet,
    joins: Vec<(String, JoinParts)>,
}

impl Parts {
    /// Adds a field. A field with the same name is replaced in place and the
    /// join resources behind it are released.
    pub(crate) fn set_field(&mut self, name: &str, field: ViewField) -> Result<()> {
        match self.fields.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = field,
            None => self.fields.push((name.into(), field)),
        }
        match self.joins.iter().position(|(existing, _)| existing == name) {
            Some(index) => self.joins.remove(index).1.release(),
            None => Ok(()),
        }
    }

    /// Adds a join field together with the resources that maintain it.
    pub(crate) fn set_join(&mut self, name: &str, field: ViewField, join: JoinParts) -> Result<()> {
        let replaced = self.set_field(name, field);
        self.joins.push((name.into(), join));
        replaced
    }

    /// Returns the plain field cells by name.
    pub(crate) fn value_cells(&self) -> Vec<(String, Observable<Value>)> {
        self.fields
            .iter()
            .filter_map(|(name, field)| field.as_value().map(|cell| (name.clone(), cell.clone())))
            .collect()
    }

    /// Tears down a projection that failed midway.
    pub(crate) fn discard(self) {
        self.subscriptions.cancel_all();
        for (_, join) in &self.joins {
            join.discard();
        }
    }
}

struct ViewRowInner {
    id: String,
    source: RowHandle,
    fields: Vec<(String, ViewField)>,
    subscriptions: SubscriptionSet,
    joins: Vec<JoinParts>,
    disposed: Cell<bool>,
}

/// The projection of one source row.
///
/// Equality is identity.
#[derive(Clone)]
pub struct ViewRow {
    inner: Rc<ViewRowInner>,
}

impl ViewRow {
    pub(crate) fn new(id: String, source: RowHandle, parts: Parts) -> ViewRow {
        ViewRow {
            inner: Rc::new(ViewRowInner {
                id,
                source,
                fields: parts.fields,
                subscriptions: parts.subscriptions,
                joins: parts.joins.into_iter().map(|(_, join)| join).collect(),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Returns the source row id.
    #[inline]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Returns the handle of the source row.
    #[inline]
    pub fn source(&self) -> RowHandle {
        self.inner.source
    }

    pub fn field(&self, name: &str) -> Option<&ViewField> {
        self.inner
            .fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, field)| field)
    }

    pub fn has(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Returns the current value of a plain field.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.field(name)?.as_value().map(Observable::get)
    }

    /// Returns the current target of a single-reference join field.
    pub fn reference(&self, name: &str) -> Option<ViewRow> {
        self.field(name)?.as_reference()?.get()
    }

    /// Returns the list of a multi-reference or reverse join field.
    pub fn list(&self, name: &str) -> Option<ObservableList<ViewRow>> {
        self.field(name)?.as_list().cloned()
    }

    /// Returns field names in projection order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.inner.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Returns true once the row was removed from its view or join.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Returns the number of live source subscriptions held by this row.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.len()
            + self
                .inner
                .joins
                .iter()
                .map(|join| join.subscriptions.len())
                .sum::<usize>()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &ViewRow) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Detaches the row from its sources and empties its join fields,
    /// recursively disposing nested projections.
    ///
    /// Every step runs even if one fails; the first error is returned.
    pub(crate) fn dispose(&self) -> Result<()> {
        if self.inner.disposed.replace(true) {
            return Ok(());
        }
        self.inner.subscriptions.cancel_all();
        for join in &self.inner.joins {
            join.subscriptions.cancel_all();
        }

        let mut outcome = Ok(());
        for (_, field) in &self.inner.fields {
            let cleared = match field {
                ViewField::Value(_) => Ok(()),
                ViewField::Ref(cell) => cell.set(None),
                ViewField::List(list) => list.clear(),
            };
            if outcome.is_ok() {
                outcome = cleared;
            }
        }
        for join in &self.inner.joins {
            let released = join.release();
            if outcome.is_ok() {
                outcome = released;
            }
        }
        outcome
    }
}

impl PartialEq for ViewRow {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ViewRow {}

impl fmt::Debug for ViewRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ViewRow");
        s.field("id", &self.inner.id);
        for (name, field) in &self.inner.fields {
            s.field(name, field);
        }
        s.finish()
    }
}
