//! Storage capability interface.
//!
//! The core never talks to a concrete backend. Everything it needs from
//! storage is this small surface: point reads, inserts with store-generated
//! ids, atomic read-modify-write transactions, change subscriptions, and a
//! filtered/ordered/limited query with a live variant. Any transactional
//! key-value or document store with at-most-one-writer-wins semantics can
//! implement it; [`MemoryStore`] is the in-process reference implementation.
//!
//! Documents cross this boundary as [`serde_json::Value`]; the typed helpers
//! at the bottom of this module do the (de)serialization for callers working
//! with domain types.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

/// Store-generated document identifier.
pub type DocId = String;

/// One document snapshot: id plus JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id within its collection.
    pub id: DocId,
    /// Document payload.
    pub data: Value,
}

/// Decision returned by a transaction closure for the snapshot it was shown.
#[derive(Debug)]
pub enum TransactStep {
    /// Replace the document with this value.
    Update(Value),
    /// Leave the document unchanged; the transaction still succeeds.
    Keep,
    /// Abort the transaction with a reason.
    Abort(String),
}

/// How a successful transaction left the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactOutcome {
    /// The closure's update was applied.
    Updated,
    /// The closure kept the snapshot; nothing was written.
    Unchanged,
}

/// Sort direction for [`Query`] ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest value first.
    Ascending,
    /// Largest value first.
    Descending,
}

/// Declarative query over one collection: optional equality filter, optional
/// single-field ordering, optional result limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filter: Option<(String, Value)>,
    order_by: Option<(String, SortDirection)>,
    limit: Option<usize>,
}

impl Query {
    /// Creates an unconstrained query (every document in the collection).
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filter = Some((field.into(), value));
        self
    }

    /// Orders results by `field`, largest first.
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some((field.into(), SortDirection::Descending));
        self
    }

    /// Orders results by `field`, smallest first.
    pub fn order_by_asc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some((field.into(), SortDirection::Ascending));
        self
    }

    /// Caps the number of returned documents.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Applies this query to a set of documents: filter, sort, truncate.
    /// Store implementations run this over their own snapshot sets.
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if let Some((field, value)) = &self.filter {
            docs.retain(|d| d.data.get(field) == Some(value));
        }
        if let Some((field, direction)) = &self.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_values(
                    a.data.get(field).unwrap_or(&Value::Null),
                    b.data.get(field).unwrap_or(&Value::Null),
                );
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }
}

/// Total order over JSON scalars for query sorting.
///
/// Ranks null < bool < number < string; arrays and objects sort last and
/// among themselves are considered equal (the core never orders by them).
fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Cancellable stream of snapshots from a store subscription.
///
/// Snapshots arrive in the store's delivery order for this subscription; no
/// ordering is guaranteed across different subscriptions. Dropping the
/// subscription (or calling [`Subscription::unsubscribe`]) detaches it.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Wraps a receiver fed by a store implementation.
    pub fn from_receiver(rx: mpsc::UnboundedReceiver<T>) -> Self {
        Self { rx }
    }

    /// Waits for the next snapshot; `None` once the store side shuts down.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns an already-delivered snapshot without waiting, if any.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Detaches from the store. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

/// Transaction closure type accepted by [`DocumentStore::transact`].
pub type TransactFn<'a> = &'a mut (dyn FnMut(&Value) -> TransactStep + Send);

/// Capability interface to a transactional document store.
///
/// The store is the single source of truth and sole ordering authority: all
/// multi-party coordination goes through [`DocumentStore::transact`], never
/// through client-side locks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a document snapshot, or `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Inserts a new document under a store-generated id.
    async fn insert(&self, collection: &str, data: Value) -> Result<DocId, StoreError>;

    /// Creates or replaces the document at `id`.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    /// Atomic read-modify-write: shows the closure the current snapshot and
    /// applies its decision all-or-nothing.
    ///
    /// Concurrent transactions on one document serialize; the loser's closure
    /// runs against the winner's committed snapshot.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the document is absent,
    /// [`StoreError::Aborted`] if the closure aborts,
    /// [`StoreError::Conflict`] from stores that resolve races optimistically
    /// (transient; safe to retry).
    async fn transact(
        &self,
        collection: &str,
        id: &str,
        apply: TransactFn<'_>,
    ) -> Result<TransactOutcome, StoreError>;

    /// Subscribes to one document. The current snapshot (if the document
    /// exists) is delivered immediately, then every subsequent write.
    async fn subscribe(&self, collection: &str, id: &str)
    -> Result<Subscription<Document>, StoreError>;

    /// Runs a query against the collection's current snapshot set.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Live variant of [`DocumentStore::query`]: the current result set is
    /// delivered immediately, then a fresh result set after every write to
    /// the collection.
    async fn subscribe_query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Subscription<Vec<Document>>, StoreError>;
}

/// Decodes a JSON document payload into a domain type.
pub fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(value.clone())?)
}

/// Encodes a domain type into a JSON document payload.
pub fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

/// Typed point read: [`DocumentStore::get`] plus [`decode`].
pub async fn get_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(collection, id).await? {
        Some(value) => Ok(Some(decode(&value)?)),
        None => Ok(None),
    }
}

/// Typed transaction: decodes the snapshot, runs `apply`, and writes the
/// returned replacement (or keeps the snapshot on `None`).
///
/// Serialization failures inside the closure surface as
/// [`StoreError::Serialization`] after the transaction completes without a
/// write.
pub async fn transact_as<T, F>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    mut apply: F,
) -> Result<TransactOutcome, StoreError>
where
    T: DeserializeOwned + Serialize,
    F: FnMut(&T) -> Option<T> + Send,
{
    let mut codec_err: Option<StoreError> = None;
    let mut step = |raw: &Value| -> TransactStep {
        let doc: T = match serde_json::from_value(raw.clone()) {
            Ok(doc) => doc,
            Err(err) => {
                codec_err = Some(err.into());
                return TransactStep::Keep;
            }
        };
        match apply(&doc) {
            Some(next) => match serde_json::to_value(&next) {
                Ok(value) => TransactStep::Update(value),
                Err(err) => {
                    codec_err = Some(err.into());
                    TransactStep::Keep
                }
            },
            None => TransactStep::Keep,
        }
    };
    let outcome = store.transact(collection, id, &mut step).await?;
    match codec_err {
        Some(err) => Err(err),
        None => Ok(outcome),
    }
}

/// Typed wrapper over a document subscription; snapshots that fail to decode
/// are logged and skipped rather than tearing the stream down.
#[derive(Debug)]
pub struct TypedSubscription<T> {
    inner: Subscription<Document>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> TypedSubscription<T> {
    /// Wraps a raw document subscription.
    pub fn new(inner: Subscription<Document>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Waits for the next decodable snapshot.
    pub async fn next(&mut self) -> Option<T> {
        while let Some(doc) = self.inner.next().await {
            match decode::<T>(&doc.data) {
                Ok(value) => return Some(value),
                Err(err) => {
                    warn!(doc_id = %doc.id, error = %err, "Skipping undecodable snapshot");
                }
            }
        }
        None
    }

    /// Detaches from the store.
    pub fn unsubscribe(self) {}
}

/// Typed wrapper over a query subscription; each delivery is the full result
/// set as `(id, value)` pairs, undecodable documents skipped with a warning.
#[derive(Debug)]
pub struct TypedQuerySubscription<T> {
    inner: Subscription<Vec<Document>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> TypedQuerySubscription<T> {
    /// Wraps a raw query subscription.
    pub fn new(inner: Subscription<Vec<Document>>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Waits for the next result set.
    pub async fn next(&mut self) -> Option<Vec<(DocId, T)>> {
        let docs = self.inner.next().await?;
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            match decode::<T>(&doc.data) {
                Ok(value) => out.push((doc.id, value)),
                Err(err) => {
                    warn!(doc_id = %doc.id, error = %err, "Skipping undecodable query row");
                }
            }
        }
        Some(out)
    }

    /// Detaches from the store.
    pub fn unsubscribe(self) {}
}
