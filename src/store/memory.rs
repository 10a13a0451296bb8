//! In-process reference implementation of [`DocumentStore`].
//!
//! Transactions serialize by holding the store mutex across the transaction
//! closure, which gives the at-most-one-writer-wins semantics the core
//! relies on: a racing transaction always sees the winner's committed
//! snapshot. Subscriptions are fed over unbounded channels and detach when
//! their receiver is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    DocId, Document, DocumentStore, Query, StoreError, Subscription, TransactFn, TransactOutcome,
    TransactStep,
};

#[derive(Debug, Default)]
struct Collection {
    docs: HashMap<DocId, Value>,
    doc_watchers: HashMap<DocId, Vec<mpsc::UnboundedSender<Document>>>,
    collection_watchers: Vec<mpsc::UnboundedSender<()>>,
}

impl Collection {
    /// Delivers a committed write to every live watcher, pruning closed ones.
    fn notify(&mut self, id: &str, data: &Value) {
        if let Some(watchers) = self.doc_watchers.get_mut(id) {
            watchers.retain(|w| {
                w.send(Document {
                    id: id.to_string(),
                    data: data.clone(),
                })
                .is_ok()
            });
        }
        self.collection_watchers.retain(|w| w.send(()).is_ok());
    }
}

/// Shared in-memory document store.
///
/// Cheap to clone; clones share the same documents and watchers, so a clone
/// per simulated client mirrors two browsers talking to one backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, Collection>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn run_query(&self, collection: &str, query: &Query) -> Vec<Document> {
        let inner = self.inner.lock().unwrap();
        let docs = inner
            .get(collection)
            .map(|coll| {
                coll.docs
                    .iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        query.apply(docs)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .get(collection)
            .and_then(|coll| coll.docs.get(id))
            .cloned())
    }

    #[instrument(skip(self, data))]
    async fn insert(&self, collection: &str, data: Value) -> Result<DocId, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.lock().unwrap();
        let coll = inner.entry(collection.to_string()).or_default();
        coll.docs.insert(id.clone(), data.clone());
        coll.notify(&id, &data);
        debug!(collection, id = %id, "Document inserted");
        Ok(id)
    }

    #[instrument(skip(self, data))]
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let coll = inner.entry(collection.to_string()).or_default();
        coll.docs.insert(id.to_string(), data.clone());
        coll.notify(id, &data);
        debug!(collection, id, "Document set");
        Ok(())
    }

    #[instrument(skip(self, apply))]
    async fn transact(
        &self,
        collection: &str,
        id: &str,
        apply: TransactFn<'_>,
    ) -> Result<TransactOutcome, StoreError> {
        // The mutex stays held across the closure; that is the serialization
        // point for racing writers.
        let mut inner = self.inner.lock().unwrap();
        let coll = inner
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        let snapshot = coll.docs.get(id).ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;

        match apply(snapshot) {
            TransactStep::Update(next) => {
                coll.docs.insert(id.to_string(), next.clone());
                coll.notify(id, &next);
                debug!(collection, id, "Transaction committed");
                Ok(TransactOutcome::Updated)
            }
            TransactStep::Keep => {
                debug!(collection, id, "Transaction kept snapshot");
                Ok(TransactOutcome::Unchanged)
            }
            TransactStep::Abort(reason) => {
                debug!(collection, id, reason = %reason, "Transaction aborted");
                Err(StoreError::Aborted { reason })
            }
        }
    }

    #[instrument(skip(self))]
    async fn subscribe(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Subscription<Document>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        let coll = inner.entry(collection.to_string()).or_default();
        // Existing snapshot is delivered immediately, matching live-query
        // backends where the first callback carries current state.
        if let Some(data) = coll.docs.get(id) {
            let _ = tx.send(Document {
                id: id.to_string(),
                data: data.clone(),
            });
        }
        coll.doc_watchers.entry(id.to_string()).or_default().push(tx);
        Ok(Subscription::from_receiver(rx))
    }

    #[instrument(skip(self))]
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        Ok(self.run_query(collection, query))
    }

    #[instrument(skip(self))]
    async fn subscribe_query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Subscription<Vec<Document>>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
        {
            let mut inner = self.inner.lock().unwrap();
            let coll = inner.entry(collection.to_string()).or_default();
            coll.collection_watchers.push(tick_tx);
        }
        let _ = tx.send(self.run_query(collection, query));

        // Re-run the query after every write to the collection until the
        // subscriber drops its receiver.
        let store = self.clone();
        let collection = collection.to_string();
        let query = query.clone();
        tokio::spawn(async move {
            while tick_rx.recv().await.is_some() {
                if tx.send(store.run_query(&collection, &query)).is_err() {
                    break;
                }
            }
        });
        Ok(Subscription::from_receiver(rx))
    }
}
