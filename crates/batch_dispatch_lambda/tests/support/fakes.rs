use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use batch_dispatch_core::PipelineError;
use batch_dispatch_lambda::adapters::connector::{ProducerClients, ProducerConnector};
use batch_dispatch_lambda::adapters::path_lister::{PathLister, PathStream};
use futures::stream;

use super::queue::InMemoryQueue;

/// Serves a fixed key list, or fails the listing outright.
#[derive(Clone, Default)]
pub struct StaticLister {
    keys: Vec<String>,
    failure: Option<PipelineError>,
}

impl StaticLister {
    pub fn with_keys(keys: Vec<String>) -> Self {
        Self {
            keys,
            failure: None,
        }
    }

    pub fn failing(error: PipelineError) -> Self {
        Self {
            keys: Vec::new(),
            failure: Some(error),
        }
    }
}

impl PathLister for StaticLister {
    fn list_paths<'a>(&'a self, _bucket: &'a str, prefix: &'a str) -> PathStream<'a> {
        if let Some(error) = &self.failure {
            return Box::pin(stream::iter(vec![Err(error.clone())]));
        }
        let matching: Vec<_> = self
            .keys
            .iter()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .map(Ok)
            .collect();
        Box::pin(stream::iter(matching))
    }
}

/// Hands out the fake clients and counts how often it was asked to.
pub struct FakeConnector {
    pub lister: StaticLister,
    pub queue: InMemoryQueue,
    connects: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new(lister: StaticLister, queue: InMemoryQueue) -> Self {
        Self {
            lister,
            queue,
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProducerConnector for FakeConnector {
    async fn connect(&self, _region: &str) -> ProducerClients {
        self.connects.fetch_add(1, Ordering::SeqCst);
        ProducerClients {
            lister: Box::new(self.lister.clone()),
            sender: Box::new(self.queue.clone()),
        }
    }
}

pub fn padded_keys(count: usize, padding: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("Source/{}/file_{i:03}.txt", "d".repeat(padding)))
        .collect()
}
