use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::engine::errors::{SourceError, SourceErrorKind};
use crate::engine::executor::{DataSource, MemorySource, Query, ReadOutput};
use crate::engine::types::{Actor, Record};

/// What the next `read` does before (or instead of) returning data.
#[derive(Debug, Clone)]
pub enum ReadStep {
    Fail(SourceErrorKind),
    Delay(Duration),
    Panic,
}

/// Data source backed by `MemorySource` with scripted misbehaviour and
/// call recording.
pub struct ScriptedSource {
    inner: MemorySource,
    resource: String,
    script: Mutex<VecDeque<ReadStep>>,
    latency: Duration,
    paged: bool,
    loaded: bool,
    readable: bool,
    fail_load_batch: Option<usize>,
    read_calls: AtomicUsize,
    load_batches: Mutex<Vec<usize>>,
    read_offsets: Mutex<Vec<usize>>,
}

impl ScriptedSource {
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Sizes of every batch handed to `load`, in call order.
    pub fn load_batches(&self) -> Vec<usize> {
        self.load_batches.lock().clone()
    }

    pub fn read_offsets(&self) -> Vec<usize> {
        self.read_offsets.lock().clone()
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn supports_read(&self) -> bool {
        self.readable
    }

    fn resources(&self) -> Vec<String> {
        vec![self.resource.clone()]
    }

    async fn read(&self, query: &Query, actor: Option<&Actor>) -> Result<ReadOutput, SourceError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.read_offsets.lock().push(query.offset);

        let step = self.script.lock().pop_front();
        match step {
            Some(ReadStep::Fail(kind)) => {
                return Err(SourceError::new(kind, "scripted failure"));
            }
            Some(ReadStep::Delay(delay)) => tokio::time::sleep(delay).await,
            Some(ReadStep::Panic) => panic!("scripted panic"),
            None => {}
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let records = self.inner.read(query, actor).await?.into_records();
        Ok(if self.paged {
            ReadOutput::Page { results: records }
        } else {
            ReadOutput::Records(records)
        })
    }

    /// Tags each record with `<relationship>_loaded = true`.
    async fn load(
        &self,
        records: Vec<Record>,
        relationship: &str,
        _actor: Option<&Actor>,
    ) -> Result<Vec<Record>, SourceError> {
        let batch_no = {
            let mut batches = self.load_batches.lock();
            batches.push(records.len());
            batches.len()
        };
        if self.fail_load_batch == Some(batch_no) {
            return Err(SourceError::other(format!("batch {batch_no} failed")));
        }
        Ok(records
            .into_iter()
            .map(|mut record| {
                if let Some(obj) = record.as_object_mut() {
                    obj.insert(format!("{relationship}_loaded"), json!(true));
                }
                record
            })
            .collect())
    }
}

pub struct ScriptedSourceFactory {
    resource: String,
    records: Vec<Record>,
    script: VecDeque<ReadStep>,
    latency: Duration,
    paged: bool,
    loaded: bool,
    readable: bool,
    fail_load_batch: Option<usize>,
}

impl ScriptedSourceFactory {
    pub fn new() -> Self {
        Self {
            resource: "orders".to_string(),
            records: Vec::new(),
            script: VecDeque::new(),
            latency: Duration::ZERO,
            paged: false,
            loaded: true,
            readable: true,
            fail_load_batch: None,
        }
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = resource.to_string();
        self
    }

    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    pub fn then(mut self, step: ReadStep) -> Self {
        self.script.push_back(step);
        self
    }

    pub fn failing(mut self, times: usize, kind: SourceErrorKind) -> Self {
        self.script
            .extend(std::iter::repeat_n(ReadStep::Fail(kind), times));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Wraps every read in `ReadOutput::Page`.
    pub fn paged(mut self) -> Self {
        self.paged = true;
        self
    }

    pub fn unloaded(mut self) -> Self {
        self.loaded = false;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    /// 1-based index of the `load` call that fails.
    pub fn fail_load_on_batch(mut self, batch: usize) -> Self {
        self.fail_load_batch = Some(batch);
        self
    }

    pub fn create(self) -> ScriptedSource {
        ScriptedSource {
            inner: MemorySource::new("scripted").with_resource(self.resource.clone(), self.records),
            resource: self.resource,
            script: Mutex::new(self.script),
            latency: self.latency,
            paged: self.paged,
            loaded: self.loaded,
            readable: self.readable,
            fail_load_batch: self.fail_load_batch,
            read_calls: AtomicUsize::new(0),
            load_batches: Mutex::new(Vec::new()),
            read_offsets: Mutex::new(Vec::new()),
        }
    }
}
