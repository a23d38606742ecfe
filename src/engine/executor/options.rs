use std::sync::Arc;
use std::time::Duration;

use crate::engine::cache::{CacheKey, ReportCache, Ttl};
use crate::engine::types::{Actor, Record};

pub type PostProcess = Arc<dyn Fn(Vec<Record>) -> Vec<Record> + Send + Sync>;

/// Binds a cache to one execution: hits skip the data source entirely.
#[derive(Clone)]
pub struct ResultCaching {
    pub cache: ReportCache<Vec<Record>>,
    pub key: CacheKey,
    pub ttl: Ttl,
}

#[derive(Clone, Default)]
pub struct ExecuteOptions {
    pub actor: Option<Actor>,
    /// Load `Query::relationships` onto the fetched records.
    pub load_relationships: bool,
    pub post_process: Option<PostProcess>,
    pub caching: Option<ResultCaching>,
    /// Overrides the executor's per-call timeout.
    pub timeout: Option<Duration>,
}

impl ExecuteOptions {
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_relationships(mut self) -> Self {
        self.load_relationships = true;
        self
    }

    pub fn with_post_process(mut self, hook: PostProcess) -> Self {
        self.post_process = Some(hook);
        self
    }

    pub fn with_caching(mut self, caching: ResultCaching) -> Self {
        self.caching = Some(caching);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl std::fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("actor", &self.actor.as_ref().map(|a| a.id.as_str()))
            .field("load_relationships", &self.load_relationships)
            .field("post_process", &self.post_process.is_some())
            .field("caching", &self.caching.as_ref().map(|c| c.key.as_str()))
            .field("timeout", &self.timeout)
            .finish()
    }
}
