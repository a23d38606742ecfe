pub mod global;
pub mod model;

pub use global::CONFIG;
pub use model::{
    AlertThresholds, CacheConfig, ExecutorConfig, LoggingConfig, MonitorConfig, PipelineDefaults,
    Settings, load_settings,
};
