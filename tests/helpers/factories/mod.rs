pub mod record_factory;
pub mod recording_variables;
pub mod scripted_source;

pub use record_factory::RecordFactory;
pub use recording_variables::{RecordingVariables, RecordingVariablesFactory};
pub use scripted_source::{ReadStep, ScriptedSource, ScriptedSourceFactory};

#[cfg(test)]
mod record_factory_test;
