pub use super::factories::{
    RecordFactory, RecordingVariables, RecordingVariablesFactory, ScriptedSource,
    ScriptedSourceFactory,
};

pub struct Factory;

impl Factory {
    pub fn record() -> RecordFactory {
        RecordFactory::new()
    }

    pub fn source() -> ScriptedSourceFactory {
        ScriptedSourceFactory::new()
    }

    pub fn variables() -> RecordingVariablesFactory {
        RecordingVariablesFactory::new()
    }
}
