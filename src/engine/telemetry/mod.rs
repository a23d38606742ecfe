mod bus;
mod event;

pub use bus::{SubscriptionId, TelemetryBus, TelemetryHandler};
pub use event::{TelemetryEvent, event_names};
