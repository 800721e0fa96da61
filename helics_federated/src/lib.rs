//! Message-filtering subsystem: the set of endpoint/filter handles a core hosts on
//! behalf of its federates, the operators and filter implementations that run over
//! messages in flight between them, and the broker-base event loop that drives it all.

pub mod broker;
pub mod capi;
pub mod coordinator;
pub mod filter_federate;
pub mod filters;
pub mod handles;
pub mod operators;
pub mod protocol;
pub mod time_coordinator;
pub mod timer;

pub use filter_federate::FilterFederate;
pub use protocol::{ActionKind, ActionMessage};
