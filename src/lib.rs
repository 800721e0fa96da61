//! helics is the message-delivery and filtering subsystem of a HELICS-style
//! co-simulation runtime: the endpoint/filter graph, the filter-federate that runs
//! filter operators, and the broker-base event loop that hosts it.
//!
//! ## Example
//!
//! Attach a delay filter to a source endpoint and run the filter federate's operator
//! chain over an in-flight message:
//!
//! ```rust
//! use helics_federated::filters::{DelayFilter, FilterOperation};
//! use helics_federated::operators::MessageOperator;
//! use helics_core::{message::Message, time::Time};
//!
//! let delay = DelayFilter::default();
//! delay.set("delay", 2.5).unwrap();
//!
//! let msg = Message::new("port1", "port2", b"hello".to_vec(), Time::ZERO);
//! let out = delay.operator().process(msg).primary.unwrap();
//! assert_eq!(out.time, Time::new(2.5));
//! ```
//!
//! ## Feature flags
#![doc = document_features::document_features!()]

#[cfg(feature = "runner")]
pub mod runner;

// Re-exports
pub use helics_core as core;
#[cfg(feature = "federated")]
pub use helics_federated as federated;
