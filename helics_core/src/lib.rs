//! Core data model, identifier algebra, and synchronization primitives shared by the
//! helics message-delivery and filtering subsystem.

pub mod endpoint;
pub mod error;
pub mod ids;
pub mod keys;
pub mod logging;
pub mod message;
pub mod sync;
pub mod time;

pub use endpoint::{Endpoint, EndpointState, FilterInfo, FilterKind};
pub use error::{HelicsError, Result};
pub use ids::{BrokerId, FederateId, GlobalHandle, InterfaceHandle, RouteId};
pub use message::{Message, MessageFlags, MessageId};
pub use time::{Time, Timestamp};
