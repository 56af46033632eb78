//! Change feed for observers
//!
//! Observers (dashboards, the CLI event stream, tests) never read shared
//! mutable state. They subscribe to the bus and receive an event for every
//! phase change, sequence boundary, rejection, log entry, and pool change.
//!
//! ```text
//!  Coordinator     Aggregator      Server pool     Harness
//!      |               |               |              |
//!      +---------------+-------+-------+--------------+
//!                              v
//!                 EventBus (tokio broadcast)
//!                              |
//!               +--------------+--------------+
//!               v              v              v
//!           CLI stream     dashboards       tests
//! ```

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, create_event_bus};
pub use types::{IntersectionEvent, TransitionCause};
