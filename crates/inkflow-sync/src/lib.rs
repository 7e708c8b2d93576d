//! Client-side data access for Inkflow.
//!
//! [`ClientService`] routes every operation to the REST API when it is
//! reachable and to a local fallback store when it is not, tagging each
//! result with where it came from. The device-side [`OfflineCache`] keeps the
//! last fetched list, drafts, preferences and a log of offline mutations.

pub mod auth;
pub mod cache;
pub mod error;
pub mod fixtures;
pub mod local;
pub mod poller;
pub mod probe;
pub mod remote;
pub mod service;

pub use auth::{AuthErrorHandler, LogAuthErrors, StaticToken, TokenProvider, friendly_message};
pub use cache::{MemoryKv, OfflineCache};
pub use error::{Error, Result};
pub use local::LocalStore;
pub use poller::{DEFAULT_POLL_PERIOD, PollHandle};
pub use probe::{AvailabilityProbe, FixedProbe, HttpProbe};
pub use remote::RemoteStore;
pub use service::{ClientService, FallbackPolicy, FallbackReason, Served, Source};
