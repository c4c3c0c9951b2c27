//! srv-discovery
//!
//! Client-side service discovery with background caching: translates a logical
//! service name into a live, periodically refreshed set of network-addressable
//! instances. Consumers read a cached snapshot on the hot path (non-blocking
//! after warm-up), resolver failures are absorbed by a last-known-good
//! staleness policy, and instance-set changes are pushed through callbacks or
//! an event-channel shim.
//!
//! The resolution protocol is pluggable through [`ResolverBackend`]; the
//! built-in backend translates RFC 2782 DNS SRV lookups into instance records.

pub mod backend;
pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod instance;
pub mod instancer;
pub mod matcher;

// Re-exports
pub use backend::ResolverBackend;
pub use backend::dns::{DnsSrvBackend, NameTemplate};
pub use backoff::{DEFAULT_MAX_REFRESH_BACKOFF, RefreshBackoff};
pub use client::{BackendFactory, Client};
pub use config::{DEFAULT_REFRESH_INTERVAL_SECS, DiscoveryConfig};
pub use error::{DiscoveryError, Result};
pub use event::Event;
pub use instance::{Health, Instance, Service};
pub use instancer::{ChangeCallback, Instancer};
pub use matcher::InstanceMatcher;
