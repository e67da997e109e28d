//! testbed-host: Host and package introspection
//!
//! Ping and process probes on the local machine, and RPM queries on any
//! command executor (local or SSH).

pub mod error;
pub mod host;
pub mod rpm;
pub mod types;

pub use error::PackageError;
pub use host::HostProbe;
pub use rpm::RpmManager;
pub use types::{MachineState, RpmListing, RpmPresence};
