// skinhost - desktop skin host core
//
// This is the library crate: skin discovery, activation, bang dispatch and the
// settings store. The binary crate (main.rs) drives it headless.

pub mod config;
pub mod host;
pub mod instance;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::HostPaths;
pub use host::{DispatchError, Host, HostShell, UserNotice};
pub use instance::{InstanceFactory, SkinInstance};
pub use models::{HostOptions, MenuEntry, SkinConfig};
pub use state::{ConfigRegistry, EventBus, HostEvent};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
