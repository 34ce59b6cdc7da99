//! Plain data shared across the host.
//!
//! - [`SkinConfig`]: one discovered config with its variants and selection
//! - [`MenuNode`] / [`MenuEntry`]: the folder-shaped skin tree and the flattened
//!   entries handed to the UI shell
//! - [`HostOptions`]: global options from the `[Rainmeter]` section
//! - [`PRESERVED_KEYS`]: global keys that survive a theme swap

pub mod options;
pub mod skin;

pub use options::{GLOBAL_SECTION, HostOptions, PRESERVED_KEYS, PreservedKey};
pub use skin::{CONFIG_COMMAND_FIRST, MenuEntry, MenuNode, SkinConfig, THEME_COMMAND_FIRST};
