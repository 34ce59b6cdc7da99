//! Services module - host logic with no UI and no running instances.
//!
//! # Components
//!
//! - [`tokenizer`]: quoting-aware splitting of bang arguments and `!Execute` batches
//! - [`scanner`]: discovery of skin configs and the menu tree under the skin root
//! - [`interpolate`]: `[name]` substitution in command text
//! - [`ini`]: a line-preserving INI document
//! - [`settings`]: the settings file plus the guarded write used by `!WriteKeyValue`
//! - [`themes`]: saved copies of the settings file
//! - [`stats`]: the statistics file
//!
//! Everything here takes its inputs as parameters, so it can be tested without
//! a [`Host`](crate::host::Host).

pub mod ini;
pub mod interpolate;
pub mod scanner;
pub mod settings;
pub mod stats;
pub mod themes;
pub mod tokenizer;

pub use ini::IniDocument;
pub use interpolate::{ValueProducers, VariableInterpolator};
pub use scanner::{ConfigScanner, DirEntry, DirectoryLister, FsLister, ScanResult};
pub use settings::{IniMappingProvider, NoIniMappings, SettingsError, SettingsStore, WriteOutcome, WriteRoute};
pub use stats::StatsStore;
pub use themes::ThemeStore;
pub use tokenizer::{quote, split_bracketed, tokenize};
