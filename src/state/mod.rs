// Host state module
//
// The config registry (flat list, menu tree, load order) plus the event bus the
// host publishes skin lifecycle changes on.

pub mod registry;

pub use registry::{ConfigRegistry, LoadOrder, LoadOrderEntry};

use tokio::sync::broadcast;

/// Events published whenever the host changes what is running.
///
/// These let a UI shell or an "about" surface follow the host without polling.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// The skin tree was scanned
    SkinsScanned { configs: usize },

    /// An instance was created for a config
    SkinActivated { config: String, variant: String },

    /// An instance was asked to go away; `deferred` when its teardown waits
    /// for the next safe point
    SkinDeactivated { config: String, deferred: bool },

    /// An instance was actually destroyed
    SkinDestroyed { config: String },

    /// A running variant moved to a new index after a rescan
    VariantReindexed {
        config: String,
        variant: String,
        active: usize,
    },

    /// A running instance reloaded itself
    SkinRefreshed { config: String },

    /// A theme replaced the settings file
    ThemeLoaded { name: String },

    /// `!Quit` reached the safe point
    QuitRequested,
}

/// Broadcast channel for [`HostEvent`]s.
///
/// Publishing never fails: with no subscriber the event is simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HostEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a bus buffering up to 100 events per subscriber
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    pub fn publish(&self, event: HostEvent) {
        tracing::trace!("Host event: {:?}", event);
        // Ignore send errors - it's OK if no one is listening
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
