//! Running skin instances.
//!
//! The host never renders anything itself: it creates, drives and destroys
//! instances through [`SkinInstance`] and [`InstanceFactory`]. A windowed
//! shell supplies real implementations; [`headless`] is the in-process one
//! used by the command-line driver and the tests.

pub mod headless;

pub use headless::{HeadlessFactory, HeadlessSkin};

use camino::Utf8Path;
use thiserror::Error;

/// Host-assigned id of a created instance, unique for the life of the host.
pub type InstanceId = u64;

/// Errors raised by an instance while being created or refreshed.
#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("Unable to read skin file: {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Skin {config} failed: {message}")]
    Failed { config: String, message: String },
}

/// Everything a bang can ask a single instance to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceAction {
    Refresh,
    Redraw,
    Update,
    Hide,
    Show,
    Toggle,
    HideFade,
    ShowFade,
    ToggleFade,
    HideMeter,
    ShowMeter,
    ToggleMeter,
    MoveMeter,
    UpdateMeter,
    DisableMeasure,
    EnableMeasure,
    ToggleMeasure,
    UpdateMeasure,
    CommandMeasure,
    ShowBlur,
    HideBlur,
    ToggleBlur,
    AddBlur,
    RemoveBlur,
    Move,
    ZPos,
    ClickThrough,
    Draggable,
    SnapEdges,
    KeepOnScreen,
    SetTransparency,
    SetVariable,
    SetOption,
    PluginBang,
    HideMeterGroup,
    ShowMeterGroup,
    ToggleMeterGroup,
    UpdateMeterGroup,
    DisableMeasureGroup,
    EnableMeasureGroup,
    ToggleMeasureGroup,
    UpdateMeasureGroup,
    SetOptionGroup,
}

/// A running realization of one config variant.
pub trait SkinInstance {
    fn config_name(&self) -> &str;

    fn variant_file(&self) -> &str;

    /// Full path of the variant file this instance was created from
    fn file_path(&self) -> &Utf8Path;

    /// Apply a bang; `args` holds the bang's own parameters joined by spaces.
    fn run_bang(&mut self, action: InstanceAction, args: &str);

    /// Reload from disk.
    fn refresh(&mut self) -> Result<(), InstanceError>;

    fn belongs_to_group(&self, group: &str) -> bool;

    /// Value of a named variable, if defined.
    fn variable(&self, name: &str) -> Option<String>;

    /// Current value of a producer (measure or variable) for `[name]`
    /// substitution, matched case-insensitively.
    fn producer_value(&self, name: &str) -> Option<String>;

    /// Evaluate `expr` as a formula against this instance's values.
    fn evaluate_formula(&self, expr: &str) -> Option<f64>;

    /// Opaque native window handle.
    fn window_handle(&self) -> u64;
}

/// Creates instances for the host.
pub trait InstanceFactory {
    fn create(
        &mut self,
        skin_root: &Utf8Path,
        config: &str,
        variant: &str,
    ) -> Result<Box<dyn SkinInstance>, InstanceError>;
}

/// Lets an instance stand in as the value source for `[name]` substitution.
pub struct InstanceProducers<'a>(pub &'a dyn SkinInstance);

impl crate::services::interpolate::ValueProducers for InstanceProducers<'_> {
    fn value_of(&self, name: &str) -> Option<String> {
        self.0.producer_value(name)
    }
}
