//! Bang routing.
//!
//! A bang name (with or without the `!`/`!Rainmeter` prefix) is looked up in a
//! [`BangTable`]. Table entries either address running instances with a fixed
//! number of leading parameters, fan out over a config group, or are handled
//! by their own code below.

use super::{DeferredTask, Host, running_key, shell::AboutTab, shell::ManageTab};
use crate::instance::{InstanceAction, InstanceId, InstanceProducers};
use crate::services::interpolate::ValueProducers;
use crate::services::settings::SettingsError;
use crate::services::tokenizer::{quote, split_bracketed, tokenize};
use crate::utils::eq_ignore_case;
use std::collections::HashMap;
use thiserror::Error;

/// Routing failures. They are logged and counted; the caller carries on.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown bang: {0}")]
    UnknownBang(String),

    #[error("!{bang}: Incorrect number of arguments")]
    IncorrectArgumentCount { bang: String },

    #[error("!{bang}: \"{config}\" not active")]
    ConfigNotFound { bang: String, config: String },

    #[error("!{bang}: Invalid parameters")]
    InvalidParameters { bang: String },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// How a bang is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bang {
    /// `arity` leading parameters, then an optional target config (absent or
    /// `*` means every running instance)
    Instance { action: InstanceAction, arity: usize },
    /// `arity` leading parameters, then a required group tag
    ConfigGroup { action: InstanceAction, arity: usize },
    Execute,
    RefreshApp,
    ActivateConfig,
    DeactivateConfig,
    ToggleConfig,
    DeactivateConfigGroup,
    About,
    Manage,
    SkinMenu,
    TrayMenu,
    ResetStats,
    WriteKeyValue,
    Quit,
    LsBoxHook,
}

/// Bang name → [`Bang`], keyed by lowercased name without prefix.
#[derive(Debug, Clone)]
pub struct BangTable {
    entries: HashMap<String, Bang>,
}

impl Default for BangTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BangTable {
    pub fn new() -> Self {
        use InstanceAction as A;

        const INSTANCE: &[(&str, InstanceAction, usize)] = &[
            ("Refresh", A::Refresh, 0),
            ("Redraw", A::Redraw, 0),
            ("Update", A::Update, 0),
            ("Hide", A::Hide, 0),
            ("Show", A::Show, 0),
            ("Toggle", A::Toggle, 0),
            ("HideFade", A::HideFade, 0),
            ("ShowFade", A::ShowFade, 0),
            ("ToggleFade", A::ToggleFade, 0),
            ("HideMeter", A::HideMeter, 1),
            ("ShowMeter", A::ShowMeter, 1),
            ("ToggleMeter", A::ToggleMeter, 1),
            ("MoveMeter", A::MoveMeter, 3),
            ("UpdateMeter", A::UpdateMeter, 1),
            ("DisableMeasure", A::DisableMeasure, 1),
            ("EnableMeasure", A::EnableMeasure, 1),
            ("ToggleMeasure", A::ToggleMeasure, 1),
            ("UpdateMeasure", A::UpdateMeasure, 1),
            ("CommandMeasure", A::CommandMeasure, 2),
            ("ShowBlur", A::ShowBlur, 0),
            ("HideBlur", A::HideBlur, 0),
            ("ToggleBlur", A::ToggleBlur, 0),
            ("AddBlur", A::AddBlur, 1),
            ("RemoveBlur", A::RemoveBlur, 1),
            ("Move", A::Move, 2),
            ("ZPos", A::ZPos, 1),
            ("ChangeZPos", A::ZPos, 1),
            ("ClickThrough", A::ClickThrough, 1),
            ("Draggable", A::Draggable, 1),
            ("SnapEdges", A::SnapEdges, 1),
            ("KeepOnScreen", A::KeepOnScreen, 1),
            ("SetTransparency", A::SetTransparency, 1),
            ("SetVariable", A::SetVariable, 2),
            ("SetOption", A::SetOption, 3),
            ("PluginBang", A::PluginBang, 1),
            // Meter and measure groups live inside one instance
            ("HideMeterGroup", A::HideMeterGroup, 1),
            ("ShowMeterGroup", A::ShowMeterGroup, 1),
            ("ToggleMeterGroup", A::ToggleMeterGroup, 1),
            ("UpdateMeterGroup", A::UpdateMeterGroup, 1),
            ("DisableMeasureGroup", A::DisableMeasureGroup, 1),
            ("EnableMeasureGroup", A::EnableMeasureGroup, 1),
            ("ToggleMeasureGroup", A::ToggleMeasureGroup, 1),
            ("UpdateMeasureGroup", A::UpdateMeasureGroup, 1),
            ("SetOptionGroup", A::SetOptionGroup, 3),
        ];

        const GROUP: &[(&str, InstanceAction, usize)] = &[
            ("RefreshGroup", A::Refresh, 0),
            ("UpdateGroup", A::Update, 0),
            ("RedrawGroup", A::Redraw, 0),
            ("HideGroup", A::Hide, 0),
            ("ShowGroup", A::Show, 0),
            ("ToggleGroup", A::Toggle, 0),
            ("HideFadeGroup", A::HideFade, 0),
            ("ShowFadeGroup", A::ShowFade, 0),
            ("ToggleFadeGroup", A::ToggleFade, 0),
            ("ZPosGroup", A::ZPos, 1),
            ("ClickThroughGroup", A::ClickThrough, 1),
            ("DraggableGroup", A::Draggable, 1),
            ("SnapEdgesGroup", A::SnapEdges, 1),
            ("KeepOnScreenGroup", A::KeepOnScreen, 1),
            ("SetTransparencyGroup", A::SetTransparency, 1),
            ("SetVariableGroup", A::SetVariable, 2),
        ];

        const SPECIAL: &[(&str, Bang)] = &[
            ("Execute", Bang::Execute),
            ("RefreshApp", Bang::RefreshApp),
            ("ActivateConfig", Bang::ActivateConfig),
            ("DeactivateConfig", Bang::DeactivateConfig),
            ("ToggleConfig", Bang::ToggleConfig),
            ("DeactivateConfigGroup", Bang::DeactivateConfigGroup),
            ("About", Bang::About),
            ("Manage", Bang::Manage),
            ("SkinMenu", Bang::SkinMenu),
            ("TrayMenu", Bang::TrayMenu),
            ("ResetStats", Bang::ResetStats),
            ("WriteKeyValue", Bang::WriteKeyValue),
            ("Quit", Bang::Quit),
            ("LsBoxHook", Bang::LsBoxHook),
        ];

        let mut entries = HashMap::new();
        for &(name, action, arity) in INSTANCE {
            entries.insert(name.to_lowercase(), Bang::Instance { action, arity });
        }
        for &(name, action, arity) in GROUP {
            entries.insert(name.to_lowercase(), Bang::ConfigGroup { action, arity });
        }
        for &(name, bang) in SPECIAL {
            entries.insert(name.to_lowercase(), bang);
        }

        Self { entries }
    }

    /// Look up a bang by name. `!Rainmeter` or `!` is stripped first.
    pub fn lookup(&self, name: &str) -> Option<Bang> {
        self.entries.get(&normalize_name(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `!RainmeterShow`, `!show` and `Show` all become `show`.
fn normalize_name(name: &str) -> String {
    let bare = match name.get(..10) {
        Some(prefix) if prefix.eq_ignore_ascii_case("!rainmeter") => &name[10..],
        _ => name.strip_prefix('!').unwrap_or(name),
    };
    bare.to_lowercase()
}

/// Bang name for diagnostics: what was typed, without the leading `!`.
fn display_name(name: &str) -> &str {
    name.strip_prefix('!').unwrap_or(name)
}

impl Host {
    /// Run a command line as issued by `origin` (or by nobody).
    ///
    /// Unless the text is an `!Execute` batch, `[name]` references are
    /// substituted from the origin's values first. Bangs are dispatched;
    /// anything else goes to the shell as a program to run.
    pub fn execute_command(
        &mut self,
        text: &str,
        origin: Option<InstanceId>,
    ) -> Result<(), DispatchError> {
        let text = if text.get(..8).is_some_and(|p| p.eq_ignore_ascii_case("!execute")) {
            text.to_string()
        } else {
            let producers = origin
                .and_then(|id| self.find_running_by_id(id))
                .map(|skin| InstanceProducers(skin.instance.as_ref()));
            self.interpolator
                .interpolate(text, producers.as_ref().map(|p| p as &dyn ValueProducers))
                .into_owned()
        };

        if text.is_empty() {
            return Ok(());
        }

        if !text.starts_with('!') {
            tracing::debug!("Running program: {}", text);
            self.shell.run_program(&text);
            return Ok(());
        }

        let (name, args) = text.split_once(' ').unwrap_or((text.as_str(), ""));

        if let Some(id) = origin {
            self.call_stack.push(id);
        }
        let result = self.dispatch_bang(name, args, origin);
        if origin.is_some() {
            self.call_stack.pop();
        }
        result
    }

    /// Route one bang. `args` is the raw argument string.
    pub fn dispatch_bang(
        &mut self,
        name: &str,
        args: &str,
        origin: Option<InstanceId>,
    ) -> Result<(), DispatchError> {
        self.metrics().record_bang();

        let result = match self.bangs.lookup(name) {
            Some(bang) => self.run_bang(bang, display_name(name), args, origin),
            None => Err(DispatchError::UnknownBang(name.to_string())),
        };

        if let Err(e) = &result {
            self.metrics().record_routing_failure();
            tracing::error!("{}", e);
        }
        result
    }

    fn run_bang(
        &mut self,
        bang: Bang,
        name: &str,
        args: &str,
        origin: Option<InstanceId>,
    ) -> Result<(), DispatchError> {
        match bang {
            Bang::Instance { action, arity } => self.bang_with_args(name, action, arity, args),
            Bang::ConfigGroup { action, arity } => {
                self.bang_group_with_args(name, action, arity, args)
            }
            Bang::Execute => {
                for command in split_bracketed(args) {
                    // Each sub-command reports its own failure
                    let _ = self.execute_command(&command, origin);
                }
                Ok(())
            }
            Bang::RefreshApp => {
                self.deferred.push_back(DeferredTask::RefreshAll);
                Ok(())
            }
            Bang::Quit => {
                self.deferred.push_back(DeferredTask::Quit);
                Ok(())
            }
            Bang::ActivateConfig => {
                let tokens = tokenize(args);
                let [config, file, ..] = tokens.as_slice() else {
                    return Err(invalid(name));
                };
                match self.registry.find_variant(config, file) {
                    Some((ci, vi)) => {
                        self.activate(ci, vi);
                        Ok(())
                    }
                    None => {
                        tracing::error!("!{}: \"{}\\{}\" not found", name, config, file);
                        Err(invalid(name))
                    }
                }
            }
            Bang::DeactivateConfig => {
                let tokens = tokenize(args);
                let Some(config) = tokens.first() else {
                    return Err(invalid(name));
                };
                if !self.is_running(config) {
                    return Err(not_active(name, config));
                }
                self.deactivate(config, true);
                Ok(())
            }
            Bang::ToggleConfig => {
                let tokens = tokenize(args);
                let [config, file, ..] = tokens.as_slice() else {
                    return Err(invalid(name));
                };
                if self.running(config).is_some_and(|skin| !skin.pending) {
                    self.deactivate(config, true);
                    return Ok(());
                }
                match self.registry.find_variant(config, file) {
                    Some((ci, vi)) => {
                        self.activate(ci, vi);
                        Ok(())
                    }
                    None => Err(invalid(name)),
                }
            }
            Bang::DeactivateConfigGroup => {
                let tokens = tokenize(args);
                let Some(group) = tokens.first() else {
                    return Err(invalid(name));
                };
                for config in self.group_members(group) {
                    self.deactivate(&config, true);
                }
                Ok(())
            }
            Bang::About => {
                self.shell.open_about(AboutTab::from_arg(args.trim()));
                Ok(())
            }
            Bang::Manage => {
                self.shell.open_manage(ManageTab::from_arg(args.trim()));
                Ok(())
            }
            Bang::SkinMenu => {
                let tokens = tokenize(args);
                let Some(config) = tokens.first() else {
                    return Err(invalid(name));
                };
                match self.skin_menu(config) {
                    Some(entries) => {
                        let config_name = self
                            .running(config)
                            .map(|skin| skin.config.clone())
                            .unwrap_or_else(|| config.clone());
                        self.shell.show_skin_menu(&config_name, &entries);
                        Ok(())
                    }
                    None => Err(not_active(name, config)),
                }
            }
            Bang::TrayMenu => {
                let entries = self.tray_menu();
                self.shell.show_tray_menu(&entries);
                Ok(())
            }
            Bang::ResetStats => {
                if let Err(e) = self.reset_stats() {
                    tracing::error!("Failed to reset statistics: {:#}", e);
                }
                Ok(())
            }
            Bang::WriteKeyValue => self.write_key_value(name, args),
            Bang::LsBoxHook => Ok(()),
        }
    }

    /// Single-target or broadcast form of an instance action.
    fn bang_with_args(
        &mut self,
        name: &str,
        action: InstanceAction,
        arity: usize,
        args: &str,
    ) -> Result<(), DispatchError> {
        let tokens = tokenize(args);
        if tokens.len() < arity {
            return Err(DispatchError::IncorrectArgumentCount {
                bang: name.to_string(),
            });
        }
        let params = tokens[..arity].join(" ");

        match tokens.get(arity) {
            Some(target) if !target.is_empty() && target != "*" => {
                let skin = self
                    .running_mut(target)
                    .ok_or_else(|| not_active(name, target))?;
                skin.instance.run_bang(action, &params);
            }
            _ => {
                for skin in self.running.values_mut() {
                    skin.instance.run_bang(action, &params);
                }
            }
        }
        Ok(())
    }

    /// Re-dispatch the non-group action once per running member of a group,
    /// naming each member as the target.
    fn bang_group_with_args(
        &mut self,
        name: &str,
        action: InstanceAction,
        arity: usize,
        args: &str,
    ) -> Result<(), DispatchError> {
        let tokens = tokenize(args);
        if tokens.len() <= arity {
            return Err(DispatchError::IncorrectArgumentCount {
                bang: name.to_string(),
            });
        }

        let params: Vec<String> = tokens[..arity].iter().map(|t| quote(t)).collect();
        let single = name
            .len()
            .checked_sub("Group".len())
            .and_then(|end| name.get(..end))
            .unwrap_or(name);

        for config in self.group_members(&tokens[arity]) {
            let mut argument = params.clone();
            argument.push(quote(&config));
            if let Err(e) = self.bang_with_args(single, action, arity, &argument.join(" ")) {
                tracing::error!("{}", e);
            }
        }
        Ok(())
    }

    /// Running configs tagged with `group`, in load order.
    pub fn group_members(&self, group: &str) -> Vec<String> {
        self.registry
            .ordered(|_, config| {
                self.running(&config.name)
                    .is_some_and(|skin| skin.instance.belongs_to_group(group))
            })
            .into_iter()
            .filter_map(|index| self.registry.config(index).map(|c| c.name.clone()))
            .collect()
    }

    /// `section key value file [formula config]`
    fn write_key_value(&mut self, name: &str, args: &str) -> Result<(), DispatchError> {
        let tokens = tokenize(args);
        let [section, key, value, file, rest @ ..] = tokens.as_slice() else {
            return Err(invalid(name));
        };

        let context = rest
            .first()
            .and_then(|config| self.running.get(&running_key(config)));
        let formula = context.map(|skin| {
            let instance = skin.instance.as_ref();
            move |expr: &str| instance.evaluate_formula(expr)
        });

        let written = self.settings.write_guarded(
            file,
            section,
            key,
            value,
            formula.as_ref().map(|f| f as &dyn Fn(&str) -> Option<f64>),
        );
        let outcome = match written {
            Ok(outcome) => outcome,
            // Warned about by the store; not a failure
            Err(SettingsError::ReadOnly(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        self.metrics().record_settings_write();
        tracing::debug!(
            "!{}: [{}] {}={} in {} ({:?})",
            name,
            section,
            key,
            outcome.value,
            file,
            outcome.route
        );

        if eq_ignore_case(file, self.paths.settings_file.as_str()) {
            self.settings.reload();
        }
        Ok(())
    }
}

fn invalid(name: &str) -> DispatchError {
    DispatchError::InvalidParameters {
        bang: name.to_string(),
    }
}

fn not_active(name: &str, config: &str) -> DispatchError {
    DispatchError::ConfigNotFound {
        bang: name.to_string(),
        config: config.to_string(),
    }
}
