// Skin activation state machine
//
// A config is Inactive (selection 0) or Active(n) with exactly one running
// instance on variant n. Activation persists the 1-based selection before the
// instance is created; deactivation persists 0 when asked to.

use super::{Host, Parked, RunningSkin, UserNotice, running_key};
use crate::instance::InstanceError;
use crate::state::HostEvent;
use crate::utils::{config_dir, eq_ignore_case};
use std::collections::HashMap;

/// Result of [`Host::activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// A new instance is running
    Activated,
    /// That exact variant was already running; nothing changed
    AlreadyActive,
    /// The variant file is gone; the config stays inactive
    FileMissing,
    /// The factory failed; the config was deactivated again
    CreationFailed,
    /// No such config or variant index
    InvalidIndex,
}

/// Result of [`Host::deactivate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivationOutcome {
    NotRunning,
    Destroyed,
    /// The instance is on the call stack and was parked for the next safe point
    Deferred,
}

/// A running instance that no longer matches the scanned tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    ConfigMissing { config: String },
    VariantMissing { config: String, variant: String },
}

/// What [`Host::refresh_all`] did.
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Instances that reloaded successfully
    pub refreshed: Vec<String>,
    /// Instances that were force-deactivated
    pub divergences: Vec<Divergence>,
    /// Instances whose reload failed; they keep running
    pub failures: Vec<(String, InstanceError)>,
    /// Instances whose variant moved to a new index
    pub reindexed: Vec<String>,
}

impl Host {
    /// Start `variant_index` (0-based) of the config at `config_index`.
    ///
    /// Replaces an instance running another variant of the same config.
    pub fn activate(&mut self, config_index: usize, variant_index: usize) -> ActivationOutcome {
        let Some((name, variant)) = self.registry.config(config_index).and_then(|config| {
            config
                .variants
                .get(variant_index)
                .map(|variant| (config.name.clone(), variant.clone()))
        }) else {
            tracing::warn!(
                "Invalid skin index: config {}, variant {}",
                config_index,
                variant_index
            );
            return ActivationOutcome::InvalidIndex;
        };

        if let Some(running) = self.running(&name) {
            let pending = running.pending;
            if !pending && eq_ignore_case(&running.variant, &variant) {
                tracing::warn!("Skin already active: {}\\{}", name, variant);
                return ActivationOutcome::AlreadyActive;
            }
            if !pending {
                self.deactivate(&name, true);
            }
            self.detach_pending(&name);
        }

        let file = config_dir(&self.paths.skin_root, &name).join(&variant);
        if !file.is_file() {
            if let Some(config) = self.registry.config_mut(config_index) {
                config.active = 0;
            }
            let notice = UserNotice::UnableToActivate {
                config: name,
                file: variant,
            };
            tracing::error!("{}", notice);
            self.shell.show_notice(&notice);
            return ActivationOutcome::FileMissing;
        }

        if let Some(config) = self.registry.config_mut(config_index) {
            config.active = variant_index + 1;
        }
        self.persist_active(&name, variant_index + 1);

        match self.factory.create(&self.paths.skin_root, &name, &variant) {
            Ok(instance) => {
                let id = self.allocate_instance_id();
                self.running.insert(
                    running_key(&name),
                    RunningSkin {
                        id,
                        config: name.clone(),
                        variant: variant.clone(),
                        instance,
                        pending: false,
                    },
                );
                tracing::info!("Activated skin: {}\\{}", name, variant);
                self.metrics().record_activation();
                self.events()
                    .publish(HostEvent::SkinActivated { config: name, variant });
                ActivationOutcome::Activated
            }
            Err(e) => {
                tracing::error!("Unable to create skin {}\\{}: {}", name, variant, e);
                if let Some(config) = self.registry.config_mut(config_index) {
                    config.active = 0;
                }
                self.persist_active(&name, 0);
                ActivationOutcome::CreationFailed
            }
        }
    }

    /// Activate by names, as the bangs do.
    pub fn activate_by_name(&mut self, config: &str, file: &str) -> ActivationOutcome {
        match self.registry.find_variant(config, file) {
            Some((config_index, variant_index)) => self.activate(config_index, variant_index),
            None => {
                tracing::error!("Invalid parameters: {} {}", config, file);
                ActivationOutcome::InvalidIndex
            }
        }
    }

    /// Stop the instance of `name`.
    ///
    /// With `persist` the config's selection is written out as 0. An instance
    /// that is on the call stack is hidden now and destroyed at the next
    /// [`pump`](Host::pump).
    pub fn deactivate(&mut self, name: &str, persist: bool) -> DeactivationOutcome {
        if let Some(index) = self.registry.find(name) {
            let config_name = match self.registry.config_mut(index) {
                Some(config) => {
                    config.active = 0;
                    config.name.clone()
                }
                None => name.to_string(),
            };
            if persist {
                self.persist_active(&config_name, 0);
            }
        }

        let key = running_key(name);
        let Some(skin) = self.running.get_mut(&key) else {
            return DeactivationOutcome::NotRunning;
        };
        if skin.pending {
            return DeactivationOutcome::Deferred;
        }

        if self.call_stack.contains(&skin.id) {
            tracing::debug!("Deferring teardown of {}", skin.config);
            skin.pending = true;
            skin.instance
                .run_bang(crate::instance::InstanceAction::HideFade, "");
            let (id, config) = (skin.id, skin.config.clone());
            self.pending_teardown.insert(id, Parked::InPlace);
            self.metrics().record_deferred_teardown();
            self.events().publish(HostEvent::SkinDeactivated {
                config,
                deferred: true,
            });
            return DeactivationOutcome::Deferred;
        }

        let Some(skin) = self.running.remove(&key) else {
            return DeactivationOutcome::NotRunning;
        };
        self.events().publish(HostEvent::SkinDeactivated {
            config: skin.config.clone(),
            deferred: false,
        });
        self.destroy(skin);
        DeactivationOutcome::Destroyed
    }

    /// Deactivate `config` if it runs, otherwise activate `file` of it.
    pub fn toggle_config(&mut self, config: &str, file: &str) {
        if self.running(config).is_some_and(|skin| !skin.pending) {
            self.deactivate(config, true);
        } else {
            self.activate_by_name(config, file);
        }
    }

    /// Rescan and reconcile every running instance with the new tree.
    ///
    /// Instances whose config or variant vanished are deactivated with a
    /// notice; moved variants are re-indexed silently; the rest are refreshed.
    /// One instance failing to refresh does not stop the others.
    pub fn refresh_all(&mut self) -> RefreshReport {
        let previous: HashMap<String, usize> = self
            .running
            .iter()
            .filter_map(|(key, skin)| {
                let index = self.registry.find(&skin.config)?;
                Some((key.clone(), self.registry.config(index)?.active))
            })
            .collect();

        self.reload_settings(false);

        let mut report = RefreshReport::default();

        for key in self.running_by_load_order() {
            let Some((name, variant)) = self
                .running
                .get(&key)
                .filter(|skin| !skin.pending)
                .map(|skin| (skin.config.clone(), skin.variant.clone()))
            else {
                continue;
            };

            let Some(config_index) = self.registry.find(&name) else {
                self.deactivate(&name, false);
                self.notify_refresh_failure(&name, "");
                report.divergences.push(Divergence::ConfigMissing { config: name });
                continue;
            };

            let Some((_, variant_index)) = self.registry.find_variant(&name, &variant) else {
                self.deactivate(&name, true);
                self.notify_refresh_failure(&name, &variant);
                report
                    .divergences
                    .push(Divergence::VariantMissing { config: name, variant });
                continue;
            };

            let active = variant_index + 1;
            if let Some(config) = self.registry.config_mut(config_index) {
                config.active = active;
            }
            if previous.get(&key) != Some(&active) {
                self.persist_active(&name, active);
                self.events().publish(HostEvent::VariantReindexed {
                    config: name.clone(),
                    variant: variant.clone(),
                    active,
                });
                report.reindexed.push(name.clone());
            }

            let result = match self.running.get_mut(&key) {
                Some(skin) => skin.instance.refresh(),
                None => continue,
            };
            match result {
                Ok(()) => {
                    self.events()
                        .publish(HostEvent::SkinRefreshed { config: name.clone() });
                    report.refreshed.push(name);
                }
                Err(e) => {
                    tracing::error!("Failed to refresh {}: {}", name, e);
                    self.metrics().record_refresh_failure();
                    report.failures.push((name, e));
                }
            }
        }

        tracing::info!(
            "Refreshed {} skins ({} removed, {} failed)",
            report.refreshed.len(),
            report.divergences.len(),
            report.failures.len()
        );
        report
    }

    /// Activate every config with a valid stored selection, in load order.
    pub fn activate_active_configs(&mut self) {
        let selections: Vec<(usize, usize)> = self
            .registry
            .ordered(|_, config| config.is_active())
            .into_iter()
            .filter_map(|index| {
                let config = self.registry.config(index)?;
                Some((index, config.active - 1))
            })
            .collect();

        for (config_index, variant_index) in selections {
            self.activate(config_index, variant_index);
        }
    }

    fn notify_refresh_failure(&mut self, config: &str, file: &str) {
        let notice = UserNotice::UnableToRefresh {
            config: config.to_string(),
            file: file.to_string(),
        };
        tracing::error!("{}", notice);
        self.shell.show_notice(&notice);
    }

    fn persist_active(&mut self, config: &str, active: usize) {
        if let Err(e) = self.settings.write(config, "Active", &active.to_string()) {
            tracing::error!("Failed to store Active for {}: {:#}", config, e);
        }
    }

    /// Store a config's load order and re-sort.
    pub fn set_load_order(&mut self, config: &str, order: i64) -> bool {
        let Some(index) = self.registry.find(config) else {
            return false;
        };
        let name = self.registry.configs()[index].name.clone();
        self.registry.set_load_order(index, order);
        if let Err(e) = self.settings.write(&name, "LoadOrder", &order.to_string()) {
            tracing::error!("Failed to store LoadOrder for {}: {:#}", name, e);
        }
        true
    }
}
