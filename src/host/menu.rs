use super::Host;
use crate::models::skin::{MenuEntry, MenuNode, THEME_COMMAND_FIRST};
use crate::state::ConfigRegistry;

impl Host {
    /// The skin tree as menu entries, with the active variants checked.
    pub fn config_menu(&self) -> Vec<MenuEntry> {
        render_nodes(&self.registry, self.registry.menu())
    }

    /// Variants of a running skin's config, or `None` if it is not running.
    pub fn skin_menu(&self, name: &str) -> Option<Vec<MenuEntry>> {
        let running = self.running(name)?;
        let config_index = self.registry.find(&running.config)?;
        let config = self.registry.config(config_index)?;

        let entries = config
            .variants
            .iter()
            .zip(&config.commands)
            .enumerate()
            .map(|(variant_index, (variant, &command))| MenuEntry::Variant {
                label: variant.clone(),
                config_index,
                variant_index,
                command,
                checked: config.active == variant_index + 1,
            })
            .collect();
        Some(entries)
    }

    /// One entry per theme folder.
    pub fn theme_menu(&self) -> Vec<MenuEntry> {
        self.themes
            .themes()
            .iter()
            .zip(THEME_COMMAND_FIRST..)
            .map(|(theme, command)| MenuEntry::Item {
                label: theme.clone(),
                command,
                checked: false,
            })
            .collect()
    }

    /// The global menu: skins, then themes when there are any.
    pub fn tray_menu(&self) -> Vec<MenuEntry> {
        let mut entries = vec![MenuEntry::Submenu {
            label: "Skins".to_string(),
            children: self.config_menu(),
        }];
        let themes = self.theme_menu();
        if !themes.is_empty() {
            entries.push(MenuEntry::Separator);
            entries.push(MenuEntry::Submenu {
                label: "Themes".to_string(),
                children: themes,
            });
        }
        entries
    }

    /// React to a menu selection. A variant toggles; a theme loads.
    ///
    /// # Returns
    /// `false` when the id belongs to no menu entry
    pub fn handle_menu_command(&mut self, command: u32) -> bool {
        if let Some((config_index, variant_index)) = self.registry.find_command(command) {
            let Some(config) = self.registry.config(config_index) else {
                return false;
            };
            if config.active == variant_index + 1 {
                let name = config.name.clone();
                self.deactivate(&name, true);
            } else {
                self.activate(config_index, variant_index);
            }
            return true;
        }

        let theme = command
            .checked_sub(THEME_COMMAND_FIRST)
            .and_then(|offset| self.themes.themes().get(offset as usize))
            .cloned();
        match theme {
            Some(theme) => {
                if let Err(e) = self.load_theme(&theme) {
                    tracing::error!("Failed to load theme {}: {:#}", theme, e);
                }
                true
            }
            None => {
                tracing::debug!("Unknown menu command: {}", command);
                false
            }
        }
    }
}

fn render_nodes(registry: &ConfigRegistry, nodes: &[MenuNode]) -> Vec<MenuEntry> {
    nodes
        .iter()
        .filter_map(|node| match node {
            MenuNode::Variant {
                name,
                config_index,
                variant_index,
            } => {
                let config = registry.config(*config_index)?;
                Some(MenuEntry::Variant {
                    label: name.clone(),
                    config_index: *config_index,
                    variant_index: *variant_index,
                    command: *config.commands.get(*variant_index)?,
                    checked: config.active == variant_index + 1,
                })
            }
            MenuNode::Folder { name, children } => Some(MenuEntry::Submenu {
                label: name.clone(),
                children: render_nodes(registry, children),
            }),
        })
        .collect()
}
