use serde::{Deserialize, Serialize};

/// First command id handed out to skin variants in the config menu.
pub const CONFIG_COMMAND_FIRST: u32 = 30000;

/// First command id handed out to themes in the theme menu.
pub const THEME_COMMAND_FIRST: u32 = 20000;

/// A discovered skin configuration: one folder holding at least one variant file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinConfig {
    /// Hierarchical name relative to the skin root (`Vendor\Clock`)
    pub name: String,

    /// Variant filenames in enumeration order
    pub variants: Vec<String>,

    /// 0 when inactive, otherwise the 1-based index of the selected variant
    pub active: usize,

    /// Menu command id of each variant, parallel to `variants`
    pub commands: Vec<u32>,
}

impl SkinConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
            active: 0,
            commands: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active > 0
    }

    /// The selected variant filename, if any.
    pub fn active_variant(&self) -> Option<&str> {
        self.active
            .checked_sub(1)
            .and_then(|i| self.variants.get(i))
            .map(String::as_str)
    }

    /// Position of `file` among the variants (case-insensitive).
    pub fn variant_index(&self, file: &str) -> Option<usize> {
        self.variants
            .iter()
            .position(|v| crate::utils::eq_ignore_case(v, file))
    }

    /// Set the 1-based selection. Out-of-range values clear it.
    pub fn set_active(&mut self, active: usize) {
        self.active = if active <= self.variants.len() { active } else { 0 };
    }
}

/// One node of the folder-shaped skin menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuNode {
    /// A selectable variant of the config at `config_index` in the flat list
    Variant {
        name: String,
        config_index: usize,
        variant_index: usize,
    },

    /// A folder with its children in enumeration order
    Folder { name: String, children: Vec<MenuNode> },
}

impl MenuNode {
    pub fn name(&self) -> &str {
        match self {
            MenuNode::Variant { name, .. } | MenuNode::Folder { name, .. } => name,
        }
    }
}

/// Menu entry as handed to the UI shell for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuEntry {
    /// A skin variant; selecting it toggles that variant
    Variant {
        label: String,
        config_index: usize,
        variant_index: usize,
        command: u32,
        checked: bool,
    },
    Item {
        label: String,
        command: u32,
        checked: bool,
    },
    Submenu {
        label: String,
        children: Vec<MenuEntry>,
    },
    Separator,
}

impl MenuEntry {
    pub fn label(&self) -> Option<&str> {
        match self {
            MenuEntry::Variant { label, .. }
            | MenuEntry::Item { label, .. }
            | MenuEntry::Submenu { label, .. } => Some(label),
            MenuEntry::Separator => None,
        }
    }

    /// Count selectable items in this entry and its children.
    pub fn item_count(&self) -> usize {
        match self {
            MenuEntry::Variant { .. } | MenuEntry::Item { .. } => 1,
            MenuEntry::Submenu { children, .. } => children.iter().map(MenuEntry::item_count).sum(),
            MenuEntry::Separator => 0,
        }
    }
}
