use crate::models::skin::{MenuNode, SkinConfig};
use crate::services::scanner::ScanResult;
use crate::utils::eq_ignore_case;

/// One `(order, config)` association in the load-order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOrderEntry {
    pub order: i64,
    pub config_index: usize,
    /// Registration sequence, breaks ties between equal orders
    seq: u64,
}

/// Configs sorted by load order. Equal orders keep registration order, and a
/// config whose order is set again moves behind the others with that order.
#[derive(Debug, Clone, Default)]
pub struct LoadOrder {
    entries: Vec<LoadOrderEntry>,
    next_seq: u64,
}

impl LoadOrder {
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
    }

    pub fn set(&mut self, config_index: usize, order: i64) {
        self.entries.retain(|e| e.config_index != config_index);
        let entry = LoadOrderEntry {
            order,
            config_index,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        let at = self
            .entries
            .partition_point(|e| (e.order, e.seq) < (entry.order, entry.seq));
        self.entries.insert(at, entry);
    }

    /// Order of a config; unset means 0.
    pub fn get(&self, config_index: usize) -> i64 {
        self.entries
            .iter()
            .find(|e| e.config_index == config_index)
            .map_or(0, |e| e.order)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadOrderEntry> {
        self.entries.iter()
    }
}

/// The flat config list, the menu tree and the load order from the last scan.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    configs: Vec<SkinConfig>,
    menu: Vec<MenuNode>,
    load_order: LoadOrder,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a fresh scan. Every config starts with order 0
    /// in scan order.
    pub fn replace(&mut self, scan: ScanResult) {
        self.configs = scan.configs;
        self.menu = scan.menu;
        self.load_order.clear();
        for index in 0..self.configs.len() {
            self.load_order.set(index, 0);
        }
    }

    pub fn configs(&self) -> &[SkinConfig] {
        &self.configs
    }

    pub fn configs_mut(&mut self) -> impl Iterator<Item = &mut SkinConfig> {
        self.configs.iter_mut()
    }

    pub fn config(&self, index: usize) -> Option<&SkinConfig> {
        self.configs.get(index)
    }

    pub fn config_mut(&mut self, index: usize) -> Option<&mut SkinConfig> {
        self.configs.get_mut(index)
    }

    pub fn menu(&self) -> &[MenuNode] {
        &self.menu
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Index of the config called `name` (case-insensitive).
    pub fn find(&self, name: &str) -> Option<usize> {
        self.configs
            .iter()
            .position(|c| eq_ignore_case(&c.name, name))
    }

    /// `(config index, variant index)` of a variant file within a config.
    pub fn find_variant(&self, name: &str, file: &str) -> Option<(usize, usize)> {
        let config_index = self.find(name)?;
        let variant_index = self.configs[config_index].variant_index(file)?;
        Some((config_index, variant_index))
    }

    /// Config owning a menu command id, with the variant index it selects.
    pub fn find_command(&self, command: u32) -> Option<(usize, usize)> {
        self.configs.iter().enumerate().find_map(|(ci, config)| {
            config
                .commands
                .iter()
                .position(|&c| c == command)
                .map(|vi| (ci, vi))
        })
    }

    pub fn set_load_order(&mut self, config_index: usize, order: i64) {
        if config_index < self.configs.len() {
            self.load_order.set(config_index, order);
        }
    }

    pub fn load_order_of(&self, config_index: usize) -> i64 {
        self.load_order.get(config_index)
    }

    /// Config indices in load order, keeping those accepted by `filter`.
    /// Group queries pass a membership test here.
    pub fn ordered<F>(&self, mut filter: F) -> Vec<usize>
    where
        F: FnMut(usize, &SkinConfig) -> bool,
    {
        self.load_order
            .iter()
            .filter_map(|e| {
                let config = self.configs.get(e.config_index)?;
                filter(e.config_index, config).then_some(e.config_index)
            })
            .collect()
    }
}
