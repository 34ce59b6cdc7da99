use super::{InstanceAction, InstanceError, InstanceFactory, SkinInstance};
use crate::services::ini::IniDocument;
use crate::utils::{config_dir, eq_ignore_case};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use std::sync::{Arc, Mutex};

/// Something that happened to a headless instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Created { config: String, variant: String },
    Bang {
        config: String,
        action: InstanceAction,
        args: String,
    },
    Refreshed { config: String },
    Destroyed { config: String },
}

/// Shared, append-only record of every headless instance's lifecycle.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<JournalEntry>>>);

impl Journal {
    pub fn push(&self, entry: JournalEntry) {
        if let Ok(mut entries) = self.0.lock() {
            entries.push(entry);
        }
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Bangs received by `config`, in order.
    pub fn bangs_for(&self, config: &str) -> Vec<(InstanceAction, String)> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                JournalEntry::Bang {
                    config: c,
                    action,
                    args,
                } if eq_ignore_case(&c, config) => Some((action, args)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.0.lock() {
            entries.clear();
        }
    }
}

/// A skin instance without a window.
///
/// Variables come from the `[Variables]` section of the variant file and group
/// tags from `Group=` (pipe separated) in its `[Rainmeter]` section.
pub struct HeadlessSkin {
    config: String,
    variant: String,
    path: Utf8PathBuf,
    variables: IndexMap<String, String>,
    groups: Vec<String>,
    visible: bool,
    handle: u64,
    journal: Journal,
}

impl HeadlessSkin {
    pub fn load(
        path: Utf8PathBuf,
        config: &str,
        variant: &str,
        handle: u64,
        journal: Journal,
    ) -> Result<Self, InstanceError> {
        let mut skin = Self {
            config: config.to_string(),
            variant: variant.to_string(),
            path,
            variables: IndexMap::new(),
            groups: Vec::new(),
            visible: true,
            handle,
            journal,
        };
        skin.read_file()?;
        Ok(skin)
    }

    fn read_file(&mut self) -> Result<(), InstanceError> {
        let text = fs::read_to_string(&self.path).map_err(|source| InstanceError::Read {
            path: self.path.to_string(),
            source,
        })?;
        let doc = IniDocument::parse(&text);

        self.variables = doc.section_entries("Variables");
        self.groups = doc
            .get("Rainmeter", "Group")
            .unwrap_or_default()
            .split('|')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();
        Ok(())
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_variable(&mut self, name: &str, value: &str) {
        let existing = self
            .variables
            .keys()
            .find(|k| eq_ignore_case(k, name))
            .cloned();
        self.variables
            .insert(existing.unwrap_or_else(|| name.to_string()), value.to_string());
    }
}

impl Drop for HeadlessSkin {
    fn drop(&mut self) {
        self.journal.push(JournalEntry::Destroyed {
            config: self.config.clone(),
        });
    }
}

impl SkinInstance for HeadlessSkin {
    fn config_name(&self) -> &str {
        &self.config
    }

    fn variant_file(&self) -> &str {
        &self.variant
    }

    fn file_path(&self) -> &Utf8Path {
        &self.path
    }

    fn run_bang(&mut self, action: InstanceAction, args: &str) {
        self.journal.push(JournalEntry::Bang {
            config: self.config.clone(),
            action,
            args: args.to_string(),
        });

        match action {
            InstanceAction::Show | InstanceAction::ShowFade => self.visible = true,
            InstanceAction::Hide | InstanceAction::HideFade => self.visible = false,
            InstanceAction::Toggle | InstanceAction::ToggleFade => self.visible = !self.visible,
            InstanceAction::SetVariable => match args.split_once(' ') {
                Some((name, value)) => self.set_variable(name, value),
                None => tracing::error!("!SetVariable: Incorrect arguments: {}", args),
            },
            InstanceAction::Refresh => {
                if let Err(e) = self.refresh() {
                    tracing::error!("{}", e);
                }
            }
            _ => tracing::debug!("{}: {:?} {}", self.config, action, args),
        }
    }

    fn refresh(&mut self) -> Result<(), InstanceError> {
        self.read_file()?;
        self.journal.push(JournalEntry::Refreshed {
            config: self.config.clone(),
        });
        Ok(())
    }

    fn belongs_to_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| eq_ignore_case(g, group))
    }

    fn variable(&self, name: &str) -> Option<String> {
        self.variables
            .iter()
            .find(|(k, _)| eq_ignore_case(k, name))
            .map(|(_, v)| v.clone())
    }

    fn producer_value(&self, name: &str) -> Option<String> {
        self.variable(name)
    }

    fn evaluate_formula(&self, expr: &str) -> Option<f64> {
        let mut parser = Formula {
            chars: expr.chars().filter(|c| !c.is_whitespace()).collect(),
            pos: 0,
            skin: self,
        };
        let value = parser.expression()?;
        (parser.pos == parser.chars.len()).then_some(value)
    }

    fn window_handle(&self) -> u64 {
        self.handle
    }
}

/// `+ - * /` and parentheses over numbers and numeric variables.
struct Formula<'a> {
    chars: Vec<char>,
    pos: usize,
    skin: &'a HeadlessSkin,
}

impl Formula<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn expression(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == '*' { value * rhs } else { value / rhs };
        }
        Some(value)
    }

    fn factor(&mut self) -> Option<f64> {
        match self.peek()? {
            '(' => {
                self.pos += 1;
                let value = self.expression()?;
                (self.peek()? == ')').then(|| self.pos += 1)?;
                Some(value)
            }
            '-' => {
                self.pos += 1;
                self.factor().map(|v| -v)
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_digit() || c == '.')
                {
                    self.pos += 1;
                }
                self.chars[start..self.pos]
                    .iter()
                    .collect::<String>()
                    .parse()
                    .ok()
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
                    self.pos += 1;
                }
                let name: String = self.chars[start..self.pos].iter().collect();
                self.skin.variable(&name)?.trim().parse().ok()
            }
            _ => None,
        }
    }
}

/// Creates [`HeadlessSkin`]s from variant files under the skin root.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    journal: Journal,
    next_handle: u64,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Journal shared by every instance this factory creates.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl InstanceFactory for HeadlessFactory {
    fn create(
        &mut self,
        skin_root: &Utf8Path,
        config: &str,
        variant: &str,
    ) -> Result<Box<dyn SkinInstance>, InstanceError> {
        self.next_handle += 1;
        let path = config_dir(skin_root, config).join(variant);
        let skin = HeadlessSkin::load(
            path,
            config,
            variant,
            0x1_0000 + self.next_handle,
            self.journal.clone(),
        )?;

        self.journal.push(JournalEntry::Created {
            config: config.to_string(),
            variant: variant.to_string(),
        });
        Ok(Box::new(skin))
    }
}
