//! Line-preserving INI document.
//!
//! Skin variant files and the host settings file are edited in place, so a
//! write has to keep comments, blank lines and the order of everything it does
//! not touch. Section and key lookups are case-insensitive; the first
//! occurrence wins when a file repeats a section or key.

use crate::utils::eq_ignore_case;
use anyhow::{Context, Result};
use camino::Utf8Path;
use indexmap::IndexMap;
use std::fmt;
use std::fs;
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Entry { key: String, value: String },
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Section {
    name: String,
    lines: Vec<Line>,
}

/// An INI file held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniDocument {
    /// Lines before the first section header
    preamble: Vec<String>,
    sections: Vec<Section>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text. Never fails: unrecognized lines are kept verbatim.
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        for raw in text.lines() {
            let trimmed = raw.trim();

            if let Some(name) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                doc.sections.push(Section {
                    name: name.trim().to_string(),
                    lines: Vec::new(),
                });
                continue;
            }

            let is_comment = trimmed.starts_with(';') || trimmed.starts_with('#');
            let line = match trimmed.split_once('=') {
                Some((key, value)) if !is_comment && !key.trim().is_empty() => Line::Entry {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                },
                _ => Line::Other(raw.to_string()),
            };

            match doc.sections.last_mut() {
                Some(section) => section.lines.push(line),
                None => doc.preamble.push(raw.to_string()),
            }
        }

        doc
    }

    /// Load a document from disk. A missing file yields an empty document.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("Failed to read INI file: {}", path))?;
        Ok(Self::parse(&text))
    }

    /// Write the document to `path` atomically (temp file in the same
    /// directory, then rename over the target).
    pub fn save_atomic(&self, path: &Utf8Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir))?;
        temp.write_all(self.to_string().as_bytes())
            .with_context(|| format!("Failed to write temporary file for {}", path))?;
        temp.flush()?;
        temp.persist(path)
            .with_context(|| format!("Failed to replace {}", path))?;
        Ok(())
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| eq_ignore_case(&s.name, name))
    }

    fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| eq_ignore_case(&s.name, name))
    }

    /// Look up a value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value } if eq_ignore_case(k, key) => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.section(section).is_some()
    }

    /// All entries of a section in file order (first occurrence of each key).
    pub fn section_entries(&self, section: &str) -> IndexMap<String, String> {
        let mut entries = IndexMap::new();
        if let Some(section) = self.section(section) {
            for line in &section.lines {
                if let Line::Entry { key, value } = line {
                    let known = entries.keys().any(|k: &String| eq_ignore_case(k, key));
                    if !known {
                        entries.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        entries
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Set a value, creating the section and key as needed. An existing key
    /// keeps its position and spelling.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        if self.section(section).is_none() {
            self.sections.push(Section {
                name: section.to_string(),
                lines: Vec::new(),
            });
        }
        let Some(target) = self.section_mut(section) else {
            return;
        };

        for line in target.lines.iter_mut() {
            if let Line::Entry { key: k, value: v } = line {
                if eq_ignore_case(k, key) {
                    *v = value.to_string();
                    return;
                }
            }
        }

        // Insert after the last entry so trailing blank lines stay trailing
        let at = target
            .lines
            .iter()
            .rposition(|l| matches!(l, Line::Entry { .. }))
            .map_or(0, |i| i + 1);
        target.lines.insert(
            at,
            Line::Entry {
                key: key.to_string(),
                value: value.to_string(),
            },
        );
    }

    /// Remove every occurrence of a key. Returns whether anything was removed.
    pub fn remove_key(&mut self, section: &str, key: &str) -> bool {
        let Some(target) = self.section_mut(section) else {
            return false;
        };
        let before = target.lines.len();
        target
            .lines
            .retain(|l| !matches!(l, Line::Entry { key: k, .. } if eq_ignore_case(k, key)));
        before != target.lines.len()
    }

    /// Remove a whole section. Returns whether it existed.
    pub fn remove_section(&mut self, section: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| !eq_ignore_case(&s.name, section));
        before != self.sections.len()
    }

    /// Replace a section's entries wholesale.
    pub fn replace_section(&mut self, section: &str, entries: &IndexMap<String, String>) {
        self.remove_section(section);
        self.sections.push(Section {
            name: section.to_string(),
            lines: entries
                .iter()
                .map(|(key, value)| Line::Entry {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        });
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.preamble {
            writeln!(f, "{line}")?;
        }
        for section in &self.sections {
            writeln!(f, "[{}]", section.name)?;
            for line in &section.lines {
                match line {
                    Line::Entry { key, value } => writeln!(f, "{key}={value}")?,
                    Line::Other(raw) => writeln!(f, "{raw}")?,
                }
            }
        }
        Ok(())
    }
}
