// Query protocol for embedded plugins: (command, data) in, one string out.

use super::Host;
use crate::instance::InstanceAction;
use crate::services::tokenizer::tokenize;
use crate::utils::normalize_separators;

/// Answer to a plugin query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeReply {
    Value(String),
    /// Nothing found
    Empty,
    Success,
    Error,
    /// Unknown or empty command
    Noop,
}

impl BridgeReply {
    pub fn as_str(&self) -> &str {
        match self {
            BridgeReply::Value(value) => value,
            BridgeReply::Empty => "",
            BridgeReply::Success => "success",
            BridgeReply::Error => "error",
            BridgeReply::Noop => "noop",
        }
    }

    pub fn into_string(self) -> String {
        match self {
            BridgeReply::Value(value) => value,
            other => other.as_str().to_string(),
        }
    }
}

impl Host {
    /// Handle a plugin query.
    ///
    /// | command       | data                   | reply                        |
    /// |---------------|------------------------|------------------------------|
    /// | `GetConfig`   | full variant file path | `"name"` or empty            |
    /// | `GetWindow`   | config                 | window handle or `error`     |
    /// | `GetVariable` | config variable        | value or empty               |
    /// | `SetVariable` | config variable value  | `success` or `error`         |
    pub fn plugin_bridge(&mut self, command: &str, data: &str) -> BridgeReply {
        if command.is_empty() {
            return BridgeReply::Noop;
        }

        match command.to_lowercase().as_str() {
            "getconfig" => {
                let wanted = normalize_separators(data);
                self.running
                    .values()
                    .find(|skin| {
                        normalize_separators(skin.instance.file_path().as_str())
                            .eq_ignore_ascii_case(&wanted)
                    })
                    .map_or(BridgeReply::Empty, |skin| {
                        BridgeReply::Value(format!("\"{}\"", skin.config))
                    })
            }
            "getwindow" => {
                let tokens = tokenize(data);
                tokens
                    .first()
                    .and_then(|config| self.running(config))
                    .map_or(BridgeReply::Error, |skin| {
                        BridgeReply::Value(skin.instance.window_handle().to_string())
                    })
            }
            "getvariable" => {
                let tokens = tokenize(data);
                let [config, variable, ..] = tokens.as_slice() else {
                    return BridgeReply::Empty;
                };
                self.running(config)
                    .and_then(|skin| skin.instance.variable(variable))
                    .map_or(BridgeReply::Empty, BridgeReply::Value)
            }
            "setvariable" => {
                let tokens = tokenize(data);
                let [config, rest @ ..] = tokens.as_slice() else {
                    return BridgeReply::Error;
                };
                if rest.is_empty() {
                    return BridgeReply::Error;
                }
                match self.running_mut(config) {
                    Some(skin) => {
                        skin.instance
                            .run_bang(InstanceAction::SetVariable, &rest.join(" "));
                        BridgeReply::Success
                    }
                    None => BridgeReply::Error,
                }
            }
            other => {
                tracing::debug!("Unknown plugin bridge command: {}", other);
                BridgeReply::Noop
            }
        }
    }
}
