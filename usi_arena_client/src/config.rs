// Engine client configuration.
//
// Loaded from a JSON file (by default `./client.json`):
//
//   {
//     "command": "./engine --threads 2",
//     "args": ["--extra"],
//     "cwd": "/opt/engine",
//     "option": { "USI_Hash": 256, "Ponder": true }
//   }
//
// `command` is split on whitespace; `args` are appended after it. Option
// values may be any JSON scalar and are sent to the engine as text.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ClientConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub option: BTreeMap<String, Value>,
}

impl ClientConfig {
    /// A config that runs `program` with `args` and no options.
    pub fn for_program(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: program.into(),
            args,
            cwd: None,
            option: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        if config.command.split_whitespace().next().is_none() {
            return Err(ConfigError::EmptyCommand);
        }
        Ok(config)
    }

    /// Program to run and its full argument list.
    pub fn program_and_args(&self) -> (String, Vec<String>) {
        let mut words = self.command.split_whitespace().map(str::to_owned);
        let program = words.next().unwrap_or_default();
        let args = words.chain(self.args.iter().cloned()).collect();
        (program, args)
    }

    /// `(name, value)` pairs for `setoption`, in name order.
    pub fn options(&self) -> Vec<(String, String)> {
        self.option
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_and_options() {
        let config = ClientConfig::from_json(
            r#"{"command": "./engine --threads 2", "args": ["-q"], "cwd": "/tmp",
                "option": {"USI_Hash": 256, "Ponder": true, "BookFile": "book.db"}}"#,
        )
        .unwrap();
        let (program, args) = config.program_and_args();
        assert_eq!(program, "./engine");
        assert_eq!(args, vec!["--threads", "2", "-q"]);
        assert_eq!(config.cwd.as_deref(), Some(Path::new("/tmp")));
        assert_eq!(
            config.options(),
            vec![
                ("BookFile".to_owned(), "book.db".to_owned()),
                ("Ponder".to_owned(), "true".to_owned()),
                ("USI_Hash".to_owned(), "256".to_owned()),
            ]
        );
    }

    #[test]
    fn blank_command_is_rejected() {
        assert!(matches!(
            ClientConfig::from_json(r#"{"command": "  "}"#).unwrap_err(),
            ConfigError::EmptyCommand
        ));
        assert!(matches!(
            ClientConfig::from_json("{}").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
