// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inference engine backed by a local llama.cpp-style command.
//!
//! Each generation runs `{command} {args} -m {model} -p {prompt} -n {max_tokens}`
//! and takes trimmed stdout as the reply.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use parlor_config::model::EngineConfig;
use parlor_core::{EngineLoader, InferenceEngine, ParlorError};
use tracing::debug;

pub struct CommandEngine {
    config: EngineConfig,
    model_path: PathBuf,
}

impl CommandEngine {
    pub fn new(config: EngineConfig, model_path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            model_path: model_path.into(),
        }
    }

    fn command(&self, prompt: &str) -> Command {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .arg("-m")
            .arg(&self.model_path)
            .arg("-p")
            .arg(prompt)
            .arg("-n")
            .arg(self.config.max_tokens.to_string())
            .stdin(Stdio::null());
        command
    }
}

impl InferenceEngine for CommandEngine {
    fn generate(&self, prompt: &str) -> Result<String, ParlorError> {
        debug!(command = %self.config.command, prompt_len = prompt.len(), "running engine");
        let output = self
            .command(prompt)
            .output()
            .map_err(|e| ParlorError::Engine {
                message: format!("could not run {}", self.config.command),
                source: Some(Box::new(e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("").trim();
            return Err(ParlorError::engine(format!(
                "{} exited with {}{}{}",
                self.config.command,
                output.status,
                if detail.is_empty() { "" } else { ": " },
                detail
            )));
        }

        let reply = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if reply.is_empty() {
            return Err(ParlorError::engine("engine produced no output"));
        }
        Ok(reply)
    }
}

/// Builds a [`CommandEngine`] per model file.
pub struct CommandEngineLoader {
    config: EngineConfig,
}

impl CommandEngineLoader {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl EngineLoader for CommandEngineLoader {
    fn load(&self, model_path: &Path) -> Result<Arc<dyn InferenceEngine>, ParlorError> {
        Ok(Arc::new(CommandEngine::new(self.config.clone(), model_path)))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn config(command: &str, args: &[&str]) -> EngineConfig {
        EngineConfig {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            max_tokens: 8,
        }
    }

    #[test]
    fn passes_model_prompt_and_token_limit() {
        let engine = CommandEngine::new(config("echo", &["--simple-io"]), "/models/q.gguf");
        let reply = engine.generate("hello there").unwrap();
        assert_eq!(reply, "--simple-io -m /models/q.gguf -p hello there -n 8");
    }

    #[test]
    fn non_zero_exit_is_an_engine_error() {
        let engine = CommandEngine::new(config("false", &[]), "/models/q.gguf");
        assert!(matches!(engine.generate("hi"), Err(ParlorError::Engine { .. })));
    }

    #[test]
    fn missing_command_is_an_engine_error() {
        let engine = CommandEngine::new(config("parlor-no-such-engine", &[]), "/m.gguf");
        let err = engine.generate("hi").unwrap_err();
        assert!(err.to_string().contains("could not run parlor-no-such-engine"));
    }

    #[test]
    fn loader_binds_model_path() {
        let loader = CommandEngineLoader::new(config("echo", &[]));
        let engine = loader.load(Path::new("/models/x.gguf")).unwrap();
        assert_eq!(engine.generate("p").unwrap(), "-m /models/x.gguf -p p -n 8");
    }
}
