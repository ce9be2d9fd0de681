//! Storage access tokens for the executor.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("token command is empty")]
    EmptyCommand,
    #[error("failed to spawn `{command}`: {message}")]
    Spawn { command: String, message: String },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("`{0}` printed no token")]
    EmptyToken(String),
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, CredentialError>;
}

/// Runs an external command (e.g. `gcloud auth print-access-token`) and
/// takes its trimmed stdout as the token.
#[derive(Debug, Clone)]
pub struct CommandTokenProvider {
    program: String,
    args: Vec<String>,
}

impl CommandTokenProvider {
    /// Split a whitespace-separated command line.
    pub fn from_command_line(line: &str) -> Result<Self, CredentialError> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(CredentialError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl CredentialProvider for CommandTokenProvider {
    async fn access_token(&self) -> Result<String, CredentialError> {
        debug!(command = %self.command_line(), "Requesting access token");
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CredentialError::Spawn {
                command: self.command_line(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CredentialError::Failed {
                command: self.command_line(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(CredentialError::EmptyToken(self.command_line()));
        }
        Ok(token)
    }
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(String);

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, CredentialError> {
        Ok(self.0.clone())
    }
}
