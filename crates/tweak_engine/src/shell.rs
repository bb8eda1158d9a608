//! Shell-backed system access.
//!
//! `WindowsSystem` implements the probe and mutator traits by running
//! `reg.exe`, `sc.exe` and the configured shell, then parsing their output.

use crate::parsers::{self, normalize_key_path};
use crate::system::{CommandOutput, RegistryValue, ServiceState, SystemMutator, SystemProbe};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};
use tweak_common::config::ShellConfig;
use tweak_common::{
    MutationError, ProbeError, RegValueType, ServiceAction, ServiceActionKind, StartupType,
};

/// sc.exe exit code when stopping a service that is not running
const ERROR_SERVICE_NOT_ACTIVE: i32 = 1062;
/// sc.exe exit code when starting a service that is already running
const ERROR_SERVICE_ALREADY_RUNNING: i32 = 1056;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Runs a program to completion and captures its output
pub struct ShellRunner;

impl ShellRunner {
    /// Spawn `program args...` and wait for it.
    ///
    /// The child is killed if the returned future is dropped, so an outer
    /// timeout never leaves a stray process behind.
    pub async fn run(program: &str, args: &[&str]) -> std::io::Result<CommandOutput> {
        debug!("  Executing: {} {:?}", program, args);

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let output = cmd.output().await?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

fn describe(program: &str, args: &[&str]) -> String {
    let mut text = program.to_string();
    for arg in args {
        text.push(' ');
        if arg.contains(' ') {
            text.push('"');
            text.push_str(arg);
            text.push('"');
        } else {
            text.push_str(arg);
        }
    }
    text
}

/// Probe + mutator for a live Windows host
#[derive(Debug, Clone, Default)]
pub struct WindowsSystem {
    shell: ShellConfig,
}

impl WindowsSystem {
    pub fn new(shell: ShellConfig) -> Self {
        Self { shell }
    }

    async fn probe_run(
        &self,
        program: &str,
        args: &[&str],
        subject: &str,
    ) -> Result<CommandOutput, ProbeError> {
        let output = ShellRunner::run(program, args)
            .await
            .map_err(|e| ProbeError::Failed(format!("could not run {}: {}", program, e)))?;

        if output.success() {
            return Ok(output);
        }

        // reg.exe reports on stderr, sc.exe on stdout
        let combined = format!("{}\n{}", output.stdout, output.stderr);
        if parsers::is_not_found(&combined) {
            Err(ProbeError::NotFound(subject.to_string()))
        } else {
            Err(ProbeError::Failed(format!(
                "{} exited with code {}: {}",
                describe(program, args),
                output.code,
                combined.trim()
            )))
        }
    }

    async fn mutate_run(
        &self,
        program: &str,
        args: &[&str],
        tolerated: &[i32],
    ) -> Result<CommandOutput, MutationError> {
        let output = ShellRunner::run(program, args)
            .await
            .map_err(|e| MutationError::Spawn(format!("{}: {}", program, e)))?;

        if output.success() || tolerated.contains(&output.code) {
            return Ok(output);
        }

        let stderr = if output.stderr.trim().is_empty() {
            output.stdout.trim().to_string()
        } else {
            output.stderr.trim().to_string()
        };
        warn!("{} failed with code {}: {}", describe(program, args), output.code, stderr);
        Err(MutationError::CommandFailed {
            command: describe(program, args),
            code: output.code,
            stderr,
        })
    }
}

#[async_trait]
impl SystemProbe for WindowsSystem {
    async fn probe_registry(&self, path: &str, key: &str) -> Result<RegistryValue, ProbeError> {
        let path = normalize_key_path(path);
        let subject = format!("{}\\{}", path, key);
        let output = self
            .probe_run(&self.shell.reg_program, &["query", path.as_str(), "/v", key], &subject)
            .await?;
        parsers::parse_reg_query(&output.stdout, key)
    }

    async fn probe_service(&self, name: &str) -> Result<ServiceState, ProbeError> {
        let subject = format!("service {}", name);
        let query = self
            .probe_run(&self.shell.sc_program, &["query", name], &subject)
            .await?;
        let qc = self
            .probe_run(&self.shell.sc_program, &["qc", name], &subject)
            .await?;
        parsers::parse_service_state(&query.stdout, &qc.stdout)
    }
}

#[async_trait]
impl SystemMutator for WindowsSystem {
    async fn write_registry(
        &self,
        path: &str,
        key: &str,
        value: &str,
        value_type: RegValueType,
    ) -> Result<(), MutationError> {
        let path = normalize_key_path(path);
        self.mutate_run(
            &self.shell.reg_program,
            &[
                "add",
                path.as_str(),
                "/v",
                key,
                "/t",
                value_type.as_reg_str(),
                "/d",
                value,
                "/f",
            ],
            &[],
        )
        .await
        .map(|_| ())
    }

    async fn set_service_startup(
        &self,
        name: &str,
        action: ServiceAction,
    ) -> Result<(), MutationError> {
        let sc = self.shell.sc_program.as_str();
        self.mutate_run(sc, &["config", name, "start=", action.startup_type.sc_value()], &[])
            .await?;

        match action.kind {
            ServiceActionKind::Disable => {
                self.mutate_run(sc, &["stop", name], &[ERROR_SERVICE_NOT_ACTIVE])
                    .await?;
            }
            ServiceActionKind::Enable if action.startup_type == StartupType::Automatic => {
                self.mutate_run(sc, &["start", name], &[ERROR_SERVICE_ALREADY_RUNNING])
                    .await?;
            }
            ServiceActionKind::Enable => {}
        }
        Ok(())
    }

    async fn run_command(&self, command: &str) -> Result<CommandOutput, MutationError> {
        let mut args: Vec<&str> = self.shell.args.iter().map(String::as_str).collect();
        args.push(command);
        self.mutate_run(&self.shell.program, &args, &[]).await
    }
}
