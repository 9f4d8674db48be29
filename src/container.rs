use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

///////////////////////////////////////////////////////////////////////////////

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntimeType {
    #[default]
    Docker,
    Podman,
}

impl ContainerRuntimeType {
    pub fn default_binary(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContainerRuntimeConfig {
    pub runtime: ContainerRuntimeType,
    /// Overrides the runtime executable looked up on `PATH`
    pub binary: Option<PathBuf>,
}

///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub read_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub image: String,
    pub container_name: Option<String>,
    pub network: Option<String>,
    pub volumes: Vec<VolumeSpec>,
    pub environment: Vec<(String, String)>,
    pub entry_point: Option<String>,
    pub args: Vec<String>,
    pub remove: bool,
}

///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
pub struct ContainerRuntime {
    config: ContainerRuntimeConfig,
}

impl ContainerRuntime {
    pub fn new(config: ContainerRuntimeConfig) -> Self {
        Self { config }
    }

    pub fn runtime_type(&self) -> ContainerRuntimeType {
        self.config.runtime
    }

    pub fn binary(&self) -> PathBuf {
        self.config
            .binary
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.config.runtime.default_binary()))
    }

    /// Arguments following the runtime binary for a `run` invocation.
    pub fn run_args(&self, args: &RunArgs) -> Vec<String> {
        let mut out = vec!["run".to_owned()];

        if args.remove {
            out.push("--rm".to_owned());
        }
        if let Some(name) = &args.container_name {
            out.push("--name".to_owned());
            out.push(name.clone());
        }
        if let Some(network) = &args.network {
            out.push("--network".to_owned());
            out.push(network.clone());
        }
        for v in &args.volumes {
            out.push("-v".to_owned());
            out.push(format!(
                "{}:{}{}",
                v.source.display(),
                v.dest.display(),
                if v.read_only { ":ro" } else { "" }
            ));
        }
        for (k, v) in &args.environment {
            out.push("-e".to_owned());
            out.push(format!("{k}={v}"));
        }
        if let Some(entry_point) = &args.entry_point {
            out.push("--entrypoint".to_owned());
            out.push(entry_point.clone());
        }

        out.push(args.image.clone());
        out.extend(args.args.iter().cloned());
        out
    }

    pub fn run_cmd(&self, args: RunArgs) -> Command {
        let mut cmd = Command::new(self.binary());
        cmd.args(self.run_args(&args));
        cmd
    }

    pub fn kill_cmd(&self, container_name: &str) -> Command {
        let mut cmd = Command::new(self.binary());
        cmd.args(["kill", container_name]);
        cmd
    }
}

///////////////////////////////////////////////////////////////////////////////
