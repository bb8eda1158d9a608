//! Mutation plans.
//!
//! A plan is the single system change an apply or revert performs. Building
//! one never touches the system, so plans double as dry-run output.

use crate::system::SystemMutator;
use serde::Serialize;
use std::fmt;
use tweak_common::{
    Mechanism, MutationError, RegValueType, ServiceAction, TweakDescriptor,
};

/// Which way a tweak is being moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Apply,
    Revert,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Apply => f.write_str("apply"),
            Direction::Revert => f.write_str("revert"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum MutationPlan {
    WriteRegistry {
        path: String,
        key: String,
        value: String,
        value_type: RegValueType,
    },
    SetService {
        name: String,
        action: ServiceAction,
    },
    RunCommand {
        command: String,
    },
}

impl MutationPlan {
    /// Move the tweak to its intended value / apply action
    pub fn for_apply(descriptor: &TweakDescriptor) -> Self {
        match &descriptor.mechanism {
            Mechanism::Registry(reg) => MutationPlan::WriteRegistry {
                path: reg.path.clone(),
                key: reg.key.clone(),
                value: reg.intended_value.clone(),
                value_type: reg.value_type,
            },
            Mechanism::Service(svc) => MutationPlan::SetService {
                name: svc.service_name.clone(),
                action: svc.apply_action,
            },
            Mechanism::Command(cmd) => MutationPlan::RunCommand {
                command: cmd.apply_command.clone(),
            },
        }
    }

    /// Move the tweak back to the catalog default / revert action.
    /// `None` when the descriptor declares nothing to go back to.
    pub fn for_revert(descriptor: &TweakDescriptor) -> Option<Self> {
        match &descriptor.mechanism {
            Mechanism::Registry(reg) => {
                descriptor
                    .default_value
                    .as_ref()
                    .map(|default| MutationPlan::WriteRegistry {
                        path: reg.path.clone(),
                        key: reg.key.clone(),
                        value: default.clone(),
                        value_type: reg.value_type,
                    })
            }
            Mechanism::Service(svc) => svc.revert_action.map(|action| MutationPlan::SetService {
                name: svc.service_name.clone(),
                action,
            }),
            Mechanism::Command(cmd) => {
                cmd.revert_command
                    .as_ref()
                    .map(|command| MutationPlan::RunCommand {
                        command: command.clone(),
                    })
            }
        }
    }

    pub async fn execute(&self, mutator: &dyn SystemMutator) -> Result<(), MutationError> {
        match self {
            MutationPlan::WriteRegistry {
                path,
                key,
                value,
                value_type,
            } => mutator.write_registry(path, key, value, *value_type).await,
            MutationPlan::SetService { name, action } => {
                mutator.set_service_startup(name, *action).await
            }
            MutationPlan::RunCommand { command } => mutator.run_command(command).await.map(|_| ()),
        }
    }
}

impl fmt::Display for MutationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationPlan::WriteRegistry {
                path,
                key,
                value,
                value_type,
            } => write!(f, "set {}\\{} = {} ({})", path, key, value, value_type),
            MutationPlan::SetService { name, action } => write!(
                f,
                "{} service {} (startup type {})",
                action.kind, name, action.startup_type
            ),
            MutationPlan::RunCommand { command } => write!(f, "run `{}`", command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tweak_common::Catalog;

    #[test]
    fn test_registry_apply_uses_intended_value() {
        let catalog = Catalog::standard();
        let d = catalog.get("disable-game-dvr").unwrap();
        match MutationPlan::for_apply(d) {
            MutationPlan::WriteRegistry { key, value, .. } => {
                assert_eq!(key, "GameDVR_Enabled");
                assert_eq!(value, "0");
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_registry_revert_uses_catalog_default() {
        let catalog = Catalog::standard();
        let d = catalog.get("disable-game-dvr").unwrap();
        match MutationPlan::for_revert(d) {
            Some(MutationPlan::WriteRegistry { value, .. }) => assert_eq!(value, "1"),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_revert_without_target_is_none() {
        let catalog = Catalog::standard();
        assert!(MutationPlan::for_revert(catalog.get("disable-startup-delay").unwrap()).is_none());
        assert!(MutationPlan::for_revert(catalog.get("ultimate-performance-plan").unwrap()).is_none());
    }

    #[test]
    fn test_service_plans() {
        let catalog = Catalog::standard();
        let d = catalog.get("disable-sysmain").unwrap();
        assert_eq!(
            MutationPlan::for_apply(d),
            MutationPlan::SetService {
                name: "SysMain".to_string(),
                action: ServiceAction::disable(),
            }
        );
        assert_eq!(
            MutationPlan::for_revert(d).unwrap().to_string(),
            "enable service SysMain (startup type Automatic)"
        );
    }

    #[test]
    fn test_json_shape() {
        let plan = MutationPlan::RunCommand {
            command: "powercfg /hibernate off".to_string(),
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["step"], "run_command");
        assert_eq!(json["command"], "powercfg /hibernate off");
    }

    #[test]
    fn test_display() {
        let plan = MutationPlan::WriteRegistry {
            path: r"HKCU\Control Panel\Desktop".to_string(),
            key: "MenuShowDelay".to_string(),
            value: "0".to_string(),
            value_type: RegValueType::String,
        };
        assert_eq!(
            plan.to_string(),
            r"set HKCU\Control Panel\Desktop\MenuShowDelay = 0 (REG_SZ)"
        );
    }
}
