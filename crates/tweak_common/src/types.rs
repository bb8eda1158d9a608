//! Tweak data model.
//!
//! A `TweakDescriptor` is the declarative catalog entry; a `ReconciledTweak`
//! is the same descriptor joined with the outcome of its latest probe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Live value reported when a probe could not produce one
pub const UNKNOWN_VALUE: &str = "Unknown";

// =============================================================================
// Classification enums
// =============================================================================

/// Tweak category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    System,
    Network,
    Privacy,
    Gaming,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::System,
        Category::Network,
        Category::Privacy,
        Category::Gaming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::System => "SYSTEM",
            Category::Network => "NETWORK",
            Category::Privacy => "PRIVACY",
            Category::Gaming => "GAMING",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SYSTEM" => Ok(Category::System),
            "NETWORK" => Ok(Category::Network),
            "PRIVACY" => Ok(Category::Privacy),
            "GAMING" => Ok(Category::Gaming),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

/// Risk of breaking something when a tweak is applied. Display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Risk::Low => "Low",
            Risk::Medium => "Medium",
            Risk::High => "High",
        };
        f.write_str(s)
    }
}

impl FromStr for Risk {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Risk::Low),
            "medium" => Ok(Risk::Medium),
            "high" => Ok(Risk::High),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

/// Declared performance impact; drives score weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    /// Score weight: Low=1, Medium=2, High=3
    pub fn weight(&self) -> u32 {
        match self {
            Impact::Low => 1,
            Impact::Medium => 2,
            Impact::High => 3,
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Impact::Low => "Low",
            Impact::Medium => "Medium",
            Impact::High => "High",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Registry value type, spelled the way reg.exe spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegValueType {
    #[serde(rename = "REG_DWORD")]
    Dword,
    #[serde(rename = "REG_QWORD")]
    Qword,
    #[serde(rename = "REG_SZ")]
    String,
    #[serde(rename = "REG_EXPAND_SZ")]
    ExpandString,
    #[serde(rename = "REG_MULTI_SZ")]
    MultiString,
    #[serde(rename = "REG_BINARY")]
    Binary,
}

impl RegValueType {
    pub fn as_reg_str(&self) -> &'static str {
        match self {
            RegValueType::Dword => "REG_DWORD",
            RegValueType::Qword => "REG_QWORD",
            RegValueType::String => "REG_SZ",
            RegValueType::ExpandString => "REG_EXPAND_SZ",
            RegValueType::MultiString => "REG_MULTI_SZ",
            RegValueType::Binary => "REG_BINARY",
        }
    }

    /// DWORD and QWORD data is printed as hex by `reg query`
    pub fn is_numeric(&self) -> bool {
        matches!(self, RegValueType::Dword | RegValueType::Qword)
    }
}

impl fmt::Display for RegValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_reg_str())
    }
}

impl FromStr for RegValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "REG_DWORD" => Ok(RegValueType::Dword),
            "REG_QWORD" => Ok(RegValueType::Qword),
            "REG_SZ" => Ok(RegValueType::String),
            "REG_EXPAND_SZ" => Ok(RegValueType::ExpandString),
            "REG_MULTI_SZ" => Ok(RegValueType::MultiString),
            "REG_BINARY" => Ok(RegValueType::Binary),
            other => Err(format!("unsupported registry value type '{}'", other)),
        }
    }
}

/// Registry-backed tweak: enabled when the live value equals `intended_value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMechanism {
    /// Full key path, e.g. `HKLM\SOFTWARE\Policies\...`
    pub path: String,
    /// Value name under the key
    pub key: String,
    pub value_type: RegValueType,
    pub intended_value: String,
}

// =============================================================================
// Services
// =============================================================================

/// Service run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceStatus {
    Running,
    Stopped,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Running => f.write_str("Running"),
            ServiceStatus::Stopped => f.write_str("Stopped"),
        }
    }
}

/// Service start type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StartupType {
    Automatic,
    Manual,
    Disabled,
}

impl StartupType {
    /// Value accepted by `sc config <name> start= <value>`
    pub fn sc_value(&self) -> &'static str {
        match self {
            StartupType::Automatic => "auto",
            StartupType::Manual => "demand",
            StartupType::Disabled => "disabled",
        }
    }
}

impl fmt::Display for StartupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupType::Automatic => f.write_str("Automatic"),
            StartupType::Manual => f.write_str("Manual"),
            StartupType::Disabled => f.write_str("Disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceActionKind {
    /// Set the start type and stop the service
    Disable,
    /// Set the start type and start the service if it is automatic
    Enable,
}

impl fmt::Display for ServiceActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceActionKind::Disable => f.write_str("disable"),
            ServiceActionKind::Enable => f.write_str("enable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAction {
    pub kind: ServiceActionKind,
    pub startup_type: StartupType,
}

impl ServiceAction {
    pub const fn disable() -> Self {
        Self {
            kind: ServiceActionKind::Disable,
            startup_type: StartupType::Disabled,
        }
    }

    pub const fn enable(startup_type: StartupType) -> Self {
        Self {
            kind: ServiceActionKind::Enable,
            startup_type,
        }
    }
}

/// Service-backed tweak
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMechanism {
    pub service_name: String,
    pub apply_action: ServiceAction,
    pub revert_action: Option<ServiceAction>,
}

// =============================================================================
// Commands
// =============================================================================

/// One-off command pair with no inherent state query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMechanism {
    pub apply_command: String,
    pub revert_command: Option<String>,
}

/// How a tweak reads and changes the system. Exactly one per descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mechanism {
    Registry(RegistryMechanism),
    Service(ServiceMechanism),
    Command(CommandMechanism),
}

impl Mechanism {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Mechanism::Registry(_) => "registry",
            Mechanism::Service(_) => "service",
            Mechanism::Command(_) => "command",
        }
    }
}

// =============================================================================
// Descriptor and reconciled view
// =============================================================================

/// Catalog entry for one tweak
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweakDescriptor {
    /// Stable join key between catalog and live state
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub risk: Risk,
    pub impact: Impact,
    pub mechanism: Mechanism,
    /// Factory value; revert target for registry tweaks
    pub default_value: Option<String>,
    pub requires_admin: bool,
    pub requires_restart: bool,
    /// What may stop working after the tweak is applied
    pub breakage: String,
}

impl TweakDescriptor {
    /// True when revert has something to go back to
    pub fn has_revert_target(&self) -> bool {
        match &self.mechanism {
            Mechanism::Registry(_) => self.default_value.is_some(),
            Mechanism::Service(svc) => svc.revert_action.is_some(),
            Mechanism::Command(cmd) => cmd.revert_command.is_some(),
        }
    }
}

/// Descriptor joined with its latest probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledTweak {
    #[serde(flatten)]
    pub descriptor: TweakDescriptor,
    pub is_enabled: bool,
    pub live_value: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_error: Option<String>,
}

impl ReconciledTweak {
    /// Probe found the key/service and read a value
    pub fn observed(descriptor: TweakDescriptor, live_value: String, is_enabled: bool) -> Self {
        Self {
            descriptor,
            is_enabled,
            live_value,
            exists: true,
            probe_error: None,
        }
    }

    /// Probe could not find the key/service, or failed outright
    pub fn missing(descriptor: TweakDescriptor, error: impl Into<String>) -> Self {
        Self {
            descriptor,
            is_enabled: false,
            live_value: UNKNOWN_VALUE.to_string(),
            exists: false,
            probe_error: Some(error.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Score contribution if enabled; zero for tweaks that do not exist
    pub fn weight(&self) -> u32 {
        if self.exists {
            self.descriptor.impact.weight()
        } else {
            0
        }
    }
}
