//! Parsers for `reg.exe` and `sc.exe` output.
//!
//! Numeric registry data is normalized to decimal so catalog values can be
//! compared as plain strings.

use crate::system::{RegistryValue, ServiceState};
use once_cell::sync::Lazy;
use regex::Regex;
use tweak_common::{ProbeError, RegValueType, ServiceStatus, StartupType};

static REG_VALUE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s{4}(?P<name>.+?)\s{4}(?P<kind>REG_[A-Z_]+)(?:\s{4}(?P<data>.*))?$")
        .expect("valid regex")
});

static SC_STATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*STATE\s*:\s*\d+\s+(?P<state>[A-Z_]+)").expect("valid regex"));

static SC_START_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*START_TYPE\s*:\s*\d+\s+(?P<start>[A-Z_]+)").expect("valid regex")
});

static SERVICE_NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)\bsc(?:\.exe)?\s+(?:config|stop|start|query|qc)\s+"?(?P<name>[\w.\-]+)"?"#,
        r#"(?i)\bnet\s+(?:stop|start)\s+"?(?P<name>[\w.\-]+)"?"#,
        r#"(?i)\b(?:Set|Stop|Start|Restart|Get)-Service\b[^;|]*?-Name\s+['"]?(?P<name>[\w.\-]+)['"]?"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Normalize PowerShell-style hive paths (`HKLM:\...`, `Registry::HKEY_...`) for reg.exe
pub fn normalize_key_path(path: &str) -> String {
    let path = path
        .strip_prefix("Registry::")
        .or_else(|| path.strip_prefix("Microsoft.PowerShell.Core\\Registry::"))
        .unwrap_or(path);

    match path.split_once('\\') {
        Some((hive, rest)) => format!("{}\\{}", hive.trim_end_matches(':'), rest),
        None => path.trim_end_matches(':').to_string(),
    }
}

/// Output of reg.exe/sc.exe that means "the thing does not exist"
pub fn is_not_found(output: &str) -> bool {
    let lower = output.to_lowercase();
    lower.contains("unable to find the specified registry key or value")
        || lower.contains("failed 1060")
        || lower.contains("does not exist as an installed service")
}

/// Extract value `key` from `reg query <path> /v <key>` output
pub fn parse_reg_query(output: &str, key: &str) -> Result<RegistryValue, ProbeError> {
    for line in output.lines() {
        let Some(caps) = REG_VALUE_LINE.captures(line) else {
            continue;
        };
        if !caps["name"].trim().eq_ignore_ascii_case(key) {
            continue;
        }

        let value_type: RegValueType = caps["kind"]
            .parse()
            .map_err(ProbeError::Failed)?;
        let raw = caps.name("data").map(|m| m.as_str()).unwrap_or("");

        let value = match value_type {
            RegValueType::Dword => parse_hex::<u32>(raw)?.to_string(),
            RegValueType::Qword => parse_hex::<u64>(raw)?.to_string(),
            _ => raw.to_string(),
        };

        return Ok(RegistryValue { value, value_type });
    }

    Err(ProbeError::NotFound(format!("value '{}' not present", key)))
}

fn parse_hex<T: TryFrom<u64>>(raw: &str) -> Result<T, ProbeError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16)
        .ok()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| ProbeError::Failed(format!("unparseable numeric data '{}'", trimmed)))
}

/// Combine `sc query <name>` and `sc qc <name>` output
pub fn parse_service_state(query: &str, qc: &str) -> Result<ServiceState, ProbeError> {
    let state = SC_STATE
        .captures(query)
        .map(|c| c["state"].to_string())
        .ok_or_else(|| ProbeError::Failed("no STATE line in sc query output".to_string()))?;
    let start = SC_START_TYPE
        .captures(qc)
        .map(|c| c["start"].to_string())
        .ok_or_else(|| ProbeError::Failed("no START_TYPE line in sc qc output".to_string()))?;

    Ok(ServiceState {
        status: parse_status(&state),
        startup_type: parse_start_type(&start)?,
    })
}

fn parse_status(state: &str) -> ServiceStatus {
    match state {
        "STOPPED" | "STOP_PENDING" => ServiceStatus::Stopped,
        _ => ServiceStatus::Running,
    }
}

fn parse_start_type(start: &str) -> Result<StartupType, ProbeError> {
    match start {
        "AUTO_START" | "BOOT_START" | "SYSTEM_START" => Ok(StartupType::Automatic),
        "DEMAND_START" => Ok(StartupType::Manual),
        "DISABLED" => Ok(StartupType::Disabled),
        other => Err(ProbeError::Failed(format!("unknown start type '{}'", other))),
    }
}

/// Name of the service a command operates on, if any
pub fn service_name_from_command(command: &str) -> Option<String> {
    SERVICE_NAME_PATTERNS
        .iter()
        .filter_map(|re| re.captures(command))
        .min_by_key(|caps| caps.get(0).map(|m| m.start()).unwrap_or(usize::MAX))
        .map(|caps| caps["name"].to_string())
}
