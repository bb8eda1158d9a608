//! Tweak catalog.
//!
//! The compiled-in list of everything that can be tweaked. Order is display
//! priority and is preserved by every reconciliation pass.

use crate::error::CatalogError;
use crate::types::{
    Category, CommandMechanism, Impact, Mechanism, RegValueType, RegistryMechanism, Risk,
    ServiceAction, ServiceMechanism, StartupType, TweakDescriptor,
};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Arc;

/// Immutable, ordered set of tweak descriptors with unique ids
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Arc<[TweakDescriptor]>,
}

impl Catalog {
    /// The built-in Windows catalog
    pub fn standard() -> Self {
        Self {
            entries: STANDARD.clone(),
        }
    }

    /// Build a catalog from explicit descriptors, rejecting empty or duplicate ids
    pub fn from_descriptors(descriptors: Vec<TweakDescriptor>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for d in &descriptors {
            if d.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(d.name.clone()));
            }
            if !seen.insert(d.id.as_str()) {
                return Err(CatalogError::DuplicateId(d.id.clone()));
            }
        }
        Ok(Self {
            entries: descriptors.into(),
        })
    }

    /// All descriptors, same order every call
    pub fn get_all(&self) -> &[TweakDescriptor] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&TweakDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn by_category(&self, category: Category) -> Vec<&TweakDescriptor> {
        self.entries.iter().filter(|d| d.category == category).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// Built-in entries
// =============================================================================

const MULTIMEDIA_PROFILE: &str =
    r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion\Multimedia\SystemProfile";
const GAME_CONFIG_STORE: &str = r"HKCU\System\GameConfigStore";

struct Meta {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: Category,
    risk: Risk,
    impact: Impact,
    requires_admin: bool,
    requires_restart: bool,
    breakage: &'static str,
}

fn registry(
    meta: Meta,
    path: &str,
    key: &str,
    value_type: RegValueType,
    intended: &str,
    default: Option<&str>,
) -> TweakDescriptor {
    build(
        meta,
        Mechanism::Registry(RegistryMechanism {
            path: path.to_string(),
            key: key.to_string(),
            value_type,
            intended_value: intended.to_string(),
        }),
        default,
    )
}

fn service(meta: Meta, name: &str, revert_to: Option<StartupType>) -> TweakDescriptor {
    build(
        meta,
        Mechanism::Service(ServiceMechanism {
            service_name: name.to_string(),
            apply_action: ServiceAction::disable(),
            revert_action: revert_to.map(ServiceAction::enable),
        }),
        None,
    )
}

fn command(meta: Meta, apply: &str, revert: Option<&str>) -> TweakDescriptor {
    build(
        meta,
        Mechanism::Command(CommandMechanism {
            apply_command: apply.to_string(),
            revert_command: revert.map(str::to_string),
        }),
        None,
    )
}

fn build(meta: Meta, mechanism: Mechanism, default: Option<&str>) -> TweakDescriptor {
    TweakDescriptor {
        id: meta.id.to_string(),
        name: meta.name.to_string(),
        description: meta.description.to_string(),
        category: meta.category,
        risk: meta.risk,
        impact: meta.impact,
        mechanism,
        default_value: default.map(str::to_string),
        requires_admin: meta.requires_admin,
        requires_restart: meta.requires_restart,
        breakage: meta.breakage.to_string(),
    }
}

static STANDARD: Lazy<Arc<[TweakDescriptor]>> = Lazy::new(|| {
    use Category::*;

    vec![
        // ---------------------------------------------------------------- SYSTEM
        registry(
            Meta {
                id: "menu-show-delay",
                name: "Instant Menus",
                description: "Removes the 400 ms hover delay before menus open.",
                category: System,
                risk: Risk::Low,
                impact: Impact::Low,
                requires_admin: false,
                requires_restart: true,
                breakage: "None known.",
            },
            r"HKCU\Control Panel\Desktop",
            "MenuShowDelay",
            RegValueType::String,
            "0",
            Some("400"),
        ),
        registry(
            Meta {
                id: "disable-startup-delay",
                name: "Disable Startup App Delay",
                description: "Launches startup applications immediately after sign-in.",
                category: System,
                risk: Risk::Low,
                impact: Impact::Medium,
                requires_admin: false,
                requires_restart: true,
                breakage: "Sign-in may feel slower on machines with many startup apps.",
            },
            r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\Serialize",
            "StartupDelayInMSec",
            RegValueType::Dword,
            "0",
            None,
        ),
        registry(
            Meta {
                id: "disable-power-throttling",
                name: "Disable Power Throttling",
                description: "Stops Windows from throttling background processes.",
                category: System,
                risk: Risk::Medium,
                impact: Impact::Medium,
                requires_admin: true,
                requires_restart: true,
                breakage: "Higher power draw and shorter battery life on laptops.",
            },
            r"HKLM\SYSTEM\CurrentControlSet\Control\Power\PowerThrottling",
            "PowerThrottlingOff",
            RegValueType::Dword,
            "1",
            Some("0"),
        ),
        registry(
            Meta {
                id: "win32-priority-separation",
                name: "Foreground Priority Boost",
                description: "Favors short, variable quanta for the foreground application.",
                category: System,
                risk: Risk::Medium,
                impact: Impact::High,
                requires_admin: true,
                requires_restart: true,
                breakage: "Background tasks such as encoding may run slower.",
            },
            r"HKLM\SYSTEM\CurrentControlSet\Control\PriorityControl",
            "Win32PrioritySeparation",
            RegValueType::Dword,
            "38",
            Some("2"),
        ),
        service(
            Meta {
                id: "disable-sysmain",
                name: "Disable SysMain (Superfetch)",
                description: "Stops memory prefetching of frequently used applications.",
                category: System,
                risk: Risk::Low,
                impact: Impact::Medium,
                requires_admin: true,
                requires_restart: false,
                breakage: "Applications may launch slightly slower on HDDs.",
            },
            "SysMain",
            Some(StartupType::Automatic),
        ),
        service(
            Meta {
                id: "disable-windows-search",
                name: "Disable Windows Search Indexing",
                description: "Stops the background indexer that catalogs files for search.",
                category: System,
                risk: Risk::Medium,
                impact: Impact::Medium,
                requires_admin: true,
                requires_restart: false,
                breakage: "Start menu and Explorer search become slower and less complete.",
            },
            "WSearch",
            Some(StartupType::Automatic),
        ),
        command(
            Meta {
                id: "disable-hibernation",
                name: "Disable Hibernation",
                description: "Turns off hibernation and deletes hiberfil.sys.",
                category: System,
                risk: Risk::Low,
                impact: Impact::Low,
                requires_admin: true,
                requires_restart: false,
                breakage: "Fast Startup and hibernate are no longer available.",
            },
            "powercfg /hibernate off",
            Some("powercfg /hibernate on"),
        ),
        command(
            Meta {
                id: "ultimate-performance-plan",
                name: "Ultimate Performance Power Plan",
                description: "Adds the hidden Ultimate Performance power scheme.",
                category: System,
                risk: Risk::Medium,
                impact: Impact::High,
                requires_admin: true,
                requires_restart: false,
                breakage: "Significantly higher idle power consumption.",
            },
            "powercfg -duplicatescheme e9a42b02-d5df-448d-aa00-03f14749eb61",
            None,
        ),
        // --------------------------------------------------------------- NETWORK
        registry(
            Meta {
                id: "network-throttling-index",
                name: "Disable Network Throttling",
                description: "Removes the packet-rate cap applied while multimedia plays.",
                category: Network,
                risk: Risk::Low,
                impact: Impact::High,
                requires_admin: true,
                requires_restart: true,
                breakage: "Audio may stutter under heavy network load on slow CPUs.",
            },
            MULTIMEDIA_PROFILE,
            "NetworkThrottlingIndex",
            RegValueType::Dword,
            "4294967295",
            Some("10"),
        ),
        registry(
            Meta {
                id: "default-ttl",
                name: "Default TTL 64",
                description: "Sets the IPv4 default time-to-live to 64 hops.",
                category: Network,
                risk: Risk::Low,
                impact: Impact::Low,
                requires_admin: true,
                requires_restart: true,
                breakage: "None known.",
            },
            r"HKLM\SYSTEM\CurrentControlSet\Services\Tcpip\Parameters",
            "DefaultTTL",
            RegValueType::Dword,
            "64",
            Some("128"),
        ),
        registry(
            Meta {
                id: "disable-llmnr",
                name: "Disable LLMNR",
                description: "Turns off Link-Local Multicast Name Resolution.",
                category: Network,
                risk: Risk::Medium,
                impact: Impact::Low,
                requires_admin: true,
                requires_restart: false,
                breakage: "Name resolution on networks without DNS may fail.",
            },
            r"HKLM\SOFTWARE\Policies\Microsoft\Windows NT\DNSClient",
            "EnableMulticast",
            RegValueType::Dword,
            "0",
            Some("1"),
        ),
        service(
            Meta {
                id: "disable-delivery-optimization",
                name: "Disable Delivery Optimization",
                description: "Stops peer-to-peer distribution of Windows updates.",
                category: Network,
                risk: Risk::Low,
                impact: Impact::Medium,
                requires_admin: true,
                requires_restart: false,
                breakage: "Updates are downloaded only from Microsoft servers.",
            },
            "DoSvc",
            Some(StartupType::Manual),
        ),
        command(
            Meta {
                id: "tcp-autotuning-normal",
                name: "TCP Receive Window Auto-Tuning",
                description: "Sets TCP auto-tuning to normal for high-latency links.",
                category: Network,
                risk: Risk::Low,
                impact: Impact::Medium,
                requires_admin: true,
                requires_restart: false,
                breakage: "Some old routers mishandle window scaling.",
            },
            "netsh int tcp set global autotuninglevel=normal",
            Some("netsh int tcp set global autotuninglevel=default"),
        ),
        // --------------------------------------------------------------- PRIVACY
        registry(
            Meta {
                id: "disable-telemetry",
                name: "Disable Telemetry",
                description: "Sets the diagnostic data level to Security (0).",
                category: Privacy,
                risk: Risk::Low,
                impact: Impact::Medium,
                requires_admin: true,
                requires_restart: false,
                breakage: "Windows Insider builds require telemetry.",
            },
            r"HKLM\SOFTWARE\Policies\Microsoft\Windows\DataCollection",
            "AllowTelemetry",
            RegValueType::Dword,
            "0",
            Some("1"),
        ),
        service(
            Meta {
                id: "disable-diagtrack",
                name: "Disable Connected User Experiences",
                description: "Stops the DiagTrack service that uploads diagnostic data.",
                category: Privacy,
                risk: Risk::Low,
                impact: Impact::Medium,
                requires_admin: true,
                requires_restart: false,
                breakage: "None known.",
            },
            "DiagTrack",
            Some(StartupType::Automatic),
        ),
        service(
            Meta {
                id: "disable-wap-push",
                name: "Disable WAP Push Routing",
                description: "Stops dmwappushservice, a telemetry message router.",
                category: Privacy,
                risk: Risk::Low,
                impact: Impact::Low,
                requires_admin: true,
                requires_restart: false,
                breakage: "MDM enrollment on managed devices may stop working.",
            },
            "dmwappushservice",
            Some(StartupType::Manual),
        ),
        registry(
            Meta {
                id: "disable-advertising-id",
                name: "Disable Advertising ID",
                description: "Stops apps from using the per-user advertising identifier.",
                category: Privacy,
                risk: Risk::Low,
                impact: Impact::Low,
                requires_admin: false,
                requires_restart: false,
                breakage: "None known.",
            },
            r"HKCU\Software\Microsoft\Windows\CurrentVersion\AdvertisingInfo",
            "Enabled",
            RegValueType::Dword,
            "0",
            Some("1"),
        ),
        registry(
            Meta {
                id: "disable-activity-history",
                name: "Disable Activity History",
                description: "Stops Windows from recording the activity timeline.",
                category: Privacy,
                risk: Risk::Low,
                impact: Impact::Low,
                requires_admin: true,
                requires_restart: false,
                breakage: "Timeline and cross-device resume are unavailable.",
            },
            r"HKLM\SOFTWARE\Policies\Microsoft\Windows\System",
            "EnableActivityFeed",
            RegValueType::Dword,
            "0",
            Some("1"),
        ),
        registry(
            Meta {
                id: "disable-cortana",
                name: "Disable Cortana",
                description: "Disables Cortana through group policy.",
                category: Privacy,
                risk: Risk::Medium,
                impact: Impact::Low,
                requires_admin: true,
                requires_restart: true,
                breakage: "Voice search and Cortana reminders stop working.",
            },
            r"HKLM\SOFTWARE\Policies\Microsoft\Windows\Windows Search",
            "AllowCortana",
            RegValueType::Dword,
            "0",
            Some("1"),
        ),
        // ---------------------------------------------------------------- GAMING
        registry(
            Meta {
                id: "disable-game-dvr",
                name: "Disable Game DVR",
                description: "Turns off background gameplay recording.",
                category: Gaming,
                risk: Risk::Low,
                impact: Impact::Medium,
                requires_admin: false,
                requires_restart: false,
                breakage: "Xbox Game Bar clip capture is unavailable.",
            },
            GAME_CONFIG_STORE,
            "GameDVR_Enabled",
            RegValueType::Dword,
            "0",
            Some("1"),
        ),
        registry(
            Meta {
                id: "disable-fullscreen-optimizations",
                name: "Disable Fullscreen Optimizations",
                description: "Uses true exclusive fullscreen instead of borderless flip.",
                category: Gaming,
                risk: Risk::Low,
                impact: Impact::Medium,
                requires_admin: false,
                requires_restart: false,
                breakage: "Alt-Tab out of games becomes slower.",
            },
            GAME_CONFIG_STORE,
            "GameDVR_FSEBehaviorMode",
            RegValueType::Dword,
            "2",
            Some("0"),
        ),
        registry(
            Meta {
                id: "hardware-gpu-scheduling",
                name: "Hardware-Accelerated GPU Scheduling",
                description: "Lets the GPU manage its own video memory scheduling.",
                category: Gaming,
                risk: Risk::Medium,
                impact: Impact::High,
                requires_admin: true,
                requires_restart: true,
                breakage: "Older drivers may crash or stutter.",
            },
            r"HKLM\SYSTEM\CurrentControlSet\Control\GraphicsDrivers",
            "HwSchMode",
            RegValueType::Dword,
            "2",
            Some("1"),
        ),
        registry(
            Meta {
                id: "system-responsiveness",
                name: "Multimedia System Responsiveness",
                description: "Reserves no CPU for low-priority tasks while games run.",
                category: Gaming,
                risk: Risk::Medium,
                impact: Impact::High,
                requires_admin: true,
                requires_restart: true,
                breakage: "Background downloads may pause during gameplay.",
            },
            MULTIMEDIA_PROFILE,
            "SystemResponsiveness",
            RegValueType::Dword,
            "0",
            Some("20"),
        ),
        registry(
            Meta {
                id: "games-task-priority",
                name: "Games Task Priority",
                description: "Raises the MMCSS scheduling priority for the Games task.",
                category: Gaming,
                risk: Risk::Low,
                impact: Impact::Medium,
                requires_admin: true,
                requires_restart: true,
                breakage: "None known.",
            },
            r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion\Multimedia\SystemProfile\Tasks\Games",
            "Priority",
            RegValueType::Dword,
            "6",
            Some("2"),
        ),
        registry(
            Meta {
                id: "disable-mouse-acceleration",
                name: "Disable Mouse Acceleration",
                description: "Turns off Enhance Pointer Precision for 1:1 aim.",
                category: Gaming,
                risk: Risk::Low,
                impact: Impact::Low,
                requires_admin: false,
                requires_restart: false,
                breakage: "Pointer feels slower on large desktops.",
            },
            r"HKCU\Control Panel\Mouse",
            "MouseSpeed",
            RegValueType::String,
            "0",
            Some("1"),
        ),
        command(
            Meta {
                id: "disable-xbox-save-sync",
                name: "Disable Xbox Save Sync",
                description: "Disables the Xbox Live game save synchronization service.",
                category: Gaming,
                risk: Risk::Medium,
                impact: Impact::Low,
                requires_admin: true,
                requires_restart: false,
                breakage: "Cloud saves for Xbox PC games stop syncing.",
            },
            "sc config XblGameSave start= disabled",
            Some("sc config XblGameSave start= demand"),
        ),
        command(
            Meta {
                id: "disable-fax-service",
                name: "Disable Fax Service",
                description: "Disables and stops the legacy Fax service.",
                category: System,
                risk: Risk::Low,
                impact: Impact::Low,
                requires_admin: true,
                requires_restart: false,
                breakage: "Sending faxes from Windows is no longer possible.",
            },
            "Set-Service -Name Fax -StartupType Disabled; Stop-Service -Name Fax -Force",
            Some("Set-Service -Name Fax -StartupType Manual"),
        ),
    ]
    .into()
});
