//! Terminal rendering.
//!
//! Every function returns a `String` so output can be checked in tests
//! without capturing stdout.

use owo_colors::OwoColorize;
use tweak_common::{CategoryScore, Mechanism, ReconciledTweak, Risk, TweakDescriptor};
use tweak_engine::{MutationPlan, MutationReport, Snapshot};

const THIN_SEP: &str = "------------------------------------------------------------";

/// Color on/off switch shared by all renderers
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub color: bool,
}

impl Style {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn good(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn bad(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    fn warn(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn section(&self, text: &str) -> String {
        if self.color {
            text.cyan().to_string()
        } else {
            text.to_string()
        }
    }

    fn risk(&self, risk: Risk) -> String {
        let label = risk.to_string();
        match risk {
            Risk::Low => self.good(&label),
            Risk::Medium => self.warn(&label),
            Risk::High => self.bad(&label),
        }
    }
}

fn state_label(style: Style, tweak: &ReconciledTweak) -> String {
    if !tweak.exists {
        style.dim("n/a")
    } else if tweak.is_enabled {
        style.good("on")
    } else {
        style.bad("off")
    }
}

/// Score with a color band: green from 80, yellow from 50
pub fn score_line(style: Style, score: u8) -> String {
    let text = format!("{}/100", score);
    let painted = if score >= 80 {
        style.good(&text)
    } else if score >= 50 {
        style.warn(&text)
    } else {
        style.bad(&text)
    };
    format!("  Optimization score: {}", painted)
}

pub fn tweak_table(style: Style, tweaks: &[&ReconciledTweak]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<34} {:<9} {:<7} {:<5} {}\n",
        "ID", "CATEGORY", "RISK", "STATE", "LIVE VALUE"
    ));
    out.push_str(THIN_SEP);
    out.push('\n');
    for tweak in tweaks {
        let d = &tweak.descriptor;
        // Pad before painting so escape codes don't break alignment
        out.push_str(&format!(
            "  {:<34} {:<9} {} {} {}\n",
            d.id,
            d.category.as_str(),
            style.risk(d.risk) + &" ".repeat(7usize.saturating_sub(d.risk.to_string().len())),
            state_label(style, tweak)
                + &" ".repeat(5usize.saturating_sub(plain_state(tweak).len())),
            tweak.live_value
        ));
    }
    out
}

fn plain_state(tweak: &ReconciledTweak) -> &'static str {
    if !tweak.exists {
        "n/a"
    } else if tweak.is_enabled {
        "on"
    } else {
        "off"
    }
}

fn mechanism_lines(mechanism: &Mechanism) -> Vec<String> {
    match mechanism {
        Mechanism::Registry(reg) => vec![
            format!("  Registry:       {}\\{}", reg.path, reg.key),
            format!("  Type:           {}", reg.value_type),
            format!("  Intended value: {}", reg.intended_value),
        ],
        Mechanism::Service(svc) => {
            let mut lines = vec![
                format!("  Service:        {}", svc.service_name),
                format!("  Apply:          {} ({})", svc.apply_action.kind, svc.apply_action.startup_type),
            ];
            if let Some(revert) = svc.revert_action {
                lines.push(format!("  Revert:         {} ({})", revert.kind, revert.startup_type));
            }
            lines
        }
        Mechanism::Command(cmd) => {
            let mut lines = vec![format!("  Apply command:  {}", cmd.apply_command)];
            if let Some(revert) = &cmd.revert_command {
                lines.push(format!("  Revert command: {}", revert));
            }
            lines
        }
    }
}

pub fn tweak_detail(style: Style, tweak: &ReconciledTweak) -> String {
    let d = &tweak.descriptor;
    let mut lines = vec![
        String::new(),
        format!("  {}", style.heading(&d.name)),
        THIN_SEP.to_string(),
        format!("  {}", d.description),
        String::new(),
        style.section("[TWEAK]"),
        format!("  Id:             {}", d.id),
        format!("  Category:       {}", d.category),
        format!("  Risk:           {}", style.risk(d.risk)),
        format!("  Impact:         {}", d.impact),
        format!("  Admin:          {}", if d.requires_admin { "required" } else { "no" }),
        format!("  Restart:        {}", if d.requires_restart { "required" } else { "no" }),
        format!("  Breakage:       {}", d.breakage),
        String::new(),
        style.section("[MECHANISM]"),
    ];
    lines.extend(mechanism_lines(&d.mechanism));
    if let Some(default) = &d.default_value {
        lines.push(format!("  Default value:  {}", default));
    }
    lines.push(String::new());
    lines.push(style.section("[LIVE STATE]"));
    lines.push(format!("  State:          {}", state_label(style, tweak)));
    lines.push(format!("  Live value:     {}", tweak.live_value));
    if let Some(err) = &tweak.probe_error {
        lines.push(format!("  Probe error:    {}", style.dim(err)));
    }
    lines.push(String::new());
    lines.join("\n")
}

pub fn category_breakdown(style: Style, scores: &[CategoryScore]) -> String {
    let mut out = String::new();
    out.push_str(&style.section("[CATEGORIES]"));
    out.push('\n');
    for cs in scores {
        out.push_str(&format!(
            "  {:<9} {:>3}/100  ({} of {} enabled)\n",
            cs.category.as_str(),
            cs.score,
            cs.enabled,
            cs.available
        ));
    }
    out
}

pub fn summary(style: Style, snapshot: &Snapshot) -> String {
    format!(
        "{}\n  {} tweaks, {} available, {} enabled, {} unavailable\n",
        score_line(style, snapshot.score),
        snapshot.tweaks.len(),
        snapshot.available().len(),
        snapshot.enabled_count(),
        snapshot.unavailable().len()
    )
}

pub fn mutation_report(style: Style, report: &MutationReport) -> String {
    let verb = match report.direction {
        tweak_engine::Direction::Apply => "Applied",
        tweak_engine::Direction::Revert => "Reverted",
    };
    let mut out = format!(
        "  {} {}: {}\n  Now: {} ({})\n{}\n",
        style.good(verb),
        report.id,
        report.plan,
        state_label(style, &report.tweak),
        report.tweak.live_value,
        score_line(style, report.score)
    );
    if report.tweak.descriptor.requires_restart {
        out.push_str(&format!("  {}\n", style.warn("A restart is required for this change to take effect.")));
    }
    out
}

pub fn dry_run(style: Style, verb: &str, id: &str, plan: &MutationPlan) -> String {
    format!("  {} {} {}: {}\n", style.dim("[dry-run]"), verb, id, plan)
}

pub fn catalog_table(descriptors: &[TweakDescriptor]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<34} {:<9} {:<7} {:<7} {:<9} {}\n",
        "ID", "CATEGORY", "RISK", "IMPACT", "MECHANISM", "ADMIN"
    ));
    out.push_str(THIN_SEP);
    out.push('\n');
    for d in descriptors {
        out.push_str(&format!(
            "  {:<34} {:<9} {:<7} {:<7} {:<9} {}\n",
            d.id,
            d.category.as_str(),
            d.risk.to_string(),
            d.impact.to_string(),
            d.mechanism.kind_str(),
            if d.requires_admin { "yes" } else { "no" }
        ));
    }
    out
}
