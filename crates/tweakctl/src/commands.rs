//! Command handlers.
//!
//! Handlers render into a `String`; `main` decides where it goes.

use crate::cli::{Cli, Commands};
use crate::display::{self, Style};
use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use tweak_common::config::DisplayConfig;
use tweak_common::{Catalog, Config, Failure};
use tweak_engine::{is_elevated, EngineOptions, ReconciliationEngine, WindowsSystem};

/// Load the config named on the command line, or the default one
pub fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::load()),
    }
}

/// Engine plus presentation settings
pub struct App {
    engine: ReconciliationEngine,
    style: Style,
    show_unavailable: bool,
}

impl App {
    pub fn new(engine: ReconciliationEngine, display: &DisplayConfig) -> Self {
        Self {
            engine,
            style: Style::new(display.color),
            show_unavailable: display.show_unavailable,
        }
    }

    /// App wired to the live system
    pub fn from_config(config: &Config) -> Self {
        let is_admin = is_elevated();
        debug!("Running elevated: {}", is_admin);

        let system = Arc::new(WindowsSystem::new(config.shell.clone()));
        let engine = ReconciliationEngine::new(
            Catalog::standard(),
            system.clone(),
            system,
            EngineOptions::from_config(&config.engine, is_admin),
        );
        Self::new(engine, &config.display)
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub async fn run(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::List {
                category,
                risk,
                unavailable,
                json,
            } => {
                let snapshot = self.engine.reconcile_all().await;
                let tweaks: Vec<_> = snapshot
                    .filter(*category, *risk)
                    .into_iter()
                    .filter(|t| {
                        if *unavailable {
                            !t.exists
                        } else {
                            t.exists || self.show_unavailable
                        }
                    })
                    .collect();

                if *json {
                    return Ok(serde_json::to_string_pretty(&tweaks)? + "\n");
                }
                let mut out = display::tweak_table(self.style, &tweaks);
                out.push('\n');
                out.push_str(&display::summary(self.style, &snapshot));
                Ok(out)
            }

            Commands::Show { id, json } => {
                let snapshot = self.engine.reconcile_all().await;
                let tweak = snapshot
                    .get(id)
                    .ok_or_else(|| Failure::UnknownTweak(id.clone()))?;
                if *json {
                    return Ok(serde_json::to_string_pretty(tweak)? + "\n");
                }
                Ok(display::tweak_detail(self.style, tweak))
            }

            Commands::Score { by_category, json } => {
                let snapshot = self.engine.reconcile_all().await;
                if *json {
                    let value = json!({
                        "score": snapshot.score,
                        "categories": snapshot.category_scores(),
                    });
                    return Ok(serde_json::to_string_pretty(&value)? + "\n");
                }
                let mut out = display::score_line(self.style, snapshot.score);
                out.push('\n');
                if *by_category {
                    out.push_str(&display::category_breakdown(
                        self.style,
                        &snapshot.category_scores(),
                    ));
                }
                Ok(out)
            }

            Commands::Apply { id, dry_run } => {
                if *dry_run {
                    let plan = self.engine.plan_apply(id)?;
                    return Ok(display::dry_run(self.style, "apply", id, &plan));
                }
                let report = self
                    .engine
                    .apply(id)
                    .await
                    .with_context(|| format!("Could not apply {}", id))?;
                Ok(display::mutation_report(self.style, &report))
            }

            Commands::Revert { id, dry_run } => {
                if *dry_run {
                    let plan = self.engine.plan_revert(id)?;
                    return Ok(display::dry_run(self.style, "revert", id, &plan));
                }
                let report = self
                    .engine
                    .revert(id)
                    .await
                    .with_context(|| format!("Could not revert {}", id))?;
                Ok(display::mutation_report(self.style, &report))
            }

            Commands::Refresh => {
                let snapshot = self.engine.reconcile_all().await;
                Ok(display::summary(self.style, &snapshot))
            }

            Commands::Catalog => Ok(display::catalog_table(self.engine.catalog().get_all())),
        }
    }
}
