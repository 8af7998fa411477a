//! Console progress reporter
//!
//! Renders orchestration activity as dim one-liners with a spinner while
//! a worker is running. Implements the application progress port.

use colored::Colorize;
use conductor_application::ports::progress::ProgressNotifier;
use conductor_domain::agent::entities::{AgentKind, ModelTier, WorkerResult};
use conductor_domain::plan::Plan;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn start_spinner(&self, message: String) {
        let mut guard = self.spinner.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(120));
        *guard = Some(bar);
    }

    fn stop_spinner(&self) {
        if let Some(bar) = self.spinner.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }

    fn line(&self, text: String) {
        // Print above any active spinner
        let guard = self.spinner.lock().unwrap();
        match guard.as_ref() {
            Some(bar) => bar.println(text),
            None => println!("{text}"),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_routing(&self) {
        self.line(format!("{}", "> routing request...".dimmed()));
    }

    fn on_spawn(&self, kind: AgentKind, tier: ModelTier) {
        let tier_label = match tier {
            ModelTier::Lite => " (lite)",
            ModelTier::Standard => "",
            ModelTier::Full => " (full)",
        };
        self.line(format!(
            "{}",
            format!("> spawning {kind} agent{tier_label}...").cyan()
        ));
        self.start_spinner(format!("{kind} working"));
    }

    fn on_worker_done(&self, result: &WorkerResult) {
        self.stop_spinner();
        let status = if result.success {
            "done".green().to_string()
        } else if result.needs_escalation {
            "escalated".yellow().to_string()
        } else {
            "failed".red().to_string()
        };
        self.line(format!(
            "{}",
            format!(
                "  {} {} ({} tool calls, {} ms)",
                result.name,
                status,
                result.tool_call_log.len(),
                result.duration_ms
            )
            .dimmed()
        ));
    }

    fn on_tool_call(&self, summary: &str) {
        self.line(format!("{}", format!("  > {summary}").dimmed()));
    }

    fn on_tool_result(&self, tool: &str, success: bool) {
        if !success {
            self.line(format!("{}", format!("  ! {tool} failed").yellow()));
        }
    }

    fn on_review_round(&self, round: u32) {
        self.line(format!("{}", format!("> reviewing (round {round})...").dimmed()));
    }

    fn on_escalation(&self, _context: &str) {
        self.line(format!(
            "{}",
            "> agent requested help; orchestrator re-planning...".yellow()
        ));
    }

    fn on_plan(&self, plan: &Plan) {
        self.line(format!("{}", plan.summary().cyan()));
    }

    fn on_group_start(&self, index: usize, size: usize) {
        self.line(format!(
            "{}",
            format!("> group {index}: running {size} step(s) in parallel").cyan()
        ));
    }

    fn on_compaction(&self) {
        self.line(format!("{}", "(conversation compacted)".dimmed()));
    }
}
