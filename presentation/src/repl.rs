//! Interactive REPL
//!
//! Free text goes to the orchestrator; slash commands form the control
//! plane and never reach the LLM.

use colored::Colorize;
use conductor_application::orchestrator::Orchestrator;
use conductor_application::ports::tool_executor::ToolExecutorPort;
use conductor_domain::agent::entities::AgentKind;
use conductor_domain::session::Session;
use conductor_domain::tool::entities::ToolCall;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::json;
use std::sync::Arc;

/// Interactive chat loop owning one session.
pub struct ChatRepl {
    orchestrator: Arc<Orchestrator>,
    tools: Arc<dyn ToolExecutorPort>,
    session: Session,
}

enum CommandOutcome {
    Continue,
    Exit,
}

impl ChatRepl {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        tools: Arc<dyn ToolExecutorPort>,
        session: Session,
    ) -> Self {
        Self {
            orchestrator,
            tools,
            session,
        }
    }

    /// Run the loop until `/exit` or EOF.
    pub async fn run(&mut self) -> rustyline::Result<()> {
        let mut editor = DefaultEditor::new()?;

        let history_path = dirs::data_dir().map(|p| p.join("conductor").join("history.txt"));
        if let Some(path) = &history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = editor.load_history(path);
        }

        self.print_welcome();

        loop {
            match editor.readline(">>> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = editor.add_history_entry(line);

                    if line.starts_with('/') {
                        match self.handle_command(line).await {
                            CommandOutcome::Exit => break,
                            CommandOutcome::Continue => continue,
                        }
                    }

                    self.process_message(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(e) => {
                    eprintln!("Error: {e:?}");
                    break;
                }
            }
        }

        if let Some(path) = &history_path {
            let _ = editor.save_history(path);
        }
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│            Conductor - Chat Mode            │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Project: {}", self.session.project_dir);
        println!("Type a request, or /help for commands.");
        println!();
    }

    async fn process_message(&mut self, line: &str) {
        println!();
        match self.orchestrator.process(&mut self.session, line).await {
            Ok(reply) => println!("{reply}"),
            Err(e) => eprintln!("{}", format!("Error: {e}").red()),
        }
        println!();
    }

    async fn handle_command(&mut self, line: &str) -> CommandOutcome {
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "/exit" | "/quit" => {
                println!("Bye!");
                return CommandOutcome::Exit;
            }
            "/help" => self.print_help(),
            "/clear" | "/reset" => {
                self.session.clear();
                println!("(conversation cleared)");
            }
            "/history" => self.print_history(),
            "/agents" => self.print_agents(),
            "/read" => {
                if rest.is_empty() {
                    println!("usage: /read <path>");
                } else {
                    self.read_file(rest).await;
                }
            }
            "/explore" => {
                if rest.is_empty() {
                    println!("usage: /explore <query>");
                } else {
                    self.run_specialist(AgentKind::Explorer, rest).await;
                }
            }
            "/execute" => {
                if rest.is_empty() {
                    println!("usage: /execute <task>");
                } else {
                    self.run_specialist(AgentKind::Executor, rest).await;
                }
            }
            "/docs" => {
                println!("Documentation indexing is not bundled with this build.");
            }
            other => {
                println!("Unknown command: {other}");
                println!("Type /help for available commands");
            }
        }
        CommandOutcome::Continue
    }

    fn print_help(&self) {
        println!();
        println!("Commands:");
        println!("  /help            - Show this help");
        println!("  /exit, /quit     - Exit chat");
        println!("  /clear, /reset   - Discard the in-memory conversation");
        println!("  /history         - Show the conversation so far");
        println!("  /agents          - Show specialist agents and concurrency status");
        println!("  /read <path>     - Print a file");
        println!("  /explore <query> - Run the explorer agent directly");
        println!("  /execute <task>  - Run the executor agent directly");
        println!();
    }

    fn print_history(&self) {
        println!();
        if !self.session.summary.is_empty() {
            println!("{}", "── summary of earlier turns ──".dimmed());
            println!("{}", self.session.summary.dimmed());
            println!();
        }
        if self.session.turns.is_empty() {
            println!("(no conversation yet)");
        }
        for turn in &self.session.turns {
            println!("{} {}", "you:".bold(), turn.user);
            println!("{} {}", "conductor:".bold(), turn.assistant);
            println!();
        }
    }

    fn print_agents(&self) {
        let status = self.orchestrator.agent_status();
        println!();
        println!(
            "Concurrency: {} active, {} available, capacity {}, {} waiting",
            status.active, status.available, status.capacity, status.waiting
        );
        println!();
        println!("Specialists:");
        for kind in AgentKind::all() {
            let capabilities: Vec<String> = kind
                .capabilities()
                .iter()
                .map(|c| c.to_string())
                .collect();
            let capabilities = if capabilities.is_empty() {
                "no tools".to_string()
            } else {
                capabilities.join(", ")
            };
            println!("  {:<11} [{capabilities}]", kind.to_string());
        }
        println!();
    }

    async fn read_file(&self, path: &str) {
        let call = match ToolCall::from_named_json("read", json!({"path": path})) {
            Ok(call) => call,
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                return;
            }
        };
        let result = self.tools.execute(&call).await;
        match result.output() {
            Some(output) if result.is_success() => println!("{output}"),
            _ => eprintln!(
                "{}",
                format!(
                    "Error: {}",
                    result
                        .error()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "unknown".to_string())
                )
                .red()
            ),
        }
    }

    async fn run_specialist(&self, kind: AgentKind, task: &str) {
        println!();
        let result = self.orchestrator.run_specialist(kind, task).await;
        if result.success {
            println!("{}", result.output);
        } else {
            eprintln!(
                "{}",
                format!(
                    "{} failed: {}",
                    kind,
                    result.error.as_deref().unwrap_or("unknown error")
                )
                .red()
            );
        }
        println!();
    }
}
