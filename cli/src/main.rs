//! CLI entrypoint for Conductor
//!
//! Wires the layers together with dependency injection: configuration,
//! LLM gateway, tool execution (local or remote via the callback
//! channel), memory, and the REPL.

use anyhow::{Context, Result, bail};
use clap::Parser;
use conductor_application::callback::{RemoteToolExecutor, ToolCallbackBroker};
use conductor_application::orchestrator::{Orchestrator, OrchestratorConfig};
use conductor_application::pool::{ModelCatalog, WorkerPool, WorkerPoolConfig};
use conductor_application::ports::llm_gateway::GenOptions;
use conductor_application::ports::progress::{NoProgress, ProgressNotifier};
use conductor_application::ports::tool_executor::ToolExecutorPort;
use conductor_application::semaphore::AgentSemaphore;
use conductor_domain::session::Session;
use conductor_infrastructure::config::{ConfigLoader, FileConfig};
use conductor_infrastructure::logging::JsonlConversationLogger;
use conductor_infrastructure::memory::QdrantMemoryStore;
use conductor_infrastructure::ollama::OllamaGateway;
use conductor_infrastructure::remote::{CallbackListener, ToolCallbackClient};
use conductor_infrastructure::tools::{LocalToolExecutor, SearchEngine};
use conductor_presentation::{ChatRepl, Cli, Command, ProgressReporter};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Trusted-client mode: serve tool execution for a remote orchestrator
    if let Some(Command::ToolClient {
        connect,
        session,
        token,
    }) = cli.command
    {
        return run_tool_client(&cli.project_dir, &connect, &session, &token).await;
    }

    // Configuration errors are fatal before the REPL starts
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("failed to load configuration")?
    };

    let project_dir = match &cli.project_dir {
        Some(dir) => dir
            .canonicalize()
            .with_context(|| format!("invalid project directory: {}", dir.display()))?,
        None => std::env::current_dir().context("cannot resolve current directory")?,
    };
    let project_dir = project_dir.to_string_lossy().to_string();

    info!("starting conductor in {project_dir}");

    // === Dependency injection ===
    let gateway = Arc::new(OllamaGateway::new(
        config.llm.api_url.clone(),
        Duration::from_secs(config.llm.timeout_seconds),
    ));

    let session_id = format!("session-{}", chrono::Utc::now().timestamp_millis());
    let session = Session::new(&session_id, &project_dir);

    let tools = build_tool_executor(&config, &project_dir, &session_id).await?;

    let semaphore = AgentSemaphore::new(config.regulators.max_concurrent_agents);
    let catalog = ModelCatalog {
        planning: config.models.planning.clone(),
        orchestration: config.models.orchestration.clone(),
        research: config.models.research.clone(),
        execution: config.models.execution.clone(),
        execution_lite: config.models.execution_lite.clone(),
        exploration: config.models.exploration.clone(),
        exploration_lite: config.models.exploration_lite.clone(),
    };
    let pool_config = WorkerPoolConfig {
        working_dir: project_dir.clone(),
        options: GenOptions {
            temperature: config.defaults.temperature,
            max_tokens: config.defaults.max_tokens,
        },
        agent_timeout: Duration::from_secs(config.regulators.agent_timeout_seconds),
        llm_timeout: Duration::from_secs(config.llm.timeout_seconds),
    };

    let progress: Arc<dyn ProgressNotifier> = if cli.quiet {
        Arc::new(NoProgress)
    } else {
        Arc::new(ProgressReporter::new())
    };

    let pool = Arc::new(
        WorkerPool::new(
            gateway.clone(),
            Arc::clone(&tools),
            semaphore,
            catalog,
            pool_config,
        )
        .with_progress(Arc::clone(&progress)),
    );

    let orchestrator_config = OrchestratorConfig {
        max_supervision_rounds: config.regulators.max_supervision_rounds,
        llm_timeout: Duration::from_secs(config.llm.timeout_seconds),
        context_window: config.defaults.context_window,
        ..OrchestratorConfig::default()
    };
    let mut orchestrator =
        Orchestrator::new(gateway, pool, orchestrator_config).with_progress(progress);

    if config.memory.enabled {
        let store = QdrantMemoryStore::new(
            config.memory.stores.qdrant.url.clone(),
            config.memory.stores.qdrant.collection.clone(),
            config.llm.api_url.clone(),
            config.memory.embedding_model.clone(),
        );
        orchestrator = orchestrator.with_memory(Arc::new(store));
    }

    if !config.logging.conversation_file.is_empty()
        && let Some(logger) = JsonlConversationLogger::new(&config.logging.conversation_file)
    {
        orchestrator = orchestrator.with_conversation_logger(Arc::new(logger));
    }

    let orchestrator = Arc::new(orchestrator);

    // One-shot mode
    if let Some(question) = cli.question {
        let mut session = session;
        let reply = orchestrator.process(&mut session, &question).await?;
        println!("{reply}");
        return Ok(());
    }

    // Interactive mode
    let mut repl = ChatRepl::new(orchestrator, tools, session);
    repl.run().await?;
    Ok(())
}

/// Local executor by default; in remote mode, host the callback listener
/// and hand out an executor that forwards every call to the trusted
/// client.
async fn build_tool_executor(
    config: &FileConfig,
    project_dir: &str,
    session_id: &str,
) -> Result<Arc<dyn ToolExecutorPort>> {
    if !config.remote.enabled {
        let engine = match config.research.engine.as_str() {
            "searxng" => SearchEngine::SearxNg {
                url: config.research.engines.searxng.url.clone(),
            },
            _ => SearchEngine::DuckDuckGo,
        };
        return Ok(Arc::new(
            LocalToolExecutor::new(project_dir).with_search_engine(engine),
        ));
    }

    let broker = Arc::new(ToolCallbackBroker::new());
    let tcp = TcpListener::bind(&config.remote.listen_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.remote.listen_addr))?;
    let addr = tcp.local_addr()?;

    let mut listener = CallbackListener::new(Arc::clone(&broker));
    if !config.remote.token.is_empty() {
        listener = listener.with_token(config.remote.token.clone());
    }
    tokio::spawn(Arc::new(listener).serve(tcp, CancellationToken::new()));

    println!("Remote mode: waiting for the trusted tool client.");
    println!("On the client machine, run:");
    println!("  conductor tool-client --connect {addr} --session {session_id}");

    while !broker.is_registered(session_id) {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    println!("Tool client connected.");

    Ok(Arc::new(
        RemoteToolExecutor::new(broker, session_id)
            .with_timeout(Duration::from_secs(30)),
    ))
}

async fn run_tool_client(
    project_dir: &Option<std::path::PathBuf>,
    connect: &str,
    session: &str,
    token: &str,
) -> Result<()> {
    let working_dir = match project_dir {
        Some(dir) => dir.to_string_lossy().to_string(),
        None => std::env::current_dir()
            .context("cannot resolve current directory")?
            .to_string_lossy()
            .to_string(),
    };

    let executor = Arc::new(LocalToolExecutor::new(working_dir));
    let client = ToolCallbackClient::new(executor, session).with_token(token);

    info!("serving tools for session {session} against {connect}");
    if let Err(e) = client.run(connect, CancellationToken::new()).await {
        bail!("tool client stopped: {e}");
    }
    Ok(())
}
