use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use streamtasks::config::{self, Config};
use streamtasks::session::{self, LaunchParams, SessionConfig, SessionStore};
use streamtasks::store::Store;
use streamtasks::sync::{Backend, ServiceFactory, SyncLayer};
use streamtasks::todoist::{LocalService, ServiceResult, Task, TaskService, TodoistClient};
use streamtasks::tui::{self, StartScreen};

#[derive(Parser)]
#[command(
    name = "streamtasks",
    version = env!("STREAMTASKS_VERSION"),
    about = "A to-do overlay for your stream, synced with Todoist"
)]
struct Cli {
    /// Widget URL carrying `token` and `projectId` query parameters
    #[arg(long, global = true)]
    url: Option<String>,

    /// Todoist API token (wins over the one in --url)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Todoist project id (wins over the one in --url)
    #[arg(long, global = true)]
    project_id: Option<String>,

    /// Keep tasks in memory only, without Todoist
    #[arg(long, global = true)]
    local: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the task widget (default)
    Widget,
    /// Open the widget on the setup screen
    Setup,
    /// Print the widget URL for the current token and project
    Url,
    /// List the projects visible to the token
    Projects,
    /// List tasks of the selected project
    Tasks,
    /// Add a task to the selected project
    Add {
        /// Task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Complete a task by id
    Complete {
        /// Task id
        id: String,
    },
    /// Delete a task by id
    Delete {
        /// Task id
        id: String,
    },
    /// Forget the stored token and project
    Forget,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Widget);
    let interactive = matches!(command, Commands::Widget | Commands::Setup);

    config::ensure_dirs()?;
    init_logging(interactive, cli.verbose)?;

    let mut config = config::load()?;
    if cli.local {
        config.local = true;
    }

    let store = Store::open()?;
    store.migrate()?;

    if matches!(command, Commands::Forget) {
        let session = SessionStore::load(store, &LaunchParams::default())?;
        session.clear()?;
        println!("Forgot the stored token and project.");
        return Ok(());
    }

    let launch = LaunchParams::resolve(cli.url.as_deref(), cli.token.clone(), cli.project_id.clone())?;
    let session = SessionStore::load(store, &launch)?;

    if matches!(command, Commands::Url) {
        return print_url(&config, &session.current());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("streamtasks-io")
        .build()
        .context("failed to start async runtime")?;

    tracing::info!(
        version = env!("STREAMTASKS_VERSION"),
        local = config.local,
        "starting"
    );

    let start = if matches!(command, Commands::Setup) {
        StartScreen::Setup
    } else {
        StartScreen::List
    };

    match command {
        Commands::Widget | Commands::Setup => {
            let sync = SyncLayer::new(backend(&config)?, runtime.handle().clone());
            tui::run(config, session, sync, start)
        }
        Commands::Projects => {
            let service = remote_service(&config, &session.current())?;
            let projects = runtime.block_on(service.list_projects())?;
            if projects.is_empty() {
                println!("No projects.");
            }
            for p in &projects {
                println!("  {}  {}", p.id, p.name);
            }
            Ok(())
        }
        Commands::Tasks => {
            let cfg = session.current();
            let service = remote_service(&config, &cfg)?;
            let project = project_for(&config, &cfg)?;
            let records = runtime.block_on(service.list_tasks(project))?;
            if records.is_empty() {
                println!("No tasks.");
            }
            for task in records.iter().map(Task::from) {
                println!("  {} {}  {}", task.symbol(), task.id, task.text);
            }
            Ok(())
        }
        Commands::Add { text } => {
            let cfg = session.current();
            let service = remote_service(&config, &cfg)?;
            let project = project_for(&config, &cfg)?;
            let text = text.join(" ");
            if text.trim().is_empty() {
                bail!("task text is empty");
            }
            let task = Task::from(&runtime.block_on(service.add_task(&text, project))?);
            println!("Added '{}' ({})", task.text, task.id);
            Ok(())
        }
        Commands::Complete { id } => {
            let service = remote_service(&config, &session.current())?;
            runtime.block_on(service.complete_task(&id))?;
            println!("Completed {id}");
            Ok(())
        }
        Commands::Delete { id } => {
            let service = remote_service(&config, &session.current())?;
            runtime.block_on(service.delete_task(&id))?;
            println!("Deleted {id}");
            Ok(())
        }
        Commands::Url | Commands::Forget => Ok(()),
    }
}

/// The widget logs to a file so the terminal UI stays clean; one-shot
/// commands log to stderr.
fn init_logging(to_file: bool, verbose: u8) -> Result<()> {
    let default_level = match (verbose, to_file) {
        (0, true) => "streamtasks=info",
        (0, false) => "warn",
        (1, _) => "streamtasks=info",
        (2, _) => "streamtasks=debug",
        _ => "streamtasks=trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow::anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let init_result = if to_file {
        let path = config::log_path()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    } else {
        builder.with_writer(std::io::stderr).try_init()
    };
    if let Err(e) = init_result {
        eprintln!("logging disabled: {e}");
    }
    Ok(())
}

fn backend(config: &Config) -> Result<Backend> {
    if config.local {
        return Ok(Backend::Local(Arc::new(LocalService::new())));
    }
    let http = reqwest::Client::builder()
        .user_agent(concat!("streamtasks/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let base_url = config.api_base_url.clone();
    let factory: ServiceFactory =
        Arc::new(move |token: &str| -> ServiceResult<Arc<dyn TaskService>> {
            let client = TodoistClient::with_http(&base_url, token, http.clone())?;
            Ok(Arc::new(client))
        });
    Ok(Backend::Remote {
        factory,
        require_project: config.require_project,
    })
}

/// Service for one-shot commands. These talk to Todoist only.
fn remote_service(config: &Config, cfg: &SessionConfig) -> Result<Arc<dyn TaskService>> {
    let Backend::Remote { factory, .. } = backend(config)? else {
        bail!("local mode keeps tasks in memory only; open the widget instead");
    };
    if !cfg.has_token() {
        bail!("no API token: pass --token or --url, or run `streamtasks setup`");
    }
    Ok(factory(&cfg.api_token)?)
}

fn project_for<'a>(config: &Config, cfg: &'a SessionConfig) -> Result<Option<&'a str>> {
    match cfg.project_filter() {
        None if config.require_project => {
            bail!("no project selected: pass --project-id, or run `streamtasks projects` to find one")
        }
        project => Ok(project),
    }
}

fn print_url(config: &Config, cfg: &SessionConfig) -> Result<()> {
    if !cfg.has_token() || !cfg.has_project() {
        bail!("Please provide both API token and select a project (--token and --project-id)");
    }
    let url = session::widget_url(&config.widget_origin, &cfg.api_token, &cfg.selected_project_id)?;
    println!("{url}");
    Ok(())
}
