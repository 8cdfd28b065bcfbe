use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use tasks_client::{
    api::ApiClient,
    app::{
        auth::SessionManager, guard::NavigationGuard, router::Router, tasks::TaskCollection,
    },
    config::{read_environment, Environment},
    model::{Credentials, Route, Task, TaskData, TaskForm, TaskId, UserData},
    storage::{ClientStorage, FileStore},
};

#[derive(Parser)]
#[command(name = "tasks")]
#[command(about = "Manage your tasks from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (overrides TASKS_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Storage file for the session token (overrides TASKS_STORAGE)
    #[arg(long, global = true, value_name = "PATH")]
    storage: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Log in with username and password
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Log out and forget the stored token
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List one page of tasks
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one task
    Show { id: i64 },
    /// Create a task
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Replace fields of a task
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Toggle a task's completion
    Done { id: i64 },
    /// Delete a task
    Delete {
        id: i64,
        /// Page the task is listed on
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Resolve a view path through the navigation guard
    Open { path: String },
}

struct Client {
    session: Arc<SessionManager>,
    tasks: TaskCollection,
    router: Router,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

fn build_client(env: &Environment) -> anyhow::Result<Client> {
    let path = match &env.storage_path {
        Some(path) => path.clone(),
        None => FileStore::default_path()
            .ok_or_else(|| anyhow!("no config directory; set TASKS_STORAGE"))?,
    };
    log::info!("Using storage file {}", path.display());

    let storage = ClientStorage::new(Arc::new(FileStore::open(path)?));
    let api = Arc::new(
        ApiClient::new(&env.api_url, storage.clone())
            .with_context(|| format!("configuring API client for {}", env.api_url))?,
    );

    let session = Arc::new(SessionManager::new(api.clone(), storage.clone()));
    let tasks = TaskCollection::new(api, env.page_size);
    let guard =
        NavigationGuard::new(session.clone(), storage).with_cooldown(env.loading_cooldown);

    Ok(Client {
        session,
        tasks,
        router: Router::new(guard),
    })
}

impl Client {
    async fn require_login(&self) -> anyhow::Result<()> {
        match self.router.push(Route::Tasks.path()).await? {
            Route::Tasks => Ok(()),
            _ => bail!("not logged in; run `tasks login` first"),
        }
    }

    async fn load_task(&self, id: i64) -> anyhow::Result<Task> {
        match self.tasks.fetch_task(TaskId::from_raw(id)).await {
            Some(task) => Ok(task),
            None => Err(self.task_error("Failed to load task")),
        }
    }

    fn task_error(&self, fallback: &str) -> anyhow::Error {
        match self.tasks.error() {
            Some(error) => anyhow!("{}: {}", fallback, error),
            None => anyhow!("{}", fallback),
        }
    }

    fn print_page(&self) {
        let view = self.tasks.view();

        if view.items.is_empty() {
            println!("No tasks.");
        }
        for task in &view.items {
            print_task_line(task);
        }

        let pages: Vec<String> = self
            .tasks
            .page_numbers()
            .into_iter()
            .map(|p| {
                if p == view.current_page {
                    format!("[{p}]")
                } else {
                    p.to_string()
                }
            })
            .collect();
        println!(
            "page {} of {} ({} tasks)  {}",
            view.current_page,
            view.total_pages().max(1),
            view.total_count,
            pages.join(" ")
        );
    }
}

fn print_task_line(task: &Task) {
    let mark = if task.completed { "x" } else { " " };
    let due = task
        .due_date
        .map(|d| format!("  (due {d})"))
        .unwrap_or_default();

    println!("[{mark}] {:>4}  {}{}", task.id, task.title, due);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut env = read_environment();
    if let Some(api_url) = cli.api_url {
        env.api_url = api_url;
    }
    if let Some(storage) = cli.storage {
        env.storage_path = Some(storage);
    }

    let client = build_client(&env)?;
    client.session.check_auth().await;

    match cli.command {
        Commands::Register {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let user = UserData {
                username,
                email,
                password2: password.clone(),
                password,
                first_name,
                last_name,
            };
            if !client.session.register(&user).await {
                let error = client.session.error().map(|e| e.to_string());
                bail!("registration failed: {}", error.unwrap_or_default());
            }
            println!("Registered and logged in as {}", user.username);
        }
        Commands::Login { username, password } => {
            let credentials = Credentials { username, password };
            if !client.session.login(&credentials).await {
                let error = client.session.error().map(|e| e.to_string());
                bail!("login failed: {}", error.unwrap_or_default());
            }
            println!("Logged in as {}", credentials.username);
        }
        Commands::Logout => {
            client.session.logout().await;
            println!("Logged out");
        }
        Commands::Whoami => match client.session.user() {
            Some(user) => println!(
                "{} <{}> {} {}",
                user.username, user.email, user.first_name, user.last_name
            ),
            None => println!("Not logged in"),
        },
        Commands::List { page } => {
            client.require_login().await?;
            client.tasks.fetch_tasks(page).await;
            if client.tasks.error().is_some() {
                return Err(client.task_error("Failed to load tasks"));
            }
            client.print_page();
        }
        Commands::Show { id } => {
            client.require_login().await?;
            let task = client.load_task(id).await?;
            print_task_line(&task);
            if let Some(description) = &task.description {
                println!("\n{description}");
            }
        }
        Commands::Add {
            title,
            description,
            due,
        } => {
            client.require_login().await?;
            let form = TaskForm {
                id: None,
                data: TaskData {
                    title: title.clone(),
                    description,
                    due_date: due,
                    completed: false,
                },
            };
            if !client.tasks.save_task(&form).await {
                return Err(client.task_error("Failed to create task"));
            }
            println!("Task \"{title}\" created successfully");
        }
        Commands::Edit {
            id,
            title,
            description,
            due,
        } => {
            client.require_login().await?;
            let task = client.load_task(id).await?;
            let mut data = TaskData::from(&task);
            if let Some(title) = title {
                data.title = title;
            }
            if description.is_some() {
                data.description = description;
            }
            if due.is_some() {
                data.due_date = due;
            }
            let form = TaskForm {
                id: Some(task.id),
                data,
            };
            if !client.tasks.save_task(&form).await {
                return Err(client.task_error("Failed to update task"));
            }
            println!("Task \"{}\" updated successfully", form.data.title);
        }
        Commands::Done { id } => {
            client.require_login().await?;
            let task = client.load_task(id).await?;
            let Some(updated) = client.tasks.toggle_completed(&task).await else {
                return Err(client.task_error("Failed to update task status"));
            };
            let state = if updated.completed {
                "completed"
            } else {
                "uncompleted"
            };
            println!("Task \"{}\" {}", updated.title, state);
        }
        Commands::Delete { id, page } => {
            client.require_login().await?;
            client.tasks.fetch_tasks(page).await;
            let title = client
                .tasks
                .items()
                .into_iter()
                .find(|t| t.id.raw() == id)
                .map(|t| t.title);
            if !client.tasks.delete_task(TaskId::from_raw(id)).await {
                return Err(client.task_error("Failed to delete task"));
            }
            match title {
                Some(title) => println!("Task \"{title}\" deleted"),
                None => println!("Task deleted"),
            }
            client.print_page();
        }
        Commands::Open { path } => {
            let route = client.router.push(&path).await?;
            if route == Route::Loading {
                client.router.guard().record_splash_shown();
            }
            println!("{}  ({})", route, route.title());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();
    log::info!("Start");

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
