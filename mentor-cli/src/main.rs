//! mentor — terminal client for the MyMentor advisory platform
//!
//! Chat with AI-backed advisors and manage users/advisors from the shell.
//! Credentials persist between invocations in the platform config dir; the
//! interactive chat keeps the token fresh with a background refresh loop.
//!
//! # Subcommands
//! - `login --email <email>`            — authenticate and persist the session
//! - `logout`                           — clear the session (server + local)
//! - `status`                           — show who is logged in
//! - `chat [--advisor <id>]`            — interactive advice session
//! - `threads list|show|delete`         — inspect advice threads
//! - `users list|create|update|delete`  — user administration
//! - `advisors list|areas|create|update|delete` — advisor administration

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mentor_core::models::{ApiKind, NewProfessional, NewUser, ProfessionalUpdate, UserUpdate};
use mentor_core::session::GENERAL_ADVISOR;
use mentor_core::{admin, run_refresh_loop, AdviceStore, ApiClient, MentorConfig, Session};
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "mentor",
    version,
    about = "MyMentor terminal client — AI advisory chat and administration"
)]
struct Cli {
    /// API base URL (overrides the config file)
    #[arg(long, env = "MENTOR_API_URL")]
    api_url: Option<String>,

    /// Path to the TOML config file
    #[arg(long, default_value = "mentor.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Authenticate and persist the session
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password (prefer MENTOR_PASSWORD over the flag)
        #[arg(long, env = "MENTOR_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the session server-side and clear local credentials
    Logout,

    /// Show the current session
    Status,

    /// Interactive advice chat
    Chat {
        /// Advisor assignment id (defaults to the general consultation advisor)
        #[arg(long)]
        advisor: Option<i64>,

        /// Generative backend answering the messages
        #[arg(long, default_value = "anthropic")]
        api_type: ApiKind,
    },

    /// Advice thread operations
    Threads {
        #[command(subcommand)]
        command: ThreadCommands,
    },

    /// User administration
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Advisor administration
    Advisors {
        #[command(subcommand)]
        command: AdvisorCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ThreadCommands {
    /// List every thread across the user's advisor assignments
    List,
    /// Show one thread with its full conversation
    Show { id: i64 },
    /// Delete a thread
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
enum UserCommands {
    /// List all users
    List,
    /// Create a user
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        phone_number: i64,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        admin: bool,
        #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
        enabled: bool,
    },
    /// Replace a user record
    Update {
        uuid: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        phone_number: i64,
        #[arg(long)]
        email: String,
        /// Only sent when the password is being changed
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        admin: bool,
        #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
        enabled: bool,
    },
    /// Delete a user
    Delete { uuid: Uuid },
}

#[derive(Debug, Subcommand)]
enum AdvisorCommands {
    /// List one page of advisors
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = admin::DEFAULT_PAGE_SIZE)]
        size: u32,
    },
    /// List the subject areas
    Areas,
    /// Create an advisor profile
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        area_id: i64,
    },
    /// Update an advisor profile
    Update {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        area_id: i64,
    },
    /// Delete an advisor profile
    Delete { id: i64 },
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = MentorConfig::load(&cli.config)?;
    if let Some(api_url) = cli.api_url {
        config.api.base_url = api_url;
    }

    let session = Arc::new(Session::with_file_store(&config.session));
    let client = ApiClient::new(&config.api, session.clone())?;

    match cli.command {
        Commands::Login { email, password } => {
            let user = session.login(&client, &email, &password).await?;
            println!("Sesión iniciada: {} {} <{}>", user.name, user.last_name, user.email);
            if session.general_asesor_id().is_none() {
                println!("Aviso: esta cuenta no tiene asignado el asesor \"{GENERAL_ADVISOR}\".");
            }
            Ok(())
        }
        Commands::Logout => {
            session.logout(&client).await;
            println!("Sesión cerrada.");
            Ok(())
        }
        Commands::Status => status(&client, &session).await,
        Commands::Chat { advisor, api_type } => {
            chat(&config, &client, &session, advisor, api_type).await
        }
        Commands::Threads { command } => threads(&client, &session, command).await,
        Commands::Users { command } => users(&client, &session, command).await,
        Commands::Advisors { command } => advisors(&client, &session, command).await,
    }
}

/// Restore the persisted session or bail out with a login hint.
async fn require_session(client: &ApiClient, session: &Arc<Session>) -> anyhow::Result<()> {
    if !session.bootstrap(client).await? {
        anyhow::bail!("No hay sesión activa. Ejecuta `mentor login` primero.");
    }
    Ok(())
}

// ============================================================================
// Session commands
// ============================================================================

async fn status(client: &ApiClient, session: &Arc<Session>) -> anyhow::Result<()> {
    if session.token().is_none() {
        println!("Sin sesión. Ejecuta `mentor login`.");
        return Ok(());
    }

    match session.bootstrap(client).await {
        Ok(_) => {
            let user = session
                .current_user()
                .ok_or_else(|| anyhow::anyhow!("sesión sin usuario cargado"))?;
            println!("Conectado como {} {} <{}>", user.name, user.last_name, user.email);
            println!("Administrador: {}", if user.admin { "sí" } else { "no" });
            println!("Asesores asignados:");
            for asesor in &user.asesores {
                println!(
                    "  [{}] {} — {}",
                    asesor.id, asesor.professional.name, asesor.professional.area.name
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("La sesión guardada ya no es válida ({e}). Ejecuta `mentor login`.");
            Ok(())
        }
    }
}

// ============================================================================
// Chat
// ============================================================================

async fn chat(
    config: &MentorConfig,
    client: &ApiClient,
    session: &Arc<Session>,
    advisor: Option<i64>,
    api_type: ApiKind,
) -> anyhow::Result<()> {
    require_session(client, session).await?;

    let user = session
        .current_user()
        .ok_or_else(|| anyhow::anyhow!("sesión sin usuario cargado"))?;

    let asesor_id = advisor
        .or_else(|| session.general_asesor_id())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No se pudo resolver el asesor: pasa --advisor o pide la asignación \"{GENERAL_ADVISOR}\"."
            )
        })?;
    let asesor = user
        .asesores
        .iter()
        .find(|a| a.id == asesor_id)
        .ok_or_else(|| anyhow::anyhow!("El asesor {asesor_id} no está asignado a esta cuenta."))?;
    let asesor_name = asesor.professional.name.clone();

    let mut store = AdviceStore::new();
    store.load_all(client, &user.asesores).await?;

    // Silent token renewal for the duration of the chat.
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let refresh = tokio::spawn(run_refresh_loop(
        client.clone(),
        Duration::from_secs(config.session.refresh_interval_minutes * 60),
        shutdown_rx,
    ));

    println!("Chat con {asesor_name} (backend: {api_type}).");
    println!("Escribe tu mensaje, o /list, /open <id>, /new, /delete <id>, /quit.");
    print_thread_list(&store);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map_or((line, ""), |(a, b)| (a, b)) {
            ("/quit", _) => break,
            ("/list", _) => print_thread_list(&store),
            ("/new", _) => {
                store.clear_selection();
                println!("Siguiente mensaje inicia una nueva asesoría.");
            }
            ("/open", arg) => match arg.trim().parse::<i64>() {
                Ok(id) if store.select(id) => print_selected_thread(&store),
                Ok(id) => println!("No existe la asesoría {id}."),
                Err(_) => println!("Uso: /open <id>"),
            },
            ("/delete", arg) => match arg.trim().parse::<i64>() {
                Ok(id) => match store.delete_thread(client, id).await {
                    Ok(()) => println!("Asesoría {id} eliminada."),
                    Err(e) => report_chat_error(&e)?,
                },
                Err(_) => println!("Uso: /delete <id>"),
            },
            _ => match store
                .send_message(client, asesor_id, &asesor_name, line, api_type)
                .await
            {
                Ok(advice) => {
                    if let Some(detail) = advice.advisorys_details.last() {
                        println!("\n{}\n", detail.answer);
                    }
                }
                Err(e) => report_chat_error(&e)?,
            },
        }
    }

    let _ = shutdown_tx.send(());
    let _ = refresh.await;
    Ok(())
}

/// Inline errors keep the chat alive; session-fatal ones end it.
fn report_chat_error(e: &mentor_core::ApiError) -> anyhow::Result<()> {
    if e.is_session_fatal() {
        anyhow::bail!("Sesión finalizada: {e}. Ejecuta `mentor login` de nuevo.");
    }
    println!("Error: {e}");
    Ok(())
}

fn print_thread_list(store: &AdviceStore) {
    if store.is_empty() {
        println!("Sin asesorías aún.");
        return;
    }
    println!("Asesorías anteriores:");
    for view in store.sorted_for_display() {
        let marker = if store.selected_id() == Some(view.id()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} [{}] {} ({})",
            view.id(),
            view.advice.description,
            view.asesor_name
        );
    }
}

fn print_selected_thread(store: &AdviceStore) {
    let Some(view) = store.selected() else {
        return;
    };
    println!("Asesoría [{}] {}", view.id(), view.advice.description);
    for detail in &view.advice.advisorys_details {
        println!("> {}", detail.question);
        println!("{}\n", detail.answer);
    }
}

// ============================================================================
// Threads
// ============================================================================

async fn threads(
    client: &ApiClient,
    session: &Arc<Session>,
    command: ThreadCommands,
) -> anyhow::Result<()> {
    require_session(client, session).await?;
    let user = session
        .current_user()
        .ok_or_else(|| anyhow::anyhow!("sesión sin usuario cargado"))?;

    match command {
        ThreadCommands::List => {
            let mut store = AdviceStore::new();
            store.load_all(client, &user.asesores).await?;
            print_thread_list(&store);
        }
        ThreadCommands::Show { id } => {
            let resp = client.get_advice(id).await?;
            println!("Asesoría [{}] {}", resp.advice.id, resp.advice.description);
            for detail in &resp.advice.advisorys_details {
                println!("> {}", detail.question);
                println!("{}  [{}]\n", detail.answer, detail.model);
            }
        }
        ThreadCommands::Delete { id } => {
            client.delete_advice(id).await?;
            println!("Asesoría {id} eliminada.");
        }
    }
    Ok(())
}

// ============================================================================
// Administration
// ============================================================================

async fn users(
    client: &ApiClient,
    session: &Arc<Session>,
    command: UserCommands,
) -> anyhow::Result<()> {
    require_session(client, session).await?;
    let mut store = admin::UserAdmin::new();

    match command {
        UserCommands::List => {
            store.fetch_all(client).await?;
            for user in store.users() {
                println!(
                    "{}  {} {} <{}>  admin={} enabled={}",
                    user.uuid, user.name, user.last_name, user.email, user.admin, user.enabled
                );
            }
        }
        UserCommands::Create {
            name,
            last_name,
            phone_number,
            email,
            password,
            admin,
            enabled,
        } => {
            let user = store
                .create(
                    client,
                    NewUser {
                        name,
                        last_name,
                        phone_number,
                        email,
                        password,
                        admin,
                        enabled,
                    },
                )
                .await?;
            println!("Usuario creado: {}", user.uuid);
        }
        UserCommands::Update {
            uuid,
            name,
            last_name,
            phone_number,
            email,
            password,
            admin,
            enabled,
        } => {
            let user = store
                .update(
                    client,
                    uuid,
                    UserUpdate {
                        name,
                        last_name,
                        phone_number,
                        email,
                        password,
                        admin,
                        enabled,
                    },
                )
                .await?;
            println!("Usuario actualizado: {}", user.uuid);
        }
        UserCommands::Delete { uuid } => {
            store.delete(client, uuid).await?;
            println!("Usuario {uuid} eliminado.");
        }
    }
    Ok(())
}

async fn advisors(
    client: &ApiClient,
    session: &Arc<Session>,
    command: AdvisorCommands,
) -> anyhow::Result<()> {
    require_session(client, session).await?;
    let mut store = admin::AdvisorAdmin::new();

    match command {
        AdvisorCommands::List { page, size } => {
            store.fetch_page(client, page, size).await?;
            for professional in store.advisors() {
                println!(
                    "[{}] {} — {} ({})",
                    professional.id,
                    professional.name,
                    professional.description,
                    professional.area.name
                );
            }
            println!("Página {} de {}", store.page() + 1, store.total_pages());
        }
        AdvisorCommands::Areas => {
            store.fetch_areas(client).await?;
            for area in store.areas() {
                println!("[{}] {}", area.id, area.name);
            }
        }
        AdvisorCommands::Create {
            name,
            description,
            area_id,
        } => {
            let created = store
                .create(
                    client,
                    NewProfessional {
                        name,
                        description,
                        area_id,
                    },
                )
                .await?;
            println!("Asesor creado: [{}] {}", created.id, created.name);
        }
        AdvisorCommands::Update {
            id,
            name,
            description,
            area_id,
        } => {
            let updated = store
                .update(
                    client,
                    id,
                    ProfessionalUpdate {
                        name,
                        description,
                        area_id,
                    },
                )
                .await?;
            println!("Asesor actualizado: [{}] {}", updated.id, updated.name);
        }
        AdvisorCommands::Delete { id } => {
            store.delete(client, id).await?;
            println!("Asesor {id} eliminado.");
        }
    }
    Ok(())
}
