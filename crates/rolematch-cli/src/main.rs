//! rolematch: edit the shared trio role assignments from a terminal.
//!
//! ## Usage
//!
//! ```bash
//! # Sign in (the link is printed instead of emailed)
//! rolematch login amy@example.org
//! rolematch redeem 'http://localhost:5173/?token=...'
//!
//! # Look and edit
//! rolematch show
//! rolematch people import names.txt
//! rolematch role assign ume educator "Dana Smith"
//! rolematch group add
//! rolematch export --format csv --out .
//! ```

mod resolve;

use std::io::{BufRead, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use rolematch_backend::{AuthProvider, AuthResult, LinkAuth, Mailer, SqliteStore};
use rolematch_client::{
    ClientConfig, DirectorySink, EditorHandle, ExportFormat, ExportSink, SignIn, SignInMessage,
};
use rolematch_types::{ColorTag, EditError, PoolError, Roster, Session, StakeholderId};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rolematch")]
#[command(about = "Assign stakeholders to trio roles in a shared document")]
struct Cli {
    /// Config file (default: ~/.config/rolematch/config.ron)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database, overriding the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request a login link for an email address
    Login { email: String },
    /// Redeem a login link (or its token)
    Redeem { link: String },
    /// Sign out
    Logout,
    /// Show who is signed in
    Whoami,
    /// Print the roster, progress, and save state
    Show,
    /// Export the roster as Markdown or CSV
    Export {
        #[arg(long, value_enum, default_value_t = FormatArg::Markdown)]
        format: FormatArg,
        /// Write into this directory instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Edit trios
    #[command(subcommand)]
    Group(GroupCommand),
    /// Edit role slots within a trio
    #[command(subcommand)]
    Role(RoleCommand),
    /// Assign additional roles
    #[command(subcommand)]
    Extra(ExtraCommand),
    /// Manage the stakeholder pool
    #[command(subcommand)]
    People(PeopleCommand),
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    /// Append a new trio with template roles
    Add,
    Rename { group: String, name: String },
    /// Set the subtitle; an empty string clears it
    Subtitle { group: String, subtitle: String },
    Color { group: String, color: ColorTag },
    Delete {
        group: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum RoleCommand {
    /// Change a slot's position title
    Title {
        group: String,
        role: String,
        title: String,
    },
    Assign {
        group: String,
        role: String,
        person: String,
    },
    Unassign { group: String, role: String },
}

#[derive(Subcommand, Debug)]
enum ExtraCommand {
    Assign { role: String, person: String },
    Unassign { role: String },
}

#[derive(Subcommand, Debug)]
enum PeopleCommand {
    Add { name: String },
    /// Remove a person and clear their assignments
    Remove { person: String },
    /// Add one name per line from a file, or `-` for stdin
    Import { file: PathBuf },
    List {
        /// Only names containing this text
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    #[value(alias = "md")]
    Markdown,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => ExportFormat::Markdown,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

/// Prints login links to stdout in place of sending mail.
struct StdoutMailer;

impl Mailer for StdoutMailer {
    fn send_login_link(&self, email: &str, url: &str) -> AuthResult<()> {
        println!("Login link for {email}:\n  {url}");
        Ok(())
    }
}

/// Everything a command needs, built from the config and flags.
struct App {
    config: ClientConfig,
    store: Arc<SqliteStore>,
    auth: Arc<LinkAuth>,
}

impl App {
    fn open(cli: &Cli) -> Result<Self> {
        let config = ClientConfig::load(cli.config.as_deref())?;

        let db_path = match &cli.db {
            Some(path) => path.clone(),
            None => config.database_path()?,
        };
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?;

        let auth_path = config.auth_state_path()?;
        let auth = LinkAuth::open(&auth_path, Arc::new(StdoutMailer))
            .with_context(|| format!("reading auth state {}", auth_path.display()))?;

        Ok(Self {
            config,
            store: Arc::new(store),
            auth: Arc::new(auth),
        })
    }

    fn sign_in(&self) -> SignIn {
        SignIn::new(self.auth.clone()).with_redirect(self.config.redirect_to.clone())
    }

    async fn session(&self) -> Result<Session> {
        match self.auth.current_session().await? {
            Some(session) => Ok(session),
            None => bail!("not signed in; run `rolematch login <email>` first"),
        }
    }

    async fn editor(&self) -> Result<EditorHandle> {
        let session = self.session().await?;
        Ok(EditorHandle::open(self.store.clone(), session.principal, &self.config).await)
    }

    /// Run one edit against the document and save it before returning.
    async fn edit(&self, f: impl FnOnce(&EditorHandle) -> Result<String>) -> Result<()> {
        let editor = self.editor().await?;
        let message = f(&editor)?;
        editor.flush().await?;
        println!("{message} (saved as v{})", editor.base_version());
        if let Some(notice) = editor.notice() {
            eprintln!("note: {notice}");
        }
        editor.shutdown().await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _otel_guard = init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "telemetry")]
fn init_tracing() -> Option<rolematch_telemetry::OtelGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    if !rolematch_telemetry::otel_enabled() {
        registry.init();
        return None;
    }
    match rolematch_telemetry::otel_layer("rolematch") {
        Ok((otel_layer, guard)) => {
            registry.with(otel_layer).init();
            Some(guard)
        }
        Err(e) => {
            registry.init();
            tracing::warn!("OTel export disabled: {e}");
            None
        }
    }
}

#[cfg(not(feature = "telemetry"))]
fn init_tracing() -> Option<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    None
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::open(&cli)?;
    match cli.command {
        Command::Login { email } => cmd_login(&app, &email).await,
        Command::Redeem { link } => {
            let session = app.sign_in().redeem(&link).await?;
            println!("Signed in as {}", session.principal.email);
            Ok(())
        }
        Command::Logout => {
            app.sign_in().sign_out().await?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            match app.auth.current_session().await? {
                Some(session) => println!(
                    "{} (session {})",
                    session.principal.email,
                    session.display_name()
                ),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::Show => cmd_show(&app).await,
        Command::Export { format, out } => cmd_export(&app, format.into(), out).await,
        Command::Group(cmd) => cmd_group(&app, cmd).await,
        Command::Role(cmd) => cmd_role(&app, cmd).await,
        Command::Extra(cmd) => cmd_extra(&app, cmd).await,
        Command::People(cmd) => cmd_people(&app, cmd).await,
    }
}

async fn cmd_login(app: &App, email: &str) -> Result<()> {
    match app.sign_in().request_link(email).await {
        SignInMessage::Success(text) => {
            println!("{text}");
            Ok(())
        }
        SignInMessage::Error(text) => bail!(text),
    }
}

async fn cmd_show(app: &App) -> Result<()> {
    let editor = app.editor().await?;
    print!("{}", render_roster(&editor.snapshot()));
    println!("Progress: {} roles assigned", editor.progress());

    let saved = match (editor.last_saved(), editor.saved_by()) {
        (Some(stamp), Some(by)) => format!(
            "v{} saved {} by {by}",
            editor.base_version(),
            format_millis(stamp.at)
        ),
        _ => "never saved (defaults)".to_string(),
    };
    println!("Document: {saved}");
    editor.shutdown().await?;
    Ok(())
}

fn render_roster(roster: &Roster) -> String {
    let name_of = |id: Option<StakeholderId>| roster.assignee_name(id).unwrap_or("-");
    let mut out = String::new();
    for group in &roster.groups {
        out.push_str(&format!("{} [{}]\n", group.name, group.color));
        if let Some(subtitle) = &group.subtitle {
            out.push_str(&format!("  {subtitle}\n"));
        }
        for role in &group.roles {
            out.push_str(&format!(
                "  {:<9} {:<42} {}\n",
                role.role_type.to_string(),
                role.title,
                name_of(role.assignee)
            ));
        }
        out.push('\n');
    }
    if !roster.extra_roles.is_empty() {
        out.push_str("Additional roles\n");
        for role in &roster.extra_roles {
            out.push_str(&format!("  {:<52} {}\n", role.title, name_of(role.assignee)));
        }
        out.push('\n');
    }
    out
}

fn format_millis(millis: u64) -> String {
    match Local.timestamp_millis_opt(millis as i64).single() {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("@{millis}ms"),
    }
}

async fn cmd_export(app: &App, format: ExportFormat, out: Option<PathBuf>) -> Result<()> {
    let editor = app.editor().await?;
    let file = editor.export(format);
    editor.shutdown().await?;

    match out {
        Some(dir) => {
            let sink = DirectorySink::new(dir);
            sink.deliver(&file)?;
            eprintln!("Wrote {}", sink.path_for(&file).display());
        }
        None => {
            std::io::stdout()
                .write_all(file.contents.as_bytes())
                .context("writing export to stdout")?;
        }
    }
    Ok(())
}

/// Ask on stderr, read y/N from stdin.
fn ask(prompt: &str) -> bool {
    eprint!("{prompt} [y/N] ");
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn cmd_group(app: &App, cmd: GroupCommand) -> Result<()> {
    app.edit(|editor| {
        let roster = editor.snapshot();
        match cmd {
            GroupCommand::Add => {
                let id = editor.add_group()?;
                Ok(format!("Added trio {}", id.short()))
            }
            GroupCommand::Rename { group, name } => {
                let id = resolve::group(&roster, &group)?;
                editor.rename_group(id, name.as_str())?;
                Ok(format!("Renamed to {name}"))
            }
            GroupCommand::Subtitle { group, subtitle } => {
                let id = resolve::group(&roster, &group)?;
                editor.set_group_subtitle(id, subtitle)?;
                Ok("Subtitle updated".to_string())
            }
            GroupCommand::Color { group, color } => {
                let id = resolve::group(&roster, &group)?;
                editor.set_group_color(id, color)?;
                Ok(format!("Colour set to {color}"))
            }
            GroupCommand::Delete { group, yes } => {
                let id = resolve::group(&roster, &group)?;
                let confirm = |prompt: &str| yes || ask(prompt);
                if editor.delete_group(id, &confirm)? {
                    Ok("Trio deleted".to_string())
                } else {
                    Ok("Kept trio".to_string())
                }
            }
        }
    })
    .await
}

async fn cmd_role(app: &App, cmd: RoleCommand) -> Result<()> {
    app.edit(|editor| {
        let roster = editor.snapshot();
        let slot = |group: &str, role: &str| -> Result<_> {
            let group_id = resolve::group(&roster, group)?;
            let group = roster
                .group(group_id)
                .context("trio vanished while resolving")?;
            Ok((group_id, resolve::role(group, role)?))
        };
        match cmd {
            RoleCommand::Title { group, role, title } => {
                let (group, role) = slot(&group, &role)?;
                editor.rename_role(group, role, title.as_str())?;
                Ok(format!("Position set to {title}"))
            }
            RoleCommand::Assign {
                group,
                role,
                person,
            } => {
                let (group, role) = slot(&group, &role)?;
                let person = resolve::person(&roster, &person)?;
                editor.assign_role(group, role, Some(person))?;
                Ok(format!(
                    "Assigned {}",
                    roster.assignee_name(Some(person)).unwrap_or("?")
                ))
            }
            RoleCommand::Unassign { group, role } => {
                let (group, role) = slot(&group, &role)?;
                editor.assign_role(group, role, None)?;
                Ok("Unassigned".to_string())
            }
        }
    })
    .await
}

async fn cmd_extra(app: &App, cmd: ExtraCommand) -> Result<()> {
    app.edit(|editor| {
        let roster = editor.snapshot();
        match cmd {
            ExtraCommand::Assign { role, person } => {
                let role = resolve::extra_role(&roster, &role)?;
                let person = resolve::person(&roster, &person)?;
                editor.assign_extra_role(role, Some(person))?;
                Ok(format!(
                    "Assigned {}",
                    roster.assignee_name(Some(person)).unwrap_or("?")
                ))
            }
            ExtraCommand::Unassign { role } => {
                let role = resolve::extra_role(&roster, &role)?;
                editor.assign_extra_role(role, None)?;
                Ok("Unassigned".to_string())
            }
        }
    })
    .await
}

async fn cmd_people(app: &App, cmd: PeopleCommand) -> Result<()> {
    match cmd {
        PeopleCommand::List { search } => {
            let editor = app.editor().await?;
            let roster = editor.snapshot();
            editor.shutdown().await?;
            let people = match &search {
                Some(query) => roster.stakeholders.search(query),
                None => roster.stakeholders.iter().collect(),
            };
            for person in &people {
                let roles = roster.assignments_of(person.id).len();
                println!("{:<32} {roles} role(s)", person.name);
            }
            eprintln!("{} of {} people", people.len(), roster.stakeholders.len());
            Ok(())
        }
        PeopleCommand::Import { file } => {
            let text = if file.as_os_str() == "-" {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("reading names from stdin")?;
                text
            } else {
                std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?
            };
            app.edit(|editor| {
                let report = editor.bulk_add_stakeholders(text)?;
                Ok(format!("Added {} name(s)", report.added.len()))
            })
            .await
        }
        PeopleCommand::Add { name } => app.edit(|editor| add_person(editor, &name)).await,
        PeopleCommand::Remove { person } => {
            app.edit(|editor| {
                let roster = editor.snapshot();
                let id = resolve::person(&roster, &person)?;
                let name = roster.stakeholders.name_of(id).unwrap_or("?").to_string();
                let cleared = editor.remove_stakeholder(id)?;
                Ok(format!("Removed {name}, cleared {cleared} assignment(s)"))
            })
            .await
        }
    }
}

/// Add one person. A name already in the pool leaves the roster unchanged
/// and surfaces as the editor's notice rather than an error.
fn add_person(editor: &EditorHandle, name: &str) -> Result<String> {
    match editor.add_stakeholder(name) {
        Ok(_) => Ok(format!("Added {}", name.trim())),
        Err(EditError::Pool(PoolError::Duplicate { .. })) => Ok("No change".to_string()),
        Err(e) => Err(e.into()),
    }
}
