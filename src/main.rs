use casa_del_sol::config::Config;
use casa_del_sol::modules::access::{AccessLogQuery, AccessReport};
use casa_del_sol::modules::admin::{
    AdminError, IdentificationViewer, PendingQuery, SearchFilters, UnauthorizeDraft, UserManagement,
};
use casa_del_sol::modules::auth::{AuthError, IdentificationPhoto, RegisterForm, Role, SessionService, User};
use casa_del_sol::modules::guard::{GuardOutcome, Route};
use casa_del_sol::modules::qr::{AccessType, CaptureMode, NoCamera, QrDisplay, QrScanner, Visibility};
use casa_del_sol::{views, App};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
usage: casa-del-sol <command>

  health                              check the backend
  login <email> [password]            sign in (password read from stdin if omitted)
  register --email E --password P --confirm P --name N --surname S
           --address A --age N --phone T --role R --photo FILE
  logout                              forget the stored session
  profile                             show your profile
  status                              authorization status and stored session
  open <path>                         show the screen at a route path
  qr-display                          rotating access code (r: refresh, h/v: hide/show, q: quit)
  scan <entry|exit> [code]            register an entry or exit
  admin pending [page] [role]
  admin search [--category R] [--search TEXT] [--page N]
  admin stats
  admin authorize|reauthorize <user-id>
  admin reject <user-id> [reason]
  admin unauthorize <user-id> <reason>
  admin identification <user-id>
  access logs [YYYY-MM-DD] [page]
  access inside
  access manual-exit <user-id> [notes]";

#[derive(Debug)]
enum Command {
    Health,
    Login { email: String, password: Option<String> },
    Register(HashMap<String, String>),
    Logout,
    Profile,
    Status,
    Open(String),
    QrDisplay,
    Scan { access_type: AccessType, code: Option<String> },
    AdminPending { page: u32, role: Option<Role> },
    AdminSearch(SearchFilters),
    AdminStats,
    AdminAuthorize(String),
    AdminReauthorize(String),
    AdminReject { user_id: String, reason: Option<String> },
    AdminUnauthorize { user_id: String, reason: String },
    AdminIdentification(String),
    AccessLogs { date: Option<NaiveDate>, page: u32 },
    AccessInside,
    AccessManualExit { user_id: String, notes: Option<String> },
}

impl Command {
    /// Screen whose guard protects the command
    fn route(&self) -> Option<Route> {
        match self {
            Self::Health | Self::Login { .. } | Self::Register(_) | Self::Logout | Self::Status | Self::Open(_) => None,
            Self::Profile => Some(Route::Profile),
            Self::QrDisplay => Some(Route::QrDisplay),
            Self::Scan { .. } => Some(Route::QrScanner),
            Self::AdminPending { .. }
            | Self::AdminSearch(_)
            | Self::AdminStats
            | Self::AdminAuthorize(_)
            | Self::AdminReauthorize(_)
            | Self::AdminReject { .. }
            | Self::AdminUnauthorize { .. }
            | Self::AdminIdentification(_) => Some(Route::AdminUsers),
            Self::AccessLogs { .. } | Self::AccessInside | Self::AccessManualExit { .. } => {
                Some(Route::AccessManagement)
            }
        }
    }
}

fn parse_flags(args: &[String]) -> Result<HashMap<String, String>, String> {
    let mut flags = HashMap::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let key = arg
            .strip_prefix("--")
            .ok_or_else(|| format!("unexpected argument '{}'", arg))?;
        let value = iter.next().ok_or_else(|| format!("missing value for --{}", key))?;
        flags.insert(key.to_string(), value.clone());
    }
    Ok(flags)
}

fn parse_page(raw: Option<&String>) -> Result<u32, String> {
    match raw {
        Some(p) => p.parse().map_err(|_| format!("invalid page '{}'", p)),
        None => Ok(1),
    }
}

fn required(args: &[String], index: usize, what: &str) -> Result<String, String> {
    args.get(index).cloned().ok_or_else(|| format!("missing {}", what))
}

fn parse(args: &[String]) -> Result<Command, String> {
    let words: Vec<&str> = args.iter().map(String::as_str).collect();
    let command = match words.as_slice() {
        ["health"] => Command::Health,
        ["login", email] => Command::Login {
            email: email.to_string(),
            password: None,
        },
        ["login", email, password] => Command::Login {
            email: email.to_string(),
            password: Some(password.to_string()),
        },
        ["register", ..] => Command::Register(parse_flags(&args[1..])?),
        ["logout"] => Command::Logout,
        ["profile"] => Command::Profile,
        ["status"] => Command::Status,
        ["open", path] => Command::Open(path.to_string()),
        ["qr-display"] => Command::QrDisplay,
        ["scan", direction, rest @ ..] if rest.len() <= 1 => Command::Scan {
            access_type: direction.parse()?,
            code: rest.first().map(|c| c.to_string()),
        },
        ["admin", "pending", rest @ ..] => Command::AdminPending {
            page: parse_page(args.get(2))?,
            role: rest.get(1).map(|r| r.parse()).transpose()?,
        },
        ["admin", "search", ..] => {
            let flags = parse_flags(&args[2..])?;
            let category = flags.get("category").map(|c| c.parse()).transpose()?;
            let page = parse_page(flags.get("page"))?;
            Command::AdminSearch(
                SearchFilters::default()
                    .with_category(category)
                    .with_search(flags.get("search").cloned())
                    .with_page(page),
            )
        }
        ["admin", "stats"] => Command::AdminStats,
        ["admin", "authorize", _] => Command::AdminAuthorize(required(args, 2, "user id")?),
        ["admin", "reauthorize", _] => Command::AdminReauthorize(required(args, 2, "user id")?),
        ["admin", "reject", _, ..] => Command::AdminReject {
            user_id: required(args, 2, "user id")?,
            reason: (args.len() > 3).then(|| args[3..].join(" ")),
        },
        ["admin", "unauthorize", _, _, ..] => Command::AdminUnauthorize {
            user_id: required(args, 2, "user id")?,
            reason: args[3..].join(" "),
        },
        ["admin", "identification", _] => Command::AdminIdentification(required(args, 2, "user id")?),
        ["access", "logs", rest @ ..] if rest.len() <= 2 => Command::AccessLogs {
            date: rest
                .first()
                .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| format!("invalid date '{}'", d)))
                .transpose()?,
            page: parse_page(args.get(3))?,
        },
        ["access", "inside"] => Command::AccessInside,
        ["access", "manual-exit", _, ..] => Command::AccessManualExit {
            user_id: required(args, 2, "user id")?,
            notes: (args.len() > 3).then(|| args[3..].join(" ")),
        },
        _ => return Err(USAGE.to_string()),
    };
    Ok(command)
}

async fn read_line(prompt: &str) -> Result<String, String> {
    println!("{}", prompt);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    match lines.next_line().await {
        Ok(Some(line)) => Ok(line.trim().to_string()),
        Ok(None) => Err("no input".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn register_form(flags: &HashMap<String, String>) -> Result<RegisterForm, String> {
    let get = |key: &str| flags.get(key).cloned().unwrap_or_default();
    let age = match flags.get("age") {
        Some(raw) => raw.parse().map_err(|_| format!("invalid age '{}'", raw))?,
        None => 0,
    };
    let role = flags.get("role").map(|r| r.parse::<Role>()).transpose()?;
    let photo = flags
        .get("photo")
        .map(|p| IdentificationPhoto::from_path(&PathBuf::from(p)).map_err(|e| format!("cannot read photo: {}", e)))
        .transpose()?;

    Ok(RegisterForm {
        email: get("email"),
        password: get("password"),
        password_confirm: flags.get("confirm").cloned().unwrap_or_else(|| get("password")),
        name: get("name"),
        surname: get("surname"),
        address: get("address"),
        age,
        phone: get("phone"),
        role,
        photo,
    })
}

fn auth_failure(e: AuthError, fallback: &str) -> String {
    match e {
        AuthError::InvalidRegistration(errors) => {
            format!("Please fix the following:\n{}", views::field_errors(&errors))
        }
        other => other.user_message(fallback),
    }
}

fn admin_failure(e: AdminError) -> String {
    e.user_message("The action could not be completed")
}

/// Renders what the guard shows instead of the screen; `true` means go ahead
fn pass_guard(app: &App, route: Route) -> bool {
    match app.guard(route) {
        GuardOutcome::Render => true,
        GuardOutcome::ShowLoading => {
            println!("{}", views::LOADING);
            false
        }
        GuardOutcome::Redirect(Route::Home) => {
            println!("You are not signed in. Use `casa-del-sol login <email>`.");
            false
        }
        GuardOutcome::Redirect(target) => {
            println!("This screen is not available to you; going to {}", target);
            false
        }
        GuardOutcome::ShowPending => {
            if let Some(user) = app.session.current().user {
                println!("{}", views::pending_notice(&user));
            }
            false
        }
        GuardOutcome::ShowRestricted(restriction) => {
            println!("{}", views::restricted(restriction));
            false
        }
    }
}

async fn find_user(management: &UserManagement, user_id: &str) -> Result<User, String> {
    management
        .find_user(user_id)
        .await
        .map_err(admin_failure)?
        .ok_or_else(|| format!("User {} not found", user_id))
}

async fn show_screen(app: &App, route: Route) -> Result<(), String> {
    match app.guard(route) {
        GuardOutcome::Render => {}
        GuardOutcome::Redirect(target) if target != Route::Home => {
            println!("Redirected to {}", target);
            return Box::pin(show_screen(app, target)).await;
        }
        _ => {
            pass_guard(app, route);
            return Ok(());
        }
    }

    let snapshot = app.session.current();
    match (route, snapshot.user.as_ref()) {
        (Route::Home, _) => println!("Casa del Sol\nSign in with `login` or create an account with `register`."),
        (Route::Profile, Some(user)) => println!("{}", views::profile(user, snapshot.status_detail.as_ref())),
        (Route::Pending, Some(user)) => println!("{}", views::pending_notice(user)),
        (_, Some(user)) => println!("{}\n\nScreen: {}", views::welcome(user), route),
        (_, None) => println!("Screen: {}", route),
    }
    Ok(())
}

async fn run_qr_display(app: &App) -> Result<(), String> {
    let (visibility_tx, visibility_rx) = watch::channel(Visibility::Visible);
    let handle = QrDisplay::new(Arc::new(app.qr()), app.clock.clone()).spawn(visibility_rx);
    let mut state = handle.subscribe();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let image_path = app.config.data_dir.join("qr-current.png");
    let mut shown_code: Option<String> = None;

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                if let Some(code) = &current.code {
                    if shown_code.as_deref() != Some(code.code.as_str()) {
                        shown_code = Some(code.code.clone());
                        match code.image_png_bytes() {
                            Ok(Some(png)) => {
                                let saved = std::fs::create_dir_all(&app.config.data_dir)
                                    .and_then(|_| std::fs::write(&image_path, png));
                                match saved {
                                    Ok(()) => println!("QR image saved to {}", image_path.display()),
                                    Err(e) => tracing::warn!("Could not save QR image: {}", e),
                                }
                            }
                            Ok(None) => {}
                            Err(e) => tracing::warn!("QR image is not valid base64: {}", e),
                        }
                    }
                }
                println!("{}\n", views::qr_state(&current));
            }
            line = input.next_line() => match line.map_err(|e| e.to_string())?.as_deref().map(str::trim) {
                Some("r") => handle.refresh().await,
                Some("h") => { let _ = visibility_tx.send(Visibility::Hidden); }
                Some("v") => { let _ = visibility_tx.send(Visibility::Visible); }
                Some("q") | None => break,
                Some(_) => println!("r: refresh, h: hide, v: show, q: quit"),
            },
        }
    }

    handle.stop().await;
    Ok(())
}

async fn run_scan(app: &App, access_type: AccessType, code: Option<String>) -> Result<(), String> {
    let scanner = QrScanner::new(Arc::new(app.qr()), Arc::new(NoCamera), app.clock.clone());
    scanner.set_access_type(access_type);

    let code = match code {
        Some(code) => code,
        None => {
            if scanner.choose_mode(CaptureMode::Camera).await == CaptureMode::Camera {
                if let Some(scan) = scanner
                    .scan_with_camera(async {
                        let _ = tokio::signal::ctrl_c().await;
                    })
                    .await
                    .map_err(|e| e.user_message())?
                {
                    println!("{}", views::last_scan(&scan));
                }
                return Ok(());
            }
            read_line("Type the QR code:").await?
        }
    };

    scanner.set_input(&code);
    let scan = scanner.submit_input().await.map_err(|e| e.user_message())?;
    println!("{}", views::last_scan(&scan));
    Ok(())
}

async fn run(app: &App, command: Command) -> Result<(), String> {
    if let Some(route) = command.route() {
        if !pass_guard(app, route) {
            return Ok(());
        }
    }

    match command {
        Command::Health => {
            let body = app.system().health().await.map_err(|e| e.user_message("Health check failed"))?;
            println!("Backend at {} is up: {}", app.config.api_base_url, body);
        }
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => read_line("Password:").await?,
            };
            let user = app
                .session
                .login(&email, &password)
                .await
                .map_err(|e| auth_failure(e, "Invalid email or password"))?;
            if app.session.current().is_pending() {
                println!("{}", views::pending_notice(&user));
            } else {
                println!("{}", views::welcome(&user));
            }
        }
        Command::Register(flags) => {
            let form = register_form(&flags)?;
            let outcome = app
                .session
                .register(&form)
                .await
                .map_err(|e| auth_failure(e, "Registration failed"))?;
            println!("{}", outcome.message);
        }
        Command::Logout => {
            app.session.logout();
            println!("Signed out");
        }
        Command::Profile => {
            let user = app
                .session
                .refresh_profile()
                .await
                .map_err(|e| auth_failure(e, "Could not load your profile"))?;
            let detail = app.session.check_auth_status().await.ok();
            println!("{}", views::profile(&user, detail.as_ref()));
        }
        Command::Status => {
            let snapshot = app.session.current();
            match &snapshot.user {
                Some(user) => {
                    println!("Signed in as {} ({})", user.email, user.authorization.label());
                    if let Ok(detail) = app.session.check_auth_status().await {
                        if let Some(message) = detail.message {
                            println!("{}", message);
                        }
                    }
                }
                None => println!("Not signed in"),
            }
            println!("{}", views::token_presence(&app.system().token_presence()));
        }
        Command::Open(path) => show_screen(app, Route::from_path(&path)).await?,
        Command::QrDisplay => run_qr_display(app).await?,
        Command::Scan { access_type, code } => run_scan(app, access_type, code).await?,
        Command::AdminPending { page, role } => {
            let management = UserManagement::new(app.admin());
            let listing = management
                .pending(PendingQuery {
                    page,
                    role,
                    ..PendingQuery::default()
                })
                .await
                .map_err(admin_failure)?;
            println!("{}", views::user_table(&listing));
        }
        Command::AdminSearch(filters) => {
            let mut management = UserManagement::new(app.admin());
            let listing = management.apply_filters(filters).await.map_err(admin_failure)?;
            println!("{}", views::user_table(listing));
        }
        Command::AdminStats => {
            let stats = UserManagement::new(app.admin()).stats().await.map_err(admin_failure)?;
            println!("{}", views::stats(&stats));
        }
        Command::AdminAuthorize(user_id) => {
            let mut management = UserManagement::new(app.admin());
            management.authorize(&user_id).await.map_err(admin_failure)?;
            println!("User {} authorized", user_id);
        }
        Command::AdminReauthorize(user_id) => {
            let mut management = UserManagement::new(app.admin());
            management.reauthorize(&user_id).await.map_err(admin_failure)?;
            println!("User {} reauthorized", user_id);
        }
        Command::AdminReject { user_id, reason } => {
            let mut management = UserManagement::new(app.admin());
            let user = find_user(&management, &user_id).await?;
            management
                .reject(&user, reason.as_deref())
                .await
                .map_err(admin_failure)?;
            println!("User {} rejected", user.full_name());
        }
        Command::AdminUnauthorize { user_id, reason } => {
            let mut management = UserManagement::new(app.admin());
            let user = find_user(&management, &user_id).await?;
            let mut draft: UnauthorizeDraft = management.begin_unauthorize(&user);
            draft.set_reason(&reason);
            management.unauthorize(&draft).await.map_err(admin_failure)?;
            println!("User {} unauthorized", draft.user_name);
        }
        Command::AdminIdentification(user_id) => {
            let mut viewer = IdentificationViewer::new(app.config.data_dir.join("identifications"));
            viewer
                .open(&app.admin(), &user_id)
                .await
                .map_err(admin_failure)?;
            if let Some(path) = viewer.take().and_then(|image| image.into_path()) {
                println!("Identification saved to {}", path.display());
            }
        }
        Command::AccessLogs { date, page } => {
            let mut report = AccessReport::new(app.access(), app.clock.clone());
            report.query = AccessLogQuery {
                date: date.or(report.query.date),
                page,
                ..report.query
            };
            let logs = report.load_logs().await?;
            println!("{}", views::access_logs(logs));
        }
        Command::AccessInside => {
            let mut report = AccessReport::new(app.access(), app.clock.clone());
            let inside = report.load_inside().await?;
            println!("{}", views::users_inside(inside));
        }
        Command::AccessManualExit { user_id, notes } => {
            let mut report = AccessReport::new(app.access(), app.clock.clone());
            report.manual_exit(&user_id, notes.as_deref()).await?;
            println!("Exit registered for {}", user_id);
            println!("{}", views::users_inside(&report.inside));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casa_del_sol=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    // Load configuration
    let config = Config::from_env().expect("Failed to load environment configuration");
    let app = App::from_config(config);

    if !app.system().test_connection().await {
        tracing::warn!("Backend health check failed, continuing");
    }
    app.session.initialize().await;

    if let Err(message) = run(&app, command).await {
        eprintln!("{}", message);
        if let Some(route) = app.navigator.last() {
            tracing::debug!(%route, "Session ended during the command");
        }
        std::process::exit(1);
    }
}
