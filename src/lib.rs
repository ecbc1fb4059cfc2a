pub mod config;
pub mod modules;
pub mod services;
pub mod views;

use std::sync::Arc;

use config::Config;
use modules::access::AccessApi;
use modules::admin::AdminApi;
use modules::auth::{AuthApi, AuthSession, SessionService};
use modules::guard::{guard_route, GuardInput, GuardOutcome, Route};
use modules::qr::QrApi;
use modules::system::SystemApi;
use services::{ApiClient, Clock, FileTokenStore, RecordingNavigator, SystemClock, TokenStore};

/// Wired-up client: one token store, one HTTP client and one session shared by every screen
pub struct App {
    pub config: Config,
    pub tokens: Arc<dyn TokenStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub api: Arc<ApiClient>,
    pub session: Arc<AuthSession>,
    pub clock: Arc<dyn Clock>,
}

impl App {
    pub fn new(config: Config, tokens: Arc<dyn TokenStore>) -> Self {
        let navigator = Arc::new(RecordingNavigator::new());
        let api = Arc::new(ApiClient::new(&config, tokens.clone(), navigator.clone()));
        let auth = AuthApi::new(api.clone(), config.upload_timeout);
        let session = Arc::new(AuthSession::new(auth, tokens.clone()));

        Self {
            config,
            tokens,
            navigator,
            api,
            session,
            clock: Arc::new(SystemClock),
        }
    }

    /// Session persisted in the configured session file
    pub fn from_config(config: Config) -> Self {
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::open(config.session_file.clone()));
        Self::new(config, tokens)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn qr(&self) -> QrApi {
        QrApi::new(self.api.clone())
    }

    pub fn admin(&self) -> AdminApi {
        AdminApi::new(self.api.clone())
    }

    pub fn access(&self) -> AccessApi {
        AccessApi::new(self.api.clone(), self.config.report_timeout)
    }

    pub fn system(&self) -> SystemApi {
        SystemApi::new(self.api.clone())
    }

    /// Guard decision for `route` against the current session
    pub fn guard(&self, route: Route) -> GuardOutcome {
        self.session.reconcile();
        guard_route(route, &GuardInput::from_snapshot(&self.session.current()))
    }
}
