//! HTTP surface — shared state, router assembly, and auth middleware.

mod auth;
mod middleware;
mod requests;

use std::sync::Arc;

use axum::Router;
use portico_auth::workflow::AccessRequestWorkflow;
use portico_auth::{
    HttpIdentityProvider, LocalAuthenticator, PasswordResetFlow, RefreshFlow, SessionGuard,
    SsoExchanger, TokenCodec,
};
use portico_core::models::portal::PortalRegistry;
use portico_db::repository::{
    SurrealAccessRequestRepository, SurrealGrantRepository, SurrealUserDirectory,
};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;

use crate::activity::TracingActivityLogger;
use crate::mailer::SmtpMailer;
use crate::settings::Settings;

type Directory = SurrealUserDirectory<Client>;
type Workflow = AccessRequestWorkflow<
    SurrealAccessRequestRepository<Client>,
    SurrealGrantRepository<Client>,
    Directory,
    SmtpMailer,
>;

/// Everything the handlers need, wired once at startup.
pub struct Portico {
    pub settings: Settings,
    pub registry: PortalRegistry,
    pub guard: SessionGuard,
    pub local: LocalAuthenticator<Directory>,
    pub sso: SsoExchanger<HttpIdentityProvider, Directory>,
    pub refresh: RefreshFlow,
    pub reset: PasswordResetFlow<Directory, SmtpMailer>,
    pub workflow: Workflow,
    pub activity: TracingActivityLogger,
}

impl Portico {
    pub fn new(settings: Settings, db: Surreal<Client>, mailer: SmtpMailer) -> Self {
        let codec = Arc::new(TokenCodec::new(&settings.auth.jwt_secret));
        let registry = settings.registry.clone();

        let users = SurrealUserDirectory::new(db.clone());

        Self {
            guard: SessionGuard::new(codec.clone(), registry.names()),
            local: LocalAuthenticator::new(
                users.clone(),
                codec.clone(),
                registry.clone(),
                settings.auth.clone(),
            ),
            sso: SsoExchanger::new(
                HttpIdentityProvider::new(settings.oauth.clone()),
                users.clone(),
                codec.clone(),
                registry.clone(),
                settings.auth.clone(),
            ),
            refresh: RefreshFlow::new(codec.clone(), registry.clone(), settings.auth.clone()),
            reset: PasswordResetFlow::new(
                users.clone(),
                mailer.clone(),
                codec,
                settings.auth.clone(),
            ),
            workflow: AccessRequestWorkflow::new(
                SurrealAccessRequestRepository::new(db.clone()),
                SurrealGrantRepository::new(db),
                users,
                mailer,
                registry.clone(),
                settings.auth.clone(),
            ),
            activity: TracingActivityLogger,
            registry,
            settings,
        }
    }
}

pub type AppState = Arc<Portico>;

/// Build the complete API router. Every route passes through the auth
/// middleware; public paths are allow-listed there.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/access-requests", requests::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}
