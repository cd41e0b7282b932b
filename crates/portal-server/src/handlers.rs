//! The four portal operations, each taking a parsed event and always
//! producing a response.

use portal_auth::{AuthService, GENERATE_INVITATION_CODES, extract_token};
use portal_core::error::{PortalError, PortalResult};
use portal_core::models::user::UserType;
use portal_core::repository::{InvitationRepository, SessionRepository, UserRepository};
use portal_db::repository::{
    SurrealInvitationRepository, SurrealSessionRepository, SurrealUserRepository,
};
use serde_json::Value;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use tracing::info;

use crate::config::ServerConfig;
use crate::dto;
use crate::envelope::{ApiEvent, ApiResponse, CorsConfig};

/// Operation selector for raw event dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Login,
    Logout,
    IssueInvitation,
}

pub struct Handlers<U, I, S>
where
    U: UserRepository,
    I: InvitationRepository,
    S: SessionRepository,
{
    service: AuthService<U, I, S>,
    cors: CorsConfig,
    protect_invitation_issuance: bool,
}

/// Handlers backed by SurrealDB.
pub type PortalHandlers = Handlers<
    SurrealUserRepository<Any>,
    SurrealInvitationRepository<Any>,
    SurrealSessionRepository<Any>,
>;

impl PortalHandlers {
    pub fn from_db(db: Surreal<Any>, config: &ServerConfig) -> Self {
        let service = AuthService::new(
            SurrealUserRepository::new(db.clone()),
            SurrealInvitationRepository::new(db.clone()),
            SurrealSessionRepository::new(db),
            config.auth.clone(),
        );
        Self::new(
            service,
            config.cors.clone(),
            config.protect_invitation_issuance,
        )
    }
}

impl<U, I, S> Handlers<U, I, S>
where
    U: UserRepository,
    I: InvitationRepository,
    S: SessionRepository,
{
    pub fn new(
        service: AuthService<U, I, S>,
        cors: CorsConfig,
        protect_invitation_issuance: bool,
    ) -> Self {
        Self {
            service,
            cors,
            protect_invitation_issuance,
        }
    }

    pub fn service(&self) -> &AuthService<U, I, S> {
        &self.service
    }

    /// Parse a raw event and run `operation` on it.
    pub async fn handle(&self, operation: Operation, raw: Value) -> ApiResponse {
        let event = match ApiEvent::parse(raw) {
            Ok(event) => event,
            Err(e) => return self.error(&e),
        };
        match operation {
            Operation::Register => self.register(event).await,
            Operation::Login => self.login(event).await,
            Operation::Logout => self.logout(event).await,
            Operation::IssueInvitation => self.issue_invitation(event).await,
        }
    }

    pub async fn register(&self, event: ApiEvent) -> ApiResponse {
        self.respond(async {
            let user = self.service.register(dto::register_input(&event)).await?;
            Ok::<_, PortalError>((201, dto::register_body(&user)))
        })
        .await
    }

    pub async fn login(&self, event: ApiEvent) -> ApiResponse {
        self.respond(async {
            let out = self.service.login(dto::login_input(&event)).await?;
            Ok::<_, PortalError>((
                200,
                dto::login_body(&out, &self.service.config().session_cookie_name),
            ))
        })
        .await
    }

    pub async fn logout(&self, event: ApiEvent) -> ApiResponse {
        let cookie_name = &self.service.config().session_cookie_name;
        let token = extract_token(&event.headers, cookie_name)
            .map(String::from)
            .or_else(|| event.str_field("token"));

        let out = self.service.logout(token.as_deref()).await;
        info!(revoked = out.revoked, "Logout acknowledged");
        ApiResponse::json(
            200,
            &dto::logout_body(&out, self.service.sessions().policy()),
            &self.cors,
        )
    }

    pub async fn issue_invitation(&self, event: ApiEvent) -> ApiResponse {
        self.respond(async {
            let issuer = if self.protect_invitation_issuance {
                let claims = self
                    .service
                    .guard()
                    .require_role(
                        &event.headers,
                        UserType::Staff,
                        Some(GENERATE_INVITATION_CODES),
                    )
                    .await?;
                Some(claims.email)
            } else {
                None
            };

            let mut request = dto::issue_invitation_input(&event)?;
            // Protected issuance always attributes the code to the caller.
            if let Some(email) = issuer {
                request.created_by = Some(email);
            }
            let code = self.service.issue_invitation(request).await?;
            Ok::<_, PortalError>((201, dto::invitation_body(&code)))
        })
        .await
    }

    pub fn preflight(&self) -> ApiResponse {
        ApiResponse::preflight(&self.cors)
    }

    pub fn error(&self, err: &PortalError) -> ApiResponse {
        ApiResponse::error(err, &self.cors)
    }

    async fn respond(
        &self,
        work: impl Future<Output = PortalResult<(u16, Value)>>,
    ) -> ApiResponse {
        match work.await {
            Ok((status, body)) => ApiResponse::json(status, &body, &self.cors),
            Err(e) => self.error(&e),
        }
    }
}
