//! Conversions between envelope payloads and workflow inputs/outputs.

use chrono::{DateTime, Utc};
use portal_auth::session::SessionPolicy;
use portal_auth::{AuthError, IssueInvitation, LoginInput, LoginOutput, LogoutOutput, RegisterInput};
use portal_core::error::PortalError;
use portal_core::models::invitation::InvitationCode;
use portal_core::models::user::{User, UserType};
use serde_json::{Value, json};

use crate::envelope::ApiEvent;

pub fn register_input(event: &ApiEvent) -> RegisterInput {
    RegisterInput {
        email: event.str_field("email"),
        password: event.str_field("password"),
        name: event.str_field("name"),
        phone: event.str_field("phone"),
        gender: event.str_field("gender"),
        user_type: event.str_field("user_type"),
        staff_tier: event.str_field("staff_tier"),
        invitation_code: event.str_field("invitation_code"),
        frontend_type: event.str_field("frontend_type"),
    }
}

pub fn login_input(event: &ApiEvent) -> LoginInput {
    LoginInput {
        email: event.str_field("email"),
        password: event.str_field("password"),
        frontend_type: event.str_field("frontend_type"),
    }
}

pub fn issue_invitation_input(event: &ApiEvent) -> Result<IssueInvitation, PortalError> {
    Ok(IssueInvitation {
        max_uses: event
            .int_field("max_uses")
            .map_err(|()| AuthError::InvalidMaxUses)?,
        expires_in_days: event
            .int_field("expires_in_days")
            .map_err(|()| AuthError::InvalidExpiry)?,
        created_by: event.str_field("created_by"),
    })
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

pub fn register_body(user: &User) -> Value {
    let mut body = json!({
        "message": "Usuario registrado exitosamente",
        "user_id": user.user_id,
        "email": user.email,
        "name": user.name,
        "user_type": user.user_type,
        "is_active": user.is_active,
        "registration_source": user.registration_source,
        "requires_verification": !user.is_verified,
    });
    if let Some(staff) = &user.staff {
        body["staff_tier"] = json!(staff.tier);
        body["permissions"] = json!(staff.permissions);
        body["is_verified"] = json!(user.is_verified);
    }
    body
}

fn user_profile(user: &User, redirect_to: &str) -> Value {
    let mut profile = json!({
        "user_id": user.user_id,
        "email": user.email,
        "name": user.name,
        "user_type": user.user_type,
        "is_active": user.is_active,
        "is_verified": user.is_verified,
        "last_login": user.last_login.map(timestamp),
        "redirect_to": redirect_to,
    });
    if user.user_type == UserType::Staff {
        profile["staff_tier"] = json!(user.staff_tier());
        profile["permissions"] = json!(user.permissions());
    }
    profile
}

pub fn login_body(out: &LoginOutput, cookie_name: &str) -> Value {
    let expires = timestamp(out.expires_at);
    json!({
        "message": "Login exitoso",
        "user": user_profile(&out.user, &out.redirect_to),
        "token": out.token,
        "token_expires": expires,
        "session": {
            "logged_in_at": timestamp(out.logged_in_at),
            "frontend_type": out.frontend_type,
        },
        "cookie_instructions": {
            "name": cookie_name,
            "value": out.token,
            "expires": expires,
            "httpOnly": true,
            "secure": true,
            "sameSite": "Strict",
            "path": "/",
        },
    })
}

pub fn logout_body(out: &LogoutOutput, policy: SessionPolicy) -> Value {
    let note = match policy {
        SessionPolicy::SignedClaims => {
            "Token eliminado del cliente. El token JWT seguirá siendo válido hasta su expiración natural."
        }
        SessionPolicy::Persisted if out.revoked => "Sesión eliminada del servidor.",
        SessionPolicy::Persisted => "Token eliminado del cliente.",
    };
    json!({
        "message": "Sesión cerrada exitosamente",
        "timestamp": timestamp(out.logged_out_at),
        "note": note,
    })
}

pub fn invitation_body(code: &InvitationCode) -> Value {
    json!({
        "message": "Código de invitación generado exitosamente",
        "invitation_code": code.code,
        "details": {
            "max_uses": code.max_uses,
            "expires_at": timestamp(code.expires_at),
            "expires_in_days": (code.expires_at - code.created_at).num_days(),
            "created_by": code.created_by,
            "created_at": timestamp(code.created_at),
        },
        "usage_instructions": {
            "para_staff": "Use este código para registrar nuevo personal staff",
            "endpoint": "/auth/register",
            "campo": "invitation_code",
        },
    })
}
