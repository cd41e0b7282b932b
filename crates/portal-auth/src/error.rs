//! Authentication error types.
//!
//! Display strings are the messages shown to portal users.

use portal_core::error::PortalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Campos obligatorios faltantes: email y password son requeridos")]
    MissingCredentials,

    #[error("Usuarios staff requieren el campo staff_tier")]
    MissingStaffTier,

    #[error("Campo obligatorio faltante: frontend_type")]
    MissingFrontend,

    #[error("Tipo de usuario inválido. Debe ser \"cliente\" o \"staff\"")]
    InvalidUserType,

    #[error("frontend_type debe ser \"client\" o \"staff\"")]
    InvalidFrontend,

    #[error("Tier inválido. Debe ser uno de: {valid}")]
    InvalidTier { valid: String },

    #[error("max_uses debe ser un entero mayor o igual a 1")]
    InvalidMaxUses,

    #[error("expires_in_days debe ser un entero mayor o igual a 1")]
    InvalidExpiry,

    #[error("Acceso denegado. El portal staff es solo para registro de personal")]
    StaffPortalRegistrationOnly,

    #[error("Acceso denegado. El portal cliente es solo para usuarios clientes")]
    ClientPortalRegistrationOnly,

    #[error("Registro de staff requiere especificar frontend_type: staff")]
    StaffFrontendRequired,

    #[error("Código de invitación inválido o expirado. Contacta al administrador.")]
    InvalidInvitationCode,

    #[error("El email ya está registrado en el sistema")]
    EmailTaken,

    #[error("Credenciales inválidas")]
    InvalidCredentials,

    #[error("Cuenta desactivada. Contacta al administrador.")]
    AccountInactive,

    #[error("Acceso denegado. El portal staff es solo para personal autorizado.")]
    StaffPortalOnly,

    #[error("Cuenta de staff incompleta. Contacta al administrador.")]
    IncompleteStaffAccount,

    #[error("Acceso denegado. El personal debe usar el portal staff.")]
    ClientPortalOnly,

    #[error("Por favor verifica tu email antes de iniciar sesión.")]
    EmailNotVerified,

    #[error("No autenticado")]
    Unauthenticated,

    #[error("Token inválido o expirado")]
    SessionInvalid,

    #[error("Acceso denegado. Solo para staff.")]
    StaffOnly,

    #[error("Permisos insuficientes")]
    InsufficientPermissions,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for PortalError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials
            | AuthError::MissingStaffTier
            | AuthError::MissingFrontend => PortalError::MissingFields {
                message: err.to_string(),
            },
            AuthError::InvalidUserType
            | AuthError::InvalidFrontend
            | AuthError::InvalidTier { .. }
            | AuthError::InvalidMaxUses
            | AuthError::InvalidExpiry => PortalError::Validation {
                message: err.to_string(),
            },
            AuthError::InvalidCredentials
            | AuthError::Unauthenticated
            | AuthError::SessionInvalid => PortalError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::StaffPortalRegistrationOnly
            | AuthError::ClientPortalRegistrationOnly
            | AuthError::StaffFrontendRequired
            | AuthError::InvalidInvitationCode
            | AuthError::AccountInactive
            | AuthError::StaffPortalOnly
            | AuthError::IncompleteStaffAccount
            | AuthError::ClientPortalOnly
            | AuthError::StaffOnly
            | AuthError::InsufficientPermissions => PortalError::AuthorizationDenied {
                reason: err.to_string(),
            },
            AuthError::EmailNotVerified => PortalError::VerificationRequired {
                reason: err.to_string(),
            },
            AuthError::EmailTaken => PortalError::Conflict {
                reason: err.to_string(),
            },
            AuthError::Crypto(msg) => PortalError::Crypto(msg),
        }
    }
}
