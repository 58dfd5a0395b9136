//! Session resolution from the access token.
//!
//! The token payload is decoded without signature verification; transport
//! security is what the client trusts. Decoding sits behind [`TokenDecoder`]
//! so a verifying decoder can replace [`UnverifiedJwtDecoder`].

use crate::models::Role;
use crate::util::now_ms;
use base64::alphabet::URL_SAFE;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use leptos::prelude::*;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

/// JWT segments may or may not carry `=` padding depending on the issuer.
const JWT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims the client cares about.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct JwtPayload {
    pub role: String,
    /// Seconds since the Unix epoch.
    pub exp: i64,
}

/// Why a token could not be turned into a [`JwtPayload`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenDecodeError {
    /// Not `header.payload.signature`.
    Segments,
    Encoding(String),
    Claims(String),
}

impl std::fmt::Display for TokenDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Segments => write!(f, "token is not a three-segment JWT"),
            Self::Encoding(e) => write!(f, "invalid payload encoding: {e}"),
            Self::Claims(e) => write!(f, "invalid payload claims: {e}"),
        }
    }
}

impl std::error::Error for TokenDecodeError {}

pub trait TokenDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<JwtPayload, TokenDecodeError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UnverifiedJwtDecoder;

impl TokenDecoder for UnverifiedJwtDecoder {
    fn decode(&self, token: &str) -> Result<JwtPayload, TokenDecodeError> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => return Err(TokenDecodeError::Segments),
        };
        let bytes = JWT_BASE64
            .decode(payload)
            .map_err(|e| TokenDecodeError::Encoding(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| TokenDecodeError::Claims(e.to_string()))
    }
}

/// Maps a token to a role at instant `now_ms`.
///
/// Missing, malformed and expired tokens all yield `None`, as does a role
/// string outside [`Role`].
pub fn resolve_role(decoder: &dyn TokenDecoder, token: Option<&str>, now_ms: i64) -> Option<Role> {
    let token = token.map(str::trim).filter(|t| !t.is_empty())?;

    let payload = match decoder.decode(token) {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("ignoring undecodable access token: {e}");
            return None;
        }
    };

    if payload.exp.saturating_mul(1000) < now_ms {
        return None;
    }

    match Role::from_str(&payload.role) {
        Ok(role) => Some(role),
        Err(_) => {
            log::warn!("access token carries unknown role {:?}", payload.role);
            None
        }
    }
}

/// Process-wide authentication state.
///
/// The role signal is only written through [`SessionState::apply`], which
/// the credential store calls on save, restore and clear.
#[derive(Clone)]
pub struct SessionState {
    role: RwSignal<Option<Role>>,
    decoder: Arc<dyn TokenDecoder>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_decoder(Arc::new(UnverifiedJwtDecoder))
    }

    pub fn with_decoder(decoder: Arc<dyn TokenDecoder>) -> Self {
        Self {
            role: RwSignal::new(None),
            decoder,
        }
    }

    /// Resolves `token` against the current time and publishes the result.
    pub fn apply(&self, token: Option<&str>) -> Option<Role> {
        let role = resolve_role(self.decoder.as_ref(), token, now_ms());
        self.role.set(role);
        role
    }

    /// Tracked read for the presentation layer.
    pub fn role(&self) -> Signal<Option<Role>> {
        self.role.into()
    }

    pub fn role_untracked(&self) -> Option<Role> {
        self.role.get_untracked()
    }

    pub fn is_authenticated(&self) -> bool {
        self.role_untracked().is_some()
    }

    pub fn is_owner(&self) -> bool {
        self.role_untracked() == Some(Role::Owner)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
