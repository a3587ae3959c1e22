use serde::{Deserialize, Serialize};

/// Access/refresh bearer token pair issued at login.
///
/// Both tokens are opaque; the client never decodes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// The refresh token, or `None` when it was stored empty
    pub fn refresh(&self) -> Option<&str> {
        Some(self.refresh_token.as_str()).filter(|t| !t.is_empty())
    }

    /// The access token, or `None` when it was stored empty
    pub fn access(&self) -> Option<&str> {
        Some(self.access_token.as_str()).filter(|t| !t.is_empty())
    }
}

/// Which login/registration endpoints to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Vehicle owner
    #[default]
    User,
    /// Shop owner, the privileged operator
    Owner,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Owner => "Admin",
        }
    }
}

// ============================================================================
// Wire payloads
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub access: String,
    pub refresh: String,
}

impl From<LoginResponse> for CredentialPair {
    fn from(resp: LoginResponse) -> Self {
        CredentialPair::new(resp.access, resp.refresh)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

impl<'a> RegisterRequest<'a> {
    /// Build a registration body, splitting the display name on the first
    /// whitespace into first and last name.
    pub fn new(email: &'a str, password: &'a str, display_name: &'a str) -> Self {
        let display_name = display_name.trim();
        let (first_name, last_name) = match display_name.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim()),
            None => (display_name, ""),
        };
        Self {
            email,
            password,
            first_name,
            last_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
    /// Only present if the server rotates refresh tokens
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Error body shape used by the backend (`{"detail": "..."}`)
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tokens_read_as_absent() {
        let pair = CredentialPair::new("", "");
        assert_eq!(pair.access(), None);
        assert_eq!(pair.refresh(), None);

        let pair = CredentialPair::new("A1", "R1");
        assert_eq!(pair.access(), Some("A1"));
        assert_eq!(pair.refresh(), Some("R1"));
    }

    #[test]
    fn test_register_request_splits_display_name() {
        let req = RegisterRequest::new("a@b.c", "pw", "Ada King Lovelace");
        assert_eq!(req.first_name, "Ada");
        assert_eq!(req.last_name, "King Lovelace");

        let req = RegisterRequest::new("a@b.c", "pw", "  Cher ");
        assert_eq!(req.first_name, "Cher");
        assert_eq!(req.last_name, "");
    }

    #[test]
    fn test_login_response_into_pair() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"access": "A1", "refresh": "R1"}"#).unwrap();
        let pair: CredentialPair = resp.into();
        assert_eq!(pair, CredentialPair::new("A1", "R1"));
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), r#""owner""#);
        assert_eq!(Role::default(), Role::User);
    }
}
