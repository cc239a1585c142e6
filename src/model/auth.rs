use serde::{Deserialize, Serialize};

/// The payload returned by the auth endpoints. The server may omit any of the fields, e.g. a
/// failed login carries only `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl AuthResponse {
    pub fn new(token: Option<String>, user_id: Option<String>, message: Option<String>) -> Self {
        Self {
            token,
            user_id,
            message,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
