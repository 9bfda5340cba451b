use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Body of `PUT /users`. Passwords are only sent when changing them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: bytes::Bytes,
}

impl AvatarUpload {
    /// Names the upload after the user the way the backend expects,
    /// e.g. `jane doe.png`.
    pub fn for_user(user: &User, extension: &str, bytes: bytes::Bytes) -> Self {
        let extension = extension.trim_start_matches('.').to_lowercase();
        Self {
            file_name: format!("{}.{}", user.name, extension).to_lowercase(),
            content_type: format!("image/{}", extension),
            bytes,
        }
    }
}
