use std::fmt;

use serde::{Deserialize, Serialize};

/// Account role; decides which dashboard and endpoints apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Faculty,
    Admin,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Faculty => "Faculty",
            Role::Admin => "Administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Current user record from `/auth/profile/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub avatar_url: Option<String>,
}

impl User {
    /// "First Last", or the username when no name is set.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn is_faculty(&self) -> bool {
        self.role == Role::Faculty
    }
}

/// Sign-up form for `/auth/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Partial profile update; unset fields are left alone by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Successful `/auth/login/` reply. Anything beyond the token pair is kept
/// untouched in `extra`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
