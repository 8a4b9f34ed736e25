use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Rider,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Rider => "rider",
            Role::Driver => "driver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rider" => Ok(Role::Rider),
            "driver" => Ok(Role::Driver),
            other => Err(CoreError::ValidationError(format!("Unknown role: {}", other))),
        }
    }
}

/// Application profile attached to a hosted-auth user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub assigned_airbear_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: Uuid, email: Option<String>, role: Role) -> Self {
        Self {
            id,
            email,
            role,
            assigned_airbear_id: None,
            created_at: Utc::now(),
        }
    }

    /// Drivers may only report for the AirBear they are assigned to
    pub fn drives(&self, airbear_id: Uuid) -> bool {
        self.role == Role::Driver && self.assigned_airbear_id == Some(airbear_id)
    }
}
