use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contact_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContactPriority {
    Primary,
    Secondary,
}

/// An emergency contact reached during alert fan-out.
///
/// The relay carries SMS and voice; `notify_email` is stored for contacts
/// who prefer email, but that channel is skipped at fan-out time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmergencyContact {
    pub contact_id: Uuid,
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub relation: Option<String>,
    pub priority: ContactPriority,
    pub notify_sms: bool,
    pub notify_call: bool,
    pub notify_email: bool,
    pub created_at: DateTime<Utc>,
}
