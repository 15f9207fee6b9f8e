//! Emergency contact CRUD. Every accessor is scoped by the owning user id.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ContactPriority, EmergencyContact};

use super::{queries, DbPool};

pub struct ContactInput {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub relation: Option<String>,
    pub priority: ContactPriority,
    pub notify_sms: bool,
    pub notify_call: bool,
    pub notify_email: bool,
}

impl ContactInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("contact name is required".into()));
        }
        if self.phone.trim().is_empty() {
            return Err(AppError::Validation("contact phone is required".into()));
        }
        Ok(())
    }
}

pub async fn create(
    pool: &DbPool,
    user_id: &str,
    input: &ContactInput,
) -> Result<EmergencyContact, AppError> {
    input.validate()?;
    let contact = sqlx::query_as(queries::INSERT_CONTACT)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.name.trim())
        .bind(input.phone.trim())
        .bind(&input.email)
        .bind(&input.relation)
        .bind(input.priority)
        .bind(input.notify_sms)
        .bind(input.notify_call)
        .bind(input.notify_email)
        .fetch_one(pool)
        .await?;
    Ok(contact)
}

pub async fn list(pool: &DbPool, user_id: &str) -> Result<Vec<EmergencyContact>, AppError> {
    let contacts = sqlx::query_as(queries::SELECT_CONTACTS)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(contacts)
}

pub async fn update(
    pool: &DbPool,
    user_id: &str,
    contact_id: Uuid,
    input: &ContactInput,
) -> Result<EmergencyContact, AppError> {
    input.validate()?;
    let contact = sqlx::query_as(queries::UPDATE_CONTACT)
        .bind(contact_id)
        .bind(user_id)
        .bind(input.name.trim())
        .bind(input.phone.trim())
        .bind(&input.email)
        .bind(&input.relation)
        .bind(input.priority)
        .bind(input.notify_sms)
        .bind(input.notify_call)
        .bind(input.notify_email)
        .fetch_optional(pool)
        .await?;
    contact.ok_or(AppError::NotFound("contact"))
}

pub async fn delete(pool: &DbPool, user_id: &str, contact_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query(queries::DELETE_CONTACT)
        .bind(contact_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("contact"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_or_phone_fails_validation() {
        let mut input = ContactInput {
            name: "Asha".into(),
            phone: "+911234567890".into(),
            email: None,
            relation: Some("sister".into()),
            priority: ContactPriority::Primary,
            notify_sms: true,
            notify_call: false,
            notify_email: false,
        };
        assert!(input.validate().is_ok());

        input.name = "  ".into();
        assert!(matches!(input.validate(), Err(AppError::Validation(_))));

        input.name = "Asha".into();
        input.phone = String::new();
        assert!(matches!(input.validate(), Err(AppError::Validation(_))));
    }
}
