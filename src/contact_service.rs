use crate::errors::AppError;
use crate::gateway::{RecordStore, UnitOfWork};
use crate::models::{Confirmation, Contact, ContactInput, ContactView};
use crate::validation::{check_id, require, require_text, WriteIntent};
use std::sync::Arc;

/// Validates and persists standalone contacts against their owning professional.
pub struct ContactService {
    store: Arc<dyn RecordStore>,
}

/// Contact request that passed local validation.
struct ValidContact {
    id: Option<i64>,
    name: String,
    contact_value: String,
    owner_id: i64,
}

impl ContactService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn fetch_by_id(&self, id: i64) -> Result<ContactView, AppError> {
        self.store
            .find_contact(id)
            .await?
            .map(ContactView::from)
            .ok_or_else(|| contact_not_found(id))
    }

    pub async fn create(&self, input: ContactInput) -> Result<Confirmation, AppError> {
        let valid = validate(&input, WriteIntent::Create)?;

        let mut work = self.store.begin().await?;
        let saved = build_and_save(work.as_mut(), valid).await?;
        let id = saved
            .id
            .ok_or_else(|| AppError::InternalError("storage assigned no id to contact".to_string()))?;
        work.commit().await?;

        tracing::info!("Created contact {} for professional {}", id, saved.owner_id);
        Ok(Confirmation::new("Contact created successfully").with_id(id))
    }

    pub async fn update(&self, input: ContactInput) -> Result<Confirmation, AppError> {
        let valid = validate(&input, WriteIntent::Update)?;
        let id = require(valid.id, "Contact cannot be updated without an id")?;

        let mut work = self.store.begin().await?;
        work.find_contact(id)
            .await?
            .ok_or_else(|| contact_not_found(id))?;
        build_and_save(work.as_mut(), valid).await?;
        work.commit().await?;

        tracing::info!("Updated contact {}", id);
        Ok(Confirmation::new("Contact updated successfully"))
    }

    pub async fn delete(&self, id: i64) -> Result<Confirmation, AppError> {
        let mut work = self.store.begin().await?;
        work.find_contact(id)
            .await?
            .ok_or_else(|| contact_not_found(id))?;
        work.delete_contact(id).await?;
        work.commit().await?;

        tracing::info!("Deleted contact {}", id);
        Ok(Confirmation::new(format!(
            "Contact with id: {} deleted successfully",
            id
        )))
    }

    /// Searches by name when given, otherwise by contact value.
    pub async fn search(
        &self,
        name_pattern: Option<&str>,
        contact_pattern: Option<&str>,
    ) -> Result<Vec<ContactView>, AppError> {
        let contacts = match (name_pattern, contact_pattern) {
            (Some(name), _) => self.store.search_contacts_by_name(name).await?,
            (None, Some(value)) => self.store.search_contacts_by_value(value).await?,
            (None, None) => {
                return Err(AppError::InvalidInput(
                    "Name and contact value not provided".to_string(),
                ))
            }
        };

        Ok(contacts.into_iter().map(ContactView::from).collect())
    }
}

pub(crate) fn contact_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Contact with id: {} not found", id))
}

fn validate(input: &ContactInput, intent: WriteIntent) -> Result<ValidContact, AppError> {
    let id = check_id("Contact", input.id, intent)?;
    let name = require_text(input.name.as_deref(), "Contact has no name")?;
    let contact_value = require_text(input.contact_value.as_deref(), "Contact has no contact value")?;
    let owner_id = require(input.owner_id, "Contact has no professional id")?;

    Ok(ValidContact {
        id,
        name,
        contact_value,
        owner_id,
    })
}

/// Resolves the owner inside the unit of work and writes the contact.
async fn build_and_save(work: &mut dyn UnitOfWork, valid: ValidContact) -> Result<Contact, AppError> {
    let owner = work
        .find_professional(valid.owner_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Professional with id: {} not found",
                valid.owner_id
            ))
        })?;

    let contact = Contact::new(
        valid.id,
        valid.name,
        valid.contact_value,
        owner.id.unwrap_or(valid.owner_id),
    );
    work.save_contact(&contact).await
}
