//! Professional reconciliation.
//!
//! A professional is written together with its contact list inside one unit of
//! work. The list is a full replacement: each listed contact is inserted or
//! overwritten in place and bound to the professional, and on update any stored
//! contact that is no longer listed is removed. Contacts are read back in the
//! order the request listed them.

use crate::contact_service::contact_not_found;
use crate::errors::AppError;
use crate::gateway::{RecordStore, UnitOfWork};
use crate::models::{
    Confirmation, Contact, ContactInput, Professional, ProfessionalInput, ProfessionalView, Role,
};
use crate::validation::{check_id, require, require_text, WriteIntent};
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;

pub struct ProfessionalService {
    store: Arc<dyn RecordStore>,
}

/// Professional request that passed local validation.
struct ValidProfessional {
    id: Option<i64>,
    name: String,
    role: Role,
    birth_date: NaiveDate,
    contacts: Vec<NestedContact>,
}

/// Nested contact description that passed local validation.
struct NestedContact {
    id: Option<i64>,
    name: String,
    contact_value: String,
}

impl ProfessionalService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn fetch_by_id(&self, id: i64) -> Result<ProfessionalView, AppError> {
        self.store
            .find_professional(id)
            .await?
            .map(ProfessionalView::from)
            .ok_or_else(|| professional_not_found(id))
    }

    /// Creates the professional, then writes its contacts against the new id.
    pub async fn create(&self, input: ProfessionalInput) -> Result<Confirmation, AppError> {
        let valid = validate(&input, WriteIntent::Create)?;

        let mut work = self.store.begin().await?;
        ensure_contacts_exist(work.as_mut(), &valid.contacts).await?;

        let professional =
            Professional::new(None, valid.name, valid.role, valid.birth_date, Utc::now());
        let saved = work.save_professional(&professional).await?;
        let id = saved.id.ok_or_else(|| {
            AppError::InternalError("storage assigned no id to professional".to_string())
        })?;
        let contacts = upsert_contacts(work.as_mut(), id, valid.contacts).await?;
        let listed = contact_ids(&contacts);
        work.arrange_contacts(id, &listed).await?;
        work.commit().await?;

        tracing::info!(
            "Created professional {} with {} contact(s)",
            id,
            contacts.len()
        );
        Ok(Confirmation::new("Professional created successfully").with_id(id))
    }

    /// Replaces the professional and its contact list, keeping `created_at`.
    pub async fn update(&self, input: ProfessionalInput) -> Result<Confirmation, AppError> {
        let valid = validate(&input, WriteIntent::Update)?;
        let id = require(valid.id, "Professional cannot be updated without an id")?;

        let mut work = self.store.begin().await?;
        let existing = work
            .find_professional(id)
            .await?
            .ok_or_else(|| professional_not_found(id))?;
        ensure_contacts_exist(work.as_mut(), &valid.contacts).await?;

        let replacement = Professional::new(
            Some(id),
            valid.name,
            valid.role,
            valid.birth_date,
            existing.created_at,
        );
        let contacts = upsert_contacts(work.as_mut(), id, valid.contacts).await?;
        let kept = contact_ids(&contacts);
        let removed = work.delete_contacts_except(id, &kept).await?;
        work.arrange_contacts(id, &kept).await?;

        let replacement = replacement.with_contacts(contacts);
        work.save_professional(&replacement).await?;
        work.commit().await?;

        tracing::info!(
            "Updated professional {}: {} contact(s) kept, {} removed",
            id,
            kept.len(),
            removed
        );
        Ok(Confirmation::new("Professional updated successfully"))
    }

    /// Deletes the professional and every contact it owns.
    pub async fn delete(&self, id: i64) -> Result<Confirmation, AppError> {
        let mut work = self.store.begin().await?;
        work.find_professional(id)
            .await?
            .ok_or_else(|| professional_not_found(id))?;
        work.delete_professional(id).await?;
        work.commit().await?;

        tracing::info!("Deleted professional {}", id);
        Ok(Confirmation::new(format!(
            "Professional with id: {} deleted successfully",
            id
        )))
    }

    pub async fn search(&self, name_pattern: &str) -> Result<Vec<ProfessionalView>, AppError> {
        let found = self.store.search_professionals_by_name(name_pattern).await?;
        Ok(found.into_iter().map(ProfessionalView::from).collect())
    }

    pub async fn search_by_role(&self, role: Role) -> Result<Vec<ProfessionalView>, AppError> {
        let found = self.store.search_professionals_by_role(role).await?;
        Ok(found.into_iter().map(ProfessionalView::from).collect())
    }
}

fn professional_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Professional with id: {} not found", id))
}

fn validate(input: &ProfessionalInput, intent: WriteIntent) -> Result<ValidProfessional, AppError> {
    let id = check_id("Professional", input.id, intent)?;
    let name = require_text(input.name.as_deref(), "Professional has no name")?;
    let birth_date = require(input.birth_date, "Professional has no birth date")?;
    let role = require(input.role, "Professional has no role")?;

    let nested = input.contacts.as_deref().unwrap_or_default();
    let mut seen = HashSet::new();
    let mut contacts = Vec::with_capacity(nested.len());
    for (position, contact) in nested.iter().enumerate() {
        contacts.push(validate_nested(position + 1, contact, &mut seen)?);
    }

    Ok(ValidProfessional {
        id,
        name,
        role,
        birth_date,
        contacts,
    })
}

fn validate_nested(
    position: usize,
    contact: &ContactInput,
    seen: &mut HashSet<i64>,
) -> Result<NestedContact, AppError> {
    if let Some(id) = contact.id {
        if !seen.insert(id) {
            return Err(AppError::InvalidInput(format!(
                "Contact with id: {} is listed more than once",
                id
            )));
        }
    }

    let name = require_text(
        contact.name.as_deref(),
        &format!("Contact at position {} has no name", position),
    )?;
    let contact_value = require_text(
        contact.contact_value.as_deref(),
        &format!("Contact at position {} has no contact value", position),
    )?;

    Ok(NestedContact {
        id: contact.id,
        name,
        contact_value,
    })
}

/// Every listed contact id must already exist; checked before the first write.
async fn ensure_contacts_exist(
    work: &mut dyn UnitOfWork,
    contacts: &[NestedContact],
) -> Result<(), AppError> {
    for id in contacts.iter().filter_map(|contact| contact.id) {
        if work.find_contact(id).await?.is_none() {
            return Err(contact_not_found(id));
        }
    }
    Ok(())
}

fn contact_ids(contacts: &[Contact]) -> Vec<i64> {
    contacts.iter().filter_map(|contact| contact.id).collect()
}

/// Writes each listed contact bound to `owner_id`, in request order.
async fn upsert_contacts(
    work: &mut dyn UnitOfWork,
    owner_id: i64,
    contacts: Vec<NestedContact>,
) -> Result<Vec<Contact>, AppError> {
    let mut saved = Vec::with_capacity(contacts.len());
    for nested in contacts {
        let contact = Contact::new(nested.id, nested.name, nested.contact_value, owner_id);
        saved.push(work.save_contact(&contact).await?);
    }
    Ok(saved)
}
