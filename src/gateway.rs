//! Persistence gateway consumed by the services.
//!
//! Reads that need no consistency with a write go through [`RecordStore`]
//! directly. Every mutating operation opens a [`UnitOfWork`]; its effects become
//! visible only on [`UnitOfWork::commit`], and dropping it uncommitted discards
//! them.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Contact, Professional, Role};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Opens a transaction spanning professional and contact writes.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;

    /// Professional with its contacts loaded in listing order.
    async fn find_professional(&self, id: i64) -> Result<Option<Professional>, AppError>;

    async fn find_contact(&self, id: i64) -> Result<Option<Contact>, AppError>;

    /// Case-insensitive substring match on the professional name.
    async fn search_professionals_by_name(
        &self,
        pattern: &str,
    ) -> Result<Vec<Professional>, AppError>;

    async fn search_professionals_by_role(&self, role: Role)
        -> Result<Vec<Professional>, AppError>;

    /// Case-insensitive substring match on the contact name.
    async fn search_contacts_by_name(&self, pattern: &str) -> Result<Vec<Contact>, AppError>;

    /// Case-insensitive substring match on the contact value.
    async fn search_contacts_by_value(&self, pattern: &str) -> Result<Vec<Contact>, AppError>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    /// Professional row only; `contacts` is left empty.
    async fn find_professional(&mut self, id: i64) -> Result<Option<Professional>, AppError>;

    async fn find_contact(&mut self, id: i64) -> Result<Option<Contact>, AppError>;

    /// Inserts when `id` is `None`, otherwise replaces the stored row.
    ///
    /// Returns the saved professional with its id assigned. Contacts are not
    /// written by this call.
    async fn save_professional(&mut self, professional: &Professional)
        -> Result<Professional, AppError>;

    /// Inserts when `id` is `None`, otherwise replaces the stored row.
    ///
    /// A contact that is new to its owner is placed after the owner's other
    /// contacts; a replaced contact with the same owner keeps its place.
    async fn save_contact(&mut self, contact: &Contact) -> Result<Contact, AppError>;

    /// Stores `ordered` as the listing order of `owner_id`'s contacts.
    async fn arrange_contacts(&mut self, owner_id: i64, ordered: &[i64]) -> Result<(), AppError>;

    /// Deletes the professional and every contact it owns.
    async fn delete_professional(&mut self, id: i64) -> Result<(), AppError>;

    async fn delete_contact(&mut self, id: i64) -> Result<(), AppError>;

    /// Deletes contacts owned by `owner_id` whose id is not in `keep`.
    ///
    /// Returns the number of removed contacts.
    async fn delete_contacts_except(&mut self, owner_id: i64, keep: &[i64])
        -> Result<u64, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
