//! In-process [`RecordStore`] used by the test suites and local experiments.
//!
//! A unit of work reads and writes a private copy of the data and records which
//! rows it touched. On commit only those rows are merged into the shared tables,
//! so overlapping units of work each publish their own records and an
//! uncommitted or failed operation leaves no trace. Ids come from shared
//! sequences and are never handed out twice. Every gateway call is counted,
//! which lets tests assert that nothing was written.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::AppError;
use crate::gateway::{RecordStore, UnitOfWork};
use crate::models::{Contact, Professional, Role};

#[derive(Debug, Clone, Default)]
struct Tables {
    /// Professionals are stored without contacts; contacts live in their own table.
    professionals: BTreeMap<i64, Professional>,
    contacts: BTreeMap<i64, Contact>,
    /// Listing position of each contact among its owner's contacts.
    positions: BTreeMap<i64, i64>,
}

impl Tables {
    fn professional_with_contacts(&self, id: i64) -> Option<Professional> {
        let professional = self.professionals.get(&id)?.clone();
        let mut contacts: Vec<Contact> = self
            .contacts
            .values()
            .filter(|contact| contact.owner_id == id)
            .cloned()
            .collect();
        contacts.sort_by_key(|contact| {
            let contact_id = contact.id.unwrap_or_default();
            (self.position_of(contact_id), contact_id)
        });
        Some(professional.with_contacts(contacts))
    }

    fn professionals_where(&self, keep: impl Fn(&Professional) -> bool) -> Vec<Professional> {
        self.professionals
            .values()
            .filter(|professional| keep(professional))
            .filter_map(|professional| professional.id)
            .filter_map(|id| self.professional_with_contacts(id))
            .collect()
    }

    fn contacts_where(&self, keep: impl Fn(&Contact) -> bool) -> Vec<Contact> {
        self.contacts
            .values()
            .filter(|contact| keep(contact))
            .cloned()
            .collect()
    }

    fn contact_ids_owned_by(&self, owner_id: i64) -> Vec<i64> {
        self.contacts
            .iter()
            .filter(|(_, contact)| contact.owner_id == owner_id)
            .map(|(id, _)| *id)
            .collect()
    }

    fn position_of(&self, contact_id: i64) -> i64 {
        self.positions.get(&contact_id).copied().unwrap_or_default()
    }

    /// Position after every contact currently listed for `owner_id`.
    fn next_position(&self, owner_id: i64) -> i64 {
        self.contact_ids_owned_by(owner_id)
            .into_iter()
            .map(|id| self.position_of(id) + 1)
            .max()
            .unwrap_or_default()
    }

    fn remove_contact(&mut self, id: i64) {
        self.contacts.remove(&id);
        self.positions.remove(&id);
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_uppercase().contains(&needle.to_uppercase())
}

/// Id sequences shared by every unit of work, like database sequences.
#[derive(Debug, Default)]
struct Sequences {
    professional: AtomicI64,
    contact: AtomicI64,
}

impl Sequences {
    fn next(sequence: &AtomicI64) -> i64 {
        sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Keeps the sequence ahead of an explicitly chosen id.
    fn observe(sequence: &AtomicI64, id: i64) {
        sequence.fetch_max(id, Ordering::SeqCst);
    }
}

/// Snapshot of how many times each gateway operation was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub professional_saves: usize,
    pub contact_saves: usize,
    pub professional_deletes: usize,
    pub contact_deletes: usize,
    pub contact_name_searches: usize,
    pub contact_value_searches: usize,
    pub commits: usize,
}

#[derive(Debug, Default)]
struct Counters {
    professional_saves: AtomicUsize,
    contact_saves: AtomicUsize,
    professional_deletes: AtomicUsize,
    contact_deletes: AtomicUsize,
    contact_name_searches: AtomicUsize,
    contact_value_searches: AtomicUsize,
    commits: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> CallCounts {
        CallCounts {
            professional_saves: self.professional_saves.load(Ordering::SeqCst),
            contact_saves: self.contact_saves.load(Ordering::SeqCst),
            professional_deletes: self.professional_deletes.load(Ordering::SeqCst),
            contact_deletes: self.contact_deletes.load(Ordering::SeqCst),
            contact_name_searches: self.contact_name_searches.load(Ordering::SeqCst),
            contact_value_searches: self.contact_value_searches.load(Ordering::SeqCst),
            commits: self.commits.load(Ordering::SeqCst),
        }
    }
}

fn lock_tables(tables: &Mutex<Tables>) -> Result<MutexGuard<'_, Tables>, AppError> {
    tables
        .lock()
        .map_err(|_| AppError::InternalError("memory store lock poisoned".to_string()))
}

/// Shared in-memory store. Clones share the same data, sequences and counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    sequences: Arc<Sequences>,
    counters: Arc<Counters>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> CallCounts {
        self.counters.snapshot()
    }

    pub fn professional_count(&self) -> Result<usize, AppError> {
        Ok(self.lock()?.professionals.len())
    }

    pub fn contact_count(&self) -> Result<usize, AppError> {
        Ok(self.lock()?.contacts.len())
    }

    /// Inserts records directly, bypassing validation and counters.
    ///
    /// Ids are assigned when absent; contacts keep the order they are given in.
    /// The seeded professional is returned with its contacts as stored.
    pub fn seed(&self, professional: Professional) -> Result<Professional, AppError> {
        let id = self.assign(&self.sequences.professional, professional.id);
        let contacts = professional.contacts.clone();
        let row = Professional {
            id: Some(id),
            contacts: Vec::new(),
            ..professional
        };

        let mut tables = self.lock()?;
        tables.professionals.insert(id, row);

        for contact in contacts {
            let contact_id = self.assign(&self.sequences.contact, contact.id);
            let position = tables.next_position(id);
            tables.contacts.insert(
                contact_id,
                Contact {
                    id: Some(contact_id),
                    owner_id: id,
                    ..contact
                },
            );
            tables.positions.insert(contact_id, position);
        }

        tables
            .professional_with_contacts(id)
            .ok_or_else(|| AppError::InternalError(format!("seeded professional {} vanished", id)))
    }

    fn assign(&self, sequence: &AtomicI64, id: Option<i64>) -> i64 {
        match id {
            Some(id) => {
                Sequences::observe(sequence, id);
                id
            }
            None => Sequences::next(sequence),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        lock_tables(&self.tables)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let staged = self.lock()?.clone();
        Ok(Box::new(MemoryUnitOfWork {
            staged,
            touched_professionals: BTreeSet::new(),
            touched_contacts: BTreeSet::new(),
            tables: Arc::clone(&self.tables),
            sequences: Arc::clone(&self.sequences),
            counters: Arc::clone(&self.counters),
        }))
    }

    async fn find_professional(&self, id: i64) -> Result<Option<Professional>, AppError> {
        Ok(self.lock()?.professional_with_contacts(id))
    }

    async fn find_contact(&self, id: i64) -> Result<Option<Contact>, AppError> {
        Ok(self.lock()?.contacts.get(&id).cloned())
    }

    async fn search_professionals_by_name(
        &self,
        pattern: &str,
    ) -> Result<Vec<Professional>, AppError> {
        Ok(self
            .lock()?
            .professionals_where(|professional| contains_ignore_case(&professional.name, pattern)))
    }

    async fn search_professionals_by_role(
        &self,
        role: Role,
    ) -> Result<Vec<Professional>, AppError> {
        Ok(self
            .lock()?
            .professionals_where(|professional| professional.role == role))
    }

    async fn search_contacts_by_name(&self, pattern: &str) -> Result<Vec<Contact>, AppError> {
        Counters::bump(&self.counters.contact_name_searches);
        Ok(self
            .lock()?
            .contacts_where(|contact| contains_ignore_case(&contact.name, pattern)))
    }

    async fn search_contacts_by_value(&self, pattern: &str) -> Result<Vec<Contact>, AppError> {
        Counters::bump(&self.counters.contact_value_searches);
        Ok(self
            .lock()?
            .contacts_where(|contact| contains_ignore_case(&contact.contact_value, pattern)))
    }
}

/// Unit of work over a private copy of the tables.
pub struct MemoryUnitOfWork {
    staged: Tables,
    touched_professionals: BTreeSet<i64>,
    touched_contacts: BTreeSet<i64>,
    tables: Arc<Mutex<Tables>>,
    sequences: Arc<Sequences>,
    counters: Arc<Counters>,
}

impl MemoryUnitOfWork {
    fn drop_contact(&mut self, id: i64) {
        self.staged.remove_contact(id);
        self.touched_contacts.insert(id);
    }

    /// Applies the touched rows of this unit of work on top of `live`.
    fn merge_into(&self, live: &mut Tables) -> Result<(), AppError> {
        for id in &self.touched_professionals {
            match self.staged.professionals.get(id) {
                Some(professional) => {
                    live.professionals.insert(*id, professional.clone());
                }
                None => {
                    live.professionals.remove(id);
                }
            }
        }

        for id in &self.touched_contacts {
            match self.staged.contacts.get(id) {
                Some(contact) => {
                    if !live.professionals.contains_key(&contact.owner_id) {
                        return Err(AppError::InternalError(format!(
                            "contact {} references missing professional {}",
                            id, contact.owner_id
                        )));
                    }
                    live.contacts.insert(*id, contact.clone());
                    live.positions.insert(*id, self.staged.position_of(*id));
                }
                None => live.remove_contact(*id),
            }
        }

        // Contacts committed elsewhere for a professional deleted here go with it.
        let orphans: Vec<i64> = live
            .contacts
            .iter()
            .filter(|(_, contact)| !live.professionals.contains_key(&contact.owner_id))
            .map(|(id, _)| *id)
            .collect();
        for id in orphans {
            live.remove_contact(id);
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_professional(&mut self, id: i64) -> Result<Option<Professional>, AppError> {
        Ok(self.staged.professionals.get(&id).cloned())
    }

    async fn find_contact(&mut self, id: i64) -> Result<Option<Contact>, AppError> {
        Ok(self.staged.contacts.get(&id).cloned())
    }

    async fn save_professional(
        &mut self,
        professional: &Professional,
    ) -> Result<Professional, AppError> {
        Counters::bump(&self.counters.professional_saves);
        let id = match professional.id {
            Some(id) if self.staged.professionals.contains_key(&id) => id,
            Some(id) => {
                return Err(AppError::NotFound(format!(
                    "Professional with id: {} not found",
                    id
                )))
            }
            None => Sequences::next(&self.sequences.professional),
        };

        let saved = Professional {
            id: Some(id),
            contacts: Vec::new(),
            ..professional.clone()
        };
        self.staged.professionals.insert(id, saved.clone());
        self.touched_professionals.insert(id);
        Ok(saved)
    }

    async fn save_contact(&mut self, contact: &Contact) -> Result<Contact, AppError> {
        Counters::bump(&self.counters.contact_saves);
        if !self.staged.professionals.contains_key(&contact.owner_id) {
            return Err(AppError::InternalError(format!(
                "contact references missing professional {}",
                contact.owner_id
            )));
        }

        let (id, previous_owner) = match contact.id {
            Some(id) => match self.staged.contacts.get(&id) {
                Some(stored) => (id, Some(stored.owner_id)),
                None => {
                    return Err(AppError::NotFound(format!("Contact with id: {} not found", id)))
                }
            },
            None => (Sequences::next(&self.sequences.contact), None),
        };

        let position = if previous_owner == Some(contact.owner_id) {
            self.staged.position_of(id)
        } else {
            self.staged.next_position(contact.owner_id)
        };

        let saved = Contact {
            id: Some(id),
            ..contact.clone()
        };
        self.staged.contacts.insert(id, saved.clone());
        self.staged.positions.insert(id, position);
        self.touched_contacts.insert(id);
        Ok(saved)
    }

    async fn arrange_contacts(&mut self, owner_id: i64, ordered: &[i64]) -> Result<(), AppError> {
        for (position, id) in ordered.iter().enumerate() {
            let owned = self
                .staged
                .contacts
                .get(id)
                .is_some_and(|contact| contact.owner_id == owner_id);
            if owned {
                self.staged.positions.insert(*id, position as i64);
                self.touched_contacts.insert(*id);
            }
        }
        Ok(())
    }

    async fn delete_professional(&mut self, id: i64) -> Result<(), AppError> {
        Counters::bump(&self.counters.professional_deletes);
        for contact_id in self.staged.contact_ids_owned_by(id) {
            self.drop_contact(contact_id);
        }
        self.staged.professionals.remove(&id);
        self.touched_professionals.insert(id);
        Ok(())
    }

    async fn delete_contact(&mut self, id: i64) -> Result<(), AppError> {
        Counters::bump(&self.counters.contact_deletes);
        self.drop_contact(id);
        Ok(())
    }

    async fn delete_contacts_except(
        &mut self,
        owner_id: i64,
        keep: &[i64],
    ) -> Result<u64, AppError> {
        let doomed: Vec<i64> = self
            .staged
            .contact_ids_owned_by(owner_id)
            .into_iter()
            .filter(|id| !keep.contains(id))
            .collect();
        for id in &doomed {
            self.drop_contact(*id);
        }
        Ok(doomed.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let mut tables = lock_tables(&self.tables)?;
        let mut merged = tables.clone();
        self.merge_into(&mut merged)?;
        *tables = merged;
        Counters::bump(&self.counters.commits);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn professional(name: &str, role: Role) -> Professional {
        Professional::new(
            None,
            name,
            role,
            NaiveDate::from_ymd_opt(1990, 3, 20).unwrap(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_uncommitted_work_is_discarded() {
        let store = MemoryStore::new();
        {
            let mut work = store.begin().await.unwrap();
            work.save_professional(&professional("dental", Role::Developer))
                .await
                .unwrap();
        }

        assert_eq!(store.professional_count().unwrap(), 0);
        assert_eq!(store.calls().professional_saves, 1);
        assert_eq!(store.calls().commits, 0);
    }

    #[tokio::test]
    async fn test_commit_assigns_ids() {
        let store = MemoryStore::new();
        let mut work = store.begin().await.unwrap();
        let saved = work
            .save_professional(&professional("dental", Role::Developer))
            .await
            .unwrap();
        let owner_id = saved.id.unwrap();
        let contact = work
            .save_contact(&Contact::new(None, "simples", "contato", owner_id))
            .await
            .unwrap();
        work.commit().await.unwrap();

        assert_eq!(contact.id, Some(1));
        let found = store.find_professional(owner_id).await.unwrap().unwrap();
        assert_eq!(found.contacts, vec![contact]);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let store = MemoryStore::new();
        store.seed(professional("Dental Care", Role::Designer)).unwrap();
        store.seed(professional("Orthodontics", Role::Tester)).unwrap();

        let found = store.search_professionals_by_name("dENT").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Dental Care");

        let testers = store.search_professionals_by_role(Role::Tester).await.unwrap();
        assert_eq!(testers.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_contacts_except() {
        let store = MemoryStore::new();
        let seeded = store
            .seed(professional("dental", Role::Support).with_contacts(vec![
                Contact::new(None, "a", "1", 0),
                Contact::new(None, "b", "2", 0),
                Contact::new(None, "c", "3", 0),
            ]))
            .unwrap();
        let owner_id = seeded.id.unwrap();

        let mut work = store.begin().await.unwrap();
        let removed = work.delete_contacts_except(owner_id, &[2]).await.unwrap();
        work.commit().await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.contact_count().unwrap(), 1);
        assert!(store.find_contact(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overlapping_units_of_work_keep_both_writes() {
        let store = MemoryStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        let a = first
            .save_professional(&professional("first", Role::Developer))
            .await
            .unwrap();
        let b = second
            .save_professional(&professional("second", Role::Tester))
            .await
            .unwrap();
        first.commit().await.unwrap();
        second.commit().await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.professional_count().unwrap(), 2);
        assert_eq!(store.find_professional(a.id.unwrap()).await.unwrap().unwrap().name, "first");
        assert_eq!(store.find_professional(b.id.unwrap()).await.unwrap().unwrap().name, "second");
    }

    #[tokio::test]
    async fn test_later_commit_only_overwrites_rows_it_touched() {
        let store = MemoryStore::new();
        let seeded = store
            .seed(professional("dental", Role::Support).with_contacts(vec![
                Contact::new(None, "a", "1", 0),
                Contact::new(None, "b", "2", 0),
            ]))
            .unwrap();
        let owner_id = seeded.id.unwrap();

        let mut renamer = store.begin().await.unwrap();
        let mut remover = store.begin().await.unwrap();
        renamer
            .save_contact(&Contact::new(Some(1), "renamed", "1", owner_id))
            .await
            .unwrap();
        remover.delete_contact(2).await.unwrap();
        remover.commit().await.unwrap();
        renamer.commit().await.unwrap();

        let found = store.find_professional(owner_id).await.unwrap().unwrap();
        assert_eq!(found.contacts, vec![Contact::new(Some(1), "renamed", "1", owner_id)]);
    }

    #[tokio::test]
    async fn test_contacts_follow_arranged_order() {
        let store = MemoryStore::new();
        let seeded = store
            .seed(professional("dental", Role::Designer).with_contacts(vec![
                Contact::new(None, "a", "1", 0),
                Contact::new(None, "b", "2", 0),
            ]))
            .unwrap();
        let owner_id = seeded.id.unwrap();

        let mut work = store.begin().await.unwrap();
        let added = work
            .save_contact(&Contact::new(None, "c", "3", owner_id))
            .await
            .unwrap();
        let added_id = added.id.unwrap();
        work.arrange_contacts(owner_id, &[added_id, 2, 1]).await.unwrap();
        work.commit().await.unwrap();

        let names: Vec<String> = store
            .find_professional(owner_id)
            .await
            .unwrap()
            .unwrap()
            .contacts
            .into_iter()
            .map(|contact| contact.name)
            .collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }
}
