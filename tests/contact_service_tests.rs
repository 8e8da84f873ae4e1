/// Contact service behaviour against the in-memory gateway
/// Covers id rules, required fields, owner resolution and search routing
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use professional_registry::contact_service::ContactService;
use professional_registry::errors::AppError;
use professional_registry::gateway::{RecordStore, UnitOfWork};
use professional_registry::memory_store::MemoryStore;
use professional_registry::models::{Contact, ContactInput, Professional, Role};
use std::sync::Arc;

fn setup() -> (MemoryStore, ContactService) {
    let store = MemoryStore::new();
    let service = ContactService::new(Arc::new(store.clone()));
    (store, service)
}

fn seed_professional(store: &MemoryStore, contacts: Vec<Contact>) -> Professional {
    store
        .seed(
            Professional::new(
                None,
                "dental",
                Role::Developer,
                NaiveDate::from_ymd_opt(1990, 3, 20).unwrap(),
                Utc::now(),
            )
            .with_contacts(contacts),
        )
        .unwrap()
}

fn contact_input(id: Option<i64>, owner_id: Option<i64>) -> ContactInput {
    ContactInput {
        id,
        name: Some("simples".to_string()),
        contact_value: Some("contato".to_string()),
        owner_id,
    }
}

#[tokio::test]
async fn test_fetch_contact_by_id() {
    let (store, service) = setup();
    let owner = seed_professional(&store, vec![Contact::new(None, "simples", "contato", 0)]);

    let view = service.fetch_by_id(1).await.unwrap();

    assert_eq!(view.id, Some(1));
    assert_eq!(view.name, "simples");
    assert_eq!(view.contact_value, "contato");
    assert_eq!(Some(view.owner_id), owner.id);
}

#[tokio::test]
async fn test_fetch_missing_contact_is_not_found() {
    let (_store, service) = setup();

    let err = service.fetch_by_id(1).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Not found: Contact with id: 1 not found");
}

#[tokio::test]
async fn test_delete_contact() {
    let (store, service) = setup();
    seed_professional(&store, vec![Contact::new(None, "simples", "contato", 0)]);

    let confirmation = service.delete(1).await.unwrap();

    assert_eq!(confirmation.message, "Contact with id: 1 deleted successfully");
    assert_eq!(store.contact_count().unwrap(), 0);
    assert_eq!(store.calls().contact_deletes, 1);
}

#[tokio::test]
async fn test_delete_missing_contact_is_not_found() {
    let (store, service) = setup();

    let err = service.delete(5).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(store.calls().contact_deletes, 0);
}

#[tokio::test]
async fn test_create_with_id_is_rejected() {
    let (store, service) = setup();
    seed_professional(&store, vec![]);

    let err = service.create(contact_input(Some(1), Some(1))).await.unwrap_err();

    assert!(err.is_invalid_input());
    assert_eq!(store.calls().contact_saves, 0);
}

#[tokio::test]
async fn test_create_without_name_is_rejected() {
    let (store, service) = setup();
    seed_professional(&store, vec![]);

    for name in [None, Some(String::new()), Some("   ".to_string())] {
        let input = ContactInput {
            name,
            ..contact_input(None, Some(1))
        };
        let err = service.create(input).await.unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(err.to_string(), "Invalid input: Contact has no name");
    }

    assert_eq!(store.calls().contact_saves, 0);
}

#[tokio::test]
async fn test_create_without_contact_value_is_rejected() {
    let (store, service) = setup();
    seed_professional(&store, vec![]);

    let input = ContactInput {
        contact_value: None,
        ..contact_input(None, Some(1))
    };
    let err = service.create(input).await.unwrap_err();

    assert!(err.is_invalid_input());
    assert_eq!(err.to_string(), "Invalid input: Contact has no contact value");
    assert_eq!(store.calls().contact_saves, 0);
}

#[tokio::test]
async fn test_create_without_owner_is_rejected() {
    let (store, service) = setup();

    let err = service.create(contact_input(None, None)).await.unwrap_err();

    assert!(err.is_invalid_input());
    assert_eq!(store.calls().contact_saves, 0);
}

#[tokio::test]
async fn test_create_with_unknown_owner_is_not_found() {
    let (store, service) = setup();

    let err = service.create(contact_input(None, Some(2))).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Not found: Professional with id: 2 not found");
    assert_eq!(store.calls().contact_saves, 0);
    assert_eq!(store.contact_count().unwrap(), 0);
}

#[tokio::test]
async fn test_create_contact() {
    let (store, service) = setup();
    let owner = seed_professional(&store, vec![]);
    let owner_id = owner.id.unwrap();

    let confirmation = service.create(contact_input(None, Some(owner_id))).await.unwrap();

    assert_eq!(confirmation.message, "Contact created successfully");
    assert_eq!(confirmation.id, Some(1));
    assert_eq!(store.calls().contact_saves, 1);

    let stored = stored_contact(&store, 1).await;
    assert_eq!(stored, Contact::new(Some(1), "simples", "contato", owner_id));
}

#[tokio::test]
async fn test_update_without_id_is_rejected() {
    let (store, service) = setup();
    seed_professional(&store, vec![]);

    let err = service.update(contact_input(None, Some(1))).await.unwrap_err();

    assert!(err.is_invalid_input());
    assert_eq!(
        err.to_string(),
        "Invalid input: Contact cannot be updated without an id"
    );
    assert_eq!(store.calls().contact_saves, 0);
}

#[tokio::test]
async fn test_update_missing_contact_is_not_found() {
    let (store, service) = setup();
    seed_professional(&store, vec![]);

    let err = service.update(contact_input(Some(9), Some(1))).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(store.calls().contact_saves, 0);
}

#[tokio::test]
async fn test_update_contact_overwrites_fields() {
    let (store, service) = setup();
    seed_professional(&store, vec![Contact::new(None, "old", "old-value", 0)]);

    let input = ContactInput {
        id: Some(1),
        name: Some("simples".to_string()),
        contact_value: Some("contato".to_string()),
        owner_id: Some(1),
    };
    let confirmation = service.update(input).await.unwrap();

    assert_eq!(confirmation.message, "Contact updated successfully");
    assert_eq!(
        stored_contact(&store, 1).await,
        Contact::new(Some(1), "simples", "contato", 1)
    );
    assert_eq!(store.contact_count().unwrap(), 1);
}

#[tokio::test]
async fn test_update_can_move_contact_to_another_owner() {
    let (store, service) = setup();
    seed_professional(&store, vec![Contact::new(None, "simples", "contato", 0)]);
    let other = seed_professional(&store, vec![]);
    let other_id = other.id.unwrap();

    service
        .update(contact_input(Some(1), Some(other_id)))
        .await
        .unwrap();

    assert_eq!(stored_contact(&store, 1).await.owner_id, other_id);
}

#[tokio::test]
async fn test_update_with_unknown_owner_leaves_contact_untouched() {
    let (store, service) = setup();
    seed_professional(&store, vec![Contact::new(None, "simples", "contato", 0)]);

    let input = ContactInput {
        name: Some("changed".to_string()),
        ..contact_input(Some(1), Some(42))
    };
    let err = service.update(input).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(stored_contact(&store, 1).await.name, "simples");
}

#[tokio::test]
async fn test_search_by_name_uses_only_name_predicate() {
    let (store, service) = setup();
    seed_professional(
        &store,
        vec![
            Contact::new(None, "simples", "contato", 0),
            Contact::new(None, "Simples Dental", "outro", 0),
            Contact::new(None, "office", "simples@example.com", 0),
        ],
    );

    let found = service.search(Some("SIMP"), None).await.unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(store.calls().contact_name_searches, 1);
    assert_eq!(store.calls().contact_value_searches, 0);
}

#[tokio::test]
async fn test_search_by_contact_value_uses_only_value_predicate() {
    let (store, service) = setup();
    seed_professional(
        &store,
        vec![
            Contact::new(None, "simples", "contato", 0),
            Contact::new(None, "office", "CONTATO@example.com", 0),
            Contact::new(None, "home", "555-0100", 0),
        ],
    );

    let found = service.search(None, Some("contato")).await.unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(store.calls().contact_name_searches, 0);
    assert_eq!(store.calls().contact_value_searches, 1);
}

#[tokio::test]
async fn test_search_prefers_name_when_both_given() {
    let (store, service) = setup();
    seed_professional(
        &store,
        vec![
            Contact::new(None, "simples", "555-0100", 0),
            Contact::new(None, "home", "contato", 0),
        ],
    );

    let found = service.search(Some("simples"), Some("contato")).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "simples");
    assert_eq!(store.calls().contact_value_searches, 0);
}

#[tokio::test]
async fn test_search_without_predicates_is_rejected() {
    let (store, service) = setup();

    let err = service.search(None, None).await.unwrap_err();

    assert!(err.is_invalid_input());
    assert_eq!(err.to_string(), "Invalid input: Name and contact value not provided");
    assert_eq!(store.calls().contact_name_searches, 0);
    assert_eq!(store.calls().contact_value_searches, 0);
}

async fn stored_contact(store: &MemoryStore, id: i64) -> Contact {
    store.find_contact(id).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_created_contact_is_listed_after_existing_ones() {
    let (store, service) = setup();
    let owner = seed_professional(
        &store,
        vec![
            Contact::new(None, "b", "2", 0),
            Contact::new(None, "a", "1", 0),
        ],
    );
    let owner_id = owner.id.unwrap();

    service.create(contact_input(None, Some(owner_id))).await.unwrap();

    let names: Vec<String> = store
        .find_professional(owner_id)
        .await
        .unwrap()
        .unwrap()
        .contacts
        .into_iter()
        .map(|contact| contact.name)
        .collect();
    assert_eq!(names, vec!["b", "a", "simples"]);
}

#[tokio::test]
async fn test_create_fails_when_storage_assigns_no_id() {
    let store = MemoryStore::new();
    let owner = seed_professional(&store, vec![]);
    let service = ContactService::new(Arc::new(IdlessStore(store.clone())));

    let err = service
        .create(contact_input(None, owner.id))
        .await
        .unwrap_err();

    assert!(matches!(err.root(), AppError::InternalError(_)));
    assert_eq!(store.contact_count().unwrap(), 0);
    assert_eq!(store.calls().commits, 0);
}

/// Gateway whose saved contacts come back without an id.
struct IdlessStore(MemoryStore);

struct IdlessUnitOfWork(Box<dyn UnitOfWork>);

#[async_trait]
impl RecordStore for IdlessStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        Ok(Box::new(IdlessUnitOfWork(self.0.begin().await?)))
    }

    async fn find_professional(&self, id: i64) -> Result<Option<Professional>, AppError> {
        self.0.find_professional(id).await
    }

    async fn find_contact(&self, id: i64) -> Result<Option<Contact>, AppError> {
        self.0.find_contact(id).await
    }

    async fn search_professionals_by_name(
        &self,
        pattern: &str,
    ) -> Result<Vec<Professional>, AppError> {
        self.0.search_professionals_by_name(pattern).await
    }

    async fn search_professionals_by_role(
        &self,
        role: Role,
    ) -> Result<Vec<Professional>, AppError> {
        self.0.search_professionals_by_role(role).await
    }

    async fn search_contacts_by_name(&self, pattern: &str) -> Result<Vec<Contact>, AppError> {
        self.0.search_contacts_by_name(pattern).await
    }

    async fn search_contacts_by_value(&self, pattern: &str) -> Result<Vec<Contact>, AppError> {
        self.0.search_contacts_by_value(pattern).await
    }
}

#[async_trait]
impl UnitOfWork for IdlessUnitOfWork {
    async fn find_professional(&mut self, id: i64) -> Result<Option<Professional>, AppError> {
        self.0.find_professional(id).await
    }

    async fn find_contact(&mut self, id: i64) -> Result<Option<Contact>, AppError> {
        self.0.find_contact(id).await
    }

    async fn save_professional(
        &mut self,
        professional: &Professional,
    ) -> Result<Professional, AppError> {
        self.0.save_professional(professional).await
    }

    async fn save_contact(&mut self, contact: &Contact) -> Result<Contact, AppError> {
        let saved = self.0.save_contact(contact).await?;
        Ok(Contact { id: None, ..saved })
    }

    async fn arrange_contacts(&mut self, owner_id: i64, ordered: &[i64]) -> Result<(), AppError> {
        self.0.arrange_contacts(owner_id, ordered).await
    }

    async fn delete_professional(&mut self, id: i64) -> Result<(), AppError> {
        self.0.delete_professional(id).await
    }

    async fn delete_contact(&mut self, id: i64) -> Result<(), AppError> {
        self.0.delete_contact(id).await
    }

    async fn delete_contacts_except(
        &mut self,
        owner_id: i64,
        keep: &[i64],
    ) -> Result<u64, AppError> {
        self.0.delete_contacts_except(owner_id, keep).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let inner = (*self).0;
        inner.commit().await
    }
}
