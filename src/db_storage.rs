use crate::errors::{AppError, ResultExt};
use crate::gateway::{RecordStore, UnitOfWork};
use crate::models::{Contact, Professional, Role};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use std::collections::HashMap;

/// Row of the `professional` table.
#[derive(Debug, FromRow)]
struct ProfessionalRow {
    id: i64,
    name: String,
    role: String,
    birth_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl ProfessionalRow {
    fn into_professional(self) -> Result<Professional, AppError> {
        let role = self.role.parse::<Role>().map_err(|e| {
            AppError::InternalError(format!("professional {} has {}", self.id, e))
        })?;
        Ok(Professional::new(
            Some(self.id),
            self.name,
            role,
            self.birth_date,
            self.created_at,
        ))
    }
}

/// Row of the `contact` table.
#[derive(Debug, FromRow)]
struct ContactRow {
    id: i64,
    name: String,
    contact_value: String,
    professional_id: i64,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact::new(Some(row.id), row.name, row.contact_value, row.professional_id)
    }
}

/// Postgres-backed persistence for professionals and contacts.
///
/// Queries are checked at runtime; the expected schema lives in `schema.sql`.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_contacts(
        &self,
        rows: Vec<ProfessionalRow>,
    ) -> Result<Vec<Professional>, AppError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("acquiring connection")?;
        attach_contacts(&mut conn, rows).await
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await.context("opening transaction")?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn find_professional(&self, id: i64) -> Result<Option<Professional>, AppError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("acquiring connection")?;
        let Some(row) = select_professional(&mut conn, id).await? else {
            return Ok(None);
        };
        Ok(attach_contacts(&mut conn, vec![row]).await?.pop())
    }

    async fn find_contact(&self, id: i64) -> Result<Option<Contact>, AppError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("acquiring connection")?;
        select_contact(&mut conn, id).await
    }

    async fn search_professionals_by_name(
        &self,
        pattern: &str,
    ) -> Result<Vec<Professional>, AppError> {
        let rows = sqlx::query_as::<_, ProfessionalRow>(
            r#"
            SELECT id, name, role, birth_date, created_at
            FROM professional
            WHERE strpos(upper(name), upper($1)) > 0
            ORDER BY id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .context("searching professionals by name")?;

        self.with_contacts(rows).await
    }

    async fn search_professionals_by_role(
        &self,
        role: Role,
    ) -> Result<Vec<Professional>, AppError> {
        let rows = sqlx::query_as::<_, ProfessionalRow>(
            r#"
            SELECT id, name, role, birth_date, created_at
            FROM professional
            WHERE role = $1
            ORDER BY id
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .context("searching professionals by role")?;

        self.with_contacts(rows).await
    }

    async fn search_contacts_by_name(&self, pattern: &str) -> Result<Vec<Contact>, AppError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, name, contact_value, professional_id
            FROM contact
            WHERE strpos(upper(name), upper($1)) > 0
            ORDER BY id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .context("searching contacts by name")?;

        Ok(rows.into_iter().map(Contact::from).collect())
    }

    async fn search_contacts_by_value(&self, pattern: &str) -> Result<Vec<Contact>, AppError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, name, contact_value, professional_id
            FROM contact
            WHERE strpos(upper(contact_value), upper($1)) > 0
            ORDER BY id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .context("searching contacts by value")?;

        Ok(rows.into_iter().map(Contact::from).collect())
    }
}

/// A unit of work backed by a Postgres transaction.
///
/// Dropping it without `commit` rolls the transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_professional(&mut self, id: i64) -> Result<Option<Professional>, AppError> {
        select_professional(&mut self.tx, id)
            .await?
            .map(ProfessionalRow::into_professional)
            .transpose()
    }

    async fn find_contact(&mut self, id: i64) -> Result<Option<Contact>, AppError> {
        select_contact(&mut self.tx, id).await
    }

    async fn save_professional(
        &mut self,
        professional: &Professional,
    ) -> Result<Professional, AppError> {
        let row = match professional.id {
            None => sqlx::query_as::<_, ProfessionalRow>(
                r#"
                INSERT INTO professional (name, role, birth_date, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, name, role, birth_date, created_at
                "#,
            )
            .bind(&professional.name)
            .bind(professional.role.as_str())
            .bind(professional.birth_date)
            .bind(professional.created_at)
            .fetch_one(&mut *self.tx)
            .await
            .context("inserting professional")?,
            Some(id) => sqlx::query_as::<_, ProfessionalRow>(
                r#"
                UPDATE professional
                SET name = $2, role = $3, birth_date = $4, created_at = $5
                WHERE id = $1
                RETURNING id, name, role, birth_date, created_at
                "#,
            )
            .bind(id)
            .bind(&professional.name)
            .bind(professional.role.as_str())
            .bind(professional.birth_date)
            .bind(professional.created_at)
            .fetch_optional(&mut *self.tx)
            .await
            .context("replacing professional")?
            .ok_or_else(|| {
                AppError::NotFound(format!("Professional with id: {} not found", id))
            })?,
        };

        tracing::debug!("Saved professional {}", row.id);
        row.into_professional()
    }

    async fn save_contact(&mut self, contact: &Contact) -> Result<Contact, AppError> {
        let row = match contact.id {
            None => sqlx::query_as::<_, ContactRow>(
                r#"
                INSERT INTO contact (name, contact_value, professional_id, position)
                VALUES (
                    $1, $2, $3,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM contact WHERE professional_id = $3)
                )
                RETURNING id, name, contact_value, professional_id
                "#,
            )
            .bind(&contact.name)
            .bind(&contact.contact_value)
            .bind(contact.owner_id)
            .fetch_one(&mut *self.tx)
            .await
            .context("inserting contact")?,
            Some(id) => sqlx::query_as::<_, ContactRow>(
                r#"
                UPDATE contact
                SET name = $2,
                    contact_value = $3,
                    position = CASE
                        WHEN professional_id = $4 THEN position
                        ELSE (SELECT COALESCE(MAX(position) + 1, 0) FROM contact WHERE professional_id = $4)
                    END,
                    professional_id = $4
                WHERE id = $1
                RETURNING id, name, contact_value, professional_id
                "#,
            )
            .bind(id)
            .bind(&contact.name)
            .bind(&contact.contact_value)
            .bind(contact.owner_id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("replacing contact")?
            .ok_or_else(|| AppError::NotFound(format!("Contact with id: {} not found", id)))?,
        };

        tracing::debug!(
            "Saved contact {} for professional {}",
            row.id,
            row.professional_id
        );
        Ok(Contact::from(row))
    }

    async fn arrange_contacts(&mut self, owner_id: i64, ordered: &[i64]) -> Result<(), AppError> {
        if ordered.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE contact AS c
            SET position = listed.ord::int - 1
            FROM unnest($2::bigint[]) WITH ORDINALITY AS listed(id, ord)
            WHERE c.id = listed.id AND c.professional_id = $1
            "#,
        )
        .bind(owner_id)
        .bind(ordered)
        .execute(&mut *self.tx)
        .await
        .context("arranging contacts")?;
        Ok(())
    }

    async fn delete_professional(&mut self, id: i64) -> Result<(), AppError> {
        let contacts = sqlx::query("DELETE FROM contact WHERE professional_id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("deleting owned contacts")?;

        sqlx::query("DELETE FROM professional WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("deleting professional")?;

        tracing::debug!(
            "Deleted professional {} and {} owned contact(s)",
            id,
            contacts.rows_affected()
        );
        Ok(())
    }

    async fn delete_contact(&mut self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM contact WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("deleting contact")?;
        Ok(())
    }

    async fn delete_contacts_except(
        &mut self,
        owner_id: i64,
        keep: &[i64],
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "DELETE FROM contact WHERE professional_id = $1 AND NOT (id = ANY($2))",
        )
        .bind(owner_id)
        .bind(keep)
        .execute(&mut *self.tx)
        .await
        .context("removing dropped contacts")?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let this = *self;
        this.tx.commit().await.context("committing transaction")
    }
}

async fn select_professional(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<ProfessionalRow>, AppError> {
    sqlx::query_as::<_, ProfessionalRow>(
        "SELECT id, name, role, birth_date, created_at FROM professional WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .context("fetching professional")
}

async fn select_contact(conn: &mut PgConnection, id: i64) -> Result<Option<Contact>, AppError> {
    let row = sqlx::query_as::<_, ContactRow>(
        "SELECT id, name, contact_value, professional_id FROM contact WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .context("fetching contact")?;

    Ok(row.map(Contact::from))
}

/// Loads the contacts of every row in one query and attaches them in listing order.
async fn attach_contacts(
    conn: &mut PgConnection,
    rows: Vec<ProfessionalRow>,
) -> Result<Vec<Professional>, AppError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let owner_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let contact_rows = sqlx::query_as::<_, ContactRow>(
        r#"
        SELECT id, name, contact_value, professional_id
        FROM contact
        WHERE professional_id = ANY($1)
        ORDER BY professional_id, position, id
        "#,
    )
    .bind(&owner_ids)
    .fetch_all(&mut *conn)
    .await
    .context("loading contacts")?;

    let mut by_owner: HashMap<i64, Vec<Contact>> = HashMap::new();
    for row in contact_rows {
        by_owner
            .entry(row.professional_id)
            .or_default()
            .push(Contact::from(row));
    }

    rows.into_iter()
        .map(|row| {
            let contacts = by_owner.remove(&row.id).unwrap_or_default();
            Ok(row.into_professional()?.with_contacts(contacts))
        })
        .collect()
}
