use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        // Fail fast when the database is unreachable; schema.sql is applied out of band.
        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }
}
