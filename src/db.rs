use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::str::FromStr;

use crate::error::{AppError, AppResult, FieldErrors, ValidationError};
use crate::models::{Category, ContactRow};
use crate::query::{like_pattern, search_text, ContactFilter, OrderTerm, DEFAULT_ORDERING};
use crate::transfer::{CategoryChanges, ContactChanges};

/// Stored and serialized timestamp layout: RFC 3339, UTC, microseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse any RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Current time in the stored layout.
pub fn current_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// The next `updated_at` for a record last modified at `previous`.
/// Always strictly later than `previous`, even if the clock is not.
pub fn next_update_timestamp(previous: &str) -> String {
    let now = Utc::now();
    let next = match parse_timestamp(previous) {
        Some(prev) => now.max(prev + Duration::microseconds(1)),
        None => now,
    };
    format_timestamp(next)
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Initialize database connection pool with recommended pragmas.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5))
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool_options = if is_memory_url(database_url) {
        // An in-memory database lives only as long as its connection.
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<std::time::Duration>)
            .max_lifetime(None::<std::time::Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections)
    };

    pool_options.connect_with(options).await
}

/// Start a transaction that holds the write lock from its first statement.
/// A deferred transaction that reads first fails with `SQLITE_BUSY`, rather
/// than waiting, once another writer commits.
async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_create_categories",
        include_str!("../migrations/001_create_categories.sql"),
    ),
    (
        "002_create_contacts",
        include_str!("../migrations/002_create_contacts.sql"),
    ),
];

/// Run database migrations. Every statement is idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for &(name, sql) in MIGRATIONS {
        sqlx::raw_sql(sql).execute(pool).await?;
        tracing::debug!(migration = name, "Applied migration");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// All categories in primary key order.
pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id ASC")
        .fetch_all(pool)
        .await
}

pub async fn get_category(pool: &SqlitePool, id: i64) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create_category(pool: &SqlitePool, name: &str) -> Result<Category, sqlx::Error> {
    let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(Category {
        id: result.last_insert_rowid(),
        name: name.to_string(),
    })
}

/// Apply `changes` to a category. Returns `None` if it does not exist.
pub async fn update_category(
    pool: &SqlitePool,
    id: i64,
    changes: &CategoryChanges,
) -> Result<Option<Category>, sqlx::Error> {
    if let Some(name) = &changes.name {
        let result = sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
    }
    get_category(pool, id).await
}

/// Delete a category. Contacts pointing at it are detached, not deleted.
/// Returns the number of detached contacts, or `None` if it does not exist.
pub async fn delete_category(pool: &SqlitePool, id: i64) -> Result<Option<i64>, sqlx::Error> {
    let mut tx = begin_write(pool).await?;

    let detached: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE category_id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    // ON DELETE SET NULL clears contacts.category_id
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    tx.commit().await?;
    Ok(Some(detached))
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

const CONTACT_SELECT: &str = r#"
    SELECT c.id, c.name, c.email, c.phone, c.address, c.category_id,
           cat.name AS category_name, c.created_at, c.updated_at
    FROM contacts c
    LEFT JOIN categories cat ON cat.id = c.category_id
"#;

async fn fetch_contact<'e, E>(executor: E, id: i64) -> Result<Option<ContactRow>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{CONTACT_SELECT} WHERE c.id = ?");
    sqlx::query_as::<_, ContactRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_contact(pool: &SqlitePool, id: i64) -> Result<Option<ContactRow>, sqlx::Error> {
    fetch_contact(pool, id).await
}

/// List contacts matching every filter in `filter`, in its ordering.
pub async fn list_contacts(
    pool: &SqlitePool,
    filter: &ContactFilter,
) -> Result<Vec<ContactRow>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(CONTACT_SELECT);
    qb.push(" WHERE 1 = 1");

    if let Some(category_id) = filter.category_id {
        qb.push(" AND c.category_id = ").push_bind(category_id);
    }
    if let Some(name) = &filter.category_name {
        qb.push(" AND cat.name = ").push_bind(name.clone());
    }
    if let Some(created_at) = &filter.created_at {
        qb.push(" AND c.created_at = ").push_bind(created_at.clone());
    }

    // Each term must appear in at least one searchable field.
    for term in &filter.search_terms {
        qb.push(" AND c.search_text LIKE ")
            .push_bind(like_pattern(&term.to_lowercase()))
            .push(" ESCAPE '\\'");
    }

    let ordering: &[OrderTerm] = if filter.ordering.is_empty() {
        &[DEFAULT_ORDERING]
    } else {
        &filter.ordering
    };
    qb.push(" ORDER BY ");
    for (i, term) in ordering.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(term.field.column())
            .push(if term.descending { " DESC" } else { " ASC" });
    }
    let id_direction = match ordering.first() {
        Some(term) if !term.descending => " ASC",
        _ => " DESC",
    };
    qb.push(", c.id").push(id_direction);

    qb.build_query_as::<ContactRow>().fetch_all(pool).await
}

async fn ensure_category_exists(conn: &mut SqliteConnection, id: i64) -> AppResult<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    if found.is_none() {
        return Err(FieldErrors::single("category", ValidationError::UnknownCategory(id)).into());
    }
    Ok(())
}

/// Insert a contact built from validated `changes`. Missing optional fields
/// are stored as empty strings.
pub async fn create_contact(pool: &SqlitePool, changes: &ContactChanges) -> AppResult<ContactRow> {
    let mut tx = begin_write(pool).await?;

    let category_id = changes.category.flatten();
    if let Some(category_id) = category_id {
        ensure_category_exists(&mut tx, category_id).await?;
    }

    let name = changes.name.as_deref().unwrap_or_default();
    let email = changes.email.as_deref().unwrap_or_default();
    let phone = changes.phone.as_deref().unwrap_or_default();

    let now = current_timestamp();
    let result = sqlx::query(
        r#"
        INSERT INTO contacts
            (name, email, phone, address, category_id, search_text, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(phone)
    .bind(changes.address.as_deref().unwrap_or_default())
    .bind(category_id)
    .bind(search_text(name, email, phone))
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    let contact = fetch_contact(&mut *tx, result.last_insert_rowid())
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    tx.commit().await?;
    Ok(contact)
}

/// Apply validated `changes` to a contact and refresh `updated_at`.
/// `created_at` is never written here.
pub async fn update_contact(
    pool: &SqlitePool,
    id: i64,
    changes: &ContactChanges,
) -> AppResult<ContactRow> {
    let mut tx = begin_write(pool).await?;

    let Some(previous) = fetch_contact(&mut *tx, id).await? else {
        return Err(AppError::NotFound {
            resource: "Contact",
            id,
        });
    };

    if let Some(Some(category_id)) = changes.category {
        ensure_category_exists(&mut tx, category_id).await?;
    }

    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE contacts SET updated_at = ");
    qb.push_bind(next_update_timestamp(&previous.updated_at));
    qb.push(", search_text = ").push_bind(search_text(
        changes.name.as_deref().unwrap_or(&previous.name),
        changes.email.as_deref().unwrap_or(&previous.email),
        changes.phone.as_deref().unwrap_or(&previous.phone),
    ));
    if let Some(name) = &changes.name {
        qb.push(", name = ").push_bind(name.clone());
    }
    if let Some(email) = &changes.email {
        qb.push(", email = ").push_bind(email.clone());
    }
    if let Some(phone) = &changes.phone {
        qb.push(", phone = ").push_bind(phone.clone());
    }
    if let Some(address) = &changes.address {
        qb.push(", address = ").push_bind(address.clone());
    }
    if let Some(category_id) = changes.category {
        qb.push(", category_id = ").push_bind(category_id);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.build().execute(&mut *tx).await?;

    let contact = fetch_contact(&mut *tx, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    tx.commit().await?;
    Ok(contact)
}

/// Returns `false` if the contact does not exist.
pub async fn delete_contact(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{parse_ordering, ContactListQuery};
    use tempfile::tempdir;

    /// Create a test database with in-memory SQLite.
    async fn setup_test_db() -> SqlitePool {
        let pool = init_pool("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn new_contact(name: &str, email: &str, phone: &str, category: Option<i64>) -> ContactChanges {
        ContactChanges {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            phone: Some(phone.to_string()),
            address: None,
            category: Some(category),
        }
    }

    fn names(rows: &[ContactRow]) -> Vec<&str> {
        rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_timestamp_format() {
        let ts = parse_timestamp("2026-10-19T08:15:02.123456789+00:00").unwrap();
        assert_eq!(format_timestamp(ts), "2026-10-19T08:15:02.123456Z");
    }

    #[test]
    fn test_next_update_timestamp_is_strictly_later() {
        let far_future = "2999-01-01T00:00:00.000000Z";
        assert_eq!(
            next_update_timestamp(far_future),
            "2999-01-01T00:00:00.000001Z"
        );

        let past = "2000-01-01T00:00:00.000000Z";
        assert!(next_update_timestamp(past).as_str() > past);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = setup_test_db().await;
        run_migrations(&pool).await.unwrap();
        assert!(list_categories(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_category_crud() {
        let pool = setup_test_db().await;

        let work = create_category(&pool, "Work").await.unwrap();
        let family = create_category(&pool, "Family").await.unwrap();
        assert_eq!(work.id, 1);
        assert_eq!(family.id, 2);

        let all = list_categories(&pool).await.unwrap();
        assert_eq!(all, vec![work.clone(), family.clone()]);

        let renamed = update_category(
            &pool,
            work.id,
            &CategoryChanges {
                name: Some("Office".to_string()),
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(renamed.name, "Office");

        let missing = update_category(&pool, 99, &CategoryChanges::default())
            .await
            .unwrap();
        assert!(missing.is_none());

        assert_eq!(delete_category(&pool, family.id).await.unwrap(), Some(0));
        assert_eq!(delete_category(&pool, family.id).await.unwrap(), None);
        assert!(get_category(&pool, family.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_contact_joins_category_name() {
        let pool = setup_test_db().await;
        let work = create_category(&pool, "Work").await.unwrap();

        let contact = create_contact(&pool, &new_contact("Alice", "", "", Some(work.id)))
            .await
            .unwrap();

        assert_eq!(contact.id, 1);
        assert_eq!(contact.category_id, Some(work.id));
        assert_eq!(contact.category_name.as_deref(), Some("Work"));
        assert_eq!(contact.address, "");
        assert_eq!(contact.created_at, contact.updated_at);
    }

    #[tokio::test]
    async fn test_create_contact_unknown_category_writes_nothing() {
        let pool = setup_test_db().await;

        let err = create_contact(&pool, &new_contact("Alice", "", "", Some(42)))
            .await
            .unwrap_err();

        match err {
            AppError::Validation(fields) => assert!(fields.has("category")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(list_contacts(&pool, &ContactFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_category_detaches_contacts() {
        let pool = setup_test_db().await;
        let work = create_category(&pool, "Work").await.unwrap();
        let alice = create_contact(&pool, &new_contact("Alice", "", "", Some(work.id)))
            .await
            .unwrap();
        let bob = create_contact(&pool, &new_contact("Bob", "", "", Some(work.id)))
            .await
            .unwrap();

        assert_eq!(delete_category(&pool, work.id).await.unwrap(), Some(2));

        for id in [alice.id, bob.id] {
            let contact = get_contact(&pool, id).await.unwrap().unwrap();
            assert_eq!(contact.category_id, None);
            assert_eq!(contact.category_name, None);
        }
    }

    #[tokio::test]
    async fn test_update_contact_timestamps() {
        let pool = setup_test_db().await;
        let created = create_contact(&pool, &new_contact("Alice", "", "", None))
            .await
            .unwrap();

        let first = update_contact(
            &pool,
            created.id,
            &ContactChanges {
                phone: Some("123456789".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let second = update_contact(&pool, created.id, &ContactChanges::default())
            .await
            .unwrap();

        assert_eq!(first.created_at, created.created_at);
        assert_eq!(second.created_at, created.created_at);
        assert!(first.updated_at > created.updated_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.phone, "123456789");
        assert_eq!(second.name, "Alice");
    }

    #[tokio::test]
    async fn test_update_contact_category_tristate() {
        let pool = setup_test_db().await;
        let work = create_category(&pool, "Work").await.unwrap();
        let contact = create_contact(&pool, &new_contact("Alice", "", "", Some(work.id)))
            .await
            .unwrap();

        // absent keeps the category
        let kept = update_contact(
            &pool,
            contact.id,
            &ContactChanges {
                name: Some("Alicia".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(kept.category_id, Some(work.id));

        // explicit null detaches
        let detached = update_contact(
            &pool,
            contact.id,
            &ContactChanges {
                category: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(detached.category_id, None);
    }

    #[tokio::test]
    async fn test_update_missing_contact() {
        let pool = setup_test_db().await;
        let err = update_contact(&pool, 7, &ContactChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { id: 7, .. }));
    }

    #[tokio::test]
    async fn test_update_contact_unknown_category_is_atomic() {
        let pool = setup_test_db().await;
        let contact = create_contact(&pool, &new_contact("Alice", "", "", None))
            .await
            .unwrap();

        let result = update_contact(
            &pool,
            contact.id,
            &ContactChanges {
                name: Some("Changed".to_string()),
                category: Some(Some(99)),
                ..Default::default()
            },
        )
        .await;
        assert!(result.is_err());

        let unchanged = get_contact(&pool, contact.id).await.unwrap().unwrap();
        assert_eq!(unchanged, contact);
    }

    #[tokio::test]
    async fn test_list_contacts_default_newest_first() {
        let pool = setup_test_db().await;
        for name in ["Carol", "Alice", "Bob"] {
            create_contact(&pool, &new_contact(name, "", "", None))
                .await
                .unwrap();
        }

        let rows = list_contacts(&pool, &ContactFilter::default()).await.unwrap();
        assert_eq!(names(&rows), vec!["Bob", "Alice", "Carol"]);

        let by_name = ContactFilter {
            ordering: parse_ordering("name"),
            ..Default::default()
        };
        let rows = list_contacts(&pool, &by_name).await.unwrap();
        assert_eq!(names(&rows), vec!["Alice", "Bob", "Carol"]);

        let by_name_desc = ContactFilter {
            ordering: parse_ordering("-name"),
            ..Default::default()
        };
        let rows = list_contacts(&pool, &by_name_desc).await.unwrap();
        assert_eq!(names(&rows), vec!["Carol", "Bob", "Alice"]);
    }

    #[tokio::test]
    async fn test_list_contacts_search() {
        let pool = setup_test_db().await;
        create_contact(&pool, &new_contact("Alice Smith", "", "", None))
            .await
            .unwrap();
        create_contact(&pool, &new_contact("Bob", "ALICE@example.com", "", None))
            .await
            .unwrap();
        create_contact(&pool, &new_contact("Carol", "carol@example.com", "123456789", None))
            .await
            .unwrap();

        let filter = ContactFilter {
            search_terms: vec!["alice".to_string()],
            ordering: parse_ordering("name"),
            ..Default::default()
        };
        let rows = list_contacts(&pool, &filter).await.unwrap();
        assert_eq!(names(&rows), vec!["Alice Smith", "Bob"]);

        let filter = ContactFilter {
            search_terms: vec!["4567".to_string()],
            ..Default::default()
        };
        assert_eq!(names(&list_contacts(&pool, &filter).await.unwrap()), vec!["Carol"]);

        // every term must match somewhere
        let filter = ContactFilter {
            search_terms: vec!["alice".to_string(), "smith".to_string()],
            ..Default::default()
        };
        assert_eq!(
            names(&list_contacts(&pool, &filter).await.unwrap()),
            vec!["Alice Smith"]
        );

        // wildcards are literal
        let filter = ContactFilter {
            search_terms: vec!["%".to_string()],
            ..Default::default()
        };
        assert!(list_contacts(&pool, &filter).await.unwrap().is_empty());

        // case folding is not limited to ASCII
        let elodie = create_contact(&pool, &new_contact("Élodie Øster", "", "", None))
            .await
            .unwrap();
        for term in ["élodie", "ÉLODIE", "øster"] {
            let filter = ContactFilter {
                search_terms: vec![term.to_string()],
                ..Default::default()
            };
            assert_eq!(
                names(&list_contacts(&pool, &filter).await.unwrap()),
                vec!["Élodie Øster"],
                "term {term}"
            );
        }

        // renaming refreshes the searchable text
        update_contact(
            &pool,
            elodie.id,
            &ContactChanges {
                name: Some("Zoé".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let filter = ContactFilter {
            search_terms: vec!["ZOÉ".to_string()],
            ..Default::default()
        };
        assert_eq!(names(&list_contacts(&pool, &filter).await.unwrap()), vec!["Zoé"]);
        let filter = ContactFilter {
            search_terms: vec!["élodie".to_string()],
            ..Default::default()
        };
        assert!(list_contacts(&pool, &filter).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_writes_on_file_database() {
        let dir = tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("contacts.db").display());
        let pool = init_pool(&url, 10).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let work = create_category(&pool, "Work").await.unwrap();
        let target = create_contact(&pool, &new_contact("Target", "", "", Some(work.id)))
            .await
            .unwrap();

        let (work_id, target_id) = (work.id, target.id);

        let mut tasks = Vec::new();
        for i in 0..50 {
            let creator = pool.clone();
            tasks.push(tokio::spawn(async move {
                let changes = new_contact(&format!("Contact {i}"), "", "", Some(work_id));
                create_contact(&creator, &changes).await.map(|_| ())
            }));

            let updater = pool.clone();
            tasks.push(tokio::spawn(async move {
                let changes = ContactChanges {
                    phone: Some(format!("{:09}", i)),
                    category: Some(Some(work_id)),
                    ..Default::default()
                };
                update_contact(&updater, target_id, &changes).await.map(|_| ())
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let in_work = ContactFilter {
            category_id: Some(work.id),
            ..Default::default()
        };
        assert_eq!(list_contacts(&pool, &in_work).await.unwrap().len(), 51);

        let updated = get_contact(&pool, target.id).await.unwrap().unwrap();
        assert!(updated.updated_at > target.updated_at);
        assert_eq!(updated.phone.len(), 9);

        pool.close().await;
    }

    #[tokio::test]
    async fn test_list_contacts_category_filters_combine() {
        let pool = setup_test_db().await;
        let work = create_category(&pool, "Work").await.unwrap();
        let family = create_category(&pool, "Family").await.unwrap();
        create_contact(&pool, &new_contact("Alice", "", "", Some(work.id)))
            .await
            .unwrap();
        create_contact(&pool, &new_contact("Bob", "", "", Some(family.id)))
            .await
            .unwrap();
        create_contact(&pool, &new_contact("Carol", "", "", None))
            .await
            .unwrap();

        let by_id = ContactFilter {
            category_id: Some(work.id),
            ..Default::default()
        };
        assert_eq!(names(&list_contacts(&pool, &by_id).await.unwrap()), vec!["Alice"]);

        let by_name = ContactFilter {
            category_name: Some("Family".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&list_contacts(&pool, &by_name).await.unwrap()), vec!["Bob"]);

        let conflicting = ContactFilter {
            category_id: Some(work.id),
            category_name: Some("Family".to_string()),
            ..Default::default()
        };
        assert!(list_contacts(&pool, &conflicting).await.unwrap().is_empty());

        let unknown = ContactFilter {
            category_name: Some("Nobody".to_string()),
            ..Default::default()
        };
        assert!(list_contacts(&pool, &unknown).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_contacts_created_at_filter() {
        let pool = setup_test_db().await;
        let alice = create_contact(&pool, &new_contact("Alice", "", "", None))
            .await
            .unwrap();
        create_contact(&pool, &new_contact("Bob", "", "", None))
            .await
            .unwrap();

        let filter = ContactListQuery {
            created_at: Some(alice.created_at.clone()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        let rows = list_contacts(&pool, &filter).await.unwrap();
        assert!(rows.iter().all(|r| r.created_at == alice.created_at));
        assert!(names(&rows).contains(&"Alice"));
    }

    #[tokio::test]
    async fn test_delete_contact() {
        let pool = setup_test_db().await;
        let contact = create_contact(&pool, &new_contact("Alice", "", "", None))
            .await
            .unwrap();

        assert!(delete_contact(&pool, contact.id).await.unwrap());
        assert!(!delete_contact(&pool, contact.id).await.unwrap());
        assert!(get_contact(&pool, contact.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_db_check_constraints() {
        let pool = setup_test_db().await;

        // Name too long should fail
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind("a".repeat(101))
            .execute(&pool)
            .await;
        assert!(result.is_err());

        // Empty contact name should fail
        let result = sqlx::query(
            "INSERT INTO contacts (name, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind("")
        .bind(current_timestamp())
        .bind(current_timestamp())
        .execute(&pool)
        .await;
        assert!(result.is_err());

        // Phone too long should fail
        let result = sqlx::query(
            "INSERT INTO contacts (name, phone, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind("Alice")
        .bind("1".repeat(18))
        .bind(current_timestamp())
        .bind(current_timestamp())
        .execute(&pool)
        .await;
        assert!(result.is_err());

        // Dangling category reference should fail
        let result = sqlx::query(
            "INSERT INTO contacts (name, category_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind("Alice")
        .bind(5_i64)
        .bind(current_timestamp())
        .bind(current_timestamp())
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
