/// A category row.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A contact row joined with the name of its category, if any.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ContactRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
