use crate::entity::{chat_history, config_entries, customers, interactions};
use crate::utils;
use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use std::path::Path;
use tracing::info;

const DB_FILE: &str = "crm.db";
const API_KEY_CONFIG: &str = "groq_api_key";

/// Row storage for configuration, customers, interactions and chat history.
///
/// Each operation opens its own SQLite connection on the blocking pool and
/// commits on its own.
#[derive(Clone)]
pub struct Store {
    db_url: String,
}

impl Store {
    /// Opens `crm.db` under `data_dir`, creating missing tables and adding
    /// missing columns to existing ones. Existing rows are left untouched.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir: {}", data_dir.display()))?;
        let db_path = data_dir.join(DB_FILE);
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        tokio::task::spawn_blocking({
            let db_url = db_url.clone();
            move || -> Result<()> {
                let db = Database::connect(&db_url).context("Failed to open SQLite database")?;
                initialize(&db)
            }
        })
        .await??;

        info!("Store ready ({})", db_path.display());
        Ok(Self { db_url })
    }

    async fn with_db<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&DatabaseConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db_url = self.db_url.clone();
        tokio::task::spawn_blocking(move || {
            let db = Database::connect(&db_url).context("Failed to open SQLite database")?;
            op(&db)
        })
        .await
        .context("Storage task panicked")?
    }

    pub async fn get_config(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.with_db(move |db| {
            let row = config_entries::Entity::find_by_id(key).one(db)?;
            Ok(row.and_then(|r| r.value))
        })
        .await
    }

    pub async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let record = config_entries::ActiveModel {
            key: Set(key.to_string()),
            value: Set(Some(value.to_string())),
        };

        self.with_db(move |db| {
            config_entries::Entity::insert(record)
                .on_conflict(
                    OnConflict::column(config_entries::Column::Key)
                        .update_column(config_entries::Column::Value)
                        .to_owned(),
                )
                .exec_without_returning(db)?;
            Ok(())
        })
        .await
    }

    pub async fn api_key(&self) -> Result<Option<String>> {
        let key = self.get_config(API_KEY_CONFIG).await?;
        Ok(key.filter(|k| !k.is_empty()))
    }

    pub async fn set_api_key(&self, key: &str) -> Result<()> {
        self.set_config(API_KEY_CONFIG, key).await?;
        info!("API key stored");
        Ok(())
    }

    /// Inserts a customer. Returns `None` without writing when name or
    /// account is missing.
    pub async fn create_customer(&self, fields: CustomerFields) -> Result<Option<Customer>> {
        if !fields.is_complete() {
            return Ok(None);
        }

        let now = utils::timestamp();
        let record = customers::ActiveModel {
            id: NotSet,
            name: Set(fields.name),
            account: Set(fields.account),
            email: Set(fields.email),
            phone: Set(fields.phone),
            created_at: Set(Some(now.clone())),
            updated_at: Set(Some(now)),
        };

        let customer: Customer = self
            .with_db(move |db| Ok(record.insert(db)?))
            .await?
            .into();

        info!("Created customer {}", customer.id);
        Ok(Some(customer))
    }

    /// Overwrites a customer's fields. Returns `None` when the id is unknown
    /// or the fields are incomplete.
    pub async fn update_customer(
        &self,
        id: i64,
        fields: CustomerFields,
    ) -> Result<Option<Customer>> {
        if !fields.is_complete() {
            return Ok(None);
        }

        let now = utils::timestamp();
        let updated = self
            .with_db(move |db| {
                let Some(existing) = customers::Entity::find_by_id(id).one(db)? else {
                    return Ok(None);
                };

                let mut record: customers::ActiveModel = existing.into();
                record.name = Set(fields.name);
                record.account = Set(fields.account);
                record.email = Set(fields.email);
                record.phone = Set(fields.phone);
                record.updated_at = Set(Some(now));
                Ok(Some(record.update(db)?))
            })
            .await?;

        if updated.is_some() {
            info!("Updated customer {}", id);
        }
        Ok(updated.map(Customer::from))
    }

    /// Deletes a customer together with all of its interactions.
    pub async fn delete_customer(&self, id: i64) -> Result<bool> {
        let (affected, notes) = self
            .with_db(move |db| {
                let notes = interactions::Entity::delete_many()
                    .filter(interactions::Column::CustomerId.eq(id))
                    .exec(db)?;
                let result = customers::Entity::delete_by_id(id).exec(db)?;
                Ok((result.rows_affected, notes.rows_affected))
            })
            .await?;

        if affected > 0 {
            info!("Deleted customer {} ({} interactions)", id, notes);
        }
        Ok(affected > 0)
    }

    pub async fn get_customer(&self, id: i64) -> Result<Option<Customer>> {
        self.with_db(move |db| {
            let row = customers::Entity::find_by_id(id).one(db)?;
            Ok(row.map(Customer::from))
        })
        .await
    }

    /// Customers newest first. A non-empty `filter` keeps only customers
    /// whose name, account, email or phone contains it, ignoring case.
    pub async fn list_customers(&self, filter: Option<&str>) -> Result<Vec<Customer>> {
        let filter = filter.filter(|q| !q.is_empty()).map(str::to_string);

        self.with_db(move |db| {
            let rows = customers::Entity::find()
                .order_by_desc(customers::Column::Id)
                .all(db)?;

            Ok(rows
                .into_iter()
                .map(Customer::from)
                .filter(|c| filter.as_deref().is_none_or(|q| c.matches(q)))
                .collect())
        })
        .await
    }

    /// Customers in insertion order.
    pub async fn all_customers(&self) -> Result<Vec<Customer>> {
        self.with_db(|db| {
            let rows = customers::Entity::find()
                .order_by_asc(customers::Column::Id)
                .all(db)?;
            Ok(rows.into_iter().map(Customer::from).collect())
        })
        .await
    }

    /// Appends a note to a customer. Returns `None` without writing when the
    /// note is empty or the customer does not exist.
    pub async fn create_interaction(
        &self,
        customer_id: i64,
        note: &str,
    ) -> Result<Option<Interaction>> {
        if note.is_empty() {
            return Ok(None);
        }

        let record = interactions::ActiveModel {
            id: NotSet,
            customer_id: Set(customer_id),
            date: Set(utils::timestamp()),
            note: Set(note.to_string()),
        };

        let created = self
            .with_db(move |db| {
                if customers::Entity::find_by_id(customer_id).one(db)?.is_none() {
                    return Ok(None);
                }
                Ok(Some(record.insert(db)?))
            })
            .await?;

        if let Some(ref row) = created {
            info!("Added interaction {} for customer {}", row.id, customer_id);
        }
        Ok(created.map(Interaction::from))
    }

    pub async fn delete_interaction(&self, id: i64) -> Result<bool> {
        let affected = self
            .with_db(move |db| {
                let result = interactions::Entity::delete_by_id(id).exec(db)?;
                Ok(result.rows_affected)
            })
            .await?;

        if affected > 0 {
            info!("Deleted interaction {}", id);
        }
        Ok(affected > 0)
    }

    /// A customer's interactions, newest first.
    pub async fn list_interactions(&self, customer_id: i64) -> Result<Vec<Interaction>> {
        self.with_db(move |db| {
            let rows = interactions::Entity::find()
                .filter(interactions::Column::CustomerId.eq(customer_id))
                .order_by_desc(interactions::Column::Date)
                .order_by_desc(interactions::Column::Id)
                .all(db)?;
            Ok(rows.into_iter().map(Interaction::from).collect())
        })
        .await
    }

    /// The `n` newest interactions across all customers.
    pub async fn recent_interactions(&self, n: usize) -> Result<Vec<Interaction>> {
        self.with_db(move |db| {
            let rows = interactions::Entity::find()
                .order_by_desc(interactions::Column::Date)
                .order_by_desc(interactions::Column::Id)
                .limit(n as u64)
                .all(db)?;
            Ok(rows.into_iter().map(Interaction::from).collect())
        })
        .await
    }

    pub async fn append_chat(&self, user_message: &str, ai_response: &str) -> Result<ChatEntry> {
        let record = chat_history::ActiveModel {
            id: NotSet,
            user_message: Set(user_message.to_string()),
            ai_response: Set(ai_response.to_string()),
            timestamp: Set(utils::timestamp()),
        };

        let row = self.with_db(move |db| Ok(record.insert(db)?)).await?;
        Ok(row.into())
    }

    /// The `n` newest chat exchanges, newest first.
    pub async fn recent_chat(&self, n: usize) -> Result<Vec<ChatEntry>> {
        self.with_db(move |db| {
            let rows = chat_history::Entity::find()
                .order_by_desc(chat_history::Column::Timestamp)
                .order_by_desc(chat_history::Column::Id)
                .limit(n as u64)
                .all(db)?;
            Ok(rows.into_iter().map(ChatEntry::from).collect())
        })
        .await
    }
}

fn initialize(db: &DatabaseConnection) -> Result<()> {
    db.get_schema_builder()
        .register(config_entries::Entity)
        .register(customers::Entity)
        .register(interactions::Entity)
        .register(chat_history::Entity)
        .sync(db)
        .context("Failed to sync database schema")
}
