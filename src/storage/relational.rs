// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Relational backend implementation (SeaORM over MySQL or SQLite)

use super::backend::{StorageBackend, StoreError, StoreResult};
use crate::config::RelationalConfig;
use crate::record::FoodItem;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use crate::record::MAX_ID_LEN;
use sea_orm::sea_query::{Alias, ColumnDef, Table, TableCreateStatement};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    DbErr, EntityTrait, QueryFilter, QueryOrder, SqlErr,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// `foods` table entity
pub mod food {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "foods")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        #[sea_orm(column_type = "Text")]
        pub name: String,
        pub protein: f64,
        pub fat: f64,
        pub carbs: f64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<food::Model> for FoodItem {
    fn from(model: food::Model) -> Self {
        FoodItem::from_stored(model.id, model.name, model.protein, model.fat, model.carbs)
    }
}

/// Relational storage backend. The SeaORM connection is a pool, so one
/// backend instance serves concurrent calls without extra locking.
pub struct RelationalBackend {
    db: DatabaseConnection,
}

impl RelationalBackend {
    /// Connect using the configured URL and make sure the schema exists
    pub async fn connect(config: &RelationalConfig) -> anyhow::Result<Self> {
        let url = config.connection_url()?;

        let mut options = ConnectOptions::new(url);
        options
            .max_connections(config.max_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .sqlx_logging(false);

        let db = Database::connect(options)
            .await
            .context("Failed to connect to relational database")?;

        info!(
            "Connected to relational database ({:?})",
            db.get_database_backend()
        );

        let backend = Self { db };
        backend.ensure_schema().await?;
        Ok(backend)
    }

    /// Create the `foods` table if it does not exist yet
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        let builder = self.db.get_database_backend();
        let statement = foods_table(builder);

        self.db
            .execute(builder.build(&statement))
            .await
            .context("Failed to create foods table")?;

        debug!("Schema for 'foods' is in place");
        Ok(())
    }
}

/// `foods` table definition.
///
/// Ids compare byte for byte on every engine. MySQL's default collation folds
/// case and accents, so the key column gets a binary collation there; SQLite
/// already compares with BINARY.
fn foods_table(backend: DbBackend) -> TableCreateStatement {
    let mut id = ColumnDef::new(food::Column::Id);
    if backend == DbBackend::MySql {
        id.custom(Alias::new(format!(
            "VARCHAR({}) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin",
            MAX_ID_LEN
        )));
    } else {
        id.string_len(MAX_ID_LEN as u32);
    }
    id.not_null().primary_key();

    Table::create()
        .table(food::Entity)
        .if_not_exists()
        .col(&mut id)
        .col(ColumnDef::new(food::Column::Name).text().not_null())
        .col(ColumnDef::new(food::Column::Protein).double().not_null())
        .col(ColumnDef::new(food::Column::Fat).double().not_null())
        .col(ColumnDef::new(food::Column::Carbs).double().not_null())
        .to_owned()
}

fn backend_error(err: DbErr, action: &str) -> StoreError {
    StoreError::Backend(anyhow!(err).context(format!("Failed to {}", action)))
}

fn mutable_fields(food: &FoodItem) -> food::ActiveModel {
    food::ActiveModel {
        id: NotSet,
        name: Set(food.name().to_string()),
        protein: Set(food.protein()),
        fat: Set(food.fat()),
        carbs: Set(food.carbs()),
    }
}

#[async_trait]
impl StorageBackend for RelationalBackend {
    async fn initialize(&self) -> StoreResult<()> {
        self.ensure_schema().await.map_err(StoreError::Backend)
    }

    async fn create(&self, food: FoodItem) -> StoreResult<FoodItem> {
        let mut model = mutable_fields(&food);
        model.id = Set(food.id().to_string());

        match food::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => {
                debug!("Inserted food '{}'", food.id());
                Ok(food)
            }
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(StoreError::AlreadyExists(food.id().to_string()))
                }
                _ => Err(backend_error(err, "insert food")),
            },
        }
    }

    async fn get(&self, id: &str) -> StoreResult<FoodItem> {
        food::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| backend_error(e, "query food"))?
            .map(FoodItem::from)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update(&self, food: FoodItem) -> StoreResult<FoodItem> {
        let result = food::Entity::update_many()
            .set(mutable_fields(&food))
            .filter(food::Column::Id.eq(food.id()))
            .exec(&self.db)
            .await
            .map_err(|e| backend_error(e, "update food"))?;

        // MySQL counts changed rows, not matched ones, so an update that
        // rewrites identical values reports zero. Tell the two cases apart.
        if result.rows_affected == 0 {
            self.get(food.id()).await?;
        }

        debug!("Updated food '{}'", food.id());
        Ok(food)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let result = food::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await
            .map_err(|e| backend_error(e, "delete food"))?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        debug!("Deleted food '{}'", id);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<FoodItem>> {
        let models = food::Entity::find()
            .order_by_asc(food::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| backend_error(e, "list foods"))?;

        Ok(models.into_iter().map(FoodItem::from).collect())
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        match self.db.ping().await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Health check error: {}", e);
                Ok(false)
            }
        }
    }

    async fn close(&self) -> StoreResult<()> {
        info!("Closing relational database connection");
        self.db
            .clone()
            .close()
            .await
            .map_err(|e| backend_error(e, "close database connection"))
    }

    fn backend_type(&self) -> &str {
        "relational"
    }
}
