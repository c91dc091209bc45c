use std::sync::Arc;

use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, warn};

use crate::config::FreePoolNames;
use crate::db::entities::{module, set};
use crate::db::error::{CmdbError, CmdbResult};

/// Set and module ids of an application's free pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreePool {
    pub set_id: i32,
    pub module_id: i32,
}

/// Locates the free-pool set/module of an application.
#[derive(Clone, Debug)]
pub struct GroupResolver {
    db: Arc<DatabaseConnection>,
    names: FreePoolNames,
}

impl GroupResolver {
    pub fn new(db: Arc<DatabaseConnection>, names: FreePoolNames) -> Self {
        Self { db, names }
    }

    pub async fn resolve_free_pool(&self, application_id: i32) -> CmdbResult<FreePool> {
        self.resolve_free_pool_in(self.db.as_ref(), application_id).await
    }

    /// Same lookup on a caller-supplied connection, typically an open transaction.
    pub async fn resolve_free_pool_in<C>(&self, conn: &C, application_id: i32) -> CmdbResult<FreePool>
    where
        C: ConnectionTrait,
    {
        let pool_set = set::Entity::find()
            .filter(set::Column::ApplicationId.eq(application_id))
            .filter(set::Column::SetName.eq(self.names.set_name.as_str()))
            .order_by_asc(set::Column::SetId)
            .one(conn)
            .await?
            .ok_or_else(|| {
                warn!(application_id, set_name = %self.names.set_name, "Free pool set missing");
                CmdbError::PoolNotFound(application_id)
            })?;

        // Any module of the pool set qualifies; the lowest id wins.
        let pool_module = module::Entity::find()
            .filter(module::Column::ApplicationId.eq(application_id))
            .filter(module::Column::SetId.eq(pool_set.set_id))
            .order_by_asc(module::Column::ModuleId)
            .one(conn)
            .await?
            .ok_or_else(|| {
                warn!(application_id, set_id = pool_set.set_id, "Free pool module missing");
                CmdbError::ModuleNotFound {
                    application_id,
                    set_id: pool_set.set_id,
                }
            })?;

        debug!(
            application_id,
            set_id = pool_set.set_id,
            module_id = pool_module.module_id,
            "Resolved free pool"
        );
        Ok(FreePool {
            set_id: pool_set.set_id,
            module_id: pool_module.module_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{insert_module, pool_names, seed_groupings, setup_db};

    #[tokio::test]
    async fn test_resolves_pool_per_application() {
        let db = setup_db().await;
        seed_groupings(&db).await;
        let resolver = GroupResolver::new(db, pool_names());

        assert_eq!(
            resolver.resolve_free_pool(1).await.unwrap(),
            FreePool { set_id: 10, module_id: 100 }
        );
        assert_eq!(
            resolver.resolve_free_pool(2).await.unwrap(),
            FreePool { set_id: 20, module_id: 200 }
        );
    }

    #[tokio::test]
    async fn test_missing_pool_set() {
        let db = setup_db().await;
        seed_groupings(&db).await;
        let resolver = GroupResolver::new(db, pool_names());

        assert!(matches!(resolver.resolve_free_pool(3).await, Err(CmdbError::PoolNotFound(3))));
        assert!(matches!(resolver.resolve_free_pool(99).await, Err(CmdbError::PoolNotFound(99))));
    }

    #[tokio::test]
    async fn test_missing_pool_module() {
        let db = setup_db().await;
        seed_groupings(&db).await;
        let resolver = GroupResolver::new(db, pool_names());

        assert!(matches!(
            resolver.resolve_free_pool(4).await,
            Err(CmdbError::ModuleNotFound { application_id: 4, set_id: 40 })
        ));
    }

    #[tokio::test]
    async fn test_pool_name_is_configurable() {
        let db = setup_db().await;
        seed_groupings(&db).await;
        // App 1's "web" set doubles as the pool under a different naming scheme.
        insert_module(&db, 111, 1, 11, "php").await;
        let names = FreePoolNames {
            set_name: "web".to_string(),
            module_name: "nginx".to_string(),
        };
        let resolver = GroupResolver::new(db, names);

        assert_eq!(
            resolver.resolve_free_pool(1).await.unwrap(),
            FreePool { set_id: 11, module_id: 110 }
        );
    }
}
