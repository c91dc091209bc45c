use std::sync::Arc;

use sea_orm::{
    prelude::Expr, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait,
};
use tracing::{info, warn};

use crate::db::entities::host;
use crate::db::error::CmdbResult;
use crate::db::services::group_service::GroupResolver;

/// Moves hosts between an application's groupings and flips their
/// distributed flag, one transaction per call.
///
/// Both directions resolve the application's *free pool* and write its
/// set/module ids onto the hosts; only `is_distributed` differs. Assigning a
/// host therefore marks it distributed while its set/module still point at
/// the pool.
#[derive(Clone, Debug)]
pub struct ReassignmentService {
    db: Arc<DatabaseConnection>,
    resolver: GroupResolver,
}

impl ReassignmentService {
    pub fn new(db: Arc<DatabaseConnection>, resolver: GroupResolver) -> Self {
        Self { db, resolver }
    }

    /// Hands hosts to `application_id` and marks them distributed.
    pub async fn assign_to_application(&self, host_ids: &[i32], application_id: i32) -> CmdbResult<u64> {
        self.reassign(host_ids, application_id, true).await
    }

    /// Takes hosts back into `application_id`'s free pool.
    pub async fn reclaim_from_application(
        &self,
        host_ids: &[i32],
        application_id: i32,
    ) -> CmdbResult<u64> {
        self.reassign(host_ids, application_id, false).await
    }

    async fn reassign(&self, host_ids: &[i32], application_id: i32, distributed: bool) -> CmdbResult<u64> {
        let txn = self.db.begin().await?;
        match self
            .reassign_in(&txn, host_ids, application_id, distributed)
            .await
        {
            Ok(rows) => {
                txn.commit().await?;
                info!(
                    application_id,
                    distributed,
                    requested = host_ids.len(),
                    rows,
                    "Reassigned hosts"
                );
                Ok(rows)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Rollback of host reassignment failed");
                }
                warn!(application_id, distributed, error = %e, "Host reassignment aborted");
                Err(e)
            }
        }
    }

    async fn reassign_in(
        &self,
        txn: &DatabaseTransaction,
        host_ids: &[i32],
        application_id: i32,
        distributed: bool,
    ) -> CmdbResult<u64> {
        let pool = self.resolver.resolve_free_pool_in(txn, application_id).await?;

        let result = host::Entity::update_many()
            .col_expr(host::Column::ApplicationId, Expr::value(application_id))
            .col_expr(host::Column::SetId, Expr::value(pool.set_id))
            .col_expr(host::Column::ModuleId, Expr::value(pool.module_id))
            .col_expr(host::Column::IsDistributed, Expr::value(distributed))
            .filter(host::Column::HostId.is_in(host_ids.iter().copied()))
            .exec(txn)
            .await?;
        Ok(result.rows_affected)
    }
}
