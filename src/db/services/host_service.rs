use std::sync::Arc;

use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Iterable, NotSet,
    PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use tracing::{debug, info, warn};

use crate::config::FreePoolNames;
use crate::db::entities::host;
use crate::db::error::{CmdbError, CmdbResult};
use crate::db::query::{HostQuery, HostRow, QueryPlan};

/// Rows per INSERT statement inside a batch transaction.
const INSERT_CHUNK_SIZE: usize = 100;

/// Grouping dimension a host count is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Application,
    Set,
    Module,
}

impl Grouping {
    fn column(self) -> host::Column {
        match self {
            Grouping::Application => host::Column::ApplicationId,
            Grouping::Set => host::Column::SetId,
            Grouping::Module => host::Column::ModuleId,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HostRepository {
    db: Arc<DatabaseConnection>,
    free_pool: FreePoolNames,
}

impl HostRepository {
    pub fn new(db: Arc<DatabaseConnection>, free_pool: FreePoolNames) -> Self {
        Self { db, free_pool }
    }

    /// Inserts every host or none of them.
    pub async fn insert_batch(&self, hosts: Vec<host::ActiveModel>) -> CmdbResult<u64> {
        if hosts.is_empty() {
            return Ok(0);
        }
        let total = hosts.len() as u64;

        let txn = self.db.begin().await?;
        let mut pending = hosts.into_iter().peekable();
        while pending.peek().is_some() {
            let chunk: Vec<host::ActiveModel> = pending.by_ref().take(INSERT_CHUNK_SIZE).collect();
            if let Err(e) = host::Entity::insert_many(chunk).exec(&txn).await {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Rollback of host batch insert failed");
                }
                warn!(error = %e, batch_size = total, "Host batch insert rolled back");
                return Err(e.into());
            }
        }
        txn.commit().await?;

        info!(inserted = total, "Inserted host batch");
        Ok(total)
    }

    pub async fn get_by_id(&self, host_id: i32) -> CmdbResult<host::Model> {
        host::Entity::find_by_id(host_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(CmdbError::NotFound(host_id))
    }

    pub async fn exists_by_serial(&self, sn: i64) -> CmdbResult<bool> {
        self.exists(host::Column::Sn.eq(sn)).await
    }

    pub async fn exists_by_inner_ip(&self, inner_ip: &str) -> CmdbResult<bool> {
        self.exists(host::Column::InnerIp.eq(inner_ip)).await
    }

    async fn exists(&self, predicate: SimpleExpr) -> CmdbResult<bool> {
        let hit = host::Entity::find()
            .select_only()
            .column(host::Column::HostId)
            .filter(predicate)
            .into_tuple::<i32>()
            .one(self.db.as_ref())
            .await?;
        Ok(hit.is_some())
    }

    /// Runs a host query. Rows come back in storage order.
    pub async fn find(&self, query: &HostQuery) -> CmdbResult<Vec<HostRow>> {
        let plan = QueryPlan::build(query)?;
        debug!(
            predicates = plan.predicates.len(),
            joins = plan.joins.len(),
            sort_keys = plan.sort.len(),
            offset = plan.offset,
            limit = ?plan.limit,
            "Executing host query"
        );
        let models = plan
            .apply(host::Entity::find())
            .all(self.db.as_ref())
            .await?;
        Ok(plan.materialize(models))
    }

    /// Overwrites every attribute of an existing host except its id and its
    /// application/set/module placement, which only reassignment may change.
    pub async fn update_by_id(&self, host: host::Model) -> CmdbResult<u64> {
        let host_id = host.host_id;
        if host::Entity::find_by_id(host_id)
            .one(self.db.as_ref())
            .await?
            .is_none()
        {
            warn!(host_id, "Update of unknown host");
            return Err(CmdbError::NotFound(host_id));
        }

        let mut active: host::ActiveModel = host.into();
        for column in host::Column::iter() {
            active.reset(column);
        }
        active.host_id = NotSet;
        active.application_id = NotSet;
        active.set_id = NotSet;
        active.module_id = NotSet;
        active.is_distributed = NotSet;

        let result = host::Entity::update_many()
            .set(active)
            .filter(host::Column::HostId.eq(host_id))
            .exec(self.db.as_ref())
            .await?;
        info!(host_id, rows = result.rows_affected, "Updated host");
        Ok(result.rows_affected)
    }

    pub async fn delete_by_id(&self, host_id: i32) -> CmdbResult<u64> {
        if host::Entity::find_by_id(host_id)
            .one(self.db.as_ref())
            .await?
            .is_none()
        {
            warn!(host_id, "Delete of unknown host");
            return Err(CmdbError::NotFound(host_id));
        }
        let result = host::Entity::delete_by_id(host_id)
            .exec(self.db.as_ref())
            .await?;
        info!(host_id, rows = result.rows_affected, "Deleted host");
        Ok(result.rows_affected)
    }

    /// Deletes whichever of `host_ids` exist; unknown ids are ignored.
    pub async fn delete_by_ids(&self, host_ids: &[i32]) -> CmdbResult<u64> {
        let result = host::Entity::delete_many()
            .filter(host::Column::HostId.is_in(host_ids.iter().copied()))
            .exec(self.db.as_ref())
            .await?;
        info!(
            requested = host_ids.len(),
            rows = result.rows_affected,
            "Deleted hosts"
        );
        Ok(result.rows_affected)
    }

    /// Counts hosts in a grouping. An application's count leaves out hosts
    /// parked in its free-pool module.
    pub async fn count_matching(&self, grouping_id: i32, grouping: Grouping) -> CmdbResult<u64> {
        let mut select = host::Entity::find().filter(grouping.column().eq(grouping_id));
        if grouping == Grouping::Application {
            // NULL module names fall out of `<>` as well.
            select = select.filter(host::Column::ModuleName.ne(self.free_pool.module_name.as_str()));
        }
        Ok(select.count(self.db.as_ref()).await?)
    }
}
