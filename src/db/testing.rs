//! In-memory SQLite fixtures shared by the service tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    Iterable, Schema, Set,
};

use crate::config::FreePoolNames;
use crate::db::entities::{host, module, set};

pub const FREE_SET: &str = "空闲机池";
pub const FREE_MODULE: &str = "空闲机";

pub async fn setup_db() -> Arc<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect to in-memory sqlite");

    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    for stmt in [
        schema.create_table_from_entity(set::Entity),
        schema.create_table_from_entity(module::Entity),
        schema.create_table_from_entity(host::Entity),
    ] {
        db.execute(backend.build(&stmt)).await.expect("create table");
    }
    Arc::new(db)
}

pub fn pool_names() -> FreePoolNames {
    FreePoolNames {
        set_name: FREE_SET.to_string(),
        module_name: FREE_MODULE.to_string(),
    }
}

pub async fn insert_set(db: &DatabaseConnection, set_id: i32, application_id: i32, name: &str) {
    set::ActiveModel {
        set_id: Set(set_id),
        application_id: Set(application_id),
        set_name: Set(name.to_string()),
        description: Set(None),
    }
    .insert(db)
    .await
    .expect("insert set");
}

pub async fn insert_module(
    db: &DatabaseConnection,
    module_id: i32,
    application_id: i32,
    set_id: i32,
    name: &str,
) {
    module::ActiveModel {
        module_id: Set(module_id),
        application_id: Set(application_id),
        set_id: Set(set_id),
        module_name: Set(name.to_string()),
        operator: Set(None),
        bak_operator: Set(None),
    }
    .insert(db)
    .await
    .expect("insert module");
}

/// Application 1: free pool set 10 / module 100, plus set 11 / module 110 ("web").
/// Application 2: free pool set 20 / module 200.
/// Application 3: a "web" set only, no free pool.
/// Application 4: a free pool set with no module.
pub async fn seed_groupings(db: &DatabaseConnection) {
    insert_set(db, 10, 1, FREE_SET).await;
    insert_module(db, 100, 1, 10, FREE_MODULE).await;
    insert_set(db, 11, 1, "web").await;
    insert_module(db, 110, 1, 11, "nginx").await;
    insert_set(db, 20, 2, FREE_SET).await;
    insert_module(db, 200, 2, 20, FREE_MODULE).await;
    insert_set(db, 30, 3, "web").await;
    insert_set(db, 40, 4, FREE_SET).await;
}

/// A host parked in application 1's free pool.
pub fn sample_host(host_id: i32, inner_ip: &str) -> host::Model {
    host::Model {
        host_id,
        asset_id: Some(format!("ASSET-{host_id:04}")),
        auto_renew: Some(0),
        bak_operator: None,
        band_width: Some(100),
        cpu: 8,
        create_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        description: None,
        deadline_time: None,
        device_class: Some("S2.MEDIUM4".to_string()),
        hard_memo: None,
        host_name: Some(format!("host-{host_id}")),
        idc_name: Some("gz-1".to_string()),
        inner_ip: inner_ip.to_string(),
        inner_switch_port: None,
        image_id: None,
        last_time: None,
        mem: Some(16384),
        operator: Some("ops".to_string()),
        os_name: Some("linux".to_string()),
        outer_ip: None,
        outer_switch_port: None,
        pos_code: None,
        price: Some(120.0),
        project_id: None,
        region: Some("south".to_string()),
        server_rack: None,
        server_type: None,
        sn: Some(1000 + host_id as i64),
        source: 1,
        status: Some("running".to_string()),
        storage_id: None,
        storage_size: Some(100.0),
        storage_type: Some("ssd".to_string()),
        host_uuid: None,
        zone_id: Some(1),
        zone_name: Some("zone-a".to_string()),
        gse_proxy: None,
        vip: None,
        mod_name: None,
        module_id: Some(100),
        module_name: Some(FREE_MODULE.to_string()),
        set_id: Some(10),
        set_name: Some(FREE_SET.to_string()),
        application_id: Some(1),
        application_name: Some("app-1".to_string()),
        owner: Some("alice".to_string()),
        checked: None,
        is_distributed: false,
    }
}

/// Every column marked `Set`, so batches share one column list.
pub fn to_active(model: host::Model) -> host::ActiveModel {
    let mut active: host::ActiveModel = model.into();
    for column in host::Column::iter() {
        active.reset(column);
    }
    active
}

pub async fn host_count(db: &DatabaseConnection) -> u64 {
    use sea_orm::PaginatorTrait;
    host::Entity::find().count(db).await.expect("count hosts")
}
