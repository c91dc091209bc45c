use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A physical or virtual machine tracked by the inventory.
///
/// `application_id`/`set_id`/`module_id` together with `is_distributed` are only
/// rewritten by the reassignment service.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "host")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "id")]
    pub host_id: i32,
    pub asset_id: Option<String>,
    pub auto_renew: Option<i16>,
    pub bak_operator: Option<i32>,
    pub band_width: Option<i32>,
    pub cpu: i32,
    pub create_time: ChronoDateTimeUtc,
    pub description: Option<String>,
    pub deadline_time: Option<ChronoDateTimeUtc>,
    pub device_class: Option<String>,
    pub hard_memo: Option<String>,
    pub host_name: Option<String>,
    pub idc_name: Option<String>,
    pub inner_ip: String,
    #[sea_orm(column_name = "inner_switchport")]
    pub inner_switch_port: Option<i32>,
    pub image_id: Option<i32>,
    pub last_time: Option<ChronoDateTimeUtc>,
    pub mem: Option<i32>,
    pub operator: Option<String>,
    pub os_name: Option<String>,
    pub outer_ip: Option<String>,
    #[sea_orm(column_name = "outer_switchport")]
    pub outer_switch_port: Option<String>,
    #[sea_orm(column_name = "poscode")]
    pub pos_code: Option<String>,
    pub price: Option<f64>,
    pub project_id: Option<i32>,
    pub region: Option<String>,
    pub server_rack: Option<String>,
    pub server_type: Option<String>,
    pub sn: Option<i64>,
    pub source: i16,
    pub status: Option<String>,
    pub storage_id: Option<i32>,
    pub storage_size: Option<f64>,
    pub storage_type: Option<String>,
    // `Uuid` would shadow the prelude type as a column variant
    #[sea_orm(column_name = "uuid")]
    pub host_uuid: Option<i32>,
    pub zone_id: Option<i32>,
    pub zone_name: Option<String>,
    pub gse_proxy: Option<String>,
    pub vip: Option<String>,
    pub mod_name: Option<String>,
    pub module_id: Option<i32>,
    pub module_name: Option<String>,
    pub set_id: Option<i32>,
    pub set_name: Option<String>,
    pub application_id: Option<i32>,
    pub application_name: Option<String>,
    pub owner: Option<String>,
    pub checked: Option<String>,
    pub is_distributed: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::set::Entity",
        from = "Column::SetId",
        to = "super::set::Column::SetId"
    )]
    AppSet,
    #[sea_orm(
        belongs_to = "super::module::Entity",
        from = "Column::ModuleId",
        to = "super::module::Column::ModuleId"
    )]
    AppModule,
}

impl Related<super::set::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppSet.def()
    }
}

impl Related<super::module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppModule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
