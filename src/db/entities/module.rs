use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "module")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub module_id: i32,
    pub application_id: i32,
    pub set_id: i32,
    pub module_name: String,
    pub operator: Option<String>,
    pub bak_operator: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::set::Entity",
        from = "Column::SetId",
        to = "super::set::Column::SetId"
    )]
    AppSet,
    #[sea_orm(has_many = "super::host::Entity")]
    Hosts,
}

impl Related<super::set::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppSet.def()
    }
}

impl Related<super::host::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hosts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
