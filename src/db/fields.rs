//! Logical field names for hosts and their storage columns.
//!
//! Every host attribute is registered once with its column and an accessor used
//! for projection. Dotted names (`set.set_name`, `module.module_name`) address a
//! column of a related table and carry the relation that has to be joined.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ColumnTrait, ColumnType, IdenStatic, IntoSimpleExpr, Iterable};
use serde_json::Value as JsonValue;

use crate::db::entities::{host, module, set};
use crate::db::error::{CmdbError, CmdbResult};

#[derive(Debug)]
pub struct HostField {
    pub name: &'static str,
    pub column: host::Column,
    pub read: fn(&host::Model) -> JsonValue,
}

macro_rules! host_field {
    ($name:literal, $column:ident, $attr:ident) => {
        HostField {
            name: $name,
            column: host::Column::$column,
            read: |h: &host::Model| serde_json::to_value(&h.$attr).unwrap_or(JsonValue::Null),
        }
    };
}

static HOST_FIELDS: &[HostField] = &[
    host_field!("host_id", HostId, host_id),
    host_field!("asset_id", AssetId, asset_id),
    host_field!("auto_renew", AutoRenew, auto_renew),
    host_field!("bak_operator", BakOperator, bak_operator),
    host_field!("band_width", BandWidth, band_width),
    host_field!("cpu", Cpu, cpu),
    host_field!("create_time", CreateTime, create_time),
    host_field!("description", Description, description),
    host_field!("deadline_time", DeadlineTime, deadline_time),
    host_field!("device_class", DeviceClass, device_class),
    host_field!("hard_memo", HardMemo, hard_memo),
    host_field!("host_name", HostName, host_name),
    host_field!("idc_name", IdcName, idc_name),
    host_field!("inner_ip", InnerIp, inner_ip),
    host_field!("inner_switch_port", InnerSwitchPort, inner_switch_port),
    host_field!("image_id", ImageId, image_id),
    host_field!("last_time", LastTime, last_time),
    host_field!("mem", Mem, mem),
    host_field!("operator", Operator, operator),
    host_field!("os_name", OsName, os_name),
    host_field!("outer_ip", OuterIp, outer_ip),
    host_field!("outer_switch_port", OuterSwitchPort, outer_switch_port),
    host_field!("pos_code", PosCode, pos_code),
    host_field!("price", Price, price),
    host_field!("project_id", ProjectId, project_id),
    host_field!("region", Region, region),
    host_field!("server_rack", ServerRack, server_rack),
    host_field!("server_type", ServerType, server_type),
    host_field!("sn", Sn, sn),
    host_field!("source", Source, source),
    host_field!("status", Status, status),
    host_field!("storage_id", StorageId, storage_id),
    host_field!("storage_size", StorageSize, storage_size),
    host_field!("storage_type", StorageType, storage_type),
    host_field!("uuid", HostUuid, host_uuid),
    host_field!("zone_id", ZoneId, zone_id),
    host_field!("zone_name", ZoneName, zone_name),
    host_field!("gse_proxy", GseProxy, gse_proxy),
    host_field!("vip", Vip, vip),
    host_field!("mod_name", ModName, mod_name),
    host_field!("module_id", ModuleId, module_id),
    host_field!("module_name", ModuleName, module_name),
    host_field!("set_id", SetId, set_id),
    host_field!("set_name", SetName, set_name),
    host_field!("application_id", ApplicationId, application_id),
    host_field!("application_name", ApplicationName, application_name),
    host_field!("owner", Owner, owner),
    host_field!("checked", Checked, checked),
    host_field!("is_distributed", IsDistributed, is_distributed),
];

static HOST_FIELD_INDEX: Lazy<HashMap<&'static str, &'static HostField>> =
    Lazy::new(|| HOST_FIELDS.iter().map(|f| (f.name, f)).collect());

static SET_FIELDS: &[(&str, set::Column)] = &[
    ("set_id", set::Column::SetId),
    ("application_id", set::Column::ApplicationId),
    ("set_name", set::Column::SetName),
    ("description", set::Column::Description),
];

static MODULE_FIELDS: &[(&str, module::Column)] = &[
    ("module_id", module::Column::ModuleId),
    ("application_id", module::Column::ApplicationId),
    ("set_id", module::Column::SetId),
    ("module_name", module::Column::ModuleName),
    ("operator", module::Column::Operator),
    ("bak_operator", module::Column::BakOperator),
];

/// A resolved logical field: either a host column or a column reached through
/// one of the host's relations.
#[derive(Clone, Copy, Debug)]
pub enum FieldPath {
    Host(host::Column),
    Set(set::Column),
    Module(module::Column),
}

impl PartialEq for FieldPath {
    fn eq(&self, other: &Self) -> bool {
        self.physical_name() == other.physical_name()
    }
}

impl Eq for FieldPath {}

impl FieldPath {
    /// The relation that must be joined before this field can be referenced.
    pub fn relation(&self) -> Option<host::Relation> {
        match self {
            FieldPath::Host(_) => None,
            FieldPath::Set(_) => Some(host::Relation::AppSet),
            FieldPath::Module(_) => Some(host::Relation::AppModule),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match *self {
            FieldPath::Host(c) => c.def().get_column_type().clone(),
            FieldPath::Set(c) => c.def().get_column_type().clone(),
            FieldPath::Module(c) => c.def().get_column_type().clone(),
        }
    }

    /// Table-qualified column expression.
    pub fn expr(&self) -> SimpleExpr {
        match *self {
            FieldPath::Host(c) => c.into_simple_expr(),
            FieldPath::Set(c) => c.into_simple_expr(),
            FieldPath::Module(c) => c.into_simple_expr(),
        }
    }

    pub fn physical_name(&self) -> String {
        match *self {
            FieldPath::Host(c) => c.as_str().to_string(),
            FieldPath::Set(c) => format!("set.{}", c.as_str()),
            FieldPath::Module(c) => format!("module.{}", c.as_str()),
        }
    }
}

/// Looks up a host attribute by logical name.
pub fn host_field(name: &str) -> CmdbResult<&'static HostField> {
    HOST_FIELD_INDEX
        .get(name)
        .copied()
        .ok_or_else(|| CmdbError::FieldNotFound(name.to_string()))
}

/// Resolves a logical field name, following a single `relation.field` hop.
pub fn resolve(name: &str) -> CmdbResult<FieldPath> {
    let not_found = || CmdbError::FieldNotFound(name.to_string());
    match name.split_once('.') {
        None => host_field(name).map(|f| FieldPath::Host(f.column)),
        Some((relation, field)) => {
            if field.contains('.') {
                return Err(not_found());
            }
            match relation {
                "set" => SET_FIELDS
                    .iter()
                    .find(|(n, _)| *n == field)
                    .map(|(_, c)| FieldPath::Set(*c))
                    .ok_or_else(not_found),
                "module" => MODULE_FIELDS
                    .iter()
                    .find(|(n, _)| *n == field)
                    .map(|(_, c)| FieldPath::Module(*c))
                    .ok_or_else(not_found),
                _ => Err(not_found()),
            }
        }
    }
}

/// Physical storage column for a logical name.
pub fn physical_column(name: &str) -> CmdbResult<String> {
    resolve(name).map(|p| p.physical_name())
}

/// Logical name of a host column.
pub fn logical_name(column: host::Column) -> Option<&'static str> {
    HOST_FIELDS
        .iter()
        .find(|f| f.column.as_str() == column.as_str())
        .map(|f| f.name)
}

/// Checks that the registry covers every host column exactly once.
pub fn validate_registry() -> CmdbResult<()> {
    check_registry(HOST_FIELDS)
}

fn check_registry(fields: &[HostField]) -> CmdbResult<()> {
    let mut names = HashSet::new();
    let mut columns = HashSet::new();
    for field in fields {
        if !names.insert(field.name) {
            return Err(CmdbError::RegistryMismatch(format!(
                "logical name {} registered more than once",
                field.name
            )));
        }
        if !columns.insert(field.column.as_str()) {
            return Err(CmdbError::RegistryMismatch(format!(
                "column {} registered more than once",
                field.column.as_str()
            )));
        }
    }
    match host::Column::iter().find(|c| !columns.contains(c.as_str())) {
        Some(column) => Err(CmdbError::RegistryMismatch(format!(
            "column {} has no logical field",
            column.as_str()
        ))),
        None => Ok(()),
    }
}

/// Builds a map holding only the requested fields of a host.
pub fn project(model: &host::Model, fields: &[&'static HostField]) -> serde_json::Map<String, JsonValue> {
    fields
        .iter()
        .map(|f| (f.name.to_string(), (f.read)(model)))
        .collect()
}
