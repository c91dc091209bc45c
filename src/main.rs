use std::collections::BTreeMap;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cmdb_hosts::config::CmdbConfig;
use cmdb_hosts::db::{
    self,
    fields::validate_registry,
    query::HostQuery,
    services::{GroupResolver, Grouping, HostRepository, ReassignmentService},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Host inventory records", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query hosts
    List {
        /// `field=value`; comma-separated values match any of them, `null` matches missing
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, JsonValue)>,
        /// Same syntax as `--filter`, inverted
        #[arg(long = "exclude", value_parser = parse_pair)]
        excludes: Vec<(String, JsonValue)>,
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        sort_by: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        order: Vec<String>,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Show one host
    Get { host_id: i32 },
    /// Count hosts in a grouping; `--by application` leaves out the free pool
    Count {
        #[arg(long, value_enum)]
        by: GroupingArg,
        id: i32,
    },
    /// Hand hosts to an application
    Assign {
        #[arg(long = "app")]
        application_id: i32,
        #[arg(required = true)]
        host_ids: Vec<i32>,
    },
    /// Return hosts to an application's free pool
    Reclaim {
        #[arg(long = "app")]
        application_id: i32,
        #[arg(required = true)]
        host_ids: Vec<i32>,
    },
    /// Delete hosts
    Delete {
        #[arg(required = true)]
        host_ids: Vec<i32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GroupingArg {
    Application,
    Set,
    Module,
}

impl From<GroupingArg> for Grouping {
    fn from(arg: GroupingArg) -> Self {
        match arg {
            GroupingArg::Application => Grouping::Application,
            GroupingArg::Set => Grouping::Set,
            GroupingArg::Module => Grouping::Module,
        }
    }
}

/// Splits `field=value` into a filter entry.
fn parse_pair(raw: &str) -> Result<(String, JsonValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    let value = match value {
        "null" => JsonValue::Null,
        v if v.contains(',') => JsonValue::Array(
            v.split(',')
                .map(|part| JsonValue::String(part.trim().to_string()))
                .collect(),
        ),
        v => JsonValue::String(v.to_string()),
    };
    Ok((key.to_string(), value))
}

/// Builds a filter map, refusing a field given more than once.
fn collect_pairs(
    flag: &str,
    pairs: Vec<(String, JsonValue)>,
) -> Result<BTreeMap<String, JsonValue>, String> {
    let mut map = BTreeMap::new();
    for (key, value) in pairs {
        if map.contains_key(&key) {
            return Err(format!(
                "{flag} '{key}' given more than once; list the values comma-separated instead"
            ));
        }
        map.insert(key, value);
    }
    Ok(map)
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "cmdb.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // stdout carries command output
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = match CmdbConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };
    init_logging(&config.log_dir);
    validate_registry()?;

    let db = match db::connect(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            return Err(e.into());
        }
    };
    let hosts = HostRepository::new(db.clone(), config.free_pool.clone());
    let resolver = GroupResolver::new(db.clone(), config.free_pool.clone());
    let reassignment = ReassignmentService::new(db, resolver);

    match args.command {
        Command::List {
            filters,
            excludes,
            fields,
            sort_by,
            order,
            offset,
            limit,
        } => {
            let query = HostQuery {
                filters: collect_pairs("--filter", filters)?,
                excludes: collect_pairs("--exclude", excludes)?,
                fields,
                sort_by,
                order,
                offset,
                limit,
            };
            let rows = hosts.find(&query).await?;
            info!(rows = rows.len(), "Listed hosts");
            print_json(&rows)?;
        }
        Command::Get { host_id } => {
            print_json(&hosts.get_by_id(host_id).await?)?;
        }
        Command::Count { by, id } => {
            let count = hosts.count_matching(id, by.into()).await?;
            print_json(&json!({ "count": count }))?;
        }
        Command::Assign {
            application_id,
            host_ids,
        } => {
            let rows = reassignment
                .assign_to_application(&host_ids, application_id)
                .await?;
            print_json(&json!({ "updated": rows }))?;
        }
        Command::Reclaim {
            application_id,
            host_ids,
        } => {
            let rows = reassignment
                .reclaim_from_application(&host_ids, application_id)
                .await?;
            print_json(&json!({ "updated": rows }))?;
        }
        Command::Delete { host_ids } => {
            let rows = hosts.delete_by_ids(&host_ids).await?;
            print_json(&json!({ "deleted": rows }))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("idc_name=gz-1").unwrap(), ("idc_name".to_string(), json!("gz-1")));
        assert_eq!(parse_pair("set_id=1,2").unwrap(), ("set_id".to_string(), json!(["1", "2"])));
        assert_eq!(parse_pair("outer_ip=null").unwrap(), ("outer_ip".to_string(), JsonValue::Null));
        assert!(parse_pair("idc_name").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn test_repeated_filter_key_is_rejected() {
        let pairs = vec![
            ("cpu".to_string(), json!("8")),
            ("cpu".to_string(), json!("16")),
        ];
        let err = collect_pairs("--filter", pairs).unwrap_err();
        assert!(err.contains("'cpu' given more than once"));

        let pairs = vec![
            ("cpu".to_string(), json!("8")),
            ("owner".to_string(), JsonValue::Null),
        ];
        assert_eq!(collect_pairs("--filter", pairs).unwrap().len(), 2);
    }

    #[test]
    fn test_list_arguments() {
        let args = Args::try_parse_from([
            "cmdb", "list", "--filter", "cpu=8", "--sort-by", "cpu,inner_ip", "--order", "desc",
            "--limit", "5",
        ])
        .unwrap();
        match args.command {
            Command::List { filters, sort_by, order, limit, offset, .. } => {
                assert_eq!(filters, vec![("cpu".to_string(), json!("8"))]);
                assert_eq!(sort_by, vec!["cpu", "inner_ip"]);
                assert_eq!(order, vec!["desc"]);
                assert_eq!(limit, Some(5));
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_assign_requires_hosts() {
        assert!(Args::try_parse_from(["cmdb", "assign", "--app", "2"]).is_err());
    }
}
