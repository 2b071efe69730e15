//! Command-line access to a single collection.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `COLLECTIONS_NODES` | http://localhost:9200 | Elasticsearch nodes (comma-separated) |
//! | `COLLECTIONS_INDEX` | - | Index to operate on |
//! | `COLLECTIONS_TIMEOUT` | 1s | Document write timeout |
//! | `COLLECTIONS_LOG_LEVEL` | warn | Log level |

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use helios_collections::{
    AfterExecute, ClientBuilder, CollectionClient, Condition, ConnectionConfig, DynamicCollection,
    init_logging,
};
use serde_json::Value;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "collections")]
#[command(about = "Query and write documents in an Elasticsearch collection")]
struct Cli {
    /// Elasticsearch node URLs.
    #[arg(
        long,
        env = "COLLECTIONS_NODES",
        value_delimiter = ',',
        default_value = "http://localhost:9200"
    )]
    nodes: Vec<String>,

    /// Index to operate on.
    #[arg(short, long, env = "COLLECTIONS_INDEX")]
    index: String,

    /// Document write timeout.
    #[arg(long, env = "COLLECTIONS_TIMEOUT", default_value = "1s")]
    timeout: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "COLLECTIONS_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check whether the engine answers.
    Ping,
    /// Count matching documents.
    Count(Filters),
    /// Search and print the `{data, total}` envelope.
    Search {
        #[command(flatten)]
        filters: Filters,

        /// Sort key as `field` or `field:asc|desc` (repeatable).
        #[arg(long = "order-by")]
        order_by: Vec<String>,

        /// Page size.
        #[arg(long)]
        limit: Option<i64>,

        /// Page offset.
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Insert one JSON document.
    Insert {
        /// The document, as JSON.
        document: String,

        /// Make the document searchable immediately.
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Debug, Args)]
struct Filters {
    /// Condition as `field:operator:value` (repeatable, joined with AND).
    #[arg(long = "where")]
    conditions: Vec<String>,
}

/// Parses `field:operator:value`. The value is read as JSON when it parses,
/// as a plain string otherwise.
fn parse_condition(raw: &str) -> anyhow::Result<Condition> {
    let mut parts = raw.splitn(3, ':');
    let (Some(field), Some(operator), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("condition '{raw}' is not of the form field:operator:value");
    };
    let value = serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::from(value));
    Ok(Condition::new(field, operator, value))
}

fn apply_filters(
    client: &mut CollectionClient<DynamicCollection>,
    filters: &Filters,
) -> anyhow::Result<()> {
    client.find();
    for raw in &filters.conditions {
        client.and_filter(parse_condition(raw)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = ConnectionConfig {
        nodes: cli.nodes.clone(),
        timeout: cli.timeout.clone(),
        ..Default::default()
    };

    info!(index = %cli.index, nodes = ?config.nodes, "Connecting");

    let mut client = ClientBuilder::new(DynamicCollection::new(&cli.index))
        .try_connect(&config)
        .await
        .context("failed to set up collection client")?;

    match cli.command {
        Command::Ping => {
            println!("{}", client.is_connected().await);
        }
        Command::Count(filters) => {
            apply_filters(&mut client, &filters)?;
            let count = client.try_count(AfterExecute::Reset).await?;
            println!("{count}");
        }
        Command::Search {
            filters,
            order_by,
            limit,
            offset,
        } => {
            apply_filters(&mut client, &filters)?;
            for key in &order_by {
                match key.split_once(':') {
                    Some((field, direction)) => client.order_by_str(field, direction),
                    None => client.order_by(key.as_str()),
                };
            }
            if let Some(limit) = limit {
                client.limit(limit);
            }
            if let Some(offset) = offset {
                client.offset(offset);
            }
            let envelope = client.try_search(AfterExecute::Reset).await?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Command::Insert { document, refresh } => {
            let document: Value =
                serde_json::from_str(&document).context("document is not valid JSON")?;
            let written = client.try_insert(&document, refresh).await?;
            println!("{written}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_collections::Operator;
    use serde_json::json;

    #[test]
    fn test_parse_condition_json_value() {
        let condition = parse_condition("age:between:[18,30]").unwrap();
        assert_eq!(condition.field, "age");
        assert_eq!(condition.operator, Operator::Between);
        assert_eq!(condition.value, json!([18, 30]));
    }

    #[test]
    fn test_parse_condition_plain_string() {
        let condition = parse_condition("url:=:http://x").unwrap();
        assert_eq!(condition.operator, Operator::Eq);
        assert_eq!(condition.value, json!("http://x"));
    }

    #[test]
    fn test_parse_condition_rejects_missing_parts() {
        assert!(parse_condition("age:>").is_err());
    }

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "collections",
            "--index",
            "users",
            "search",
            "--where",
            "age:>=:18",
            "--order-by",
            "name:desc",
            "--limit",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.nodes, vec!["http://localhost:9200"]);
        let Command::Search {
            filters, limit, ..
        } = cli.command
        else {
            panic!("expected search");
        };
        assert_eq!(filters.conditions, vec!["age:>=:18"]);
        assert_eq!(limit, Some(5));
    }
}
