//! Bulk-load demo: snowflake identities plus binary COPY ingestion.
//!
//! Run against a throwaway database:
//!
//! ```text
//! cargo run --example bulk_load -- localhost app svc secret
//! ```

use fjord_pg_client::{BatchInsert, Client, ClientOptions, Result, Value};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let mut next = |name: &str, default: &str| {
        args.next().unwrap_or_else(|| {
            eprintln!("no {name} argument, using {default:?}");
            default.to_string()
        })
    };

    let options = ClientOptions::new(
        next("host", "localhost"),
        next("database", "postgres"),
        next("username", "postgres"),
        next("password", "postgres"),
        1,
    );

    let mut client = Client::new(options)?;

    client
        .insert(
            "CREATE TABLE IF NOT EXISTS bulk_demo \
             (id BIGINT PRIMARY KEY, name VARCHAR NOT NULL, title VARCHAR)",
            &[],
        )
        .await?;

    let rows: Vec<Vec<Value>> = (0..10_000)
        .map(|n| {
            vec![
                Value::I64(client.next_identity()),
                Value::Str(format!("user-{n}")),
                if n % 7 == 0 {
                    Value::Null
                } else {
                    Value::Str(format!("title-{n}"))
                },
            ]
        })
        .collect();

    let ingested = client
        .insert_batch(BatchInsert::new("bulk_demo", ["id", "name", "title"], rows))
        .await?;
    println!("ingested {ingested} rows");

    let first = client
        .first_or_default("SELECT * FROM bulk_demo ORDER BY id", &[])
        .await?;
    if let Some(row) = first {
        println!("first row: id={} name={}", row["id"], row["name"]);
    }

    client.close().await;
    Ok(())
}
