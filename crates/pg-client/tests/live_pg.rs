//! Integration tests against a live PostgreSQL.
//!
//! Gated on `FJORD_PG_TEST=1`; every test is a no-op skip otherwise.
//! Connection details come from `FJORD_PG_TEST_HOST` / `_PORT` / `_DB` /
//! `_USER` / `_PASSWORD`, defaulting to a local dev server.

use fjord_pg_client::{BatchInsert, Client, ClientOptions, Error, Value};

fn live_options() -> Option<ClientOptions> {
    if std::env::var("FJORD_PG_TEST").as_deref() != Ok("1") {
        eprintln!("skipping: set FJORD_PG_TEST=1 to run live tests");
        return None;
    }

    let var = |name: &str, default: &str| {
        std::env::var(name).unwrap_or_else(|_| default.to_string())
    };

    let port = var("FJORD_PG_TEST_PORT", "5432").parse().expect("port");
    Some(
        ClientOptions::new(
            var("FJORD_PG_TEST_HOST", "localhost"),
            var("FJORD_PG_TEST_DB", "postgres"),
            var("FJORD_PG_TEST_USER", "postgres"),
            var("FJORD_PG_TEST_PASSWORD", "postgres"),
            1,
        )
        .with_port(port),
    )
}

async fn fresh_table(client: &mut Client, table: &str) {
    let tx = client.transaction().await.unwrap();
    Client::insert_in(&tx, &format!("DROP TABLE IF EXISTS {table}"), &[])
        .await
        .unwrap();
    Client::insert_in(
        &tx,
        &format!("CREATE TABLE {table} (id BIGINT PRIMARY KEY, name VARCHAR NOT NULL, title VARCHAR)"),
        &[],
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn insert_then_read_back_by_id() {
    let Some(options) = live_options() else { return };
    let mut client = Client::new(options).unwrap();
    fresh_table(&mut client, "fjord_test_single").await;

    let id = client.next_identity();
    client
        .insert(
            "INSERT INTO fjord_test_single (id, name, title) VALUES ($1, $2, $3)",
            &[Value::I64(id), Value::from("Johnny"), Value::from("User")],
        )
        .await
        .unwrap();

    let row = client
        .first_or_default(
            "SELECT * FROM fjord_test_single WHERE id = $1",
            &[Value::I64(id)],
        )
        .await
        .unwrap()
        .expect("row written above");

    assert_eq!(row["name"], Value::from("Johnny"));
    assert_eq!(row.column::<i64>("id").unwrap(), id);
    client.close().await;
}

#[tokio::test]
async fn bulk_ingestion_preserves_rows_nulls_and_order() {
    let Some(options) = live_options() else { return };
    let mut client = Client::new(options).unwrap();
    fresh_table(&mut client, "fjord_test_bulk").await;

    let g1 = client.next_identity();
    let g2 = client.next_identity();
    let ingested = client
        .insert_batch(BatchInsert::new(
            "fjord_test_bulk",
            ["id", "name", "title"],
            vec![
                vec![Value::I64(g1), Value::from("Fredrik"), Value::from("Owner")],
                vec![Value::I64(g2), Value::from("Pablo"), Value::Null],
            ],
        ))
        .await
        .unwrap();
    assert_eq!(ingested, 2);

    let rows = client
        .rows_where(
            "SELECT * FROM fjord_test_bulk WHERE id = $1 OR id = $2 ORDER BY id",
            &[Value::I64(g1), Value::I64(g2)],
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], Value::from("Fredrik"));
    assert_eq!(rows[1]["name"], Value::from("Pablo"));
    assert_eq!(rows[1]["title"], Value::Null);
    client.close().await;
}

#[tokio::test]
async fn mapped_projection_skips_generic_rows() {
    let Some(options) = live_options() else { return };
    let mut client = Client::new(options).unwrap();
    fresh_table(&mut client, "fjord_test_mapped").await;

    for name in ["a", "b", "c"] {
        let id = client.next_identity();
        client
            .insert(
                "INSERT INTO fjord_test_mapped (id, name) VALUES ($1, $2)",
                &[Value::I64(id), Value::from(name)],
            )
            .await
            .unwrap();
    }

    let names = client
        .rows_where_map(
            "SELECT name FROM fjord_test_mapped ORDER BY id",
            &[],
            |row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| Error::Query {
                        context: "reading name".into(),
                        source: e,
                    })
            },
        )
        .await
        .unwrap();

    assert_eq!(names, ["a", "b", "c"]);
    client.close().await;
}

#[tokio::test]
async fn insert_returning_yields_the_scalar() {
    let Some(options) = live_options() else { return };
    let mut client = Client::new(options).unwrap();
    fresh_table(&mut client, "fjord_test_returning").await;

    let id = client.next_identity();
    let returned = client
        .insert_returning(
            "INSERT INTO fjord_test_returning (id, name) VALUES ($1, $2) RETURNING id",
            &[Value::I64(id), Value::from("x")],
        )
        .await
        .unwrap();

    assert_eq!(returned, Some(Value::I64(id)));
    client.close().await;
}

#[tokio::test]
async fn first_or_default_takes_first_of_many() {
    let Some(options) = live_options() else { return };
    let mut client = Client::new(options).unwrap();
    fresh_table(&mut client, "fjord_test_first").await;

    for name in ["first", "second", "third"] {
        let id = client.next_identity();
        client
            .insert(
                "INSERT INTO fjord_test_first (id, name) VALUES ($1, $2)",
                &[Value::I64(id), Value::from(name)],
            )
            .await
            .unwrap();
    }

    // A caller-supplied limit larger than one still yields the first row.
    let row = client
        .first_or_default("SELECT * FROM fjord_test_first ORDER BY id LIMIT 5", &[])
        .await
        .unwrap()
        .expect("table has rows");
    assert_eq!(row["name"], Value::from("first"));

    // So does a query with no limit at all over several rows.
    let row = client
        .first_or_default("SELECT * FROM fjord_test_first ORDER BY id DESC", &[])
        .await
        .unwrap()
        .expect("table has rows");
    assert_eq!(row["name"], Value::from("third"));
    client.close().await;
}

#[tokio::test]
async fn insert_returning_takes_first_of_many() {
    let Some(options) = live_options() else { return };
    let mut client = Client::new(options).unwrap();
    fresh_table(&mut client, "fjord_test_returning_many").await;

    let id1 = client.next_identity();
    let id2 = client.next_identity();
    let returned = client
        .insert_returning(
            "INSERT INTO fjord_test_returning_many (id, name) VALUES ($1, $2), ($3, $4) RETURNING id",
            &[
                Value::I64(id1),
                Value::from("a"),
                Value::I64(id2),
                Value::from("b"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(returned, Some(Value::I64(id1)));
    client.close().await;
}

#[tokio::test]
async fn rolled_back_transaction_leaves_no_rows() {
    let Some(options) = live_options() else { return };
    let mut client = Client::new(options).unwrap();
    fresh_table(&mut client, "fjord_test_tx").await;

    let id = client.next_identity();
    {
        let tx = client.transaction().await.unwrap();
        Client::insert_in(
            &tx,
            "INSERT INTO fjord_test_tx (id, name) VALUES ($1, $2)",
            &[Value::I64(id), Value::from("ghost")],
        )
        .await
        .unwrap();
        tx.rollback().await.unwrap();
    }

    let row = client
        .first_or_default(
            "SELECT * FROM fjord_test_tx WHERE id = $1",
            &[Value::I64(id)],
        )
        .await
        .unwrap();
    assert!(row.is_none());
    client.close().await;
}

#[tokio::test]
async fn connect_and_close_are_idempotent() {
    let Some(options) = live_options() else { return };
    let mut client = Client::new(options).unwrap();

    client.connect().await.unwrap();
    client.connect().await.unwrap();
    assert!(client.is_connected());

    client.close().await;
    client.close().await;
    assert!(!client.is_connected());

    // Reconnect after close still works.
    client.connect().await.unwrap();
    client.close().await;
}

#[tokio::test]
async fn dropped_in_flight_operation_leaves_session_closable() {
    let Some(options) = live_options() else { return };
    let mut client = Client::new(options).unwrap();
    fresh_table(&mut client, "fjord_test_cancel").await;

    // Drop the operation future mid-flight; the timeout wins long
    // before the sleep completes.
    let slept = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        client.first_or_default("SELECT pg_sleep(10)", &[]),
    )
    .await;
    assert!(slept.is_err());

    // The session is still closable, and a fresh connection works.
    client.close().await;
    assert!(!client.is_connected());

    let id = client.next_identity();
    client
        .insert(
            "INSERT INTO fjord_test_cancel (id, name) VALUES ($1, $2)",
            &[Value::I64(id), Value::from("after")],
        )
        .await
        .unwrap();
    let row = client
        .first_or_default(
            "SELECT * FROM fjord_test_cancel WHERE id = $1",
            &[Value::I64(id)],
        )
        .await
        .unwrap()
        .expect("row written above");
    assert_eq!(row["name"], Value::from("after"));
    client.close().await;
}
