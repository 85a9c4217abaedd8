mod common;

use chrono::{DateTime, Utc};
use common::{account_db, connect};
use ramdb::{Error, ExecResult, Result, Value};

#[test]
fn test_update_by_autoincrement_id() -> Result<()> {
    let mut conn = account_db("update_by_id")?;
    conn.exec("INSERT INTO account ('email') VALUES ('foo@bar.com')", &[])?;
    conn.exec("INSERT INTO account ('email') VALUES ('leon@bar.com')", &[])?;

    let result = conn.exec(
        "UPDATE account SET email = $1 WHERE id = $2",
        &[Value::from("roger@gmail.com"), Value::Integer(2)],
    )?;
    assert_eq!(result.rows_affected, 1);

    let email: Option<(String,)> = conn.query_row("SELECT email FROM account WHERE id = 2", &[])?;
    assert_eq!(email, Some(("roger@gmail.com".to_string(),)));
    let email: Option<(String,)> = conn.query_row("SELECT email FROM account WHERE id = 1", &[])?;
    assert_eq!(email, Some(("foo@bar.com".to_string(),)));
    Ok(())
}

#[test]
fn test_is_null_counts() -> Result<()> {
    let mut conn = account_db("is_null_counts")?;
    conn.exec("INSERT INTO account (email, age) VALUES ('a@x', 1), (NULL, 2), ('c@x', NULL)", &[])?;

    let count = |conn: &mut ramdb::Connection, sql: &str| -> Result<i64> {
        Ok(conn.query_row::<(i64,)>(sql, &[])?.map_or(0, |(n,)| n))
    };
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM account WHERE email IS NULL")?, 1);
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM account WHERE email IS NOT NULL")?, 2);
    assert_eq!(count(&mut conn, "SELECT COUNT(age) FROM account")?, 2);
    // NULL is neither equal nor unequal to anything
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM account WHERE age != 1")?, 1);
    assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM account WHERE age = NULL")?, 0);
    Ok(())
}

#[test]
fn test_update_where_is_null() -> Result<()> {
    let mut conn = connect("update_where_is_null")?;
    conn.exec(
        "CREATE TABLE account (id INT AUTOINCREMENT, email TEXT, \
         creation_date TIMESTAMP WITH TIME ZONE)",
        &[],
    )?;
    conn.exec("INSERT INTO account ('email') VALUES ('foo@bar.com')", &[])?;
    conn.exec("INSERT INTO account ('email') VALUES ('leon@bar.com')", &[])?;

    let now = Utc::now();
    let result = conn.exec(
        "UPDATE account SET email = 'roger@gmail.com', creation_date = $1 \
         WHERE id = 2 AND creation_date IS NULL",
        &[Value::from(now)],
    )?;
    assert_eq!(result.rows_affected, 1);

    let ids = |conn: &mut ramdb::Connection, sql: &str| -> Result<Vec<i64>> {
        let mut rows = conn.query(sql, &[])?;
        let mut ids = Vec::new();
        while rows.next() {
            ids.push(rows.get::<i64>(0)?);
        }
        Ok(ids)
    };
    assert_eq!(ids(&mut conn, "SELECT id FROM account WHERE creation_date IS NULL")?, vec![1]);
    assert_eq!(ids(&mut conn, "SELECT id FROM account WHERE creation_date IS NOT NULL")?, vec![2]);

    let stamped: Option<(String, DateTime<Utc>)> =
        conn.query_row("SELECT email, creation_date FROM account WHERE id = 2", &[])?;
    assert_eq!(stamped, Some(("roger@gmail.com".to_string(), now)));

    // the row is no longer NULL, so running it again changes nothing
    let result = conn.exec(
        "UPDATE account SET creation_date = $1 WHERE id = 2 AND creation_date IS NULL",
        &[Value::from(now)],
    )?;
    assert_eq!(result.rows_affected, 0);
    Ok(())
}

#[test]
fn test_order_by_with_nan() -> Result<()> {
    let mut conn = connect("order_by_nan")?;
    conn.exec("CREATE TABLE t (v FLOAT)", &[])?;
    for i in 0..60i64 {
        let value = if i % 3 == 0 {
            Value::Float(f64::NAN)
        } else {
            Value::Float(((i * 37) % 60) as f64)
        };
        conn.exec("INSERT INTO t VALUES ($1)", &[value])?;
    }
    conn.exec("INSERT INTO t VALUES (NULL)", &[])?;

    let mut rows = conn.query("SELECT v FROM t ORDER BY v", &[])?;
    let mut values = Vec::new();
    while rows.next() {
        values.push(rows.get::<Option<f64>>(0)?);
    }
    assert_eq!(values.len(), 61);
    assert_eq!(values[0], None);
    let numbers: Vec<f64> = values[1..].iter().flatten().copied().collect();
    let (ordered, nans) = numbers.split_at(40);
    assert!(ordered.windows(2).all(|w| w[0] <= w[1]), "{:?}", ordered);
    assert!(nans.iter().all(|v| v.is_nan()));

    let mut rows = conn.query("SELECT v FROM t ORDER BY v DESC LIMIT 25", &[])?;
    let mut top = Vec::new();
    while rows.next() {
        top.push(rows.get::<f64>(0)?);
    }
    assert!(top[..20].iter().all(|v| v.is_nan()));
    assert!(top[20..].windows(2).all(|w| w[0] >= w[1]));
    Ok(())
}

#[test]
fn test_timestamp_defaults() -> Result<()> {
    let mut conn = connect("timestamp_defaults")?;
    conn.exec(
        "CREATE TABLE event (
            id INT AUTOINCREMENT,
            name TEXT,
            created TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
            modified TIMESTAMP DEFAULT NOW() ON UPDATE CURRENT_TIMESTAMP
        )",
        &[],
    )?;
    let before = Utc::now();
    conn.exec("INSERT INTO event (name) VALUES ('boot')", &[])?;

    let (created, modified): (DateTime<Utc>, DateTime<Utc>) = conn
        .query_row("SELECT created, modified FROM event WHERE id = 1", &[])?
        .ok_or_else(|| Error::Internal("event row missing".into()))?;
    assert!(created >= before - chrono::Duration::seconds(1));

    conn.exec("UPDATE event SET name = 'reboot' WHERE id = 1", &[])?;
    let (created_after, modified_after): (DateTime<Utc>, DateTime<Utc>) = conn
        .query_row("SELECT created, modified FROM event", &[])?
        .ok_or_else(|| Error::Internal("event row missing".into()))?;
    assert_eq!(created_after, created);
    assert!(modified_after > modified);

    conn.exec("INSERT INTO event (name, created) VALUES ('fixed', '2020-01-02 03:04:05')", &[])?;
    let created: Option<(DateTime<Utc>,)> =
        conn.query_row("SELECT created FROM event WHERE name = 'fixed'", &[])?;
    assert_eq!(created.map(|(c,)| c.to_rfc3339()), Some("2020-01-02T03:04:05+00:00".to_string()));
    Ok(())
}

#[test]
fn test_delete_and_truncate() -> Result<()> {
    let mut conn = account_db("delete_and_truncate")?;
    conn.exec("INSERT INTO account (email) VALUES ('a'), ('b'), ('c')", &[])?;

    assert_eq!(conn.exec("DELETE FROM account WHERE email = 'b'", &[])?.rows_affected, 1);
    assert_eq!(conn.exec("DELETE FROM account", &[])?.rows_affected, 2);
    let mut rows = conn.query("SELECT * FROM account", &[])?;
    assert!(!rows.next());

    conn.exec("INSERT INTO account (email) VALUES ('d')", &[])?;
    conn.exec("TRUNCATE account", &[])?;
    assert_eq!(conn.query_row::<(i64,)>("SELECT COUNT(*) FROM account", &[])?, Some((0,)));
    assert!(matches!(conn.exec("TRUNCATE nothing", &[]), Err(Error::Schema(_))));
    Ok(())
}

#[test]
fn test_autoincrement_survives_deletes() -> Result<()> {
    let mut conn = account_db("autoincrement_deletes")?;
    let mut last = 0;
    for round in 0..5 {
        let result = conn.exec(
            "INSERT INTO account (email) VALUES ($1)",
            &[Value::from(format!("user{}", round))],
        )?;
        let id = result.last_insert_id.unwrap_or_default();
        assert!(id > last, "{} not above {}", id, last);
        last = id;
        conn.exec("DELETE FROM account WHERE id = $1", &[Value::Integer(id)])?;
    }
    conn.exec("TRUNCATE account", &[])?;
    let result = conn.exec("INSERT INTO account (email) VALUES ('after')", &[])?;
    assert_eq!(result.last_insert_id, Some(last + 1));

    let explicit = conn.exec("INSERT INTO account (id, email) VALUES (1, 'x')", &[]);
    assert!(matches!(explicit, Err(Error::Constraint(_))));
    Ok(())
}

#[test]
fn test_implicit_where() -> Result<()> {
    let mut conn = account_db("implicit_where")?;
    conn.exec("INSERT INTO account (email, age) VALUES ('a', 3), ('b', 1), ('c', 2)", &[])?;

    let all = |conn: &mut ramdb::Connection, sql: &str| -> Result<Vec<Vec<Value>>> {
        let mut rows = conn.query(sql, &[])?;
        let mut out = Vec::new();
        while rows.next() {
            out.push(rows.scan()?);
        }
        Ok(out)
    };
    let implicit = all(&mut conn, "SELECT * FROM account")?;
    assert_eq!(implicit.len(), 3);
    assert_eq!(implicit, all(&mut conn, "SELECT * FROM account WHERE 1 = 1")?);
    Ok(())
}

#[test]
fn test_order_limit_offset() -> Result<()> {
    let mut conn = account_db("order_limit_offset")?;
    conn.exec(
        "INSERT INTO account (email, age) \
         VALUES ('a', 30), ('b', 10), ('c', NULL), ('d', 20), ('e', 10)",
        &[],
    )?;

    let mut rows = conn.query(
        "SELECT email FROM account ORDER BY age DESC, email LIMIT 3 OFFSET 1",
        &[],
    )?;
    let mut emails = Vec::new();
    while rows.next() {
        emails.push(rows.get::<String>(0)?);
    }
    assert_eq!(emails, vec!["d", "b", "e"]);

    let first: Option<(String,)> = conn.query_row("SELECT email FROM account ORDER BY age", &[])?;
    assert_eq!(first, Some(("c".to_string(),)));
    Ok(())
}

#[test]
fn test_joins_and_aggregates() -> Result<()> {
    let mut conn = account_db("joins_and_aggregates")?;
    conn.exec("CREATE TABLE address (id INT AUTOINCREMENT, account_id BIGINT, city TEXT)", &[])?;
    conn.exec("INSERT INTO account (email, age) VALUES ('a', 20), ('b', 40), ('c', 60)", &[])?;
    conn.exec(
        "INSERT INTO address (account_id, city) VALUES (1, 'Paris'), (1, 'Lyon'), (2, 'Nice')",
        &[],
    )?;

    let mut rows = conn.query(
        "SELECT account.email, address.city FROM account
         JOIN address ON account.id = address.account_id
         ORDER BY address.city",
        &[],
    )?;
    assert_eq!(rows.columns(), ["email", "city"]);
    let mut pairs = Vec::new();
    while rows.next() {
        pairs.push(rows.scan::<(String, String)>()?);
    }
    assert_eq!(pairs[0], ("a".to_string(), "Lyon".to_string()));
    assert_eq!(pairs.len(), 3);

    let lonely: Option<(String, Option<String>)> = conn.query_row(
        "SELECT account.email, address.city FROM account
         LEFT JOIN address ON account.id = address.account_id
         WHERE address.id IS NULL",
        &[],
    )?;
    assert_eq!(lonely, Some(("c".to_string(), None)));

    let stats: Option<(i64, i64, i64, i64, f64)> =
        conn.query_row(
            "SELECT COUNT(*), MIN(age), MAX(age), SUM(age), AVG(age) FROM account",
            &[],
        )?;
    assert_eq!(stats, Some((3, 20, 60, 120, 40.0)));

    let mixed = conn.query("SELECT email, COUNT(*) FROM account", &[]);
    assert!(matches!(mixed, Err(Error::Schema(_))));
    Ok(())
}

#[test]
fn test_returning_and_exec_result() -> Result<()> {
    let mut conn = account_db("returning")?;
    let result = conn.exec("INSERT INTO account (email) VALUES ('a'), ('b')", &[])?;
    assert_eq!(
        result,
        ExecResult {
            rows_affected: 2,
            last_insert_id: Some(2)
        }
    );

    let id: Option<(i64,)> = conn.query_row(
        "INSERT INTO account (email) VALUES ($1) RETURNING id",
        &[Value::from("c")],
    )?;
    assert_eq!(id, Some((3,)));

    let result = conn.exec("CREATE TABLE IF NOT EXISTS account (id INT)", &[])?;
    assert_eq!(result.rows_affected, 0);
    assert!(matches!(conn.exec("CREATE TABLE account (id INT)", &[]), Err(Error::Schema(_))));
    conn.exec("DROP TABLE account", &[])?;
    conn.exec("DROP TABLE IF EXISTS account", &[])?;
    assert!(matches!(conn.exec("DROP TABLE account", &[]), Err(Error::Schema(_))));
    Ok(())
}

#[test]
fn test_parameter_mismatch() -> Result<()> {
    let mut conn = account_db("parameter_mismatch")?;
    let missing = conn.exec(
        "INSERT INTO account (email, age) VALUES ($1, $2)",
        &[Value::from("a")],
    );
    assert!(matches!(missing, Err(Error::Parameter(_))));
    let extra = conn.exec(
        "INSERT INTO account (email) VALUES ($1)",
        &[Value::from("a"), Value::Integer(1)],
    );
    assert!(matches!(extra, Err(Error::Parameter(_))));
    let gap = conn.exec(
        "INSERT INTO account (email, age) VALUES ($1, $3)",
        &[Value::from("a"), Value::Integer(1)],
    );
    assert!(matches!(gap, Err(Error::Parameter(_))));

    // nothing was written by the rejected statements
    assert_eq!(conn.query_row::<(i64,)>("SELECT COUNT(*) FROM account", &[])?, Some((0,)));

    let mut lenient = connect("parameter_lenient?strict_params=false")?;
    lenient.exec("CREATE TABLE t (v TEXT)", &[])?;
    let result = lenient.exec(
        "INSERT INTO t VALUES ($1)",
        &[Value::from("a"), Value::from("unused")],
    )?;
    assert_eq!(result.rows_affected, 1);
    Ok(())
}

#[test]
fn test_dsn_options() -> Result<()> {
    let mut conn = connect("dsn_options?autoincrement_start=1000")?;
    conn.exec("CREATE TABLE t (id INT AUTOINCREMENT, v TEXT)", &[])?;
    let result = conn.exec("INSERT INTO t (v) VALUES ('a')", &[])?;
    assert_eq!(result.last_insert_id, Some(1000));

    assert!(matches!(connect("dsn_bad?strict_params=maybe"), Err(Error::Internal(_))));
    Ok(())
}

#[test]
fn test_syntax_error_is_reported() -> Result<()> {
    let mut conn = connect("syntax_error")?;
    match conn.exec("SELECT * FORM account", &[]) {
        Err(Error::Syntax { token, .. }) => assert_eq!(token, "form"),
        other => panic!("unexpected result {:?}", other),
    }
    Ok(())
}
