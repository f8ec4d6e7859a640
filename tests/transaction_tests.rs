// Transactions over the embedded database

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use weatherdal::dal::{Station, StationManager};
use weatherdal::{
    ArgumentList, ConnectionProvider, Dal, DalConfig, DalError, Database, DriverError, EmbeddedProvider,
    QueryExecution, Transaction,
};

fn setup() -> (Arc<Database>, EmbeddedProvider) {
    let database = Arc::new(Database::new("test"));
    database
        .run_script(
            "CREATE TABLE observations (
                 id INTEGER PRIMARY KEY,
                 station TEXT NOT NULL,
                 observedOn DATE
             )",
        )
        .unwrap();
    let provider = EmbeddedProvider::new(Arc::clone(&database), Duration::from_secs(1));
    (database, provider)
}

fn insert(provider: &dyn ConnectionProvider, id: i32, station: &str) -> Result<(), DalError> {
    let mut query = QueryExecution::new(
        "INSERT INTO observations (id, station) VALUES (?, ?)",
        ArgumentList::new().int(id).text(station),
        provider,
    );
    query.execute()
}

/// Insert `ids` in one transaction, failing on the first error
fn insert_batch(provider: &dyn ConnectionProvider, ids: &[i32]) -> Result<(), DalError> {
    let transaction = Transaction::begin(provider)?;
    for id in ids {
        insert(&transaction, *id, "KPIT")?;
    }
    transaction.commit()
}

#[test]
fn test_failed_batch_leaves_no_rows() {
    let (database, provider) = setup();

    // The duplicate in the middle fails the batch after five inserts
    let ids = [1, 2, 3, 4, 5, 5, 6, 7, 8, 9];
    let err = insert_batch(&provider, &ids).unwrap_err();

    assert!(matches!(err.driver_error(), Some(DriverError::Engine(_))));
    assert_eq!(database.row_count("observations"), Some(0));
    assert!(provider.connection().unwrap().auto_commit());
}

#[test]
fn test_committed_batch_is_kept() {
    let (database, provider) = setup();

    insert_batch(&provider, &[1, 2, 3]).unwrap();
    assert_eq!(database.row_count("observations"), Some(3));

    // Auto-commit is back on, so a later failure does not touch the batch
    assert!(insert(&provider, 3, "KERI").is_err());
    assert_eq!(database.row_count("observations"), Some(3));
}

#[test]
fn test_rollback_restores_updated_and_deleted_rows() {
    let (database, provider) = setup();
    insert(&provider, 1, "KPIT").unwrap();
    insert(&provider, 2, "KERI").unwrap();

    let transaction = Transaction::begin(&provider).unwrap();
    let mut update = QueryExecution::new(
        "UPDATE observations SET station = ? WHERE id = ?",
        ArgumentList::new().text("KCLE").int(1),
        &transaction,
    );
    update.execute().unwrap();
    drop(update);
    let mut delete = QueryExecution::new(
        "DELETE FROM observations WHERE id = ?",
        ArgumentList::new().int(2),
        &transaction,
    );
    delete.execute().unwrap();
    drop(delete);

    assert_eq!(database.row_count("observations"), Some(1));
    transaction.rollback().unwrap();

    let mut query = QueryExecution::new(
        "SELECT station FROM observations WHERE id = ? OR id = ?",
        ArgumentList::new().int(1).int(2),
        &provider,
    );
    query.execute().unwrap();
    let stations: Vec<String> = query
        .rows()
        .unwrap()
        .iter()
        .map(|row| row.get::<String>("station").unwrap())
        .collect();
    assert_eq!(stations, vec!["KPIT", "KERI"]);
}

#[test]
fn test_dropped_transaction_rolls_back() {
    let (database, provider) = setup();
    {
        let transaction = Transaction::begin(&provider).unwrap();
        insert(&transaction, 1, "KPIT").unwrap();
        insert(&transaction, 2, "KERI").unwrap();
        assert_eq!(database.row_count("observations"), Some(2));
    }

    assert_eq!(database.row_count("observations"), Some(0));
    assert!(provider.connection().unwrap().auto_commit());
}

#[test]
fn test_nested_begin_is_rejected() {
    let (_database, provider) = setup();
    let outer = Transaction::begin(&provider).unwrap();

    let err = Transaction::begin(&outer).err().unwrap();
    assert!(matches!(err.driver_error(), Some(DriverError::Transaction(_))));
    outer.commit().unwrap();
}

fn station(code: &str, name: &str) -> Station {
    Station {
        code: code.to_string(),
        name: name.to_string(),
        state: Some("PA".to_string()),
    }
}

#[test]
fn test_rollback_keeps_writes_made_outside_the_transaction() {
    let dal = Dal::open(&DalConfig::default()).unwrap();

    let transaction = Transaction::begin(dal.provider()).unwrap();
    StationManager::new(&transaction)
        .insert(&station("KERI", "Erie"))
        .unwrap();

    // Auto-committed through the provider while the transaction is open
    dal.stations().insert(&station("KPIT", "Pittsburgh")).unwrap();
    assert!(dal.provider().connection().unwrap().auto_commit());

    transaction.rollback().unwrap();

    let codes: Vec<String> = dal.stations().all().unwrap().into_iter().map(|s| s.code).collect();
    assert_eq!(codes, vec!["KPIT"]);
}

#[test]
fn test_manager_transaction_runs_alongside_open_transaction() {
    let dal = Dal::open(&DalConfig::default()).unwrap();
    dal.stations().insert(&station("KPIT", "Pittsburgh")).unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
    let data = BTreeMap::from([("high".to_string(), "54".to_string())]);

    let transaction = Transaction::begin(dal.provider()).unwrap();
    assert_eq!(dal.station_data().add("KPIT", day, &data).unwrap(), 1);
    transaction.rollback().unwrap();

    let recorded = dal.station_data().get("KPIT", day).unwrap().unwrap();
    assert_eq!(recorded.data, data);
}

#[test]
fn test_separate_transactions_roll_back_independently() {
    let (database, provider) = setup();
    let first = Transaction::begin(&provider).unwrap();
    let second = Transaction::begin(&provider).unwrap();

    insert(&first, 1, "KPIT").unwrap();
    insert(&second, 2, "KERI").unwrap();
    first.rollback().unwrap();
    second.commit().unwrap();

    assert_eq!(database.row_count("observations"), Some(1));
}

#[test]
fn test_prepared_statement_reused_in_transaction() {
    let (database, provider) = setup();
    let first = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

    let transaction = Transaction::begin(&provider).unwrap();
    let mut statement = transaction
        .prepare("INSERT INTO observations (id, station, observedOn) VALUES (?, ?, ?)")
        .unwrap();
    for day in 0..3 {
        statement.clear_parameters();
        statement.bind_int(1, day + 1).unwrap();
        statement.bind_string(2, "KPIT").unwrap();
        statement
            .bind_date(3, first + chrono::Duration::days(i64::from(day)))
            .unwrap();
        assert!(!statement.execute().unwrap());
        assert_eq!(statement.update_count(), Some(1));
    }
    statement.close().unwrap();
    transaction.commit().unwrap();

    assert_eq!(database.row_count("observations"), Some(3));
}
