// Example: Basic data-access usage
// Run with: cargo run --example basic_usage

use chrono::NaiveDate;
use std::collections::BTreeMap;
use weatherdal::dal::{Bookmark, BookmarkCategory, Station};
use weatherdal::display::format_table;
use weatherdal::{ArgumentList, Dal, DalConfig, QueryExecution, Transaction};

fn main() -> anyhow::Result<()> {
    println!("=== weatherdal Basic Usage Example ===\n");

    // Open the embedded database with the weather schema installed
    let dal = Dal::open(&DalConfig::default())?;

    // 1. Stations through the manager
    println!("1. Adding stations...");
    let stations = dal.stations();
    for (code, name, state) in [
        ("KPIT", "Pittsburgh", "PA"),
        ("KERI", "Erie", "PA"),
        ("KCLE", "Cleveland", "OH"),
    ] {
        stations.insert(&Station {
            code: code.to_string(),
            name: name.to_string(),
            state: Some(state.to_string()),
        })?;
    }
    println!("States: {:?}\n", stations.states()?);

    // 2. A parameterized query run directly
    println!("2. Stations in PA...");
    let mut query = QueryExecution::new(
        "SELECT stationCode, stationName FROM forecaster_stations WHERE state = ?",
        ArgumentList::new().text("PA"),
        dal.provider(),
    );
    query.execute()?;
    let columns = query
        .result_set()
        .map(|cursor| cursor.columns().to_vec())
        .unwrap_or_default();
    let rows = query.rows()?;
    println!("{}\n", format_table(&columns, &rows));
    query.close();

    // 3. An update reports the rows it changed
    println!("3. Renaming KERI...");
    let mut query = QueryExecution::new(
        "UPDATE forecaster_stations SET stationName = ? WHERE stationCode = ?",
        ArgumentList::new().text("Erie International").text("KERI"),
        dal.provider(),
    );
    query.execute()?;
    println!(
        "affected rows: {:?}, success: {}\n",
        query.affected_rows(),
        query.is_success()
    );
    query.close();

    // 4. Station data for a day, written in one transaction
    println!("4. Recording observations...");
    let date = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap_or_default();
    let data = BTreeMap::from([
        ("high".to_string(), "54".to_string()),
        ("low".to_string(), "37".to_string()),
        ("sky".to_string(), "overcast".to_string()),
    ]);
    dal.station_data().add("KPIT", date, &data)?;
    if let Some(observed) = dal.station_data().get("KPIT", date)? {
        println!("{} on {}: {:?}\n", observed.station.name, observed.date, observed.data);
    }

    // 5. Bookmarks with a camera picture
    println!("5. Bookmarking a camera frame...");
    let category = dal.categories().add(&BookmarkCategory::new("Storms", "Severe weather"))?;
    let start = date.and_hms_opt(14, 0, 0).unwrap_or_default();
    let number = dal.bookmarks().add(&Bookmark {
        number: None,
        category_number: category.number.unwrap_or_default(),
        name: "Shelf cloud".to_string(),
        created_by: 7,
        start_time: start,
        end_time: start + chrono::Duration::minutes(5),
        camera_picture: vec![0x89, b'P', b'N', b'G'],
        notes: "Looking west".to_string(),
    })?;
    println!("Saved bookmark #{}\n", number);

    // 6. A rolled-back transaction leaves nothing behind
    println!("6. Rolling back a transaction...");
    let transaction = Transaction::begin(dal.provider())?;
    {
        let mut query = QueryExecution::new(
            "DELETE FROM forecaster_stations WHERE state = ?",
            ArgumentList::new().text("PA"),
            &transaction,
        );
        query.execute()?;
        println!("deleted inside transaction: {:?}", query.affected_rows());
    }
    transaction.rollback()?;
    println!("stations after rollback: {}\n", stations.all()?.len());

    println!("=== Example Complete ===");
    Ok(())
}
