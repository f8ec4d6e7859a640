// Data-access managers over the embedded weather schema

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use weatherdal::dal::{
    Answer, Bookmark, BookmarkCategory, ForecasterLesson, InstructorResponse, Question, Response, Station, Version,
};
use weatherdal::{ConnectionProvider, Dal, DalConfig, DalError, Database, DriverError, EmbeddedProvider};

fn open() -> Dal {
    Dal::open(&DalConfig::default()).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    date.and_hms_opt(h, m, 0).unwrap()
}

fn station(code: &str, name: &str, state: Option<&str>) -> Station {
    Station {
        code: code.to_string(),
        name: name.to_string(),
        state: state.map(str::to_string),
    }
}

fn lesson(id: &str, course_number: i32) -> ForecasterLesson {
    let start = date(2024, 2, 1);
    ForecasterLesson {
        id: id.to_string(),
        name: format!("Lesson {}", id),
        start_date: at(start, 8, 0),
        due_date: at(date(2024, 2, 8), 17, 0),
        maximum_tries: 3,
        active: true,
        archived_date: None,
        station_code: None,
        course_number,
    }
}

fn question(lesson_id: &str, number: i32, answers: &[(&str, &str)]) -> Question {
    Question {
        id: None,
        lesson_id: lesson_id.to_string(),
        number,
        text: format!("Question {}", number),
        zulu: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        answers: answers.iter().map(|(text, value)| Answer::new(*text, *value)).collect(),
    }
}

#[test]
fn test_stations() {
    let dal = open();
    let stations = dal.stations();

    stations.insert(&station("KPIT", "Pittsburgh", Some("PA"))).unwrap();
    stations.insert(&station("KERI", "Erie", Some("PA"))).unwrap();
    stations.insert(&station("KCLE", "Cleveland", Some("OH"))).unwrap();
    stations.insert(&station("XBUOY", "Lake buoy", None)).unwrap();
    assert!(stations.insert(&station("KPIT", "Duplicate", None)).is_err());

    assert_eq!(stations.all().unwrap().len(), 4);
    assert_eq!(stations.by_state("PA").unwrap().len(), 2);
    assert_eq!(stations.states().unwrap(), vec!["OH", "PA"]);

    assert_eq!(stations.obtain("Erie").unwrap().unwrap().code, "KERI");
    assert_eq!(stations.obtain("KCLE").unwrap().unwrap().name, "Cleveland");
    assert!(stations.obtain("KXYZ").unwrap().is_none());

    assert!(stations.update(&station("XBUOY", "Erie buoy", Some("PA"))).unwrap());
    assert!(!stations.update(&station("KXYZ", "Nowhere", None)).unwrap());
    assert_eq!(stations.by_state("PA").unwrap().len(), 3);

    assert!(stations.delete("XBUOY").unwrap());
    assert!(!stations.delete("XBUOY").unwrap());
}

#[test]
fn test_station_data_for_a_day() {
    let dal = open();
    dal.stations().insert(&station("KPIT", "Pittsburgh", Some("PA"))).unwrap();
    let day = date(2024, 3, 14);

    let data = BTreeMap::from([
        ("high".to_string(), "54".to_string()),
        ("low".to_string(), "37".to_string()),
    ]);
    assert_eq!(dal.station_data().add("KPIT", day, &data).unwrap(), 2);

    let recorded = dal.station_data().get("KPIT", day).unwrap().unwrap();
    assert_eq!(recorded.station.name, "Pittsburgh");
    assert_eq!(recorded.data, data);

    let other_day = dal.station_data().get("KPIT", date(2024, 3, 15)).unwrap().unwrap();
    assert!(other_day.data.is_empty());
    assert!(dal.station_data().get("KXYZ", day).unwrap().is_none());
}

#[test]
fn test_station_data_add_is_all_or_nothing() {
    // Keys are unique here, so a key already on file fails the batch
    let database = Arc::new(Database::new("keyed"));
    database
        .run_script(
            "CREATE TABLE forecaster_station_data (
                 dataKey TEXT PRIMARY KEY,
                 stationCode TEXT NOT NULL,
                 dataDate DATE NOT NULL,
                 dataValue TEXT
             );
             INSERT INTO forecaster_station_data VALUES ('low', 'KPIT', '2024-03-13', '35')",
        )
        .unwrap();
    database
        .define_procedure(
            "sp_insertStationData",
            "INSERT INTO forecaster_station_data (stationCode, dataDate, dataKey, dataValue) VALUES (?, ?, ?, ?)",
        )
        .unwrap();
    let provider = EmbeddedProvider::new(Arc::clone(&database), Duration::from_secs(1));
    let dal = Dal::new(Arc::new(provider));

    // "high" is written before "low" collides
    let data = BTreeMap::from([
        ("high".to_string(), "54".to_string()),
        ("low".to_string(), "37".to_string()),
        ("sky".to_string(), "overcast".to_string()),
    ]);
    let err = dal.station_data().add("KPIT", date(2024, 3, 14), &data).unwrap_err();

    assert!(matches!(err.driver_error(), Some(DriverError::Engine(_))));
    assert_eq!(database.row_count("forecaster_station_data"), Some(1));
    assert!(dal.provider().connection().unwrap().auto_commit());
}

#[test]
fn test_categories_and_bookmarks() {
    let dal = open();
    let categories = dal.categories();

    let mut storms = BookmarkCategory::new("Storms", "Severe weather");
    storms.order_rank = 2;
    let storms = categories.add(&storms).unwrap();
    let fog = categories.add(&BookmarkCategory::new("Fog", "")).unwrap();
    assert_ne!(storms.number, fog.number);

    let names: Vec<String> = categories.all().unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Fog", "Storms"]);
    assert_eq!(categories.by_name("Storms").unwrap(), Some(storms.clone()));

    let start = at(date(2024, 6, 2), 14, 0);
    let bookmark = Bookmark {
        number: None,
        category_number: storms.number.unwrap(),
        name: "Shelf cloud".to_string(),
        created_by: 7,
        start_time: start,
        end_time: at(date(2024, 6, 2), 14, 5),
        camera_picture: vec![0x89, b'P', b'N', b'G'],
        notes: String::new(),
    };
    let number = dal.bookmarks().add(&bookmark).unwrap();

    let saved = dal.bookmarks().get(number).unwrap().unwrap();
    assert_eq!(saved.camera_picture, bookmark.camera_picture);
    assert_eq!(saved.start_time, start);
    assert_eq!(dal.bookmarks().by_creator(7).unwrap().len(), 1);

    let renamed = Bookmark {
        name: "Gust front".to_string(),
        ..saved
    };
    assert!(dal.bookmarks().update(&renamed).unwrap());
    assert_eq!(
        dal.bookmarks().by_category(storms.number.unwrap()).unwrap()[0].name,
        "Gust front"
    );

    assert_eq!(dal.bookmarks().remove_by_category(storms.number.unwrap()).unwrap(), 1);
    assert!(dal.bookmarks().all().unwrap().is_empty());
    assert!(categories.delete(&storms).unwrap());
    assert!(categories.by_number(storms.number.unwrap()).unwrap().is_none());

    // Unsaved entities are rejected before touching the database
    assert!(matches!(
        categories.update(&BookmarkCategory::new("Hail", "")),
        Err(DalError::InvalidData(_))
    ));
}

#[test]
fn test_lessons() {
    let dal = open();
    let lessons = dal.lessons();

    lessons.insert(&lesson("L1", 101)).unwrap();
    let mut archived = lesson("L2", 101);
    archived.archived_date = Some(date(2023, 12, 24));
    archived.station_code = Some("KPIT".to_string());
    lessons.insert(&archived).unwrap();
    lessons.insert(&lesson("L3", 202)).unwrap();

    assert_eq!(lessons.all().unwrap().len(), 3);
    assert_eq!(lessons.by_course(101).unwrap().len(), 2);
    assert_eq!(lessons.get("L2").unwrap(), Some(archived.clone()));
    assert_eq!(lessons.get("L1").unwrap().unwrap().archived_date, None);

    let closed = ForecasterLesson {
        active: false,
        archived_date: None,
        ..archived
    };
    assert!(lessons.update(&closed).unwrap());
    assert_eq!(lessons.get("L2").unwrap(), Some(closed));

    assert!(lessons.remove("L3").unwrap());
    assert!(lessons.get("L3").unwrap().is_none());
}

#[test]
fn test_questions_with_answers() {
    let dal = open();
    dal.lessons().insert(&lesson("L1", 101)).unwrap();
    let questions = dal.questions();

    let second = questions
        .insert(&question("L1", 2, &[("Rain", "0"), ("Snow", "1")]))
        .unwrap();
    let first = questions
        .insert(&question("L1", 1, &[("Clear", "1"), ("Cloudy", "0"), ("Fog", "0")]))
        .unwrap();
    assert!(second.answers.iter().all(|a| a.id.is_some()));

    let loaded = questions.for_lesson("L1").unwrap();
    assert_eq!(loaded.iter().map(|q| q.number).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(loaded[0], first);
    assert_eq!(loaded[1].answers.len(), 2);

    let moved = Question {
        zulu: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        ..first.clone()
    };
    assert!(questions.update(&moved).unwrap());
    assert_eq!(questions.for_lesson("L1").unwrap()[0].zulu, moved.zulu);

    assert!(questions.delete(&first).unwrap());
    assert!(dal.answers().for_question(first.id.unwrap()).unwrap().is_empty());
    assert_eq!(questions.for_lesson("L1").unwrap().len(), 1);
}

#[test]
fn test_responses_and_selected_answers() {
    let dal = open();
    let saved = dal
        .questions()
        .insert(&question("L1", 1, &[("Clear", "1"), ("Cloudy", "0")]))
        .unwrap();
    let clear = saved.answers[0].clone();
    let cloudy = saved.answers[1].clone();

    let response = Response {
        id: None,
        attempt_id: "attempt-1".to_string(),
        points_earned: 1,
        points_possible: 1,
        answer_ids: Vec::new(),
    };
    let id = dal.responses().insert(&response, &[clear.clone()]).unwrap();
    assert_eq!(dal.answers().for_response(id).unwrap(), vec![clear.clone()]);

    let mut stored = dal.responses().by_attempt("attempt-1").unwrap().remove(0);
    assert_eq!(stored.answer_ids, vec![clear.id.unwrap()]);

    stored.answer_ids = vec![cloudy.id.unwrap()];
    stored.points_earned = 0;
    assert!(dal.responses().update(&stored).unwrap());
    let reloaded = dal.responses().by_attempt("attempt-1").unwrap().remove(0);
    assert_eq!(reloaded.answer_ids, vec![cloudy.id.unwrap()]);
    assert_eq!(reloaded.points_earned, 0);

    assert!(dal.responses().delete(&reloaded).unwrap());
    assert!(dal.responses().by_attempt("attempt-1").unwrap().is_empty());
    assert!(dal.answers().for_response(id).unwrap().is_empty());

    // Answers must be saved before they can be selected
    assert!(matches!(
        dal.responses().insert(&response, &[Answer::new("Unsaved", "0")]),
        Err(DalError::InvalidData(_))
    ));
}

#[test]
fn test_instructor_responses() {
    let dal = open();
    let day = date(2024, 4, 2);
    let manager = dal.instructor_responses();

    let saved = manager
        .insert(&InstructorResponse {
            id: None,
            question_id: 4,
            date: day,
            value: "62".to_string(),
            station_code: "KPIT".to_string(),
        })
        .unwrap();
    assert!(saved.id.is_some());

    assert_eq!(
        manager.by_question_date_and_station(4, day, "KPIT").unwrap(),
        vec![saved.clone()]
    );
    assert!(manager
        .by_question_date_and_station(4, date(2024, 4, 3), "KPIT")
        .unwrap()
        .is_empty());

    assert!(manager.delete(saved.id.unwrap()).unwrap());
    assert!(!manager.delete(saved.id.unwrap()).unwrap());
}

#[test]
fn test_versions() {
    let dal = open();
    let versions = dal.versions();
    let released = at(date(2024, 1, 15), 9, 30);

    for (major, minor, release) in [(1, 10, 0), (1, 2, 3), (2, 0, 1)] {
        versions
            .insert(&Version {
                major,
                minor,
                release,
                notes: String::new(),
                release_date: released,
            })
            .unwrap();
    }

    let ordered: Vec<String> = versions.all().unwrap().iter().map(Version::to_string).collect();
    assert_eq!(ordered, vec!["1.2.3", "1.10.0", "2.0.1"]);
    assert_eq!(versions.most_recent().unwrap().unwrap().to_string(), "2.0.1");

    let mut found = versions.from_string("1.10.0").unwrap().unwrap();
    assert_eq!(found.release_date, released);
    found.notes = "Archived lessons".to_string();
    assert!(versions.update_notes(&found).unwrap());
    assert_eq!(versions.from_string("1.10.0").unwrap().unwrap().notes, "Archived lessons");

    assert!(versions.from_string("3.0.0").unwrap().is_none());
    assert!(matches!(versions.from_string("1.x"), Err(DalError::InvalidData(_))));
}

#[test]
fn test_resource_relations() {
    let dal = open();
    let relations = dal.resource_relations();

    assert_eq!(relations.related_station(3).unwrap(), None);
    relations.set(3, 40).unwrap();
    relations.set(3, 41).unwrap();
    assert_eq!(relations.related_station(3).unwrap(), Some(41));

    assert!(relations.remove(3).unwrap());
    assert_eq!(relations.related_station(3).unwrap(), None);
}

#[test]
fn test_open_runs_init_script() {
    let mut script = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        script,
        "INSERT INTO forecaster_stations (stationCode, stationName, state) VALUES ('KPIT', 'Pittsburgh', 'PA');"
    )
    .unwrap();

    let mut config = DalConfig::default();
    config.database.init_script = Some(script.path().to_path_buf());
    let dal = Dal::open(&config).unwrap();

    assert_eq!(dal.stations().all().unwrap().len(), 1);
    assert_eq!(dal.database().unwrap().row_count("forecaster_stations"), Some(1));
}
