use crate::{DATA_SOURCE, products::recreate};
use dorm::{Dorm, Filter, Record, is_validation};
use indoc::indoc;

pub async fn paging(dorm: &Dorm) {
    recreate(
        dorm,
        "dorm_event",
        indoc! {"
            CREATE TABLE dorm_event (
                id INT NOT NULL PRIMARY KEY,
                kind VARCHAR(16) NOT NULL,
                happened_at DATETIME NOT NULL
            )
        "},
    )
    .await;
    let insert = dorm
        .insert_into(DATA_SOURCE, "dorm_event", None)
        .await
        .expect("Could not load the fields of dorm_event");
    let start = time::macros::datetime!(2024-03-01 08:00);
    let records = (1..=23)
        .map(|i| {
            Record::new()
                .with("id", i)
                .with("kind", if i % 2 == 0 { "even" } else { "odd" })
                .with("happened_at", start + time::Duration::minutes(i as i64))
        })
        .collect::<Vec<_>>();
    dorm.insert_bulk(DATA_SOURCE, &insert, records, None)
        .await
        .expect("Could not insert the events");

    let query = dorm
        .query(DATA_SOURCE, "dorm_event", None)
        .await
        .expect("Could not build the query")
        .asc(&["id"])
        .expect("Invalid order");
    let (rows, total) = dorm
        .page(DATA_SOURCE, query.clone(), 3, 10, None)
        .await
        .expect("Could not read the third page");
    assert_eq!(total, 23);
    assert_eq!(
        rows.iter()
            .map(|v| v.get::<i32>("id").expect("Missing id"))
            .collect::<Vec<_>>(),
        [21, 22, 23]
    );

    let (rows, total) = dorm
        .page(
            DATA_SOURCE,
            query.clone().eq("kind", "even").expect("Invalid condition"),
            2,
            5,
            None,
        )
        .await
        .expect("Could not read the second page");
    assert_eq!(total, 11);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].get::<i32>("id").expect("Missing id"), 12);
    assert_eq!(
        rows[0]
            .get::<time::PrimitiveDateTime>("happened_at")
            .expect("Missing happened_at"),
        time::macros::datetime!(2024-03-01 08:12)
    );

    let (rows, total) = dorm
        .page(
            DATA_SOURCE,
            query.clone().gt("id", 100).expect("Invalid condition"),
            1,
            10,
            None,
        )
        .await
        .expect("Could not read an empty page");
    assert_eq!(total, 0);
    assert!(rows.is_empty());

    let (rows, total) = dorm
        .page(DATA_SOURCE, query.clone(), 4, 10, None)
        .await
        .expect("Could not read past the last page");
    assert_eq!(total, 23);
    assert!(rows.is_empty());

    let error = dorm
        .page(DATA_SOURCE, query, 0, 10, None)
        .await
        .unwrap_err();
    assert!(is_validation(&error));
}
