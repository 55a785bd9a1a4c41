use crate::{DATA_SOURCE, products::recreate};
use dorm::{Dorm, Filter, Record};
use indoc::indoc;

pub async fn schema(dorm: &Dorm) {
    recreate(
        dorm,
        "dorm_note",
        indoc! {"
            CREATE TABLE dorm_note (
                id INT NOT NULL AUTO_INCREMENT PRIMARY KEY COMMENT 'identifier',
                title VARCHAR(80) NOT NULL,
                body TEXT NULL,
                pinned TINYINT(1) NOT NULL DEFAULT 0
            )
        "},
    )
    .await;
    let data_source = dorm.data_source(DATA_SOURCE).expect("Missing data source");

    let columns = data_source
        .describe(None, "dorm_note", None)
        .await
        .expect("Could not describe dorm_note");
    assert_eq!(
        columns.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        ["id", "title", "body", "pinned"]
    );
    assert_eq!(columns[0].key, "PRI");
    assert_eq!(columns[0].comment, "identifier");
    assert!(columns[0].extra.contains("auto_increment"));
    assert!(!columns[1].nullable);
    assert!(columns[2].nullable);
    assert_eq!(columns[3].default.as_deref(), Some("0"));

    let shape = dorm
        .shape(DATA_SOURCE, "dorm_note", None)
        .await
        .expect("Could not load the shape");
    assert_eq!(shape.table, "dorm_note");
    assert_eq!(shape.fields.len(), 4);

    // The cached fields survive a change of the table until they are removed
    dorm.raw_execute(
        DATA_SOURCE,
        "ALTER TABLE dorm_note ADD COLUMN color VARCHAR(16) NULL",
        vec![],
        None,
    )
    .await
    .expect("Could not alter dorm_note");
    let insert = dorm
        .insert_into(DATA_SOURCE, "dorm_note", None)
        .await
        .expect("Could not build the insert");
    assert!(!insert.shape().contains("color"));
    assert!(
        data_source
            .remove_model(None, "dorm_note")
            .expect("Could not remove the model")
    );
    assert!(
        !data_source
            .remove_model(None, "dorm_note")
            .expect("Could not remove the model")
    );
    let insert = dorm
        .insert_into(DATA_SOURCE, "dorm_note", None)
        .await
        .expect("Could not build the insert");
    assert!(insert.shape().contains("color"));
    dorm.insert(
        DATA_SOURCE,
        &insert,
        Record::new()
            .with("title", "groceries")
            .with("color", "green")
            .with("pinned", true),
        None,
    )
    .await
    .expect("Could not insert the note");

    // Tables of the default database can also be qualified
    let database = data_source.default_database().to_string();
    let query = dorm
        .query(DATA_SOURCE, &format!("{database}.dorm_note"), None)
        .await
        .expect("Could not build the qualified query")
        .eq("color", "green")
        .expect("Invalid condition");
    assert_eq!(
        query.build_select().expect("Invalid query").0,
        format!("SELECT id,title,body,pinned,color FROM {database}.dorm_note WHERE color = ?")
    );
    let note = dorm
        .one(DATA_SOURCE, query, None)
        .await
        .expect("Could not select the note")
        .expect("The note was not found");
    assert_eq!(note.get::<String>("title").expect("Missing title"), "groceries");
    assert!(note.get::<bool>("pinned").expect("Missing pinned"));

    let error = dorm
        .query(DATA_SOURCE, "dorm_missing_table", None)
        .await
        .unwrap_err();
    assert!(format!("{error:#}").contains("dorm_missing_table"));
    assert!(dorm.query("unknown", "dorm_note", None).await.is_err());
}
