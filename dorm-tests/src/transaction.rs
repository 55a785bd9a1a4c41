use crate::{DATA_SOURCE, products::recreate};
use dorm::{Dorm, Filter, Record, Value, is_validation};
use indoc::indoc;
use std::time::Duration;

pub async fn transaction(dorm: &Dorm) {
    recreate(
        dorm,
        "dorm_account",
        indoc! {"
            CREATE TABLE dorm_account (
                id INT NOT NULL PRIMARY KEY,
                owner VARCHAR(32) NOT NULL,
                balance BIGINT NOT NULL
            ) ENGINE = InnoDB
        "},
    )
    .await;
    let insert = dorm
        .insert_into(DATA_SOURCE, "dorm_account", None)
        .await
        .expect("Could not load the fields of dorm_account");
    let all = dorm
        .query(DATA_SOURCE, "dorm_account", None)
        .await
        .expect("Could not build the query");
    let update = dorm
        .update_table(DATA_SOURCE, "dorm_account", None)
        .await
        .expect("Could not build the update");

    // Commit
    let mut tx = dorm.begin(DATA_SOURCE).await.expect("Could not begin");
    assert!(tx.id().starts_with("tx-"));
    dorm.insert_bulk(
        DATA_SOURCE,
        &insert,
        vec![
            Record::new()
                .with("id", 1)
                .with("owner", "alice")
                .with("balance", 100),
            Record::new()
                .with("id", 2)
                .with("owner", "bob")
                .with("balance", 50),
        ],
        Some(&mut tx),
    )
    .await
    .expect("Could not insert the accounts");
    dorm.raw_execute(
        DATA_SOURCE,
        "UPDATE dorm_account SET balance = balance + ? WHERE id = ?",
        vec![Value::Int64(-30), Value::Int64(1)],
        Some(&mut tx),
    )
    .await
    .expect("Could not withdraw");
    let moved = dorm
        .update(
            DATA_SOURCE,
            update
                .clone()
                .set("balance", 80)
                .expect("Invalid field")
                .eq("id", 2)
                .expect("Invalid condition"),
            Some(&mut tx),
        )
        .await
        .expect("Could not deposit");
    assert_eq!(moved, 1);
    assert_eq!(
        dorm.count(DATA_SOURCE, all.clone(), Some(&mut tx))
            .await
            .expect("Could not count inside the transaction"),
        2
    );
    tx.commit().await.expect("Could not commit");

    let total = dorm
        .raw_query(
            DATA_SOURCE,
            "SELECT SUM(balance) AS total FROM dorm_account",
            vec![],
            None,
        )
        .await
        .expect("Could not sum the balances");
    assert_eq!(total[0].get::<i64>("total").expect("Missing total"), 150);

    // Rollback
    let mut tx = dorm.begin(DATA_SOURCE).await.expect("Could not begin");
    dorm.insert(
        DATA_SOURCE,
        &insert,
        Record::new()
            .with("id", 3)
            .with("owner", "carol")
            .with("balance", 10),
        Some(&mut tx),
    )
    .await
    .expect("Could not insert carol");
    tx.rollback().await.expect("Could not rollback");
    assert_eq!(
        dorm.count(DATA_SOURCE, all.clone(), None)
            .await
            .expect("Could not count"),
        2
    );

    // Dropped without commit, the fields are loaded inside the transaction
    let data_source = dorm.data_source(DATA_SOURCE).expect("Missing data source");
    assert!(
        data_source
            .remove_model(None, "dorm_account")
            .expect("Could not remove the model")
    );
    {
        let mut tx = dorm.begin(DATA_SOURCE).await.expect("Could not begin");
        let delete = dorm
            .delete_from(DATA_SOURCE, "dorm_account", Some(&mut tx))
            .await
            .expect("Could not build the delete inside the transaction");
        let removed = dorm
            .delete(
                DATA_SOURCE,
                delete.gt("id", 0).expect("Invalid condition"),
                Some(&mut tx),
            )
            .await
            .expect("Could not delete the accounts");
        assert_eq!(removed, 2);
    }
    assert_eq!(
        dorm.count(DATA_SOURCE, all.clone(), None)
            .await
            .expect("Could not count after the dropped transaction"),
        2
    );

    // The transaction holds the connection
    let tx = dorm.begin(DATA_SOURCE).await.expect("Could not begin");
    let error = data_source
        .connection()
        .acquire(Duration::from_millis(100))
        .await
        .err()
        .expect("The connection was acquired during a transaction");
    assert!(dorm::is_connection(&error));
    tx.rollback().await.expect("Could not rollback");

    // A transaction cannot be used on another data source
    let mut tx = dorm.begin(DATA_SOURCE).await.expect("Could not begin");
    let error = dorm
        .count("other", all, Some(&mut tx))
        .await
        .unwrap_err();
    assert!(is_validation(&error));
    tx.rollback().await.expect("Could not rollback");
}
