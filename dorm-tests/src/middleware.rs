use crate::{DATA_SOURCE, products::recreate};
use dorm::{Condition, Dorm, Error, Filter, Operator, Record, is_validation};
use indoc::indoc;

const TENANT: &str = "acme";

pub async fn middleware(dorm: &Dorm) {
    recreate(
        dorm,
        "dorm_order",
        indoc! {"
            CREATE TABLE dorm_order (
                id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                tenant VARCHAR(16) NOT NULL,
                amount INT NOT NULL
            )
        "},
    )
    .await;
    dorm.raw_execute(
        DATA_SOURCE,
        "INSERT INTO dorm_order(tenant, amount) VALUES ('globex', 5), ('globex', 7)",
        vec![],
        None,
    )
    .await
    .expect("Could not insert the orders of another tenant");

    dorm.use_insert_middleware(|table, record| {
        if table.ends_with("dorm_order") {
            record.set("tenant", TENANT);
        }
        Ok(())
    });
    dorm.use_query_middleware(|table, predicate| {
        if table.ends_with("dorm_order") {
            predicate.add_condition(Condition::new("tenant", Operator::Eq, TENANT));
        }
        Ok(())
    });

    let insert = dorm
        .insert_into(DATA_SOURCE, "dorm_order", None)
        .await
        .expect("Could not build the insert");
    dorm.insert_bulk(
        DATA_SOURCE,
        &insert,
        (1..=3)
            .map(|i| Record::new().with("amount", i * 10))
            .collect(),
        None,
    )
    .await
    .expect("Could not insert the orders");

    let all = dorm
        .query(DATA_SOURCE, "dorm_order", None)
        .await
        .expect("Could not build the query");
    assert_eq!(
        dorm.count(DATA_SOURCE, all.clone(), None)
            .await
            .expect("Could not count"),
        3
    );
    let big = all.clone().ge("amount", 20).expect("Invalid condition");
    assert_eq!(
        dorm.count(DATA_SOURCE, big, None)
            .await
            .expect("Could not count"),
        2
    );

    // Updates and deletes are scoped as well
    let delete = dorm
        .delete_from(DATA_SOURCE, "dorm_order", None)
        .await
        .expect("Could not build the delete")
        .lt("amount", 100)
        .expect("Invalid condition");
    assert_eq!(
        dorm.delete(DATA_SOURCE, delete, None)
            .await
            .expect("Could not delete"),
        3
    );
    let rows = dorm
        .raw_query(
            DATA_SOURCE,
            "SELECT COUNT(*) AS orders FROM dorm_order",
            vec![],
            None,
        )
        .await
        .expect("Could not count the orders of every tenant");
    assert_eq!(rows[0].get::<u64>("orders").expect("Missing orders"), 2);

    // Conditions added by a middleware are validated like the others
    dorm.use_query_middleware(|table, predicate| {
        if table.ends_with("dorm_order") {
            predicate.add_condition(Condition::new("deleted", Operator::Eq, false));
        }
        Ok(())
    });
    let error = dorm.count(DATA_SOURCE, all.clone(), None).await.unwrap_err();
    assert!(is_validation(&error));

    dorm.use_insert_middleware(|_, _| Err(Error::validation("inserts are disabled")));
    let error = dorm
        .insert(
            DATA_SOURCE,
            &insert,
            Record::new().with("amount", 1),
            None,
        )
        .await
        .unwrap_err();
    assert!(is_validation(&error));
}
