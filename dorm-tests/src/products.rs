use crate::DATA_SOURCE;
use dorm::{
    Dorm, Filter, FromRow, Record, Result, RowLabeled, UpdateColumns, Value, Where, is_validation,
};
use indoc::indoc;
use rust_decimal::Decimal;

#[derive(Debug, PartialEq)]
struct Product {
    id: u64,
    name: String,
    price: Decimal,
    stock: i32,
    description: Option<String>,
}

impl FromRow for Product {
    fn from_row(row: RowLabeled) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            price: row.get("price")?,
            stock: row.get("stock")?,
            description: row.get("description")?,
        })
    }
}

/// Drops and creates `table`, the cached fields are forgotten.
pub(crate) async fn recreate(dorm: &Dorm, table: &str, create: &str) {
    dorm.raw_execute(
        DATA_SOURCE,
        &format!("DROP TABLE IF EXISTS {table}"),
        vec![],
        None,
    )
    .await
    .expect("Could not drop the table");
    dorm.raw_execute(DATA_SOURCE, create, vec![], None)
        .await
        .expect("Could not create the table");
    let _ = dorm
        .data_source(DATA_SOURCE)
        .expect("Missing data source")
        .remove_model(None, table);
}

pub async fn products(dorm: &Dorm) {
    recreate(
        dorm,
        "dorm_product",
        indoc! {"
            CREATE TABLE dorm_product (
                id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
                name VARCHAR(64) NOT NULL UNIQUE,
                price DECIMAL(10, 2) NOT NULL,
                stock INT NOT NULL DEFAULT 0,
                description VARCHAR(255) NULL
            )
        "},
    )
    .await;

    // Single insert, the null description is left to its default
    let insert = dorm
        .insert_into(DATA_SOURCE, "dorm_product", None)
        .await
        .expect("Could not load the fields of dorm_product");
    let result = dorm
        .insert(
            DATA_SOURCE,
            &insert,
            Record::new()
                .with("name", "keyboard")
                .with("price", Decimal::new(4990, 2))
                .with("stock", 10)
                .with("description", None::<String>)
                .with("color", "black"),
            None,
        )
        .await
        .expect("Could not insert a product");
    assert_eq!(result.rows_affected, 1);
    assert_eq!(result.last_affected_id, Some(1));

    let query = dorm
        .query(DATA_SOURCE, "dorm_product", None)
        .await
        .expect("Could not build the query")
        .eq("name", "keyboard")
        .expect("Invalid condition");
    let keyboard = dorm
        .one_as::<Product>(DATA_SOURCE, query.clone(), None)
        .await
        .expect("Could not select the product")
        .expect("The product was not found");
    assert_eq!(
        keyboard,
        Product {
            id: 1,
            name: "keyboard".into(),
            price: Decimal::new(4990, 2),
            stock: 10,
            description: None,
        }
    );

    // Bulk
    let records = ["mouse", "monitor", "cable", "webcam"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            Record::new()
                .with("name", name)
                .with("price", Decimal::new(1000 * (i as i64 + 1), 2))
                .with("stock", i as i32)
        })
        .collect::<Vec<_>>();
    let result = dorm
        .insert_bulk(DATA_SOURCE, &insert, records, None)
        .await
        .expect("Could not insert the products");
    assert_eq!(result.rows_affected, 4);
    assert_eq!(result.last_affected_id, Some(5));

    let all = dorm
        .query(DATA_SOURCE, "dorm_product", None)
        .await
        .expect("Could not build the query");
    assert_eq!(
        dorm.count(DATA_SOURCE, all.clone(), None)
            .await
            .expect("Could not count"),
        5
    );
    let names = dorm
        .list(
            DATA_SOURCE,
            all.clone()
                .select(&["name"])
                .expect("Invalid column")
                .desc(&["price"])
                .expect("Invalid order")
                .limit(3),
            None,
        )
        .await
        .expect("Could not list the products")
        .into_iter()
        .map(|row| row.get::<String>("name"))
        .collect::<Result<Vec<_>>>()
        .expect("Could not decode the names");
    assert_eq!(names, ["keyboard", "webcam", "cable"]);

    // Grouped conditions
    let query = all
        .clone()
        .lt("stock", 3)
        .expect("Invalid condition")
        .or(Where::any().l_like("name", "mo").eq("price", Decimal::new(3000, 2)))
        .expect("Invalid group")
        .asc(&["id"])
        .expect("Invalid order");
    let products = dorm
        .list_as::<Product>(DATA_SOURCE, query, None)
        .await
        .expect("Could not list the products");
    assert_eq!(
        products.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        ["mouse", "monitor", "cable"]
    );

    // Upsert of an existing unique key only updates the listed columns
    let result = dorm
        .upsert(
            DATA_SOURCE,
            &insert,
            Record::new()
                .with("name", "mouse")
                .with("price", Decimal::new(999, 2))
                .with("stock", 50),
            &UpdateColumns::only(["stock"]),
            None,
        )
        .await
        .expect("Could not upsert the mouse");
    assert!(result.rows_affected > 0);
    let mouse = dorm
        .one_as::<Product>(
            DATA_SOURCE,
            all.clone().eq("name", "mouse").expect("Invalid condition"),
            None,
        )
        .await
        .expect("Could not select the mouse")
        .expect("The mouse was not found");
    assert_eq!(mouse.stock, 50);
    assert_eq!(mouse.price, Decimal::new(1000, 2));

    let result = dorm
        .upsert_bulk(
            DATA_SOURCE,
            &insert,
            vec![
                Record::new()
                    .with("name", "cable")
                    .with("price", Decimal::new(500, 2))
                    .with("stock", 7),
                Record::new()
                    .with("name", "speaker")
                    .with("price", Decimal::new(8000, 2))
                    .with("stock", 1),
            ],
            &UpdateColumns::All,
            None,
        )
        .await
        .expect("Could not upsert the products");
    assert!(result.rows_affected >= 2);
    assert_eq!(
        dorm.count(DATA_SOURCE, all.clone(), None)
            .await
            .expect("Could not count"),
        6
    );

    // Update
    let update = dorm
        .update_table(DATA_SOURCE, "dorm_product", None)
        .await
        .expect("Could not build the update")
        .set("description", "on sale")
        .expect("Invalid field")
        .set("stock", 0)
        .expect("Invalid field")
        .is_in("name", ["cable", "speaker", "nothing"])
        .expect("Invalid condition");
    let changed = dorm
        .update(DATA_SOURCE, update, None)
        .await
        .expect("Could not update");
    assert_eq!(changed, 2);
    let on_sale = dorm
        .count(
            DATA_SOURCE,
            all.clone()
                .eq("description", "on sale")
                .expect("Invalid condition"),
            None,
        )
        .await
        .expect("Could not count");
    assert_eq!(on_sale, 2);

    // A predicate is required
    let update = dorm
        .update_table(DATA_SOURCE, "dorm_product", None)
        .await
        .expect("Could not build the update")
        .set("stock", 1)
        .expect("Invalid field");
    let error = dorm.update(DATA_SOURCE, update, None).await.unwrap_err();
    assert!(is_validation(&error));

    // Delete
    let delete = dorm
        .delete_from(DATA_SOURCE, "dorm_product", None)
        .await
        .expect("Could not build the delete")
        .eq("stock", 0)
        .expect("Invalid condition");
    let removed = dorm
        .delete(DATA_SOURCE, delete, None)
        .await
        .expect("Could not delete");
    assert_eq!(removed, 2);
    assert_eq!(
        dorm.count(DATA_SOURCE, all, None)
            .await
            .expect("Could not count"),
        4
    );

    // Raw statements
    let rows = dorm
        .raw_query(
            DATA_SOURCE,
            "SELECT name FROM dorm_product WHERE price > ? ORDER BY name",
            vec![Value::Decimal(Decimal::new(2000, 2))],
            None,
        )
        .await
        .expect("Could not run the raw query");
    assert_eq!(
        rows.iter()
            .map(|v| v.get::<String>("name"))
            .collect::<Result<Vec<_>>>()
            .expect("Could not decode the names"),
        ["keyboard", "webcam"]
    );
}
