#[cfg(test)]
mod tests {
    use dorm_core::{
        Entity, Executor, Filter, FromRow, Insert, Query, Record, Result, RowLabeled,
        RowsAffected, Value, execute_many, is_validation, select_one, translate_placeholders,
    };
    use std::{future::Future, sync::Arc};

    /// Records every statement, `COUNT(*)` queries return `total`.
    struct Recorder {
        total: u64,
        rows: Vec<RowLabeled>,
        statements: Vec<(String, Vec<Value>)>,
    }

    impl Recorder {
        fn new(total: u64) -> Self {
            Self {
                total,
                rows: Vec::new(),
                statements: Vec::new(),
            }
        }
    }

    impl Executor for Recorder {
        fn fetch(
            &mut self,
            sql: &str,
            args: Vec<Value>,
        ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
            self.statements.push((sql.to_string(), args));
            let rows = if sql.starts_with("SELECT COUNT(*)") {
                vec![RowLabeled::new(
                    Arc::from(vec!["COUNT(*)".to_string()]),
                    Box::new([Value::Int64(self.total as i64)]),
                )]
            } else {
                self.rows.clone()
            };
            async move { Ok(rows) }
        }

        fn execute(
            &mut self,
            sql: &str,
            args: Vec<Value>,
        ) -> impl Future<Output = Result<RowsAffected>> + Send {
            self.statements.push((sql.to_string(), args));
            let id = self.statements.len() as u64;
            async move {
                Ok(RowsAffected {
                    rows_affected: 1,
                    last_affected_id: Some(id),
                })
            }
        }
    }

    struct Product;
    impl Entity for Product {
        const TABLE: &'static str = "product";
        const FIELDS: &'static [&'static str] = &["id", "name", "price"];
    }

    #[derive(Debug, PartialEq)]
    struct ProductName {
        id: u64,
        name: String,
    }
    impl FromRow for ProductName {
        fn from_row(row: RowLabeled) -> Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
            })
        }
    }

    fn product_row(id: u64, name: &str) -> RowLabeled {
        RowLabeled::new(
            Arc::from(vec!["id".to_string(), "name".to_string()]),
            Box::new([Value::UInt64(id), Value::Varchar(name.into())]),
        )
    }

    #[tokio::test]
    async fn page_empty_skips_rows() {
        let mut executor = Recorder::new(0);
        let query = Query::of::<Product>().gt("price", 10).unwrap();
        let (rows, total) = query.page(&mut executor, 1, 10).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 0);
        assert_eq!(executor.statements.len(), 1);
        assert_eq!(
            executor.statements[0].0,
            "SELECT COUNT(*) FROM product WHERE price > ?"
        );
    }

    #[tokio::test]
    async fn page_offset() {
        let mut executor = Recorder::new(25);
        executor.rows = vec![product_row(11, "eleven")];
        let query = Query::of::<Product>().asc(&["id"]).unwrap();
        let (rows, total) = query.page(&mut executor, 2, 10).await.unwrap();
        assert_eq!(total, 25);
        assert_eq!(rows.len(), 1);
        assert_eq!(executor.statements.len(), 2);
        assert_eq!(
            executor.statements[1].0,
            "SELECT id,name,price FROM product ORDER BY id asc LIMIT 10 OFFSET 10"
        );
    }

    #[tokio::test]
    async fn page_invalid() {
        let mut executor = Recorder::new(3);
        let query = Query::of::<Product>();
        assert!(is_validation(
            &query.page(&mut executor, 0, 10).await.unwrap_err()
        ));
        assert!(is_validation(
            &query.page(&mut executor, 1, 0).await.unwrap_err()
        ));
        assert!(is_validation(
            &query.page(&mut executor, u64::MAX, 2).await.unwrap_err()
        ));
        assert!(executor.statements.is_empty());
        let (_, total) = query.page(&mut executor, u64::MAX, 1).await.unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn count_and_typed_rows() {
        let mut executor = Recorder::new(7);
        let query = Query::of::<Product>().select(&["id", "name"]).unwrap();
        assert_eq!(query.count(&mut executor).await.unwrap(), 7);
        executor.rows = vec![product_row(1, "one"), product_row(2, "two")];
        let products = query.list_as::<ProductName, _>(&mut executor).await.unwrap();
        assert_eq!(
            products,
            [
                ProductName {
                    id: 1,
                    name: "one".into()
                },
                ProductName {
                    id: 2,
                    name: "two".into()
                },
            ]
        );
        let first = query.one_as::<ProductName, _>(&mut executor).await.unwrap();
        assert_eq!(first.map(|v| v.id), Some(1));
        executor.rows.clear();
        assert!(query.one(&mut executor).await.unwrap().is_none());
        assert!(query.list(&mut executor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_terminals() {
        let mut executor = Recorder::new(0);
        let insert = Insert::of::<Product>();
        let result = insert
            .insert(&mut executor, &Record::new().with("name", "a").with("price", 5))
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(
            executor.statements[0],
            (
                "INSERT INTO product(name,price) VALUES(?,?)".to_string(),
                vec![Value::Varchar("a".into()), Value::Int64(5)]
            )
        );
        let records = vec![
            Record::new().with("id", 1).with("name", "x"),
            Record::new().with("id", 2).with("name", "y"),
            Record::new().with("id", 3).with("name", "z"),
        ];
        let result = insert.insert_bulk(&mut executor, &records).await.unwrap();
        assert_eq!(result.rows_affected, 3);
        assert_eq!(result.last_affected_id, Some(4));
        assert_eq!(executor.statements.len(), 4);
    }

    #[tokio::test]
    async fn free_functions() {
        let mut executor = Recorder::new(0);
        executor.rows = vec![product_row(1, "one"), product_row(2, "two")];
        let row = select_one(&mut executor, "SELECT id,name FROM product", vec![])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.get::<String>("name").unwrap(), "one");
        let result = execute_many(
            &mut executor,
            "DELETE FROM product WHERE id = ?",
            vec![vec![Value::Int64(1)], vec![Value::Int64(2)]],
        )
        .await
        .unwrap();
        assert_eq!(result.rows_affected, 2);
        assert_eq!(executor.statements.len(), 3);
    }

    #[test]
    fn placeholders() {
        assert_eq!(translate_placeholders("a = ? and b = ?", "?"), "a = ? and b = ?");
        assert_eq!(
            translate_placeholders("a = ? and b = '?' and c = \"?\"", "%s"),
            "a = %s and b = '?' and c = \"?\""
        );
    }
}
