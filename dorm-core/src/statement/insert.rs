use crate::{
    Entity, Error, Executor, Record, Result, RowsAffected, TableShape, Value, execute,
    execute_many, separated_by,
};
use std::sync::Arc;

/// Columns refreshed by an upsert when the row collides with an existing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateColumns {
    /// Every inserted column.
    All,
    /// Only these, they must be inserted columns too.
    Only(Vec<String>),
}

impl UpdateColumns {
    pub fn only<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        UpdateColumns::Only(columns.into_iter().map(Into::into).collect())
    }
}

/// `INSERT` statement wrapper, single row, bulk and upsert flavours.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    shape: TableShape,
}

impl Insert {
    pub fn new(table: impl Into<String>, known_fields: impl Into<Arc<[String]>>) -> Result<Self> {
        Ok(Self::from_shape(TableShape::new(table, known_fields)?))
    }
    pub fn from_shape(shape: TableShape) -> Self {
        Self { shape }
    }
    pub fn of<E: Entity>() -> Self {
        Self::from_shape(E::shape())
    }
    pub fn shape(&self) -> &TableShape {
        &self.shape
    }

    /// Keeps the known fields of `record`, in the record order.
    fn columns<'r>(&self, record: &'r Record, skip_null: bool) -> Result<Vec<(&'r str, &'r Value)>> {
        let columns = record
            .iter()
            .filter(|(k, v)| self.shape.contains(k) && !(skip_null && v.is_null()))
            .collect::<Vec<_>>();
        if columns.is_empty() {
            return Err(Error::validation(format!(
                "no valid field found for [{}]",
                self.shape.table
            )));
        }
        Ok(columns)
    }

    fn write_insert<'a>(&self, out: &mut String, columns: impl Iterator<Item = &'a str> + Clone) {
        out.push_str("INSERT INTO ");
        out.push_str(&self.shape.table);
        out.push('(');
        separated_by(out, columns.clone(), |out, v| out.push_str(v), ",");
        out.push_str(") VALUES(");
        separated_by(out, columns, |out, _| out.push('?'), ",");
        out.push(')');
    }

    fn write_update<'a>(
        &self,
        out: &mut String,
        inserted: &[&'a str],
        update: &'a UpdateColumns,
    ) -> Result<()> {
        let columns: Vec<&str> = match update {
            UpdateColumns::All => inserted.to_vec(),
            UpdateColumns::Only(columns) => {
                if columns.is_empty() {
                    return Err(Error::validation(format!(
                        "empty update column list for [{}]",
                        self.shape.table
                    )));
                }
                if let Some(missing) = columns.iter().find(|v| !inserted.contains(&v.as_str())) {
                    return Err(Error::validation(format!(
                        "update column [{missing}] is not an inserted column of [{}]",
                        self.shape.table
                    )));
                }
                columns.iter().map(String::as_str).collect()
            }
        };
        out.push_str(" ON DUPLICATE KEY UPDATE ");
        separated_by(
            out,
            columns,
            |out, v| {
                out.push_str(v);
                out.push_str("=VALUES(");
                out.push_str(v);
                out.push(')');
            },
            ",",
        );
        Ok(())
    }

    fn build_single(
        &self,
        record: &Record,
        update: Option<&UpdateColumns>,
    ) -> Result<(String, Vec<Value>)> {
        let columns = self.columns(record, true)?;
        let names = columns.iter().map(|(k, _)| *k).collect::<Vec<_>>();
        let mut out = String::new();
        self.write_insert(&mut out, names.iter().copied());
        if let Some(update) = update {
            self.write_update(&mut out, &names, update)?;
        }
        let args = columns.into_iter().map(|(_, v)| v.clone()).collect();
        Ok((out, args))
    }

    /// Null values are skipped so the column defaults apply.
    pub fn build_insert(&self, record: &Record) -> Result<(String, Vec<Value>)> {
        self.build_single(record, None)
    }

    pub fn build_upsert(
        &self,
        record: &Record,
        update: &UpdateColumns,
    ) -> Result<(String, Vec<Value>)> {
        self.build_single(record, Some(update))
    }

    /// Every row must carry exactly the known fields of the first one, the values
    /// are aligned to the first row column order.
    pub fn build_bulk(
        &self,
        records: &[Record],
        update: Option<&UpdateColumns>,
    ) -> Result<(String, Vec<Vec<Value>>)> {
        let Some(first) = records.first() else {
            return Err(Error::validation(format!(
                "no row to insert into [{}]",
                self.shape.table
            )));
        };
        let names = self
            .columns(first, false)?
            .into_iter()
            .map(|(k, _)| k)
            .collect::<Vec<_>>();
        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let known = record.keys().filter(|k| self.shape.contains(k)).count();
            let row = names
                .iter()
                .map(|k| record.get(k).cloned())
                .collect::<Option<Vec<_>>>();
            match row {
                Some(row) if known == names.len() => rows.push(row),
                _ => {
                    return Err(Error::validation(format!(
                        "row {i} does not have the same fields as the first row ({}) for [{}]",
                        names.join(","),
                        self.shape.table
                    )));
                }
            }
        }
        let mut out = String::new();
        self.write_insert(&mut out, names.iter().copied());
        if let Some(update) = update {
            self.write_update(&mut out, &names, update)?;
        }
        Ok((out, rows))
    }

    pub async fn insert<E: Executor>(&self, executor: &mut E, record: &Record) -> Result<RowsAffected> {
        let (sql, args) = self.build_insert(record)?;
        execute(executor, &sql, args).await
    }

    pub async fn upsert<E: Executor>(
        &self,
        executor: &mut E,
        record: &Record,
        update: &UpdateColumns,
    ) -> Result<RowsAffected> {
        let (sql, args) = self.build_upsert(record, update)?;
        execute(executor, &sql, args).await
    }

    pub async fn insert_bulk<E: Executor>(
        &self,
        executor: &mut E,
        records: &[Record],
    ) -> Result<RowsAffected> {
        let (sql, rows) = self.build_bulk(records, None)?;
        execute_many(executor, &sql, rows).await
    }

    pub async fn upsert_bulk<E: Executor>(
        &self,
        executor: &mut E,
        records: &[Record],
        update: &UpdateColumns,
    ) -> Result<RowsAffected> {
        let (sql, rows) = self.build_bulk(records, Some(update))?;
        execute_many(executor, &sql, rows).await
    }
}
