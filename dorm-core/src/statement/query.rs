use crate::{
    AsValue, ConditionTree, Entity, Error, Executor, Filter, FromRow, Result, RowLabeled,
    TableShape, Value, check_field, select_many, select_one, separated_by, write_where,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn keyword(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// `SELECT` statement wrapper.
///
/// The column list defaults to every known field, `ignore` removes columns from
/// whatever list is in effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    shape: TableShape,
    predicate: ConditionTree,
    select: Vec<String>,
    ignore: Vec<String>,
    distinct: bool,
    order_by: Vec<(String, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Query {
    pub fn new(table: impl Into<String>, known_fields: impl Into<Arc<[String]>>) -> Result<Self> {
        Ok(Self::from_shape(TableShape::new(table, known_fields)?))
    }
    pub fn from_shape(shape: TableShape) -> Self {
        Self {
            shape,
            predicate: Default::default(),
            select: Vec::new(),
            ignore: Vec::new(),
            distinct: false,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
    pub fn of<E: Entity>() -> Self {
        Self::from_shape(E::shape())
    }

    fn check_fields(&self, fields: &[&str]) -> Result<()> {
        for field in fields {
            check_field(&self.shape.table, &self.shape.fields, field)?;
        }
        Ok(())
    }

    /// Replaces the column list.
    pub fn select(mut self, fields: &[&str]) -> Result<Self> {
        self.check_fields(fields)?;
        self.select = fields.iter().map(|v| v.to_string()).collect();
        Ok(self)
    }
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
    pub fn ignore(mut self, fields: &[&str]) -> Result<Self> {
        self.check_fields(fields)?;
        self.ignore = fields.iter().map(|v| v.to_string()).collect();
        Ok(self)
    }
    pub fn asc(self, fields: &[&str]) -> Result<Self> {
        self.order(fields, Order::Asc)
    }
    pub fn desc(self, fields: &[&str]) -> Result<Self> {
        self.order(fields, Order::Desc)
    }
    pub fn order(mut self, fields: &[&str], order: Order) -> Result<Self> {
        self.check_fields(fields)?;
        self.order_by
            .extend(fields.iter().map(|v| (v.to_string(), order)));
        Ok(self)
    }
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn shape(&self) -> &TableShape {
        &self.shape
    }

    /// Columns that will be selected.
    pub fn columns(&self) -> Vec<&str> {
        let selected: Box<dyn Iterator<Item = &String>> = if self.select.is_empty() {
            Box::new(self.shape.fields.iter())
        } else {
            Box::new(self.select.iter())
        };
        selected
            .filter(|v| !self.ignore.contains(v))
            .map(String::as_str)
            .collect()
    }

    pub fn build_select(&self) -> Result<(String, Vec<Value>)> {
        let columns = self.columns();
        if columns.is_empty() {
            return Err(Error::validation(format!(
                "no column left to select from [{}]",
                self.shape.table
            )));
        }
        let mut out = String::from("SELECT ");
        let mut args = Vec::new();
        if self.distinct {
            out.push_str("DISTINCT ");
        }
        separated_by(&mut out, columns, |out, v| out.push_str(v), ",");
        out.push_str(" FROM ");
        out.push_str(&self.shape.table);
        write_where(&mut out, &mut args, &self.predicate);
        if !self.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            separated_by(
                &mut out,
                &self.order_by,
                |out, (field, order)| {
                    out.push_str(field);
                    out.push(' ');
                    out.push_str(order.keyword());
                },
                ",",
            );
        }
        if let Some(limit) = self.limit {
            out.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            out.push_str(&format!(" OFFSET {offset}"));
        }
        Ok((out, args))
    }

    /// `SELECT COUNT(*)` with the same predicate, ignoring columns, ordering and paging.
    pub fn build_count(&self) -> (String, Vec<Value>) {
        let mut out = format!("SELECT COUNT(*) FROM {}", self.shape.table);
        let mut args = Vec::new();
        write_where(&mut out, &mut args, &self.predicate);
        (out, args)
    }

    pub async fn one<E: Executor>(&self, executor: &mut E) -> Result<Option<RowLabeled>> {
        let (sql, args) = self.build_select()?;
        select_one(executor, &sql, args).await
    }

    pub async fn list<E: Executor>(&self, executor: &mut E) -> Result<Vec<RowLabeled>> {
        let (sql, args) = self.build_select()?;
        select_many(executor, &sql, args).await
    }

    pub async fn count<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        let (sql, args) = self.build_count();
        let row = select_one(executor, &sql, args).await?;
        match row.and_then(|v| v.values.into_vec().into_iter().next()) {
            Some(value) => u64::try_from_value(value),
            None => Ok(0),
        }
    }

    /// Returns the rows of page `page` (starting from 1) and the total number of
    /// matching rows. The rows are not fetched when the total is zero.
    pub async fn page<E: Executor>(
        &self,
        executor: &mut E,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<RowLabeled>, u64)> {
        if page < 1 {
            return Err(Error::validation("page must start from 1"));
        }
        if page_size < 1 {
            return Err(Error::validation("page size must be greater than 0"));
        }
        let offset = (page - 1).checked_mul(page_size).ok_or_else(|| {
            Error::validation(format!("page {page} of size {page_size} is out of range"))
        })?;
        let paged = self.clone().limit(page_size).offset(offset);
        let total = self.count(executor).await?;
        if total == 0 {
            return Ok((Vec::new(), 0));
        }
        let rows = paged.list(executor).await?;
        Ok((rows, total))
    }

    pub async fn one_as<T: FromRow, E: Executor>(&self, executor: &mut E) -> Result<Option<T>> {
        self.one(executor).await?.map(T::from_row).transpose()
    }

    pub async fn list_as<T: FromRow, E: Executor>(&self, executor: &mut E) -> Result<Vec<T>> {
        self.list(executor)
            .await?
            .into_iter()
            .map(T::from_row)
            .collect()
    }
}

impl Filter for Query {
    fn table(&self) -> &str {
        &self.shape.table
    }
    fn known_fields(&self) -> &[String] {
        &self.shape.fields
    }
    fn predicate(&self) -> &ConditionTree {
        &self.predicate
    }
    fn predicate_mut(&mut self) -> &mut ConditionTree {
        &mut self.predicate
    }
}
