use crate::decode_value;
use dorm_core::{Context, Row, RowLabeled, RowNames};

pub(crate) struct RowWrap(pub(crate) RowLabeled);

impl TryFrom<mysql_async::Row> for RowWrap {
    type Error = dorm_core::anyhow::Error;

    fn try_from(mut row: mysql_async::Row) -> Result<Self, Self::Error> {
        let columns = row.columns();
        let names: RowNames = columns.iter().map(|v| v.name_str().into_owned()).collect();
        let values: Row = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = row
                    .take::<mysql_async::Value, _>(i)
                    .unwrap_or(mysql_async::Value::NULL);
                decode_value(value, column)
                    .with_context(|| format!("While reading the column `{}`", names[i]))
            })
            .collect::<Result<_, _>>()?;
        Ok(RowWrap(RowLabeled::new(names, values)))
    }
}
