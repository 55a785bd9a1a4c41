use dorm_core::{ColumnInfo, Error, Executor, Result, RowLabeled, select_many};

/// Quotes an identifier with backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn text(row: &RowLabeled, name: &str) -> Result<String> {
    Ok(row.get::<Option<String>>(name)?.unwrap_or_default())
}

fn column_info(row: &RowLabeled) -> Result<ColumnInfo> {
    Ok(ColumnInfo {
        name: text(row, "Field")?,
        column_type: text(row, "Type")?,
        nullable: text(row, "Null")?.eq_ignore_ascii_case("YES"),
        key: text(row, "Key")?,
        default: row.get("Default")?,
        extra: text(row, "Extra")?,
        comment: text(row, "Comment")?,
    })
}

/// Columns of `database.table` in declaration order.
pub async fn describe<E: Executor>(
    executor: &mut E,
    database: &str,
    table: &str,
) -> Result<Vec<ColumnInfo>> {
    if table.trim().is_empty() {
        return Err(Error::validation("table is required"));
    }
    let sql = if database.is_empty() {
        format!("SHOW FULL COLUMNS FROM {}", quote_identifier(table))
    } else {
        format!(
            "SHOW FULL COLUMNS FROM {}.{}",
            quote_identifier(database),
            quote_identifier(table)
        )
    };
    let rows = select_many(executor, &sql, Vec::new()).await?;
    if rows.is_empty() {
        return Err(Error::validation(format!(
            "table [{table}] has no column in database [{database}]"
        )));
    }
    rows.iter().map(column_info).collect()
}
