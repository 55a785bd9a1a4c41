use dorm_core::{Error, Result, Value, anyhow::anyhow};
use mysql_async::{Column, consts::ColumnType};
use rust_decimal::Decimal;
use std::str::FromStr;
use time::{Date, Month, PrimitiveDateTime, Time};

const BINARY_CHARSET: u16 = 63;

/// Statement argument on its way to the server.
pub(crate) struct ValueWrap(pub(crate) Value);

impl From<Value> for ValueWrap {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl TryFrom<ValueWrap> for mysql_async::Value {
    type Error = dorm_core::anyhow::Error;

    fn try_from(value: ValueWrap) -> Result<Self> {
        type MySQLValue = mysql_async::Value;
        Ok(match value.0 {
            Value::Null => MySQLValue::NULL,
            Value::Boolean(v) => MySQLValue::from(v),
            Value::Int64(v) => MySQLValue::from(v),
            Value::UInt64(v) => MySQLValue::from(v),
            Value::Float32(v) => MySQLValue::from(v),
            Value::Float64(v) => MySQLValue::from(v),
            Value::Decimal(v) => MySQLValue::Bytes(v.to_string().into_bytes()),
            Value::Varchar(v) => MySQLValue::from(v),
            Value::Blob(v) => MySQLValue::Bytes(v.into_vec()),
            Value::Date(v) => MySQLValue::Date(
                checked_year(v.year(), &v)?,
                v.month().into(),
                v.day(),
                0,
                0,
                0,
                0,
            ),
            Value::Time(v) => MySQLValue::Time(
                false,
                0,
                v.hour(),
                v.minute(),
                v.second(),
                v.microsecond(),
            ),
            Value::Timestamp(v) => MySQLValue::Date(
                checked_year(v.year(), &v)?,
                v.month().into(),
                v.day(),
                v.hour(),
                v.minute(),
                v.second(),
                v.microsecond(),
            ),
            Value::Uuid(v) => MySQLValue::Bytes(v.hyphenated().to_string().into_bytes()),
            Value::List(..) => {
                return Err(Error::validation(
                    "a list can only be the argument of an `in` condition",
                ));
            }
        })
    }
}

fn checked_year(year: i32, date: &impl std::fmt::Display) -> Result<u16> {
    u16::try_from(year)
        .ok()
        .filter(|v| *v <= 9999)
        .ok_or_else(|| Error::validation(format!("Date {date} is out of range for MySQL")))
}

fn month(value: u8) -> Option<Month> {
    Month::try_from(value).ok()
}

/// Converts a cell coming from the binary protocol, `column` decides how the raw
/// bytes are interpreted.
pub(crate) fn decode_value(value: mysql_async::Value, column: &Column) -> Result<Value> {
    type MySQLValue = mysql_async::Value;
    let error = |value: &MySQLValue| {
        anyhow!(
            "Cannot decode {:?} from column `{}` of type {:?}",
            value,
            column.name_str(),
            column.column_type()
        )
    };
    Ok(match value {
        MySQLValue::NULL => Value::Null,
        MySQLValue::Int(v) => Value::Int64(v),
        MySQLValue::UInt(v) => Value::UInt64(v),
        MySQLValue::Float(v) => Value::Float32(v),
        MySQLValue::Double(v) => Value::Float64(v),
        MySQLValue::Bytes(v) => match column.column_type() {
            ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                let decimal = std::str::from_utf8(&v)
                    .ok()
                    .and_then(|v| Decimal::from_str(v).ok());
                match decimal {
                    Some(decimal) => Value::Decimal(decimal),
                    None => return Err(error(&MySQLValue::Bytes(v))),
                }
            }
            _ if column.character_set() == BINARY_CHARSET => Value::Blob(v.into()),
            _ => match String::from_utf8(v) {
                Ok(v) => Value::Varchar(v),
                Err(e) => Value::Blob(e.into_bytes().into()),
            },
        },
        // Zero dates (`0000-00-00`, `2024-00-00`) are not valid calendar dates.
        MySQLValue::Date(_, 0, ..) | MySQLValue::Date(_, _, 0, ..) => Value::Null,
        MySQLValue::Date(year, m, day, hour, minute, second, micros) => {
            let date = month(m)
                .and_then(|m| Date::from_calendar_date(year as _, m, day).ok())
                .ok_or_else(|| error(&value))?;
            if column.column_type() == ColumnType::MYSQL_TYPE_DATE {
                Value::Date(date)
            } else {
                let time = Time::from_hms_micro(hour, minute, second, micros)
                    .map_err(|_| error(&value))?;
                Value::Timestamp(PrimitiveDateTime::new(date, time))
            }
        }
        MySQLValue::Time(false, 0, hours, minutes, seconds, micros) => Value::Time(
            Time::from_hms_micro(hours, minutes, seconds, micros).map_err(|_| error(&value))?,
        ),
        // Durations outside of a single day have no native counterpart.
        MySQLValue::Time(negative, days, hours, minutes, seconds, micros) => {
            Value::Varchar(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                if negative { "-" } else { "" },
                days * 24 + hours as u32,
                minutes,
                seconds,
                micros
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::decode_value;
    use dorm_core::{Value, is_validation};
    use mysql_async::{Column, Value as MySQLValue, consts::ColumnType};
    use time::macros::{date, datetime};

    fn column(column_type: ColumnType) -> Column {
        Column::new(column_type).with_name(b"happened_at")
    }

    #[test]
    fn zero_dates() {
        let date = column(ColumnType::MYSQL_TYPE_DATE);
        assert_eq!(
            decode_value(MySQLValue::Date(0, 0, 0, 0, 0, 0, 0), &date).unwrap(),
            Value::Null
        );
        assert_eq!(
            decode_value(MySQLValue::Date(2024, 3, 0, 0, 0, 0, 0), &date).unwrap(),
            Value::Null
        );
        assert_eq!(
            decode_value(MySQLValue::Date(2024, 2, 29, 0, 0, 0, 0), &date).unwrap(),
            Value::Date(date!(2024 - 02 - 29))
        );
        let timestamp = column(ColumnType::MYSQL_TYPE_DATETIME);
        assert_eq!(
            decode_value(MySQLValue::Date(0, 0, 0, 0, 0, 0, 0), &timestamp).unwrap(),
            Value::Null
        );
        assert_eq!(
            decode_value(MySQLValue::Date(2020, 1, 1, 8, 30, 0, 0), &timestamp).unwrap(),
            Value::Timestamp(datetime!(2020-01-01 8:30))
        );
    }

    #[test]
    fn undecodable() {
        let error = decode_value(
            MySQLValue::Date(2023, 2, 30, 0, 0, 0, 0),
            &column(ColumnType::MYSQL_TYPE_DATE),
        )
        .unwrap_err();
        assert!(!is_validation(&error));
        assert!(error.to_string().contains("happened_at"));

        let error = decode_value(
            MySQLValue::Bytes(b"12,5".to_vec()),
            &column(ColumnType::MYSQL_TYPE_NEWDECIMAL),
        )
        .unwrap_err();
        assert!(!is_validation(&error));
    }
}
