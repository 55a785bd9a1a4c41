use crate::{Error, Result};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::{any, borrow::Cow, str::FromStr};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed SQL value, used both for statement arguments and for the
/// cells of the returned rows.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    Varchar(String),
    Blob(Box<[u8]>),
    Date(Date),
    Time(Time),
    Timestamp(PrimitiveDateTime),
    Uuid(Uuid),
    /// Only meaningful as the argument of an `in` condition.
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual content of the value, blobs are accepted when they are valid UTF-8.
    pub fn as_str(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Varchar(v) => Some(Cow::Borrowed(v)),
            Value::Blob(v) => std::str::from_utf8(v).ok().map(Cow::Borrowed),
            _ => None,
        }
    }
}

/// Conversion between native Rust types and [`Value`].
///
/// Every argument accepted by the statement builders goes through this trait,
/// rows are decoded back with [`AsValue::try_from_value`].
pub trait AsValue {
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

fn mismatch<T>(value: &Value) -> anyhow::Error {
    anyhow::anyhow!(
        "Cannot convert {:?} into {}",
        value,
        any::type_name::<T>()
    )
}

impl AsValue for Value {
    fn as_value(self) -> Value {
        self
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

macro_rules! impl_as_value_integer {
    ($variant:ident, $wide:ty, $($source:ty),+) => {
        $(
            impl AsValue for $source {
                fn as_value(self) -> Value {
                    Value::$variant(self as $wide)
                }
                fn try_from_value(value: Value) -> Result<Self> {
                    let result = match &value {
                        Value::Int64(v) => <$source>::try_from(*v).ok(),
                        Value::UInt64(v) => <$source>::try_from(*v).ok(),
                        Value::Boolean(v) => Some(*v as $source),
                        Value::Decimal(v) if v.fract().is_zero() => {
                            v.to_i128().and_then(|v| <$source>::try_from(v).ok())
                        }
                        Value::Varchar(v) => <$source>::from_str(v).ok(),
                        Value::Blob(v) => std::str::from_utf8(v)
                            .ok()
                            .and_then(|v| <$source>::from_str(v).ok()),
                        _ => None,
                    };
                    result.ok_or_else(|| mismatch::<$source>(&value))
                }
            }
        )+
    };
}
impl_as_value_integer!(Int64, i64, i8, i16, i32, i64);
impl_as_value_integer!(UInt64, u64, u8, u16, u32, u64);

macro_rules! impl_as_value_float {
    ($variant:ident, $source:ty) => {
        impl AsValue for $source {
            fn as_value(self) -> Value {
                Value::$variant(self)
            }
            fn try_from_value(value: Value) -> Result<Self> {
                let result = match &value {
                    Value::Float32(v) => Some(*v as $source),
                    Value::Float64(v) => Some(*v as $source),
                    Value::Int64(v) => Some(*v as $source),
                    Value::UInt64(v) => Some(*v as $source),
                    Value::Decimal(v) => v.to_f64().map(|v| v as $source),
                    Value::Varchar(v) => <$source>::from_str(v).ok(),
                    _ => None,
                };
                result.ok_or_else(|| mismatch::<$source>(&value))
            }
        }
    };
}
impl_as_value_float!(Float32, f32);
impl_as_value_float!(Float64, f64);

impl AsValue for bool {
    fn as_value(self) -> Value {
        Value::Boolean(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Int64(v) => Ok(v != 0),
            Value::UInt64(v) => Ok(v != 0),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for String {
    fn as_value(self) -> Value {
        Value::Varchar(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(v) => Ok(v),
            Value::Blob(v) => String::from_utf8(v.into_vec())
                .map_err(|e| anyhow::Error::new(e).context("Blob is not valid UTF-8")),
            Value::Int64(v) => Ok(v.to_string()),
            Value::UInt64(v) => Ok(v.to_string()),
            Value::Decimal(v) => Ok(v.to_string()),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for &str {
    fn as_value(self) -> Value {
        Value::Varchar(self.to_owned())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Err(mismatch::<Self>(&value).context("Borrowed strings cannot be decoded, use String"))
    }
}

impl AsValue for Box<[u8]> {
    fn as_value(self) -> Value {
        Value::Blob(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(v) => Ok(v),
            Value::Varchar(v) => Ok(v.into_bytes().into_boxed_slice()),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for Decimal {
    fn as_value(self) -> Value {
        Value::Decimal(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Decimal(v) => Ok(*v),
            Value::Int64(v) => Ok((*v).into()),
            Value::UInt64(v) => Ok((*v).into()),
            Value::Varchar(v) => Decimal::from_str(v).map_err(Into::into),
            Value::Blob(v) => std::str::from_utf8(v)
                .map_err(anyhow::Error::from)
                .and_then(|v| Decimal::from_str(v).map_err(Into::into)),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

macro_rules! impl_as_value_plain {
    ($variant:ident, $source:ty) => {
        impl AsValue for $source {
            fn as_value(self) -> Value {
                Value::$variant(self)
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    _ => Err(mismatch::<Self>(&value)),
                }
            }
        }
    };
}
impl_as_value_plain!(Date, Date);
impl_as_value_plain!(Time, Time);
impl_as_value_plain!(Timestamp, PrimitiveDateTime);

impl AsValue for Uuid {
    fn as_value(self) -> Value {
        Value::Uuid(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Uuid(v) => Ok(*v),
            Value::Varchar(v) => Uuid::parse_str(v).map_err(Into::into),
            Value::Blob(v) if v.len() == 16 => Uuid::from_slice(v).map_err(Into::into),
            Value::Blob(v) => std::str::from_utf8(v)
                .map_err(anyhow::Error::from)
                .and_then(|v| Uuid::parse_str(v).map_err(Into::into)),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
}

impl<T: AsValue> AsValue for Vec<T> {
    fn as_value(self) -> Value {
        Value::List(self.into_iter().map(AsValue::as_value).collect())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(v) => v.into_iter().map(T::try_from_value).collect(),
            _ => Err(Error::validation(format!(
                "Expected a list, found {:?}",
                value
            ))),
        }
    }
}
