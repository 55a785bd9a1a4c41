#[cfg(test)]
mod tests {
    use dorm::{AsValue, Value};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use time::macros::{date, datetime, time};

    #[test]
    fn value_none() {
        assert_eq!(Value::Null, Value::default());
        assert!(None::<i32>.as_value().is_null());
        assert_eq!(Option::<String>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<i64>::try_from_value(Value::Int64(3)).unwrap(),
            Some(3)
        );
    }

    #[test]
    fn value_integers() {
        assert_eq!(7_i8.as_value(), Value::Int64(7));
        assert_eq!(7_u16.as_value(), Value::UInt64(7));
        assert_eq!(u8::try_from_value(Value::Int64(255)).unwrap(), 255);
        assert!(u8::try_from_value(Value::Int64(256)).is_err());
        assert!(u32::try_from_value(Value::Int64(-1)).is_err());
        assert_eq!(i32::try_from_value(Value::UInt64(12)).unwrap(), 12);
        assert_eq!(i64::try_from_value(Value::Varchar("-42".into())).unwrap(), -42);
        assert_eq!(
            i64::try_from_value(Value::Decimal(Decimal::new(1500, 2))).unwrap(),
            15
        );
        assert!(i64::try_from_value(Value::Decimal(Decimal::new(1505, 2))).is_err());
        assert!(i64::try_from_value(Value::Varchar("ten".into())).is_err());
    }

    #[test]
    fn value_bool() {
        assert_eq!(true.as_value(), Value::Boolean(true));
        assert!(bool::try_from_value(Value::Int64(1)).unwrap());
        assert!(!bool::try_from_value(Value::UInt64(0)).unwrap());
        assert!(bool::try_from_value(Value::Varchar("true".into())).is_err());
    }

    #[test]
    fn value_text() {
        assert_eq!("abc".as_value(), Value::Varchar("abc".into()));
        assert_eq!(
            String::try_from_value(Value::Blob(b"bytes".to_vec().into())).unwrap(),
            "bytes"
        );
        assert_eq!(String::try_from_value(Value::UInt64(9)).unwrap(), "9");
        assert!(String::try_from_value(Value::Blob(vec![0xff, 0xfe].into())).is_err());
        assert_eq!(
            Value::Blob(b"text".to_vec().into()).as_str().as_deref(),
            Some("text")
        );
    }

    #[test]
    fn value_decimal() {
        let value = Decimal::from_str("1234.5678").unwrap();
        assert_eq!(value.as_value(), Value::Decimal(value));
        assert_eq!(
            Decimal::try_from_value(Value::Varchar("1234.5678".into())).unwrap(),
            value
        );
        assert_eq!(
            Decimal::try_from_value(Value::Int64(-3)).unwrap(),
            Decimal::new(-3, 0)
        );
        assert!((f64::try_from_value(Value::Decimal(value)).unwrap() - 1234.5678).abs() < 1e-9);
    }

    #[test]
    fn value_time() {
        assert_eq!(
            date!(2024 - 02 - 29).as_value(),
            Value::Date(date!(2024 - 02 - 29))
        );
        assert_eq!(
            time::Time::try_from_value(Value::Time(time!(23:59:59))).unwrap(),
            time!(23:59:59)
        );
        assert_eq!(
            time::PrimitiveDateTime::try_from_value(Value::Timestamp(datetime!(2020-01-01 0:00)))
                .unwrap(),
            datetime!(2020-01-01 0:00)
        );
        assert!(time::Date::try_from_value(Value::Varchar("2024-02-29".into())).is_err());
    }

    #[test]
    fn value_list() {
        assert_eq!(
            vec![1, 2].as_value(),
            Value::List(vec![Value::Int64(1), Value::Int64(2)])
        );
        assert_eq!(
            Vec::<u64>::try_from_value(Value::List(vec![Value::UInt64(4)])).unwrap(),
            [4]
        );
        assert!(Vec::<u64>::try_from_value(Value::UInt64(4)).is_err());
    }
}
