use std::borrow::Cow;
use uuid::Uuid;

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Short random identifier used to follow one operation through the lock logs.
pub fn operation_id(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &id[..10])
}

/// The query trimmed to a length suitable for the logs.
pub fn printable_query(query: &str) -> Cow<'_, str> {
    const MAX: usize = 497;
    let query = query.trim_end();
    if query.len() <= MAX {
        return Cow::Borrowed(query);
    }
    let mut end = MAX;
    while !query.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}...", query[..end].trim_end()))
}
