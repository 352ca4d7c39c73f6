// (c) Copyright 2025 Helsing GmbH. All rights reserved.
/// Convenience macro for building a [`Value`](crate::Value) literal.
///
/// Arrays use `[...]`, objects use `{ "key": value }`, and `null` stands for
/// [`Value::Null`](crate::Value::Null). Anything else is converted with `Value::from`, so
/// arbitrary expressions (including negative numbers and [`Value::Absent`](crate::Value::Absent))
/// go in parentheses.
///
/// ```rust
/// # use tomes::{value, Value};
/// let v = value!({
///     "name": "Alice",
///     "tags": ["admin", null],
///     "scores": [1, (Value::Absent), (-2.5)]
/// });
/// assert!(matches!(v, Value::Object(_)));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(::std::vec![ $( $crate::value!($elem) ),* ])
    };

    ({ $($k:literal : $v:tt),* $(,)? }) => {{
        #[allow(unused_mut)]
        let mut props = ::std::collections::BTreeMap::new();
        $( props.insert(::std::string::String::from($k), $crate::value!($v)); )*
        $crate::Value::Object(props)
    }};

    ($other:expr) => {
        $crate::Value::from($other)
    };
}
