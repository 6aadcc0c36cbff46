use std::path::PathBuf;

/// A type an annotation field can be coerced into from its raw text.
pub trait FieldValue: Sized {
    /// A short description of the accepted input, used in error messages.
    const KIND: &'static str;

    /// Parse `raw`, which is already trimmed and unquoted.
    fn parse_field(raw: &str) -> Option<Self>;
}

impl FieldValue for String {
    const KIND: &'static str = "a string";

    fn parse_field(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FieldValue for PathBuf {
    const KIND: &'static str = "a path";

    fn parse_field(raw: &str) -> Option<Self> {
        Some(PathBuf::from(raw))
    }
}

impl FieldValue for bool {
    const KIND: &'static str = "a boolean";

    fn parse_field(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "1" | "t" | "true" | "yes" => Some(true),
            "0" | "f" | "false" | "no" => Some(false),
            _ => None,
        }
    }
}

macro_rules! impl_field_value_from_str {
    ($kind:literal => $($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const KIND: &'static str = $kind;

                fn parse_field(raw: &str) -> Option<Self> {
                    raw.parse().ok()
                }
            }
        )*
    };
}

impl_field_value_from_str!("an integer" => u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
impl_field_value_from_str!("a number" => f32, f64);

/// An empty value leaves the field unset.
impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: &'static str = T::KIND;

    fn parse_field(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            Some(None)
        } else {
            T::parse_field(raw).map(Some)
        }
    }
}
