//! A small annotation language for requesting assets from source comments.
//!
//! An annotation is a marker made of a sentinel character and an
//! identifier, followed by a body of `key,value` pairs:
//!
//! ```text
//! // @asset(asset,static/logo.svg;compressor,tar;absolute,false)
//! ```
//!
//! Records are declared with [`annotation!`](crate::annotation!), which
//! binds each field to a key and coerces values through [`FieldValue`].

mod parser;
mod value;

pub use self::parser::{Block, PairSeparator, Parser, Syntax};
pub use self::value::FieldValue;

/// A record that can be populated from an annotation body.
pub trait Annotation {
    /// The identifier following the sentinel character.
    fn identifier(&self) -> &str;

    /// Store `value` in the field bound to `key`.
    ///
    /// Returns `Ok(false)` for keys the record does not know about.
    fn assign(&mut self, key: &str, value: &str) -> Result<bool, AnnotationError>;
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AnnotationError {
    /// The text holds no annotation with the requested identifier.
    #[error("No \"{identifier}\" annotation found")]
    NotPresent { identifier: String },
    #[error("Invalid value \"{value}\" for \"{key}\", expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("Unable to build the matcher for \"{identifier}\"")]
    Pattern {
        identifier: String,
        #[source]
        error: regex::Error,
    },
}

impl AnnotationError {
    /// Whether the annotation was simply absent, which callers usually skip.
    pub fn is_not_present(&self) -> bool {
        matches!(self, AnnotationError::NotPresent { .. })
    }
}

/// Declare an annotation record.
///
/// The struct gets a `Default` implementation and an [`Annotation`]
/// implementation binding each field to the key after `=>`.
///
/// ```
/// stowage::annotation! {
///     #[derive(Debug)]
///     pub struct Icon: "icon" {
///         pub path: String => "path",
///         pub size: u32 => "size",
///     }
/// }
///
/// let mut icon = Icon::default();
/// stowage::Parser::csv()
///     .parse("@icon(path,app.png;size,64)", &mut icon)
///     .unwrap();
/// assert_eq!(icon.size, 64);
/// ```
#[macro_export]
macro_rules! annotation {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $identifier:literal {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty => $key:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::annotation::Annotation for $name {
            fn identifier(&self) -> &str {
                $identifier
            }

            fn assign(
                &mut self,
                key: &str,
                value: &str,
            ) -> ::std::result::Result<bool, $crate::annotation::AnnotationError> {
                match key {
                    $(
                        $key => {
                            self.$field = <$ty as $crate::annotation::FieldValue>::parse_field(value)
                                .ok_or_else(|| $crate::annotation::AnnotationError::InvalidValue {
                                    key: key.to_string(),
                                    value: value.to_string(),
                                    expected: <$ty as $crate::annotation::FieldValue>::KIND,
                                })?;
                            Ok(true)
                        }
                    )*
                    _ => Ok(false),
                }
            }
        }
    };
}

annotation! {
    /// An asset to embed into the build.
    ///
    /// `asset` is the path of a file or directory, resolved against the
    /// directory of the annotated source unless `absolute` is set.
    /// `compressor` names the codec to use; empty means the configured one.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct AssetAnnotation: "asset" {
        pub asset: String => "asset",
        pub compressor: String => "compressor",
        pub absolute: bool => "absolute",
    }
}
