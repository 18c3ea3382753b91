//! Macros to reduce boilerplate in the codebase

/// Macro to generate Display and FromStr implementations for string-backed enums
///
/// Parsing is case-insensitive; the error variant receives the rejected input.
///
/// # Usage
///
/// ```rust,ignore
/// use crate::error::KennzeichenError;
///
/// enum_display_fromstr!(
///     ViewMode,
///     KennzeichenError::InvalidViewMode,
///     {
///         Alphabetical => "alphabetical",
///         Grouped => "grouped",
///     }
/// );
/// ```
#[macro_export]
macro_rules! enum_display_fromstr {
    (
        $enum_name:ident,
        $error_variant:path,
        { $($variant:ident => $str:expr),+ $(,)? }
    ) => {
        impl $enum_name {
            /// The canonical string form of this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($enum_name::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::error::KennzeichenError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok($enum_name::$variant),)+
                    _ => Err($error_variant(s.to_string())),
                }
            }
        }
    };
}
