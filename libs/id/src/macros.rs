//! Macro for defining typed resource name types.

/// Macro to define a typed resource name with a resource-type tag.
///
/// This generates a newtype wrapper around a validated `String` with:
/// - A `RESOURCE_TYPE` constant (used in SRN rendering)
/// - `new()` to validate and construct a name
/// - `as_str()` to borrow the underlying text
/// - `Display` and `FromStr` implementations
/// - `Serialize` and `Deserialize` implementations (strict on input)
/// - `Ord`, `Hash`, and other standard traits
///
/// # Example
///
/// ```ignore
/// define_name!(TierName, "capacity-tier");
///
/// let tier = TierName::new("high-capacity")?;
/// let parsed: TierName = "high-capacity".parse()?;
/// ```
#[macro_export]
macro_rules! define_name {
    ($name:ident, $resource_type:literal) => {
        /// A caller-assigned stable name for this resource type.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// The resource-type tag used when rendering references.
            pub const RESOURCE_TYPE: &'static str = $resource_type;

            /// Validates and constructs a name.
            pub fn new(s: impl Into<String>) -> Result<Self, $crate::NameError> {
                let s = s.into();
                $crate::validate_name(&s)?;
                Ok(Self(s))
            }

            /// Returns the name text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Builds the fully qualified reference for this name in an
            /// environment target.
            #[must_use]
            pub fn srn(&self, account: &str, region: &str) -> $crate::Srn {
                $crate::Srn::new(account, region, Self::RESOURCE_TYPE, &self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::NameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}
