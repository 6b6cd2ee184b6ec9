//! # spotgrid-id
//!
//! Caller-assigned stable names and references for spotgrid resources.
//!
//! ## Design Principles
//!
//! - Every resource is identified by an explicit, caller-assigned name;
//!   nothing derives identity from its position in an object tree
//! - All names have a canonical string representation with strict parsing
//! - Names support roundtrip serialization (parse → format → parse)
//! - Names are typed to prevent mixing different resource types
//!
//! ## Name Format
//!
//! A name is 1 to 63 characters of lowercase ASCII letters, digits, and
//! hyphens. It must start with a letter and must not end with a hyphen.
//!
//! ## Resource References (SRN)
//!
//! A fully qualified reference pins a name to an environment target:
//!
//! ```text
//! srn:{account}:{region}:{resource_type}/{name}
//! ```
//!
//! Examples:
//! - `srn:884515231596:eu-central-1:job-template/starter-task`
//! - `srn:884515231596:eu-central-1:capacity-tier/high-capacity`

mod error;
mod macros;
mod srn;
mod types;

pub use error::NameError;
pub use srn::Srn;
pub use types::*;

/// Validates the shared name charset used by every typed name.
///
/// Exposed so the macro expansion can call it; not intended as public API
/// beyond that.
#[doc(hidden)]
pub fn validate_name(s: &str) -> Result<(), NameError> {
    if s.is_empty() {
        return Err(NameError::Empty);
    }

    if s.len() > MAX_NAME_LENGTH {
        return Err(NameError::TooLong {
            length: s.len(),
            max: MAX_NAME_LENGTH,
        });
    }

    let mut chars = s.chars();
    let first = chars.next().unwrap();
    if !first.is_ascii_lowercase() {
        return Err(NameError::InvalidStart { actual: first });
    }

    for c in chars {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
            return Err(NameError::InvalidChar { actual: c });
        }
    }

    if s.ends_with('-') {
        return Err(NameError::TrailingHyphen);
    }

    Ok(())
}

/// Maximum name length in bytes.
pub const MAX_NAME_LENGTH: usize = 63;
