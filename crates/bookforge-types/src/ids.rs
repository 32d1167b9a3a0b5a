//! Strongly typed identifiers for project graph entities

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Result, TypesError};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn from_string(s: &str) -> Result<Self> {
                uuid::Uuid::parse_str(s)
                    .map(|_| Self(s.to_string()))
                    .map_err(|e| {
                        TypesError::InvalidId(format!("{} {}: {}", stringify!($name), s, e))
                    })
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identity of an assembled project
    ProjectId
);
uuid_id!(ChapterId);
uuid_id!(
    /// Identity of a page, unique across the whole project
    PageId
);
uuid_id!(CharacterId);
