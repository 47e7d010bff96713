//! References into the external category, language and broadcast area sets.
//!
//! Each reference is identified by its code alone: two references with the
//! same code are equal and hash identically regardless of display name. They
//! also borrow as `str` so membership can be checked by code without building
//! a reference first.

use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

macro_rules! keyed_reference {
    ($(#[$meta:meta])* $name:ident, $key:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct $name {
            pub $key: String,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub name: Option<String>,
        }

        impl $name {
            pub fn new<K: Into<String>>($key: K) -> Self {
                Self {
                    $key: $key.into(),
                    name: None,
                }
            }

            pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
                self.name = Some(name.into());
                self
            }

            pub fn code(&self) -> &str {
                &self.$key
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.$key == other.$key
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.$key.hash(state);
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.$key
            }
        }
    };
}

keyed_reference!(
    /// Category membership, keyed by category id (e.g. `news`)
    CategoryRef,
    id
);

keyed_reference!(
    /// Language membership, keyed by ISO 639-3 code (e.g. `eng`)
    LanguageRef,
    code
);

keyed_reference!(
    /// Broadcast area membership, keyed by area code (e.g. `c/UK`, `r/INT`)
    AreaRef,
    code
);
