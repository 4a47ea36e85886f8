//! Core domain models shared across all Souk services.
//!
//! These are the "truth" types: what the database stores and the API serializes.
//! Status-like columns are stored as snake_case text and modeled as enums.

/// Declares a text-backed enum with `as_str`, `parse` and `Display`.
///
/// The literal for each variant must match serde's snake_case rendering.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $( $text => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod address;
pub mod agent;
pub mod catalog;
pub mod chat;
pub mod market;
pub mod notification;
pub mod order;
pub mod payment;
pub mod review;
pub mod shopping_list;
pub mod support;
pub mod user;
pub mod workflow;

/// Re-export all model types for convenience.
pub use address::*;
pub use agent::*;
pub use catalog::*;
pub use chat::*;
pub use market::*;
pub use notification::*;
pub use order::*;
pub use payment::*;
pub use review::*;
pub use shopping_list::*;
pub use support::*;
pub use user::*;
pub use workflow::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_match_serde() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.as_str().into()));
            assert_eq!(OrderStatus::parse(status.as_str()), Some(*status));
        }
        for kind in IdType::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().into()));
        }
        for t in MarketType::ALL {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::Value::String(t.as_str().into()));
        }
    }
}
