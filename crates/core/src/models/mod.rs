//! Data models for Staybook

/// Declares a fieldless enum stored and serialized as an upper-case string.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            #[allow(clippy::should_implement_trait)]
            pub fn from_str(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
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

mod booking_history;
mod hotel;
mod housekeeping;
mod maintenance;
mod page;
mod pricing;
mod product;
mod registration;
mod reservation;
mod room;
mod room_charge;
mod shop_order;
mod tenant;
mod user;

pub use booking_history::*;
pub use hotel::*;
pub use housekeeping::*;
pub use maintenance::*;
pub use page::*;
pub use pricing::*;
pub use product::*;
pub use registration::*;
pub use reservation::*;
pub use room::*;
pub use room_charge::*;
pub use shop_order::*;
pub use tenant::*;
pub use user::*;
