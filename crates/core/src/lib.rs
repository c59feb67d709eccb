//! Staybook Core Library
//!
//! Domain models, tenant scoping, permissions, pricing and SQLite storage
//! for the Staybook hotel platform, plus the services built on top of them.

pub mod availability;
pub mod credentials;
pub mod error;
pub mod invariants;
pub mod models;
pub mod permissions;
pub mod pricing;
pub mod scope;
pub mod services;
pub mod storage;

pub use availability::StayDates;
pub use error::{Error, Result};
pub use models::*;
pub use permissions::*;
pub use pricing::{PriceCalculator, PricingPolicy};
pub use scope::TenantScope;
pub use storage::{Database, InventoryRepository, ReservationRepository, Storage, UserRepository};
