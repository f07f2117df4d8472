//! SeaORM entities for the identity store: login accounts and the
//! role-carrying profiles linked to them.

pub mod account;
pub mod profile;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::account::Entity as Account;
    pub use super::profile::Entity as Profile;
    pub use super::profile::Role;
}
