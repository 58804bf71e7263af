//! SeaORM entities for the user-profile schema.
//!
//! `auth` and `users` are one-to-one; `roles`, `divisions` and `logs` hang off
//! `users`. Every child reference is nullable and uses `ON DELETE SET NULL` so
//! that removing a parent leaves orphans behind for the cleaning pipeline to
//! sweep instead of cascading silently.

pub mod auth;
pub mod division;
pub mod log;
pub mod role;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::auth::Entity as Auth;
    pub use super::division::Entity as Division;
    pub use super::log::Entity as Log;
    pub use super::role::Entity as Role;
    pub use super::user::Entity as User;
}
