//! Root module for the SeaORM entities of the store-rating platform.
//! Three tables carry the whole domain: users (with a role), stores
//! (optionally owned by a store_owner user) and ratings (one row per
//! user/store pair).

pub mod rating;
pub mod store;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::rating::Entity as Rating;
    pub use super::store::Entity as Store;
    pub use super::user::Entity as User;
}
