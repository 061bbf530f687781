use model::entities::user::Role;
use model::entities::{store, user};

use crate::error::ApiError;

/// Role-gated actions. The capability table below is the only place that
/// decides which role may do what; handlers never compare role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Browse the store catalogue and read per-store aggregates.
    BrowseStores,
    /// Submit or revise an own rating.
    SubmitRating,
    /// Read the own rating history.
    ViewOwnRatings,
    /// List the stores the caller owns.
    ViewOwnedStores,
    /// Read the individual ratings of a store (ownership checked separately).
    ViewStoreRatings,
    /// Create, update and delete stores.
    ManageStores,
    /// Create, update and delete users.
    ManageUsers,
    /// Delete ratings on behalf of other users.
    ManageRatings,
    /// Read the platform-wide counters.
    ViewDashboard,
}

/// Capability table: role x action -> allowed.
pub fn allows(role: Role, action: Action) -> bool {
    match (role, action) {
        // Every authenticated account browses and rates.
        (_, Action::BrowseStores | Action::SubmitRating | Action::ViewOwnRatings) => true,
        // The owned-stores view is tied to actually owning stores; admins
        // manage all stores through the admin surface instead.
        (Role::StoreOwner, Action::ViewOwnedStores) => true,
        (_, Action::ViewOwnedStores) => false,
        (Role::StoreOwner | Role::Admin, Action::ViewStoreRatings) => true,
        (
            Role::Admin,
            Action::ManageStores | Action::ManageUsers | Action::ManageRatings | Action::ViewDashboard,
        ) => true,
        _ => false,
    }
}

/// Ownership gate for store-scoped reads: the caller must own the store,
/// unless they are an admin.
pub fn ensure_store_access(caller: &user::Model, store: &store::Model) -> Result<(), ApiError> {
    if caller.role == Role::Admin || store.owner_id == Some(caller.id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Access denied".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_users_browse_and_rate_only() {
        assert!(allows(Role::User, Action::BrowseStores));
        assert!(allows(Role::User, Action::SubmitRating));
        assert!(allows(Role::User, Action::ViewOwnRatings));
        assert!(!allows(Role::User, Action::ViewOwnedStores));
        assert!(!allows(Role::User, Action::ViewStoreRatings));
        assert!(!allows(Role::User, Action::ManageStores));
        assert!(!allows(Role::User, Action::ManageUsers));
        assert!(!allows(Role::User, Action::ViewDashboard));
    }

    #[test]
    fn store_owners_see_their_ratings_but_do_not_manage() {
        assert!(allows(Role::StoreOwner, Action::ViewOwnedStores));
        assert!(allows(Role::StoreOwner, Action::ViewStoreRatings));
        assert!(allows(Role::StoreOwner, Action::SubmitRating));
        assert!(!allows(Role::StoreOwner, Action::ManageStores));
        assert!(!allows(Role::StoreOwner, Action::ManageUsers));
        assert!(!allows(Role::StoreOwner, Action::ManageRatings));
        assert!(!allows(Role::StoreOwner, Action::ViewDashboard));
    }

    #[test]
    fn admins_manage_everything_but_own_no_stores() {
        assert!(allows(Role::Admin, Action::ManageStores));
        assert!(allows(Role::Admin, Action::ManageUsers));
        assert!(allows(Role::Admin, Action::ManageRatings));
        assert!(allows(Role::Admin, Action::ViewDashboard));
        assert!(allows(Role::Admin, Action::ViewStoreRatings));
        assert!(!allows(Role::Admin, Action::ViewOwnedStores));
    }
}
