//! Role-based permission system

use crate::models::{User, UserRole};

/// Actions guarded by role checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Platform administration
    ManageTenants,
    ManageHotels,
    ManageUsers,
    ReviewRegistrations,

    // Hotel configuration
    ManageRooms,
    ManageProducts,
    ManagePricing,
    ManageStaff,
    ViewStaff,

    // Front desk
    MakeBookings,
    ViewBookings,
    ManageBookings,
    UpdateRoomStatus,
    ManageShopOrders,
    ManageRoomCharges,

    // Operations
    ManageHousekeeping,
    WorkHousekeepingTasks,
    InspectHousekeeping,
    ManageMaintenance,
    WorkMaintenanceTasks,
    VerifyMaintenance,
}

/// Permission matrix for platform roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: UserRole, action: Action) -> bool {
        use UserRole::*;
        match action {
            // Platform - system admin only
            Action::ManageTenants
            | Action::ManageHotels
            | Action::ManageUsers
            | Action::ReviewRegistrations => role == Admin,

            // Hotel configuration
            Action::ManageRooms | Action::ManageProducts => {
                matches!(role, Admin | HotelAdmin | HotelManager)
            }
            Action::ManagePricing | Action::ManageStaff => matches!(role, Admin | HotelAdmin),
            Action::ViewStaff => {
                matches!(role, Admin | HotelAdmin | HotelManager | OperationsSupervisor)
            }

            // Anyone signed in may book for themselves
            Action::MakeBookings => true,

            Action::ViewBookings => matches!(
                role,
                Admin | HotelAdmin | HotelManager | Frontdesk | OperationsSupervisor
            ),
            Action::ManageBookings | Action::ManageShopOrders | Action::ManageRoomCharges => {
                matches!(role, Admin | HotelAdmin | HotelManager | Frontdesk)
            }
            Action::UpdateRoomStatus => matches!(
                role,
                Admin | HotelAdmin | HotelManager | Frontdesk | OperationsSupervisor
            ),

            // Supervisors plan and check work, staff carry it out
            Action::ManageHousekeeping
            | Action::InspectHousekeeping
            | Action::ManageMaintenance
            | Action::VerifyMaintenance => {
                matches!(role, Admin | HotelAdmin | HotelManager | OperationsSupervisor)
            }
            Action::WorkHousekeepingTasks => role == Housekeeping,
            Action::WorkMaintenanceTasks => role == Maintenance,
        }
    }

    /// Any of the user's roles grants the action
    pub fn allows(user: &User, action: Action) -> bool {
        user.is_active && user.roles.iter().any(|r| Self::can_perform(*r, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_permissions() {
        assert!(PermissionMatrix::can_perform(UserRole::Admin, Action::ManageTenants));
        assert!(PermissionMatrix::can_perform(UserRole::Admin, Action::ManageBookings));
        assert!(!PermissionMatrix::can_perform(UserRole::Admin, Action::WorkHousekeepingTasks));
    }

    #[test]
    fn test_hotel_admin_is_not_platform_admin() {
        assert!(PermissionMatrix::can_perform(UserRole::HotelAdmin, Action::ManagePricing));
        assert!(!PermissionMatrix::can_perform(UserRole::HotelAdmin, Action::ManageTenants));
        assert!(!PermissionMatrix::can_perform(UserRole::HotelManager, Action::ManagePricing));
        assert!(PermissionMatrix::can_perform(UserRole::HotelAdmin, Action::ManageStaff));
        assert!(!PermissionMatrix::can_perform(UserRole::Frontdesk, Action::ManageStaff));
    }

    #[test]
    fn test_staff_permissions() {
        assert!(PermissionMatrix::can_perform(UserRole::Frontdesk, Action::ManageBookings));
        assert!(!PermissionMatrix::can_perform(UserRole::Frontdesk, Action::ManageRooms));
        assert!(
            PermissionMatrix::can_perform(UserRole::Housekeeping, Action::WorkHousekeepingTasks)
        );
        assert!(!PermissionMatrix::can_perform(UserRole::Housekeeping, Action::ManageHousekeeping));
        assert!(!PermissionMatrix::can_perform(UserRole::Customer, Action::ViewBookings));
        assert!(PermissionMatrix::can_perform(UserRole::Customer, Action::MakeBookings));
    }

    #[test]
    fn test_any_role_grants() {
        let mut user = User::new(
            "multi@hotel.test".into(),
            String::new(),
            "Multi".into(),
            "Role".into(),
            UserRole::Housekeeping,
        );
        assert!(!PermissionMatrix::allows(&user, Action::ManageBookings));
        user.roles.insert(UserRole::Frontdesk);
        assert!(PermissionMatrix::allows(&user, Action::ManageBookings));

        user.is_active = false;
        assert!(!PermissionMatrix::allows(&user, Action::ManageBookings));
    }
}
