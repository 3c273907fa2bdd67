use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CollaboratorError;

// ============================================================================
// Authorization - consumed as a capability check
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    ConfirmOrder,
    ManageKitchen,
    AssignDelivery,
    PerformDelivery,
    CompleteOrder,
    CancelOrder,
    /// Read another customer's order, timeline or tracking
    ViewOrder,
}

impl Permission {
    pub fn key(&self) -> &'static str {
        match self {
            Permission::ConfirmOrder => "order:confirm",
            Permission::ManageKitchen => "kitchen:manage",
            Permission::AssignDelivery => "delivery:assign",
            Permission::PerformDelivery => "delivery:perform",
            Permission::CompleteOrder => "order:complete",
            Permission::CancelOrder => "order:cancel",
            Permission::ViewOrder => "order:view",
        }
    }
}

/// The acting user as reported by the auth layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub restaurant_id: Option<Uuid>,
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            restaurant_id: None,
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn at_restaurant(mut self, restaurant_id: Uuid) -> Self {
        self.restaurant_id = Some(restaurant_id);
        self
    }
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn has_permission(
        &self,
        user: &CurrentUser,
        permission: Permission,
        restaurant_id: Uuid,
    ) -> Result<bool, CollaboratorError>;
}

/// Grants everything; for demos and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn has_permission(&self, _: &CurrentUser, _: Permission, _: Uuid) -> Result<bool, CollaboratorError> {
        Ok(true)
    }
}

/// Grants nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

#[async_trait]
impl Authorizer for DenyAll {
    async fn has_permission(&self, _: &CurrentUser, _: Permission, _: Uuid) -> Result<bool, CollaboratorError> {
        Ok(false)
    }
}

/// Grants a permission when the user holds one of the listed roles
#[derive(Debug, Clone, Default)]
pub struct RoleAuthorizer {
    grants: Vec<(String, Permission)>,
}

impl RoleAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role: impl Into<String>, permissions: &[Permission]) -> Self {
        let role = role.into();
        self.grants
            .extend(permissions.iter().map(|p| (role.clone(), *p)));
        self
    }
}

#[async_trait]
impl Authorizer for RoleAuthorizer {
    async fn has_permission(
        &self,
        user: &CurrentUser,
        permission: Permission,
        restaurant_id: Uuid,
    ) -> Result<bool, CollaboratorError> {
        if user.restaurant_id.is_some_and(|own| own != restaurant_id) {
            return Ok(false);
        }

        Ok(self
            .grants
            .iter()
            .any(|(role, granted)| *granted == permission && user.roles.iter().any(|r| r == role)))
    }
}
