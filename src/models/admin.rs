use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AdminRole {
    #[serde(rename = "super_admin")]
    SuperAdmin,
    #[serde(rename = "assistant_admin")]
    AssistantAdmin,
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminRole::SuperAdmin => write!(f, "super_admin"),
            AdminRole::AssistantAdmin => write!(f, "assistant_admin"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageProducts,
    ManageOrders,
    ManageUsers,
    ManageAdmins,
    ManageAffiliates,
    ViewAnalytics,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Permissions {
    pub manage_products: bool,
    pub manage_orders: bool,
    pub manage_users: bool,
    pub manage_admins: bool,
    pub manage_affiliates: bool,
    pub view_analytics: bool,
}

impl Permissions {
    pub fn for_role(role: AdminRole) -> Self {
        match role {
            AdminRole::SuperAdmin => Self {
                manage_products: true,
                manage_orders: true,
                manage_users: true,
                manage_admins: true,
                manage_affiliates: true,
                view_analytics: true,
            },
            AdminRole::AssistantAdmin => Self {
                manage_products: true,
                manage_orders: true,
                view_analytics: true,
                ..Self::default()
            },
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::ManageProducts => self.manage_products,
            Permission::ManageOrders => self.manage_orders,
            Permission::ManageUsers => self.manage_users,
            Permission::ManageAdmins => self.manage_admins,
            Permission::ManageAffiliates => self.manage_affiliates,
            Permission::ViewAnalytics => self.view_analytics,
        }
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Admin {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub password: String,
    pub role: AdminRole,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<i64>,
    #[serde(default)]
    pub created_by: Option<ObjectId>,
    pub created_at: i64,
}

impl Admin {
    pub fn new(username: String, email: String, password_hash: String, role: AdminRole, created_by: Option<ObjectId>) -> Self {
        let mut admin = Self {
            id: None,
            username,
            email,
            password: password_hash,
            role,
            permissions: Permissions::default(),
            is_active: true,
            last_login: None,
            created_by,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        admin.apply_role_permissions();
        admin
    }

    /// Permissions always follow the role; called before every write.
    pub fn apply_role_permissions(&mut self) {
        self.permissions = Permissions::for_role(self.role);
    }

    pub fn public(&self) -> Admin {
        Admin {
            password: String::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    /// Username or email.
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_new_role")]
    pub role: AdminRole,
}

fn default_new_role() -> AdminRole {
    AdminRole::AssistantAdmin
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdminRequest {
    pub email: Option<String>,
    pub role: Option<AdminRole>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}
