use common::{Role, UserId};
use domain::Order;
use serde::{Deserialize, Serialize};

/// The user on whose behalf an order operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl Caller {
    pub fn user(user_id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role: Role::User,
        }
    }

    pub fn moderator(user_id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            role: Role::Moderator,
            ..Self::user(user_id, email)
        }
    }

    pub fn is_moderator(&self) -> bool {
        self.role.is_moderator()
    }

    /// Owners and moderators may see and cancel an order.
    pub fn can_access(&self, order: &Order) -> bool {
        self.is_moderator() || order.user_id == self.user_id
    }
}
