//! Users, roles, and the per-request identity.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::repository::Entity;
use crate::schema;

/// What a user is allowed to do in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can browse, fill a cart and place orders.
    #[default]
    Buyer,

    /// Can additionally list products for sale.
    Seller,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered account. `password` holds the Argon2 PHC hash, never plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl User {
    /// Returns the identity embedded in this user's session tokens.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

impl Entity for User {
    type Id = UserId;
    const COLLECTION: &'static str = schema::USERS;

    fn id(&self) -> UserId {
        self.id
    }
}

/// The authenticated principal for one request, reconstructed from a verified token.
///
/// Reflects the user as of token issuance; later changes to the stored user
/// are not visible until the next login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    /// Returns true if this principal may list products.
    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }
}
