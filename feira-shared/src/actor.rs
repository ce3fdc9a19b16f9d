use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles in the marketplace. A closed set: anything else is rejected at the
/// authentication boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Buyer,
    Supplier,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "BUYER",
            Role::Supplier => "SUPPLIER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "BUYER" => Some(Role::Buyer),
            "SUPPLIER" => Some(Role::Supplier),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Role-gated operations. Each engine operation checks exactly one
/// capability up front; ownership checks are separate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    RequestQuotes,
    RespondToQuotes,
    DecideQuotes,
    AdvanceFulfillment,
    IssuePayments,
    RefundPayments,
}

/// The authenticated party an operation runs on behalf of. Produced by the
/// authentication collaborator before any engine logic runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Capability check: admins may do everything, other roles only what
    /// their side of the marketplace requires.
    pub fn can(&self, capability: Capability) -> bool {
        use Capability::*;
        match (self.role, capability) {
            (Role::Admin, _) => true,
            (Role::Buyer, RequestQuotes | DecideQuotes | IssuePayments) => true,
            (Role::Supplier, RespondToQuotes | AdvanceFulfillment) => true,
            _ => false,
        }
    }
}
