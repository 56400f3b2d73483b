use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub method: String,
    pub claims: HashMap<String, serde_json::Value>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            method: "none".to_string(),
            claims: HashMap::new(),
        }
    }
}

/// Role an actor may hold with respect to an organization or the platform.
///
/// Owner and Manager are organization-scoped; Staff and Support are
/// platform-wide service roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    Owner,
    Manager,
    Staff,
    Support,
}

/// A caller of the core operations: a user id plus the role set the
/// boundary layer resolved for it.
///
/// Role membership is looked up by the caller, never by the core — the
/// store operations only consume the result of that lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: String,
    pub roles: Vec<OrgRole>,
}

impl Actor {
    /// Plain customer with no elevated roles.
    pub fn customer(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: Vec::new(),
        }
    }

    /// Actor holding the given roles.
    pub fn with_roles(user_id: impl Into<String>, roles: Vec<OrgRole>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: OrgRole) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the actor may act on bookings it does not own.
    pub fn can_manage_bookings(&self) -> bool {
        self.has_role(OrgRole::Staff) || self.has_role(OrgRole::Support)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_identity() {
        let identity = Identity::anonymous();
        assert_eq!(identity.user_id, "anonymous");
        assert_eq!(identity.method, "none");
        assert!(identity.claims.is_empty());
    }

    #[test]
    fn test_identity_serialization() {
        let identity = Identity {
            user_id: "user123".to_string(),
            method: "api_key".to_string(),
            claims: {
                let mut map = HashMap::new();
                map.insert("email".to_string(), serde_json::json!("user@example.com"));
                map
            },
        };

        let json = serde_json::to_string(&identity).unwrap();
        let deserialized: Identity = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.user_id, "user123");
        assert_eq!(deserialized.method, "api_key");
        assert_eq!(
            deserialized.claims.get("email"),
            Some(&serde_json::json!("user@example.com"))
        );
    }

    #[test]
    fn test_customer_actor_has_no_roles() {
        let actor = Actor::customer("alice");
        assert_eq!(actor.user_id, "alice");
        assert!(!actor.has_role(OrgRole::Owner));
        assert!(!actor.can_manage_bookings());
    }

    #[test]
    fn test_support_actor_can_manage_bookings() {
        let actor = Actor::with_roles("agent", vec![OrgRole::Support]);
        assert!(actor.can_manage_bookings());
        assert!(!actor.has_role(OrgRole::Owner));
    }

    #[test]
    fn test_staff_actor_can_manage_bookings() {
        let actor = Actor::with_roles("ops", vec![OrgRole::Staff]);
        assert!(actor.can_manage_bookings());
    }

    #[test]
    fn test_owner_cannot_manage_foreign_bookings() {
        let actor = Actor::with_roles("boss", vec![OrgRole::Owner, OrgRole::Manager]);
        assert!(!actor.can_manage_bookings());
    }
}
