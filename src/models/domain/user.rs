use async_graphql::Enum;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Teacher,
    #[default]
    Student,
    Parent,
    Admin,
}

/// The authenticated caller, tagged by role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Actor {
    Teacher(String),
    Student(String),
    Parent(String),
    Admin(String),
}

impl Actor {
    pub fn new(role: UserRole, user_id: &str) -> Self {
        let id = user_id.to_string();
        match role {
            UserRole::Teacher => Actor::Teacher(id),
            UserRole::Student => Actor::Student(id),
            UserRole::Parent => Actor::Parent(id),
            UserRole::Admin => Actor::Admin(id),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Actor::Teacher(id) | Actor::Student(id) | Actor::Parent(id) | Actor::Admin(id) => id,
        }
    }

    pub fn role(&self) -> UserRole {
        match self {
            Actor::Teacher(_) => UserRole::Teacher,
            Actor::Student(_) => UserRole::Student,
            Actor::Parent(_) => UserRole::Parent,
            Actor::Admin(_) => UserRole::Admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&UserRole::Parent).expect("serialize");
        assert_eq!(json, "\"parent\"");
    }

    #[test]
    fn actor_round_trips_role_and_id() {
        for role in [
            UserRole::Teacher,
            UserRole::Student,
            UserRole::Parent,
            UserRole::Admin,
        ] {
            let actor = Actor::new(role, "user-7");
            assert_eq!(actor.role(), role);
            assert_eq!(actor.id(), "user-7");
        }
    }
}
