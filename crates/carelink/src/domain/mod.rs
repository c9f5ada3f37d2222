//! Entities shared by the compliance rules, the repository seam, and the HTTP layer.

pub mod accounts;
pub mod audit;
pub mod requirement;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use accounts::{ClientProfile, Participant, SetupProgress, User, WorkerProfile};
pub use audit::{AuditAction, AuditEntry};
pub use requirement::{
    DocumentCategory, RequirementMetadata, RequirementStatus, RequirementType,
    VerificationRequirement,
};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a registered account.
    UserId
);
uuid_id!(
    /// Identifier of a worker (contractor) profile.
    WorkerId
);
uuid_id!(ClientId);
uuid_id!(ParticipantId);
uuid_id!(
    /// Identifier of a single verification requirement row.
    RequirementId
);
uuid_id!(AuditId);

/// Marketplace roles; every route is gated on exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Worker,
    Client,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Worker => "worker",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
