//! Accounts, onboarding, and admin review for the care marketplace.

pub mod envelope;
pub mod memory;
pub mod password;
pub mod registration;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use envelope::ApiResponse;
pub use memory::InMemoryMarketplace;
pub use registration::{
    ClientRegistration, LoginRequest, ParticipantDetails, ValidationErrors, WorkerProfileUpdate,
    WorkerRegistration,
};
pub use repository::{MarketplaceRepository, RepositoryError};
pub use router::marketplace_router;
pub use service::{
    ClientOverview, ClientRegistered, DocumentUpload, MarketplaceError, MarketplaceService,
    ProgressUpdate, ReviewDecision, SignedIn, WorkerRegistered,
};
pub use session::{bearer_token, Session, SessionStore};
