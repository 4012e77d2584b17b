//! Database repositories for the data access layer
//!
//! Each repository owns the queries for one aggregate and is responsible for
//! scoping every query by organization (directly or through the project
//! relation). Store traits in [stores] expose the minimal surface the service
//! layer needs, so services can be tested against in-memory doubles.

pub mod db;
pub mod stores;

pub use db::incident::{IncidentRepository, IncidentTypeRepository};
pub use db::invite::InviteRepository;
pub use db::material::MaterialRepository;
pub use db::member::MemberRepository;
pub use db::organization::OrganizationRepository;
pub use db::profile::ProfileRepository;
pub use db::project::ProjectRepository;
pub use db::subscription::SubscriptionRepository;
pub use db::upload::UploadRepository;
pub use stores::{ChatStore, MembershipStore};
