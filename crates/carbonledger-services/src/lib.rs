//! CarbonLedger service layer
//!
//! Workflow and integration services sitting between the HTTP handlers and
//! the repositories: the membership/invitation workflow, the AI completion
//! client and its typed analysis wrappers, the chat responder, and the
//! identity-provider code exchange.

pub mod analysis;
pub mod chat;
pub mod completion;
pub mod identity;
pub mod membership;

pub use analysis::{AnalysisService, EmissionAnalysis, EmissionPrediction};
pub use chat::{ChatContext, ChatService};
pub use completion::{AnthropicCompletion, CompletionProvider};
pub use identity::{AuthenticatedUser, HttpIdentityProvider, IdentityProvider};
pub use membership::{CreatedOrganization, MembershipService};
