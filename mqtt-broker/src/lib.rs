pub mod acl;
pub mod auth;
pub mod guid;
pub mod hooks;
pub mod registry;
pub mod router;

pub use acl::{AllowAll, DenyListAcl};
pub use auth::{AllowAnonymous, StaticCredentials};
pub use guid::GuidGenerator;
pub use hooks::LoggingHooks;
pub use registry::ClientRegistry;
pub use router::MemoryRouter;

// Re-export the collaborator contracts themselves so callers (mqttd) need only
// depend on this crate to get both the traits and the reference implementations.
pub use mqtt_session::collab::{
    AclAction, AclBackend, AuthBackend, AuthError, ClientIdGenerator, Delivery, DeliverySink,
    DisconnectReason, Hooks, Registry, Router, ShutdownReason, SubscribeRequest,
};
