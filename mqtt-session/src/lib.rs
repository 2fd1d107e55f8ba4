pub mod acl_cache;
pub mod collab;
pub mod delivery;
pub mod error;
pub mod keepalive;
pub mod packet_id;
pub mod session;
pub mod subscriptions;
pub mod validator;

pub use error::{Result, SessionError};
pub use session::{
    DeliveryOutcome, Session, SessionCollaborators, SessionConfig, SessionOutcome, TimeoutEvent,
};
