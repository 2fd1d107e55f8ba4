//! Structural packet validation: checks performed before a packet is
//! dispatched to the rest of the session, independent of authentication or ACL.

use mqtt_core::topic::{validate_publish_topic, validate_subscribe_filter};

use crate::error::{Result, SessionError};

pub fn validate_publish(topic: &str) -> Result<()> {
    validate_publish_topic(topic)?;
    Ok(())
}

pub fn validate_subscribe(filters: &[impl AsRef<str>]) -> Result<()> {
    if filters.is_empty() {
        return Err(SessionError::EmptyTopics);
    }
    for filter in filters {
        validate_subscribe_filter(filter.as_ref())?;
    }
    Ok(())
}

pub fn validate_unsubscribe(filters: &[impl AsRef<str>]) -> Result<()> {
    validate_subscribe(filters)
}
