//! Envelope admission checks applied by the relay before routing.

use crate::models::Envelope;

/// Why an inbound envelope was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("envelope has an empty sender")]
    EmptySender,
    #[error("envelope has an empty recipient")]
    EmptyRecipient,
    #[error("envelope has an empty body")]
    EmptyBody,
}

impl Envelope {
    /// Check the fields the relay needs in order to route.
    ///
    /// The recipient is checked first, then the sender, then the body.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.recipient_id.is_empty() {
            return Err(ValidationError::EmptyRecipient);
        }
        if self.sender_id.is_empty() {
            return Err(ValidationError::EmptySender);
        }
        if self.body.is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
