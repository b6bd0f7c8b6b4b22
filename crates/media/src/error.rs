use narrate_state::source::MediaLocator;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to fetch {locator}: {reason}")]
    Fetch { locator: String, reason: String },

    #[error("failed to decode audio from {locator}: {reason}")]
    Decode { locator: String, reason: String },

    #[error("thumbnail generation stopped at slot {slot_index}: {reason}")]
    Thumbnail { slot_index: usize, reason: String },

    #[error("cancelled")]
    Cancelled,
}

impl MediaError {
    pub fn fetch(locator: &MediaLocator, reason: impl Into<String>) -> Self {
        Self::Fetch {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }

    pub fn decode(locator: &MediaLocator, reason: impl Into<String>) -> Self {
        Self::Decode {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type MediaResult<T> = Result<T, MediaError>;
