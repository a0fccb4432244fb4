use thiserror::Error;

/// Errors that are the user's to fix.
///
/// Command handlers return `anyhow::Result`; anything that downcasts to
/// [`UserError`] is replied to the channel verbatim, everything else is
/// treated as a bug and replaced with a generic apology.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("'{0}' is not a valid clip. 🤦 Try ?playlist.")]
    ClipNotFound(String),

    #[error("I'm not in a voice channel")]
    NotConnected,

    #[error("{0}")]
    AudioSessionNotFound(String),

    #[error("channel not found")]
    ChannelNotFound,

    #[error("{0}")]
    Invalid(String),

    /// An outside service (tts, a download mirror) is not answering.
    #[error("{0}")]
    Unavailable(String),
}

impl UserError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// The [`UserError`] behind `error`, if it is one. Anything else is a bug.
    pub fn find(error: &anyhow::Error) -> Option<&UserError> {
        error.downcast_ref::<UserError>()
    }
}

/// Internal playback failures. Logged, never shown to the requester.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("clip queue was empty when the next clip was requested")]
    EmptyQueue,

    #[error("voice sink error: {0}")]
    Sink(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_errors_are_told_apart_from_bugs() {
        let missing: anyhow::Error = UserError::ClipNotFound("local:helloits".to_string()).into();
        assert!(matches!(UserError::find(&missing), Some(UserError::ClipNotFound(_))));

        let offline: anyhow::Error = UserError::Unavailable("tts is down".to_string()).into();
        assert_eq!(UserError::find(&offline).map(ToString::to_string).as_deref(), Some("tts is down"));

        let wrapped = Err::<(), _>(UserError::NotConnected)
            .context("playing intro")
            .unwrap_err();
        assert!(matches!(UserError::find(&wrapped), Some(UserError::NotConnected)));

        let bug = anyhow::anyhow!("index out of range");
        assert!(UserError::find(&bug).is_none());
    }
}
