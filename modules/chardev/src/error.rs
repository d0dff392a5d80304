use axerrno::LinuxError;

/// Failures the device reports to its callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChardevError {
    /// Another session holds the device open.
    Busy,
    /// The device is read-only.
    Unsupported,
    /// The host refused to hand out a major number.
    RegistrationFailed(LinuxError),
}

impl core::fmt::Display for ChardevError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ChardevError::Busy => write!(f, "Device already held by another session"),
            ChardevError::Unsupported => write!(f, "Sorry, this operation isn't supported"),
            ChardevError::RegistrationFailed(err) => {
                write!(f, "Registering char device failed with {:?}", err)
            }
        }
    }
}

impl core::error::Error for ChardevError {}

impl From<ChardevError> for LinuxError {
    fn from(err: ChardevError) -> Self {
        match err {
            ChardevError::Busy => LinuxError::EBUSY,
            ChardevError::Unsupported => LinuxError::EINVAL,
            ChardevError::RegistrationFailed(err) => err,
        }
    }
}
