//! Error types for the DLT channel.

/// Errors produced while framing or sending a DLT message.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload of {0} bytes does not fit in a DLT message")]
    PayloadTooLarge(usize),
}
