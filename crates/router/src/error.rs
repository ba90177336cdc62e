/// Errors produced while framing, routing or submitting records.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("empty frame")]
    EmptyFrame,

    #[error("unknown record kind 0x{0:02x}")]
    UnknownKind(u8),

    #[error("frame of {0} bytes exceeds the datagram limit")]
    FrameTooLarge(usize),

    #[error("cannot encode file transfer entry: {0}")]
    Encode(#[from] dltrouter_protocol::EncodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
