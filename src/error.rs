//! Error and observability enums. No operation inside [`crate::engine::ProtocolEngine::poll`]
//! propagates a hard error to the caller — these types exist
//! so decode failures are `Result`s rather than panics, and so the engine can
//! report *what* it did for a poll cycle without the caller reaching into
//! private state.

/// A received byte buffer could not be parsed into the frame shape its type
/// byte claims. Always recovered by dropping the frame.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the frame shape's fixed header requires.
    TooShort { have: usize, need: usize },
    /// `detect_type` could not classify the first two bytes.
    UnknownFrameControl,
    /// The type byte at the expected offset is not one of the known
    /// `MessageType` values.
    TypeByteUnknown { byte: u8 },
    /// A payload's declared device count would read past the buffer.
    PayloadTruncated,
}

/// What `ProtocolEngine::poll` actually did with one cycle's sent/received
/// events. Exists purely for observability and tests — the engine never
/// requires the caller to inspect this to stay correct.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineNote {
    /// Nothing to report this cycle.
    Idle,
    /// A frame of an unexpected `MessageType` arrived; `protocol_failed` was
    /// set (anchor) or `expected` was reset (tag). No range was computed.
    UnexpectedFrameType,
    /// A short-MAC frame named a source address with no matching `Peer`.
    PeerNotFound,
    /// A peer was evicted to make room for a new one (table was full).
    TableFull,
    /// One or more peers were removed by the periodic inactivity sweep.
    InactiveSwept,
    /// The tag transmitted RANGE on the retry timeout rather than the
    /// last-expected-POLL_ACK shortcut.
    TimeoutRetry,
    /// The radio reported a corrupt receive; the frame was dropped untouched.
    CorruptReceive,
    /// `detect_type` succeeded but the type byte itself was not recognized.
    TypeByteUnknown,
    /// A fresh range was computed and the `on_new_range` callback fired.
    RangeComputed,
}
