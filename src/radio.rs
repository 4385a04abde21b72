//! External collaborators: the radio driver and two platform primitives (a
//! monotonic millisecond clock and a source of randomness for slot
//! selection). None of these are implemented by this crate — they are
//! supplied by the embedding application as trait implementations.

use crate::address::{LongAddress, ShortAddress};
use crate::timestamp::Timestamp;

/// Opaque radio PHY mode blob (data rate / pulse repetition frequency /
/// preamble length in whatever encoding the concrete `RadioDriver` expects).
/// The engine forwards this to [`RadioDriver::configure_network`] without
/// interpreting it.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadioMode(pub [u8; 3]);

/// The send/receive/timestamp contract the protocol engine drives. This is
/// the SPI/GPIO-level DW1000 driver the ranging engine sits above. A
/// concrete implementation owns the actual hardware (or, in tests, a
/// scripted playback of timestamps and events).
///
/// # Contract
///
/// - `take_sent_event`/`take_received_event` must be read-and-clear: once
///   observed `true`, the same event must not be reported again until the
///   driver completes another transmit/receive. On interrupt-driven
///   hardware this is the interrupt handler setting a flag the poll loop
///   clears; on a thread-based test harness, a mutex or single-slot mailbox
///   fills the same role.
/// - Within one `poll()` invocation a pending sent event is always drained
///   before a pending received event, matching the hardware timeline where
///   transmit completion is observed first.
/// - `get_data` copies as many bytes as were received, up to the buffer
///   length, and returns the number of bytes copied.
pub trait RadioDriver {
    /// Write this node's 64-bit address into the radio.
    fn set_eui(&mut self, eui: LongAddress);

    /// One-shot network configuration: device short address, PAN ID, PHY
    /// mode, collapsed into a single call over the driver's usual multi-step
    /// configure/commit sequence.
    fn configure_network(&mut self, short_address: ShortAddress, pan_id: u16, mode: RadioMode);

    /// Optional transmit power boost.
    fn high_power_init(&mut self);

    /// Begin composing a new outgoing frame.
    fn new_transmit(&mut self);
    /// Stage the frame bytes to send.
    fn set_data(&mut self, data: &[u8]);
    /// Schedule the transmit to fire `delay` device-ticks from now; returns
    /// the resulting absolute scheduled transmit timestamp.
    fn set_delay(&mut self, delay: Timestamp) -> Timestamp;
    /// Fire the scheduled (or immediate, if `set_delay` was not called)
    /// transmit. Fire-and-forget: completion is observed via
    /// `take_sent_event` on a later `poll()`.
    fn start_transmit(&mut self);

    /// Begin listening.
    fn new_receive(&mut self);
    /// If `true`, the driver automatically re-arms reception after each
    /// received frame instead of requiring `start_receive` again.
    fn receive_permanently(&mut self, permanent: bool);
    /// Arm the receiver.
    fn start_receive(&mut self);
    /// Copy the most recently received frame into `buf`, returning the
    /// number of bytes copied.
    fn get_data(&mut self, buf: &mut [u8]) -> usize;

    /// Read-and-clear: has a transmit completed since the last call?
    fn take_sent_event(&mut self) -> bool;
    /// Read-and-clear: has a frame been received since the last call?
    fn take_received_event(&mut self) -> bool;

    /// Hardware timestamp of the most recently completed transmit.
    fn get_transmit_timestamp(&self) -> Timestamp;
    /// Hardware timestamp of the most recently completed receive.
    fn get_receive_timestamp(&self) -> Timestamp;

    /// Receive signal power, dBm.
    fn get_receive_power(&self) -> f32;
    /// First-path (direct-path) power estimate, dBm.
    fn get_first_path_power(&self) -> f32;
    /// A combined receive quality factor used for peer-table eviction
    /// ranking.
    fn get_receive_quality(&self) -> f32;
    /// Did the most recent receive fail CRC/sync (corrupt)?
    fn is_receive_failed(&self) -> bool;
}

/// A free-running monotonic millisecond counter, supplied by the platform.
/// Deliberately not `embedded-time`'s generic `Clock`/`Instant` machinery —
/// every duration in this protocol is expressed directly in milliseconds,
/// so a single flat counter is all that's needed.
pub trait MonotonicClock {
    fn now_ms(&self) -> u32;
}

/// A source of randomness for slot selection.
pub trait RandomSource {
    /// Uniform pseudo-random value in `0..bound`. `bound` is always `> 0`.
    fn random_below(&mut self, bound: u32) -> u32;
}
