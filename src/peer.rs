//! A single ranging partner and the raw timestamps two-way ranging needs to
//! turn its exchange into a distance.

use crate::address::ShortAddress;
use crate::timestamp::Timestamp;

/// Per-peer state tracked between a POLL and its matching RANGE exchange,
/// plus the bookkeeping the table needs to evict and expire entries.
///
/// Carries the six TWR timestamps (poll sent/received, poll-ack sent/
/// received, range sent/received) that the time-of-flight formula consumes.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peer {
    pub short_address: ShortAddress,

    pub time_poll_sent: Timestamp,
    pub time_poll_received: Timestamp,
    pub time_poll_ack_sent: Timestamp,
    pub time_poll_ack_received: Timestamp,
    pub time_range_sent: Timestamp,
    pub time_range_received: Timestamp,

    /// Tag-side only: set once this anchor's POLL_ACK has been received in
    /// the current exchange; cleared whenever a new POLL starts.
    pub has_acked_poll: bool,

    /// Most recent range estimate, meters. `None` until the first RANGE
    /// exchange against this peer completes.
    pub range_m: Option<f32>,

    pub receive_power_dbm: f32,
    pub first_path_power_dbm: f32,
    pub quality: f32,

    /// Millisecond timestamp of the last frame seen from this peer, used by
    /// `PeerTable::sweep_inactive`.
    pub last_activity_ms: u32,

    /// This peer's assigned reply-delay slot, in microseconds
    /// (`(2*slot + 1) * DEFAULT_REPLY_DELAY_US`).
    pub reply_delay_us: u32,

    /// Index of this peer within its owning `PeerTable`'s dense storage.
    /// Kept in sync by `PeerTable::insert`/`remove`.
    pub index: usize,
}

impl Peer {
    pub fn new(short_address: ShortAddress, index: usize, reply_delay_us: u32, now_ms: u32) -> Self {
        Peer {
            short_address,
            time_poll_sent: Timestamp::ZERO,
            time_poll_received: Timestamp::ZERO,
            time_poll_ack_sent: Timestamp::ZERO,
            time_poll_ack_received: Timestamp::ZERO,
            time_range_sent: Timestamp::ZERO,
            time_range_received: Timestamp::ZERO,
            has_acked_poll: false,
            range_m: None,
            receive_power_dbm: 0.0,
            first_path_power_dbm: 0.0,
            quality: 0.0,
            last_activity_ms: now_ms,
            reply_delay_us,
            index,
        }
    }

    /// `round1` of the asymmetric TOF formula: the tag's own POLL→POLL_ACK
    /// interval, wrapped into `[0, 2^40)`. Carried to the anchor as
    /// `delta1` in the RANGE payload, since only the tag holds both
    /// timestamps.
    pub fn round1(&self) -> Timestamp {
        (self.time_poll_ack_received - self.time_poll_sent).wrap()
    }

    /// `reply1`: the anchor's own POLL→POLL_ACK turnaround.
    pub fn reply1(&self) -> Timestamp {
        (self.time_poll_ack_sent - self.time_poll_received).wrap()
    }

    /// `round2`: the anchor's own POLL_ACK→RANGE interval.
    pub fn round2(&self) -> Timestamp {
        (self.time_range_received - self.time_poll_ack_sent).wrap()
    }

    /// `reply2`: the tag's own POLL_ACK→RANGE turnaround. Carried to the
    /// anchor as `delta2` in the RANGE payload.
    pub fn reply2(&self) -> Timestamp {
        (self.time_range_sent - self.time_poll_ack_received).wrap()
    }

    /// Mark this peer as just having been heard from.
    pub fn note_activity(&mut self, now_ms: u32) {
        self.last_activity_ms = now_ms;
    }

    /// True once `inactivity_ms` have elapsed since the last frame from this
    /// peer.
    pub fn is_inactive(&self, now_ms: u32, inactivity_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_activity_ms) >= inactivity_ms
    }

    /// Reset the per-exchange timestamps and ack flag at the start of a new
    /// POLL, keeping identity, quality history, and activity intact.
    pub fn begin_new_exchange(&mut self) {
        self.time_poll_sent = Timestamp::ZERO;
        self.time_poll_received = Timestamp::ZERO;
        self.time_poll_ack_sent = Timestamp::ZERO;
        self.time_poll_ack_received = Timestamp::ZERO;
        self.time_range_sent = Timestamp::ZERO;
        self.time_range_received = Timestamp::ZERO;
        self.has_acked_poll = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_inactive_after_threshold() {
        let mut p = Peer::new(ShortAddress::new(1), 0, 3000, 0);
        assert!(!p.is_inactive(1999, 2000));
        assert!(p.is_inactive(2000, 2000));
        p.note_activity(2000);
        assert!(!p.is_inactive(3999, 2000));
    }

    #[test]
    fn round_trip_deltas_wrap_correctly_across_zero() {
        let mut p = Peer::new(ShortAddress::new(1), 0, 3000, 0);
        p.time_poll_received = Timestamp::from_ticks(10);
        p.time_poll_ack_sent = Timestamp::from_ticks(4); // wraps negative before wrap()
        let r1 = p.round1();
        assert!(r1.as_ticks() >= 0);
    }
}
