//! Periodic tick: blink emission, poll issuance, inactivity sweep cadence.
//! Interleaves a `blink_counter`-cycled counter with the reply-delay-scaled
//! retry check, and recomputes its own next-tick headroom after every
//! emission.

use crate::config::Config;

/// Up to this many known peers are addressed per POLL.
pub const DEVICE_PER_POLL_TRANSMIT: usize = 4;
/// Total reply-delay slots a POLL round reserves; the last slot is always
/// reserved for the last-addressed peer regardless of how many peers are
/// actually addressed, so its reply time is also the last-expected-POLL_ACK
/// deadline.
pub const POLL_ACK_TIME_SLOTS: usize = 6;
/// Up to this many acked peers are addressed per RANGE transmission.
pub const DEVICES_PER_RANGE_TRANSMIT: usize = 6;

/// What a due tick asks the engine to transmit.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// `blink_counter == 0`: emit BLINK and sweep inactive peers.
    Blink,
    /// Any other count: emit a multicast POLL if at least one peer is known.
    Poll,
}

/// Owns the `blink_counter ∈ [0, BLINK_INTERVAL)` cadence and the next
/// scheduled tick time.
pub struct Scheduler {
    blink_counter: u8,
    blink_interval: u8,
    next_tick_ms: u32,
}

impl Scheduler {
    pub fn new(now_ms: u32, config: &Config) -> Self {
        Scheduler {
            blink_counter: 0,
            blink_interval: config.blink_interval,
            next_tick_ms: now_ms.wrapping_add(config.range_interval_ms),
        }
    }

    /// Has the clock reached the next scheduled tick?
    pub fn due(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.next_tick_ms) < (u32::MAX / 2)
    }

    /// Consume the due tick: advance the schedule by `range_interval_ms` plus
    /// a headroom sized for whichever emission this tick makes (a BLINK's
    /// trailing peer-list room, or a full POLL round's reply-slot budget),
    /// and return which action this tick is.
    pub fn consume_tick(&mut self, now_ms: u32, config: &Config) -> TickAction {
        let action = if self.blink_counter == 0 {
            TickAction::Blink
        } else {
            TickAction::Poll
        };
        let headroom_slots = match action {
            // A blink round needs less headroom than a full poll round.
            TickAction::Blink => 10,
            TickAction::Poll => POLL_ACK_TIME_SLOTS,
        };
        self.next_tick_ms = now_ms
            .wrapping_add(config.range_interval_ms)
            .wrapping_add(headroom_ms(headroom_slots, config.default_reply_delay_us));
        self.blink_counter = (self.blink_counter + 1) % self.blink_interval.max(1);
        action
    }

    /// After a RANGE transmit, re-derive the next tick's headroom from
    /// however many peers actually answered this cycle, rather than waiting
    /// for the next scheduled POLL/BLINK headroom to apply. `acked_count` is
    /// how many peers were addressed in the RANGE just sent.
    pub fn reschedule_after_range(&mut self, now_ms: u32, acked_count: usize, config: &Config) {
        self.next_tick_ms = now_ms
            .wrapping_add(config.range_interval_ms)
            .wrapping_add(headroom_ms(acked_count, config.default_reply_delay_us));
    }
}

fn headroom_ms(slots: usize, default_reply_delay_us: u32) -> u32 {
    (slots as u32 * 3 * default_reply_delay_us) / 1000
}

/// Slot `i`'s reply delay: `(2i + 1) * DEFAULT_REPLY_DELAY_US`.
pub fn slot_reply_delay_us(slot: usize, default_reply_delay_us: u32) -> u32 {
    (2 * slot as u32 + 1) * default_reply_delay_us
}

/// The deadline (ms) by which the tag must fall back to transmitting RANGE
/// with whatever POLL_ACKs it has collected, if the last-expected POLL_ACK
/// has not arrived.
pub fn range_retry_deadline_ms(poll_sent_ms: u32, last_slot_reply_us: u32) -> u32 {
    poll_sent_ms
        .wrapping_add(last_slot_reply_us / 1000)
        .wrapping_add(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_config() -> Config {
        Config::new_tag(crate::address::ShortAddress::new(1), crate::address::LongAddress::new([0; 8]))
    }

    #[test]
    fn blink_fires_every_blink_interval_ticks() {
        let config = tag_config();
        let mut sched = Scheduler::new(0, &config);
        let mut actions = heapless::Vec::<TickAction, 8>::new();
        let mut now = 0u32;
        for _ in 0..config.blink_interval {
            assert!(sched.due(now));
            let _ = actions.push(sched.consume_tick(now, &config));
            now = now.wrapping_add(config.range_interval_ms);
        }
        assert_eq!(actions[0], TickAction::Blink);
        for a in &actions[1..] {
            assert_eq!(*a, TickAction::Poll);
        }
    }

    #[test]
    fn slot_reply_delay_matches_arithmetic_progression() {
        assert_eq!(slot_reply_delay_us(0, 3000), 3000);
        assert_eq!(slot_reply_delay_us(1, 3000), 9000);
        assert_eq!(slot_reply_delay_us(2, 3000), 15000);
    }

    #[test]
    fn range_retry_deadline_adds_three_ms() {
        assert_eq!(range_retry_deadline_ms(1000, 9000), 1012);
    }
}
