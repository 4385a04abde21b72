//! The asymmetric two-way ranging state machine: discovers peers, drives
//! the BLINK/RANGING_INIT/POLL/POLL_ACK/RANGE/RANGE_REPORT exchange across
//! time slots, and turns hardware timestamps into a distance. An owned
//! `ProtocolEngine` value borrows its `RadioDriver` collaborator for the
//! duration of each `poll()` call instead of holding static state, looks
//! peers up by index instead of raw pointer, and invokes a `Callbacks`
//! value instead of C-style function pointers.

use heapless::Vec;

use crate::address::ShortAddress;
use crate::config::{Config, Role};
use crate::error::EngineNote;
use crate::mac_frame::{
    self, decode_known_peer, decode_poll_entry, decode_range_entry, decode_range_report_payload,
    decode_type_byte, detect_type, encode_known_peers_payload, encode_poll_payload,
    encode_range_payload, encode_range_report_payload, known_peers_count, poll_device_count,
    range_device_count, type_byte_offset, FrameShape, MacCodec, MessageType, PollEntry, RangeEntry,
    LEN_DATA,
};
use crate::peer::Peer;
use crate::peer_table::{InsertOutcome, PeerTable, DEFAULT_CAPACITY};
use crate::radio::{MonotonicClock, RadioDriver, RandomSource};
use crate::scheduler::{
    range_retry_deadline_ms, slot_reply_delay_us, Scheduler, TickAction, DEVICES_PER_RANGE_TRANSMIT,
    DEVICE_PER_POLL_TRANSMIT, POLL_ACK_TIME_SLOTS,
};

/// The anchor side of the state machine.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorState {
    AwaitPoll,
    AwaitRange,
}

/// The tag side of the state machine.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagState {
    Idle,
    AwaitPollAck,
    AwaitRangeReport,
}

/// The capability set an embedder can hook into. Every method has a no-op
/// default, so an embedder only implements the callbacks it cares about.
pub trait Callbacks {
    fn on_new_range(&mut self, _peer: &Peer) {}
    fn on_blink_device(&mut self, _peer: &Peer) {}
    fn on_new_device(&mut self, _peer: &Peer) {}
    fn on_inactive_device(&mut self, _peer: &Peer) {}
    fn on_evicted_on_full(&mut self, _peer: &Peer) {}
}

/// A `Callbacks` implementor that observes nothing. Used by callers who only
/// want the side-effecting behavior of `poll()` (transmits, table upkeep)
/// and read `EngineNote`/the peer table directly instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl Callbacks for NoopCallbacks {}

/// Slot quantum multiplier defining the RANGING_INIT random-delay window.
const RANGING_INIT_SLOT_DURATION_NUM: u32 = 5;
const RANGING_INIT_SLOT_DURATION_DEN: u32 = 2;
const RANGING_INIT_MAX_SLOTS: u32 = 7;

fn ranging_init_slot_duration_us(default_reply_delay_us: u32) -> u32 {
    (default_reply_delay_us * RANGING_INIT_SLOT_DURATION_NUM) / RANGING_INIT_SLOT_DURATION_DEN
}

/// The asymmetric two-way ranging protocol engine. One instance plays
/// exactly one `Role` for its lifetime. `N` is the peer
/// table's capacity.
pub struct ProtocolEngine<const N: usize = DEFAULT_CAPACITY> {
    config: Config,
    codec: MacCodec,
    peers: PeerTable<N>,
    scheduler: Scheduler,

    anchor_state: AnchorState,
    tag_state: TagState,
    protocol_failed: bool,

    /// The addresses addressed by the most recently transmitted POLL, in
    /// slot order; `last()` is the last-expected POLL_ACK.
    last_poll_addressed: Vec<ShortAddress, N>,
    last_poll_sent_ms: u32,
    last_slot_reply_us: u32,

    /// Engine-wide liveness: updated on every send or receive. If untouched
    /// for `reset_period_ms`, the anchor hard-resets to `AwaitPoll`.
    last_activity_ms: u32,
}

impl<const N: usize> ProtocolEngine<N> {
    pub fn new(config: Config, now_ms: u32) -> Self {
        let scheduler = Scheduler::new(now_ms, &config);
        ProtocolEngine {
            config,
            codec: MacCodec::new(),
            peers: PeerTable::new(),
            scheduler,
            anchor_state: AnchorState::AwaitPoll,
            tag_state: TagState::Idle,
            protocol_failed: false,
            last_poll_addressed: Vec::new(),
            last_poll_sent_ms: now_ms,
            last_slot_reply_us: 0,
            last_activity_ms: now_ms,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn peers(&self) -> &PeerTable<N> {
        &self.peers
    }

    pub fn anchor_state(&self) -> AnchorState {
        self.anchor_state
    }

    pub fn tag_state(&self) -> TagState {
        self.tag_state
    }

    pub fn protocol_failed(&self) -> bool {
        self.protocol_failed
    }

    fn note_activity_engine(&mut self, now_ms: u32) {
        self.last_activity_ms = now_ms;
    }

    /// Finds or inserts `short_address`, returning its index and whether the
    /// insert evicted an existing peer to make room (table was full).
    fn insert_or_get<Cb: Callbacks>(
        &mut self,
        short_address: ShortAddress,
        now_ms: u32,
        callbacks: &mut Cb,
        on_new: impl FnOnce(&mut Cb, &Peer),
    ) -> (usize, bool) {
        if let Some(index) = self.peers.find_index(short_address) {
            return (index, false);
        }
        let peer = Peer::new(short_address, 0, self.config.default_reply_delay_us, now_ms);
        match self.peers.insert(peer) {
            InsertOutcome::Inserted { index } => {
                on_new(callbacks, self.peers.get(index).expect("just inserted"));
                (index, false)
            }
            InsertOutcome::Replaced { index, evicted } => {
                callbacks.on_evicted_on_full(&evicted);
                on_new(callbacks, self.peers.get(index).expect("just inserted"));
                (index, true)
            }
            InsertOutcome::AlreadyPresent { index } => (index, false),
            InsertOutcome::RejectedTableFull => (index_or_panic(), false),
        }
    }

    /// Drain and process this cycle's radio events, then run any due
    /// scheduler tick or retry timeout. Never blocks, never panics on
    /// malformed input. Returns what, if anything
    /// noteworthy happened — purely for observability and tests.
    pub fn poll<R, C, Rng, Cb>(
        &mut self,
        radio: &mut R,
        clock: &C,
        rng: &mut Rng,
        callbacks: &mut Cb,
    ) -> EngineNote
    where
        R: RadioDriver,
        C: MonotonicClock,
        Rng: RandomSource,
        Cb: Callbacks,
    {
        let now_ms = clock.now_ms();
        let mut note = EngineNote::Idle;

        if self.config.role == Role::Anchor
            && now_ms.wrapping_sub(self.last_activity_ms) >= self.config.reset_period_ms
        {
            self.anchor_state = AnchorState::AwaitPoll;
            self.protocol_failed = false;
            self.last_activity_ms = now_ms;
        }

        // A sent event is always drained before a received one within one
        // poll() — both merely note engine-wide activity here,
        // since every transmit already captured its own timestamp
        // synchronously via `RadioDriver::set_delay`'s return value.
        if radio.take_sent_event() {
            self.note_activity_engine(now_ms);
        }

        if radio.take_received_event() {
            if radio.is_receive_failed() {
                note = EngineNote::CorruptReceive;
            } else {
                let mut buf = [0u8; LEN_DATA];
                let n = radio.get_data(&mut buf);
                note = self.handle_receive(&buf[..n], radio, now_ms, rng, callbacks);
            }
        }

        let sweep_count = if self.scheduler.due(now_ms) {
            let action = self.scheduler.consume_tick(now_ms, &self.config);
            self.handle_tick(action, radio, now_ms, &mut note, callbacks)
        } else {
            0
        };
        let _ = sweep_count;

        if self.config.role == Role::Tag && self.tag_state == TagState::AwaitPollAck {
            let deadline = range_retry_deadline_ms(self.last_poll_sent_ms, self.last_slot_reply_us);
            if now_ms.wrapping_sub(deadline) < (u32::MAX / 2) {
                self.tag_transmit_range(radio, now_ms);
                note = EngineNote::TimeoutRetry;
            }
        }

        note
    }

    fn handle_tick<R, Cb>(
        &mut self,
        action: TickAction,
        radio: &mut R,
        now_ms: u32,
        note: &mut EngineNote,
        callbacks: &mut Cb,
    ) -> usize
    where
        R: RadioDriver,
        Cb: Callbacks,
    {
        if action == TickAction::Blink {
            let evicted = self.peers.sweep_inactive(now_ms, self.config.inactivity_ms, |p| {
                callbacks.on_inactive_device(p);
            });
            if evicted > 0 {
                *note = EngineNote::InactiveSwept;
            }
            if self.config.role == Role::Tag {
                self.tag_transmit_blink(radio, now_ms);
            }
            evicted
        } else {
            if self.config.role == Role::Tag && !self.peers.is_empty() {
                self.tag_transmit_poll(radio, now_ms);
            }
            0
        }
    }

    // ---- tag transmit paths -------------------------------------------

    fn tag_transmit_blink<R: RadioDriver>(&mut self, radio: &mut R, now_ms: u32) {
        let mut buf = [0u8; LEN_DATA];
        let n = self.codec.build_blink(self.config.short_address, &mut buf);
        let known: Vec<ShortAddress, N> = self.peers.iter().map(|p| p.short_address).collect();
        let payload_len = encode_known_peers_payload(&known, &mut buf[n..]);
        radio.new_transmit();
        let _ = radio.set_delay(crate::timestamp::Timestamp::ZERO);
        radio.set_data(&buf[..n + payload_len]);
        radio.start_transmit();
        self.note_activity_engine(now_ms);
    }

    fn tag_transmit_poll<R: RadioDriver>(&mut self, radio: &mut R, now_ms: u32) {
        let addressed_count = self.peers.len().min(DEVICE_PER_POLL_TRANSMIT);
        let slot_start = POLL_ACK_TIME_SLOTS.saturating_sub(addressed_count);

        let mut entries: Vec<PollEntry, N> = Vec::new();
        self.last_poll_addressed.clear();
        for (i, peer) in self.peers.iter_mut().take(addressed_count).enumerate() {
            let slot = slot_start + i;
            let reply_time_us = slot_reply_delay_us(slot, self.config.default_reply_delay_us);
            peer.reply_delay_us = reply_time_us;
            peer.begin_new_exchange();
            let _ = entries.push(PollEntry { short_address: peer.short_address, reply_time_us: reply_time_us as u16 });
            let _ = self.last_poll_addressed.push(peer.short_address);
        }
        if let Some(last) = entries.last() {
            self.last_slot_reply_us = last.reply_time_us as u32;
        }

        let mut buf = [0u8; LEN_DATA];
        let n = self.codec.build_short(self.config.short_address, ShortAddress::BROADCAST, &mut buf);
        buf[n] = MessageType::Poll as u8;
        let payload_len = encode_poll_payload(&entries, &mut buf[n + 1..]);
        let total = n + 1 + payload_len;

        radio.new_transmit();
        let ts = radio.set_delay(crate::timestamp::Timestamp::ZERO);
        radio.set_data(&buf[..total]);
        radio.start_transmit();

        for addr in self.last_poll_addressed.iter() {
            if let Some(peer) = self.peers.find_mut(*addr) {
                peer.time_poll_sent = ts;
            }
        }

        self.last_poll_sent_ms = now_ms;
        self.tag_state = TagState::AwaitPollAck;
        self.note_activity_engine(now_ms);
    }

    /// Build and send RANGE carrying whatever anchors acked this cycle.
    fn tag_transmit_range<R: RadioDriver>(&mut self, radio: &mut R, now_ms: u32) {
        let addressed: Vec<ShortAddress, N> = self.last_poll_addressed.clone();
        let acked: Vec<ShortAddress, N> = addressed
            .iter()
            .copied()
            .filter(|a| self.peers.find(*a).map(|p| p.has_acked_poll).unwrap_or(false))
            .take(DEVICES_PER_RANGE_TRANSMIT)
            .collect();

        let mut buf = [0u8; LEN_DATA];
        let n = self.codec.build_short(self.config.short_address, ShortAddress::BROADCAST, &mut buf);
        buf[n] = MessageType::Range as u8;

        // The RANGE frame must carry reply2 = t_range_sent - t_poll_ack_received,
        // but t_range_sent is this very transmit's timestamp. set_delay's
        // deterministic scheduled-timestamp return resolves the
        // circularity: request the (immediate) transmit slot first, then build
        // the payload around the timestamp it hands back, only then stage the
        // bytes.
        radio.new_transmit();
        let ts = radio.set_delay(crate::timestamp::Timestamp::ZERO);

        let mut entries: Vec<RangeEntry, N> = Vec::new();
        for addr in acked.iter() {
            if let Some(peer) = self.peers.find_mut(*addr) {
                peer.time_range_sent = ts;
                let _ = entries.push(RangeEntry {
                    short_address: *addr,
                    delta1: peer.round1(),
                    delta2: peer.reply2(),
                });
            }
        }

        let payload_len = encode_range_payload(&entries, &mut buf[n + 1..]);
        radio.set_data(&buf[..n + 1 + payload_len]);
        radio.start_transmit();

        self.tag_state = if self.config.enable_range_report {
            TagState::AwaitRangeReport
        } else {
            TagState::Idle
        };
        self.scheduler.reschedule_after_range(now_ms, acked.len(), &self.config);
        self.note_activity_engine(now_ms);
    }

    // ---- anchor transmit paths -----------------------------------------

    fn anchor_transmit_ranging_init<R: RadioDriver>(
        &mut self,
        radio: &mut R,
        tag_short: ShortAddress,
        now_ms: u32,
        delay_us: u32,
    ) {
        let mut buf = [0u8; LEN_DATA];
        let dst_eui = crate::address::LongAddress::from_short(tag_short);
        let n = self.codec.build_long(self.config.short_address, dst_eui, &mut buf);
        buf[n] = MessageType::RangingInit as u8;

        radio.new_transmit();
        let _ = radio.set_delay(crate::timestamp::Timestamp::from_micros(delay_us));
        radio.set_data(&buf[..n + 1]);
        radio.start_transmit();
        self.note_activity_engine(now_ms);
    }

    fn anchor_transmit_poll_ack<R: RadioDriver>(
        &mut self,
        radio: &mut R,
        tag_short: ShortAddress,
        delay_us: u32,
        now_ms: u32,
    ) {
        let mut buf = [0u8; LEN_DATA];
        let n = self.codec.build_short(self.config.short_address, tag_short, &mut buf);
        buf[n] = MessageType::PollAck as u8;

        radio.new_transmit();
        let ts = radio.set_delay(crate::timestamp::Timestamp::from_micros(delay_us));
        radio.set_data(&buf[..n + 1]);
        radio.start_transmit();

        if let Some(peer) = self.peers.find_mut(tag_short) {
            peer.time_poll_ack_sent = ts;
        }
        self.note_activity_engine(now_ms);
    }

    fn anchor_transmit_range_report<R: RadioDriver>(
        &mut self,
        radio: &mut R,
        tag_short: ShortAddress,
        range_m: f32,
        rx_power_dbm: f32,
        now_ms: u32,
    ) {
        let mut buf = [0u8; LEN_DATA];
        let n = self.codec.build_short(self.config.short_address, tag_short, &mut buf);
        buf[n] = MessageType::RangeReport as u8;
        let payload_len = encode_range_report_payload(range_m, rx_power_dbm, &mut buf[n + 1..]);

        radio.new_transmit();
        let _ = radio.set_delay(crate::timestamp::Timestamp::ZERO);
        radio.set_data(&buf[..n + 1 + payload_len]);
        radio.start_transmit();
        self.note_activity_engine(now_ms);
    }

    // ---- receive path ----------------------------------------------------

    fn handle_receive<R, Rng, Cb>(
        &mut self,
        buf: &[u8],
        radio: &mut R,
        now_ms: u32,
        rng: &mut Rng,
        callbacks: &mut Cb,
    ) -> EngineNote
    where
        R: RadioDriver,
        Rng: RandomSource,
        Cb: Callbacks,
    {
        let shape = match detect_type(buf) {
            Ok(s) => s,
            Err(_) => return EngineNote::TypeByteUnknown,
        };

        if shape == FrameShape::Blink {
            return self.handle_blink(buf, radio, rng, now_ms, callbacks);
        }

        let offset = type_byte_offset(shape);
        if buf.len() <= offset {
            return EngineNote::TypeByteUnknown;
        }
        let msg_type = match decode_type_byte(buf[offset]) {
            Ok(t) => t,
            Err(_) => return EngineNote::TypeByteUnknown,
        };
        let payload = &buf[offset + 1..];

        let src = match shape {
            FrameShape::Short => MacCodec::decode_short_src(buf),
            FrameShape::Long => MacCodec::decode_long_src(buf),
            FrameShape::Blink => unreachable!(),
        };
        let src = match src {
            Ok(s) => s,
            Err(_) => return EngineNote::TypeByteUnknown,
        };

        match self.config.role {
            Role::Anchor => self.anchor_handle(msg_type, src, payload, radio, rng, now_ms, callbacks),
            Role::Tag => self.tag_handle(msg_type, src, payload, radio, now_ms, callbacks),
        }
    }

    fn handle_blink<R, Rng, Cb>(
        &mut self,
        buf: &[u8],
        radio: &mut R,
        rng: &mut Rng,
        now_ms: u32,
        callbacks: &mut Cb,
    ) -> EngineNote
    where
        R: RadioDriver,
        Rng: RandomSource,
        Cb: Callbacks,
    {
        if self.config.role != Role::Anchor {
            // a tag overhearing another tag's blink has nothing to do with it.
            return EngineNote::Idle;
        }
        let src = match MacCodec::decode_blink_src(buf) {
            Ok(s) => s,
            Err(_) => return EngineNote::TypeByteUnknown,
        };

        let payload = &buf[mac_frame::BLINK_LEN..];
        let knows_us = known_peers_count(payload)
            .map(|count| {
                (0..count).any(|i| decode_known_peer(payload, i) == Ok(self.config.short_address))
            })
            .unwrap_or(false);

        let (_, table_full) = self.insert_or_get(src, now_ms, callbacks, |cb, p| cb.on_blink_device(p));
        if let Some(peer) = self.peers.find_mut(src) {
            peer.note_activity(now_ms);
        }
        self.note_activity_engine(now_ms);

        if !knows_us {
            let slot_duration = ranging_init_slot_duration_us(self.config.default_reply_delay_us);
            let slot = 1 + rng.random_below(RANGING_INIT_MAX_SLOTS);
            let delay_us = slot * slot_duration;
            self.anchor_transmit_ranging_init(radio, src, now_ms, delay_us);
        }

        if table_full {
            EngineNote::TableFull
        } else {
            EngineNote::Idle
        }
    }

    fn anchor_handle<R, Rng, Cb>(
        &mut self,
        msg_type: MessageType,
        src: ShortAddress,
        payload: &[u8],
        radio: &mut R,
        rng: &mut Rng,
        now_ms: u32,
        callbacks: &mut Cb,
    ) -> EngineNote
    where
        R: RadioDriver,
        Rng: RandomSource,
        Cb: Callbacks,
    {
        match msg_type {
            MessageType::Poll => {
                self.protocol_failed = false;
                let count = poll_device_count(payload).unwrap_or(0);
                let own = (0..count)
                    .filter_map(|i| decode_poll_entry(payload, i).ok())
                    .find(|e| e.short_address == self.config.short_address);

                let (_, table_full) = self.insert_or_get(src, now_ms, callbacks, |cb, p| cb.on_new_device(p));
                if let Some(peer) = self.peers.find_mut(src) {
                    peer.note_activity(now_ms);
                }
                self.note_activity_engine(now_ms);

                match own {
                    Some(entry) => {
                        if let Some(peer) = self.peers.find_mut(src) {
                            peer.time_poll_received = radio.get_receive_timestamp();
                        }
                        self.anchor_transmit_poll_ack(radio, src, entry.reply_time_us as u32, now_ms);
                        self.anchor_state = AnchorState::AwaitRange;
                        if table_full {
                            EngineNote::TableFull
                        } else {
                            EngineNote::Idle
                        }
                    }
                    None => {
                        let free_slots = POLL_ACK_TIME_SLOTS.saturating_sub(count);
                        let slot = if free_slots > 0 { rng.random_below(free_slots as u32) as usize } else { 0 };
                        let delay_us = slot_reply_delay_us(slot, self.config.default_reply_delay_us);
                        self.anchor_transmit_ranging_init(radio, src, now_ms, delay_us);
                        if table_full {
                            EngineNote::TableFull
                        } else {
                            EngineNote::Idle
                        }
                    }
                }
            }
            MessageType::Range if self.anchor_state == AnchorState::AwaitRange => {
                let count = range_device_count(payload).unwrap_or(0);
                let own = (0..count)
                    .filter_map(|i| decode_range_entry(payload, i).ok())
                    .find(|e| e.short_address == self.config.short_address);

                let Some(entry) = own else {
                    self.anchor_state = AnchorState::AwaitPoll;
                    return EngineNote::PeerNotFound;
                };

                let Some(peer) = self.peers.find_mut(src) else {
                    self.anchor_state = AnchorState::AwaitPoll;
                    return EngineNote::PeerNotFound;
                };

                peer.time_range_received = radio.get_receive_timestamp();
                peer.receive_power_dbm = radio.get_receive_power();
                peer.first_path_power_dbm = radio.get_first_path_power();
                peer.quality = radio.get_receive_quality();
                peer.note_activity(now_ms);
                self.last_activity_ms = now_ms;
                self.anchor_state = AnchorState::AwaitPoll;

                if self.protocol_failed {
                    return EngineNote::UnexpectedFrameType;
                }

                let round1 = entry.delta1;
                let reply2 = entry.delta2;
                let reply1 = peer.reply1();
                let round2 = peer.round2();
                let denom = round1 + round2 + reply1 + reply2;
                // A forged RANGE payload could zero every contributing duration;
                // guard the division rather than let untrusted wire data panic.
                if denom.as_ticks() == 0 {
                    return EngineNote::PeerNotFound;
                }
                let tof = (round1 * round2 - reply1 * reply2) / denom;
                let range_m = tof.as_meters();
                peer.range_m = Some(range_m);
                let rx_power = peer.receive_power_dbm;

                callbacks.on_new_range(peer);

                if self.config.enable_range_report {
                    self.anchor_transmit_range_report(radio, src, range_m, rx_power, now_ms);
                }
                EngineNote::RangeComputed
            }
            _ => {
                self.protocol_failed = true;
                EngineNote::UnexpectedFrameType
            }
        }
    }

    fn tag_handle<R, Cb>(
        &mut self,
        msg_type: MessageType,
        src: ShortAddress,
        payload: &[u8],
        radio: &mut R,
        now_ms: u32,
        callbacks: &mut Cb,
    ) -> EngineNote
    where
        R: RadioDriver,
        Cb: Callbacks,
    {
        match msg_type {
            MessageType::RangingInit => {
                let (_, table_full) = self.insert_or_get(src, now_ms, callbacks, |cb, p| cb.on_new_device(p));
                if let Some(peer) = self.peers.find_mut(src) {
                    peer.note_activity(now_ms);
                }
                self.note_activity_engine(now_ms);
                if table_full {
                    EngineNote::TableFull
                } else {
                    EngineNote::Idle
                }
            }
            MessageType::PollAck if self.tag_state == TagState::AwaitPollAck => {
                let Some(peer) = self.peers.find_mut(src) else {
                    return EngineNote::PeerNotFound;
                };
                peer.time_poll_ack_received = radio.get_receive_timestamp();
                peer.has_acked_poll = true;
                peer.note_activity(now_ms);
                self.note_activity_engine(now_ms);

                let is_last_expected = self.last_poll_addressed.last() == Some(&src);
                if is_last_expected {
                    self.tag_transmit_range(radio, now_ms);
                }
                EngineNote::Idle
            }
            MessageType::RangeReport if self.tag_state == TagState::AwaitRangeReport => {
                let Ok((range_m, rx_power)) = decode_range_report_payload(payload) else {
                    return EngineNote::TypeByteUnknown;
                };
                if let Some(peer) = self.peers.find_mut(src) {
                    peer.range_m = Some(range_m);
                    peer.receive_power_dbm = rx_power;
                    peer.note_activity(now_ms);
                    self.note_activity_engine(now_ms);
                    self.tag_state = TagState::Idle;
                    callbacks.on_new_range(peer);
                    EngineNote::RangeComputed
                } else {
                    self.tag_state = TagState::Idle;
                    EngineNote::PeerNotFound
                }
            }
            _ => {
                self.tag_state = TagState::AwaitPollAck;
                EngineNote::UnexpectedFrameType
            }
        }
    }
}

/// `PeerTable::insert` never returns `RejectedTableFull` for a freshly
/// constructed peer (it always evicts instead) — this path is unreachable.
fn index_or_panic() -> usize {
    unreachable!("PeerTable::insert never rejects a fresh peer on a full table")
}
