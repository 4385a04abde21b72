//! Black-box exercise of the protocol engine through its public API only:
//! a scripted `RadioDriver` plays back one BLINK/POLL/RANGE cycle against an
//! anchor engine and checks the reported distance.

use heapless::Vec;

use uwb_ranging::mac_frame::{
    encode_known_peers_payload, encode_poll_payload, encode_range_payload, MacCodec, MessageType,
    PollEntry, RangeEntry, LEN_DATA,
};
use uwb_ranging::radio::{MonotonicClock, RadioDriver, RadioMode, RandomSource};
use uwb_ranging::timestamp::Timestamp;
use uwb_ranging::{AnchorState, Callbacks, Config, EngineNote, LongAddress, Peer, ProtocolEngine, ShortAddress};

struct FixedClock(u32);
impl MonotonicClock for FixedClock {
    fn now_ms(&self) -> u32 {
        self.0
    }
}

struct FixedRng;
impl RandomSource for FixedRng {
    fn random_below(&mut self, bound: u32) -> u32 {
        bound.saturating_sub(1)
    }
}

/// Scripted radio: replays one injected receive buffer per `poll()` and
/// records every transmit.
struct ScriptedRadio {
    rx_buf: [u8; LEN_DATA],
    rx_len: usize,
    rx_timestamp: Timestamp,
    rx_pending: bool,
    tx_pending: bool,
    tx_log: Vec<([u8; LEN_DATA], usize), 8>,
    next_tx_timestamp: Timestamp,
}

impl ScriptedRadio {
    fn new() -> Self {
        ScriptedRadio {
            rx_buf: [0u8; LEN_DATA],
            rx_len: 0,
            rx_timestamp: Timestamp::ZERO,
            rx_pending: false,
            tx_pending: false,
            tx_log: Vec::new(),
            next_tx_timestamp: Timestamp::ZERO,
        }
    }

    fn inject(&mut self, buf: &[u8], at: Timestamp) {
        self.rx_buf[..buf.len()].copy_from_slice(buf);
        self.rx_len = buf.len();
        self.rx_timestamp = at;
        self.rx_pending = true;
    }
}

impl RadioDriver for ScriptedRadio {
    fn set_eui(&mut self, _eui: LongAddress) {}
    fn configure_network(&mut self, _short_address: ShortAddress, _pan_id: u16, _mode: RadioMode) {}
    fn high_power_init(&mut self) {}

    fn new_transmit(&mut self) {}
    fn set_data(&mut self, data: &[u8]) {
        let mut buf = [0u8; LEN_DATA];
        buf[..data.len()].copy_from_slice(data);
        let _ = self.tx_log.push((buf, data.len()));
        self.tx_pending = true;
    }
    fn set_delay(&mut self, _delay: Timestamp) -> Timestamp {
        self.next_tx_timestamp
    }
    fn start_transmit(&mut self) {}

    fn new_receive(&mut self) {}
    fn receive_permanently(&mut self, _permanent: bool) {}
    fn start_receive(&mut self) {}
    fn get_data(&mut self, buf: &mut [u8]) -> usize {
        buf[..self.rx_len].copy_from_slice(&self.rx_buf[..self.rx_len]);
        self.rx_len
    }

    fn take_sent_event(&mut self) -> bool {
        core::mem::replace(&mut self.tx_pending, false)
    }
    fn take_received_event(&mut self) -> bool {
        core::mem::replace(&mut self.rx_pending, false)
    }

    fn get_transmit_timestamp(&self) -> Timestamp {
        self.next_tx_timestamp
    }
    fn get_receive_timestamp(&self) -> Timestamp {
        self.rx_timestamp
    }

    fn get_receive_power(&self) -> f32 {
        -80.0
    }
    fn get_first_path_power(&self) -> f32 {
        -82.0
    }
    fn get_receive_quality(&self) -> f32 {
        0.9
    }
    fn is_receive_failed(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct LastRange(Option<(ShortAddress, f32)>);
impl Callbacks for LastRange {
    fn on_new_range(&mut self, peer: &Peer) {
        self.0 = Some((peer.short_address, peer.range_m.unwrap()));
    }
}

#[test]
fn anchor_computes_distance_over_public_api() {
    let config = Config::new_anchor(ShortAddress::new(0x0002), LongAddress::new([0; 8]));
    let mut engine: ProtocolEngine<4> = ProtocolEngine::new(config, 0);
    let mut radio = ScriptedRadio::new();
    let clock = FixedClock(0);
    let mut rng = FixedRng;
    let mut cb = LastRange::default();
    let mut codec = MacCodec::new();

    // BLINK from an unknown tag, with an empty known-peers list.
    let mut blink = [0u8; LEN_DATA];
    let n = codec.build_blink(ShortAddress::new(0x0001), &mut blink);
    let pn = encode_known_peers_payload(&[], &mut blink[n..]);
    radio.inject(&blink[..n + pn], Timestamp::ZERO);
    engine.poll(&mut radio, &clock, &mut rng, &mut cb);
    assert_eq!(radio.tx_log.len(), 1); // RANGING_INIT queued

    // POLL addressing the anchor with a 3000us reply slot.
    let mut poll = [0u8; LEN_DATA];
    let pn = codec.build_short(ShortAddress::new(0x0001), ShortAddress::BROADCAST, &mut poll);
    poll[pn] = MessageType::Poll as u8;
    let entries = [PollEntry { short_address: ShortAddress::new(0x0002), reply_time_us: 3000 }];
    let plen = encode_poll_payload(&entries, &mut poll[pn + 1..]);
    radio.inject(&poll[..pn + 1 + plen], Timestamp::ZERO);
    engine.poll(&mut radio, &clock, &mut rng, &mut cb);
    assert_eq!(engine.anchor_state(), AnchorState::AwaitRange);
    assert_eq!(radio.tx_log.len(), 2); // + POLL_ACK

    // RANGE carrying the tag's own round1/reply2 deltas.
    let mut range = [0u8; LEN_DATA];
    let rn = codec.build_short(ShortAddress::new(0x0001), ShortAddress::BROADCAST, &mut range);
    range[rn] = MessageType::Range as u8;
    let range_entries = [RangeEntry {
        short_address: ShortAddress::new(0x0002),
        delta1: Timestamp::from_ticks(6100),
        delta2: Timestamp::from_ticks(3100),
    }];
    let rlen = encode_range_payload(&range_entries, &mut range[rn + 1..]);
    radio.inject(&range[..rn + 1 + rlen], Timestamp::from_ticks(9000));
    let note = engine.poll(&mut radio, &clock, &mut rng, &mut cb);

    assert_eq!(note, EngineNote::RangeComputed);
    assert_eq!(engine.anchor_state(), AnchorState::AwaitPoll);
    let (addr, range_m) = cb.0.expect("on_new_range should have fired");
    assert_eq!(addr, ShortAddress::new(0x0001));
    assert!(range_m.is_finite() && range_m >= 0.0);
}
