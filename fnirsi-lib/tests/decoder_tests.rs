//! Decoder properties over many generated reports.

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use fnirsi_lib::frame::RawFrame;
use fnirsi_lib::state::SessionState;
use fnirsi_lib::{FrameDecoder, FrameError};

/// Captured report: 4 × (5.07078 V, 0.48718 A, D+ 0.002 V, D- 0.002 V, 29.1 °C).
const CAPTURED_REPORT: &str = "aa04\
    c6bc0700\
    4ebe0000\
    02000200\
    01\
    2301\
    c6bc07004ebe000002000200012301\
    c6bc07004ebe000002000200012301\
    c6bc07004ebe000002000200012301\
    00";

fn captured_frame() -> RawFrame {
    let mut bytes = hex::decode(CAPTURED_REPORT).unwrap();
    let checksum = fnirsi_lib::crc::checksum(&bytes[1..]);
    bytes.push(checksum);
    RawFrame::try_from(bytes.as_slice()).unwrap()
}

/// Small deterministic generator so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }
}

fn random_frame(rng: &mut Lcg) -> RawFrame {
    let slots = std::array::from_fn(|_| {
        slot(
            rng.next() % 2_500_000,
            rng.next() % 700_000,
            (rng.next() % 1000) as u16,
        )
    });
    data_frame(slots)
}

#[test]
fn test_captured_report() {
    let frame = captured_frame();
    let mut state = SessionState::new();
    let samples = FrameDecoder::default()
        .decode(&frame, &mut state, Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        .unwrap();

    assert_eq!(samples.len(), 4);
    let s = samples[0];
    assert!((s.voltage_v - 5.07078).abs() < 1e-9);
    assert!((s.current_a - 0.48718).abs() < 1e-9);
    assert!((s.dp_v - 0.002).abs() < 1e-12);
    assert!((s.temperature_c - 29.1).abs() < 1e-9);
}

#[test]
fn test_valid_reports_yield_four_evenly_spaced_samples() {
    let mut rng = Lcg(7);
    let decoder = FrameDecoder::default();
    let mut state = SessionState::new();

    for n in 0..200 {
        let capture = Utc.timestamp_opt(1_000 + n, 0).unwrap();
        let samples = decoder.decode(&random_frame(&mut rng), &mut state, capture).unwrap();
        assert_eq!(samples.len(), 4);
        for pair in samples.windows(2) {
            let step = pair[1].timestamp - pair[0].timestamp;
            assert!(step > 0.0);
            assert!((step - 0.01).abs() < 1e-9, "step {step}");
        }
        // The report's capture time is one interval after its last sample
        let last = samples[3].timestamp;
        assert!((last - (1_000 + n) as f64 + 0.01).abs() < 1e-9);
    }
}

#[test]
fn test_non_data_reports_yield_nothing() {
    let decoder = FrameDecoder::default();
    let mut state = SessionState::new();
    let now = Utc::now();

    for packet_type in (0..=255u8).filter(|&t| t != 0x04) {
        let valid = non_data_frame(packet_type);
        let mut invalid = valid;
        invalid.checksum = invalid.checksum.wrapping_add(1);

        assert!(decoder.decode(&valid, &mut state, now).unwrap().is_empty());
        assert!(decoder.decode(&invalid, &mut state, now).unwrap().is_empty());
    }
    assert_eq!(state.temperature_ema, None);
    assert_eq!(state.energy_ws(), 0.0);
}

#[test]
fn test_any_corrupted_checksum_is_rejected() {
    let decoder = FrameDecoder::default();
    let mut state = SessionState::new();
    let good = constant_frame();

    for delta in 1..=255u8 {
        let mut frame = good;
        frame.checksum = good.checksum.wrapping_add(delta);
        match decoder.decode(&frame, &mut state, Utc::now()) {
            Err(FrameError::ChecksumMismatch { len, expected, actual }) => {
                assert_eq!(len, 64);
                assert_eq!(expected, good.checksum);
                assert_eq!(actual, frame.checksum);
            }
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }
    assert_eq!(state.energy_ws(), 0.0);
}

#[test]
fn test_corrupted_payload_is_rejected() {
    let decoder = FrameDecoder::default();
    let mut state = SessionState::new();
    let good = constant_frame().to_array();

    for offset in 2..63 {
        let mut bytes = good;
        bytes[offset] ^= 0x10;
        let frame = RawFrame::from_array(bytes);
        assert!(decoder.decode(&frame, &mut state, Utc::now()).is_err(), "offset {offset}");
    }
}

#[test]
fn test_accumulators_monotonic() {
    let mut rng = Lcg(42);
    let decoder = FrameDecoder::default();
    let mut state = SessionState::new();
    let mut last = (0.0f64, 0.0f64);

    for _ in 0..500 {
        for sample in decoder.decode(&random_frame(&mut rng), &mut state, Utc::now()).unwrap() {
            assert!(sample.energy_ws >= last.0);
            assert!(sample.charge_as >= last.1);
            last = (sample.energy_ws, sample.charge_as);
        }
    }
    assert!(last.0 > 0.0);
}

#[test]
fn test_zero_load_keeps_totals_flat() {
    let frame = data_frame([slot(512_000, 0, 250); 4]);
    let mut state = SessionState::new();
    let samples = FrameDecoder::default().decode(&frame, &mut state, Utc::now()).unwrap();
    assert!(samples.iter().all(|s| s.energy_ws == 0.0 && s.charge_as == 0.0));
}

#[test]
fn test_temperature_ema_first_and_second() {
    let frame = data_frame([slot(0, 0, 215), slot(0, 0, 225), slot(0, 0, 225), slot(0, 0, 225)]);
    let mut state = SessionState::new();
    let samples = FrameDecoder::new(true, 0.9).decode(&frame, &mut state, Utc::now()).unwrap();

    let ema1 = samples[0].temperature_c;
    assert_eq!(ema1, 21.5);
    let ema2 = 22.5 * 0.1 + ema1 * 0.9;
    assert!((samples[1].temperature_c - ema2).abs() < 1e-12);
}
