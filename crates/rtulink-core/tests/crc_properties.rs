//! CRC-16 properties checked against an independent implementation

use crc::{Crc, CRC_16_MODBUS};
use proptest::prelude::*;
use rtulink_core::protocol::crc as rtu_crc;
use rtulink_core::protocol::parser;

const REFERENCE: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

proptest! {
    #[test]
    fn matches_reference_crc(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        prop_assert_eq!(rtu_crc::compute(&data), REFERENCE.checksum(&data));
    }

    #[test]
    fn appended_crc_verifies(data in proptest::collection::vec(any::<u8>(), 1..256)) {
        let mut frame = data.clone();
        rtu_crc::append(&mut frame);
        prop_assert!(rtu_crc::verify(&frame));
    }

    #[test]
    fn single_bit_flip_is_detected(
        data in proptest::collection::vec(any::<u8>(), 1..64),
        bit in 0usize..512,
    ) {
        let mut frame = data.clone();
        rtu_crc::append(&mut frame);
        let bit = bit % (data.len() * 8);
        frame[bit / 8] ^= 1 << (bit % 8);
        prop_assert!(!rtu_crc::verify(&frame));
    }

    #[test]
    fn valid_response_always_parses(
        station in 1u8..=247,
        function in 1u8..=4,
        data in proptest::collection::vec(any::<u8>(), 0..120),
    ) {
        let mut frame = vec![station, function, data.len() as u8];
        frame.extend_from_slice(&data);
        rtu_crc::append(&mut frame);

        let bounds = parser::parse(&frame, station);
        prop_assert!(bounds.is_ok());
        let bounds = bounds.unwrap();
        prop_assert_eq!(bounds.packet_start, 0);
        prop_assert_eq!(bounds.data(&frame), data.as_slice());
    }

    #[test]
    fn parser_never_panics(
        station in any::<u8>(),
        capture in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        let _ = parser::parse(&capture, station);
    }
}
