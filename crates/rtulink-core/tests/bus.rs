mod common;

use common::{fast_config, mock_master, response, set_responder};
use pretty_assertions::assert_eq;
use rtulink_core::bus::SharedBus;
use rtulink_core::protocol::{FrameError, FunctionCode, ProtocolError, ReadRequest, Value, ValueKind};
use std::thread;

#[test]
fn test_threads_share_one_line() {
    let (master, state) = mock_master(fast_config());
    // each station answers with its own address as the register value
    set_responder(&state, |req| response(req[0], req[1], &[0x00, req[0]]));
    let bus = SharedBus::new(master);

    let handles: Vec<_> = (1u8..=4)
        .map(|station| {
            let bus = bus.clone();
            thread::spawn(move || {
                let request =
                    ReadRequest::new(station, FunctionCode::ReadHoldingRegisters, 0, 1);
                (0..5)
                    .map(|_| bus.query(&request, ValueKind::Integer))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for (station, handle) in (1u8..=4).zip(handles) {
        let results = handle.join().expect("poller thread");
        for result in results {
            assert_eq!(result.ok(), Some(Value::Integer(station as i64)));
        }
    }

    let stats = bus.transact(|m| m.stats()).unwrap();
    assert_eq!(stats.tx_frames, 20);
    assert_eq!(stats.rx_frames, 20);
}

#[test]
fn test_bus_reports_frame_errors() {
    let (master, _state) = mock_master(fast_config());
    let bus = SharedBus::new(master);
    let request = ReadRequest::new(0x01, FunctionCode::ReadCoils, 0, 8);

    let result = bus.read(&request);
    assert!(matches!(
        result,
        Err(ProtocolError::Frame(FrameError::Timeout))
    ));
    assert_eq!(bus.last_error().unwrap(), Some(FrameError::Timeout));
}

#[test]
fn test_bus_records_decode_errors() {
    let (master, state) = mock_master(fast_config());
    set_responder(&state, |req| response(req[0], req[1], &[0x43, 0x66]));
    let bus = SharedBus::new(master);
    let request = ReadRequest::new(0x02, FunctionCode::ReadInputRegisters, 0, 1);

    let expected = FrameError::DataTooShort {
        needed: 4,
        available: 2,
    };
    let result = bus.query(&request, ValueKind::Float);
    assert!(matches!(result, Err(ProtocolError::Frame(ref e)) if *e == expected));
    assert_eq!(bus.last_error().unwrap(), Some(expected));

    // a later success clears it
    assert_eq!(
        bus.query(&request, ValueKind::Integer).ok(),
        Some(Value::Integer(0x4366))
    );
    assert_eq!(bus.last_error().unwrap(), None);
}
