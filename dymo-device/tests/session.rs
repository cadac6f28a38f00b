//! Full setup sequence against a simulated printer

use std::collections::VecDeque;
use std::time::Duration;

use dymo_device::{
    CancelToken, Error, LabelManager, ManualClock, NetworkStatus, Operator, PACKET_SIZE, Phase, ScannedNetwork,
    Session, SessionConfig, Transport, TransportError,
};
use dymo_proto::ResponseHeader;
use dymo_proto::frame::{OBJ_HEADER_LEN, RESP_HEADER_LEN};
use dymo_proto::network::{SCAN_FIRST_RECORD, SCAN_RECORD_STRIDE};

/// Answers object commands the way the firmware does. Network status
/// replies come from `statuses`; the last one repeats forever.
#[derive(Default)]
struct Printer {
    statuses: VecDeque<NetworkStatus>,
    networks: Vec<ScannedNetwork>,
    /// Object opcodes and raw letters in the order received
    log: Vec<u8>,
    /// Payload of the last `0x02`
    config: Vec<u8>,
    wifi_enabled: bool,
    pending: Vec<u8>,
    outbox: VecDeque<Vec<u8>>,
}

impl Printer {
    fn with_statuses(statuses: impl IntoIterator<Item = NetworkStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            ..Default::default()
        }
    }

    fn queue_reply(&mut self, id: u8, body: &[u8]) {
        let header = ResponseHeader {
            response_id: id,
            length: (RESP_HEADER_LEN + body.len()) as u16,
            status: 0,
        };
        let mut wire = header.to_bytes().to_vec();
        wire.extend_from_slice(body);
        for chunk in wire.chunks(PACKET_SIZE) {
            let mut packet = chunk.to_vec();
            packet.resize(PACKET_SIZE, 0);
            self.outbox.push_back(packet);
        }
    }

    fn next_status(&mut self) -> NetworkStatus {
        if self.statuses.len() > 1 {
            self.statuses.pop_front().unwrap_or_default()
        } else {
            self.statuses.front().copied().unwrap_or_default()
        }
    }

    fn handle_object(&mut self, command: Vec<u8>) {
        let opcode = command[2];
        self.log.push(opcode);
        match opcode {
            0x0c => {
                let status = self.next_status().to_bytes();
                self.queue_reply(0x8c, &status);
            }
            0x01 => {
                let mut body = vec![0u8; SCAN_FIRST_RECORD];
                body[0] = self.networks.len() as u8;
                for network in &self.networks {
                    let mut slot = network.to_bytes().to_vec();
                    slot.resize(SCAN_RECORD_STRIDE, 0);
                    body.extend_from_slice(&slot);
                }
                self.queue_reply(0x81, &body);
            }
            0x02 => {
                self.config = command[OBJ_HEADER_LEN..].to_vec();
                self.queue_reply(0x82, &[]);
            }
            0x08 => self.queue_reply(0x88, &[0, 0, 0, 0, 0x00, 0x80, 0x92, 0x0a, 0x0b, 0x0c]),
            other => self.queue_reply(0x80 | other, &[]),
        }
    }
}

impl Transport for Printer {
    fn write(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        assert!(packet.len() <= PACKET_SIZE);
        if self.pending.is_empty() {
            assert_eq!(packet[0], 0x1b, "command must start with ESC");
            match packet[1] {
                b'W' => {}
                b'A' => {
                    self.log.push(b'A');
                    self.outbox.push_back(vec![0x40, 12, 0x10, 80, 0x10, 0x0e]);
                    return Ok(());
                }
                b'I' => {
                    self.log.push(b'I');
                    self.wifi_enabled = packet[2] == 1;
                    return Ok(());
                }
                other => panic!("unknown raw command {other:#x}"),
            }
        }

        self.pending.extend_from_slice(packet);
        let declared = u32::from_le_bytes([self.pending[3], self.pending[4], self.pending[5], self.pending[6]]);
        if self.pending.len() >= declared as usize {
            let command = std::mem::take(&mut self.pending);
            self.handle_object(command);
        }
        Ok(())
    }

    fn read(&mut self, _max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.outbox
            .pop_front()
            .ok_or_else(|| TransportError::timeout(timeout))
    }
}

fn status(f: impl FnOnce(&mut NetworkStatus)) -> NetworkStatus {
    let mut s = NetworkStatus {
        wifi_network_status: 3,
        ..Default::default()
    };
    f(&mut s);
    s
}

fn network(name: &str) -> ScannedNetwork {
    let mut essid = [0u8; 32];
    essid[..name.len()].copy_from_slice(name.as_bytes());
    ScannedNetwork {
        bssid: [0xaa, 0xbb, 0xcc, 0x00, 0x11, name.len() as u8],
        channel: 6,
        encryption: [3, 4],
        essid,
    }
}

/// Radio ready at once, scan done on the third query, then the given
/// connection statuses
fn printer(connection: &[u8]) -> Printer {
    let mut statuses = vec![status(|_| {})];
    statuses.extend([0, 0, 2].map(|scan| status(|s| s.wifi_scan_status = scan)));
    statuses.extend(
        connection
            .iter()
            .map(|code| status(|s| s.wifi_connection_status = *code)),
    );
    let mut printer = Printer::with_statuses(statuses);
    printer.networks = vec![network("home"), network("office")];
    printer
}

#[derive(Default)]
struct ScriptedOperator {
    choice: usize,
    password: String,
    offered: Vec<String>,
    progress: Vec<Phase>,
    finished: Vec<Phase>,
}

impl Operator for ScriptedOperator {
    fn choose_network(&mut self, networks: &[ScannedNetwork]) -> Result<usize, Error> {
        self.offered = networks.iter().map(|n| n.name()).collect();
        Ok(self.choice)
    }

    fn password(&mut self, _network: &ScannedNetwork) -> Result<String, Error> {
        Ok(self.password.clone())
    }

    fn progress(&mut self, phase: Phase, _status: &NetworkStatus) {
        self.progress.push(phase);
    }

    fn phase_finished(&mut self, phase: Phase, _status: &NetworkStatus) {
        self.finished.push(phase);
    }
}

fn session(printer: Printer) -> Session<Printer, ManualClock> {
    Session::with_clock(LabelManager::new(printer), SessionConfig::default(), ManualClock::new())
}

fn operator(choice: usize) -> ScriptedOperator {
    ScriptedOperator {
        choice,
        password: "correct horse".into(),
        ..Default::default()
    }
}

#[test]
fn rejected_connection_reports_fatal_status() {
    let mut session = session(printer(&[0, 0, 3]));
    let mut op = operator(1);

    let err = session.run(&mut op).unwrap_err();
    assert!(
        matches!(err, Error::FatalStatus { phase: Phase::Connect, code: 3 }),
        "{err:?}"
    );

    assert_eq!(op.offered, ["home", "office"]);
    assert_eq!(op.finished, [Phase::RadioReady, Phase::ScanComplete]);
    assert_eq!(
        op.progress,
        [Phase::ScanComplete, Phase::ScanComplete, Phase::Connect, Phase::Connect]
    );

    // settle delay, two scan sleeps, two connect sleeps
    assert_eq!(session.clock().sleeps, vec![Duration::from_secs(1); 5]);

    let printer = session.device().transport();
    assert!(printer.wifi_enabled);
    assert_eq!(
        printer.log,
        [b'I', 0x0c, 0x00, 0x0c, 0x0c, 0x0c, 0x01, 0x02, 0x05, 0x0c, 0x0c, 0x0c]
    );
}

#[test]
fn submitted_config_carries_chosen_network() {
    let mut session = session(printer(&[1, 2]));
    let mut op = operator(1);

    let status = session.run(&mut op).unwrap();
    assert_eq!(status.wifi_connection_status, 2);
    assert_eq!(op.finished, [Phase::RadioReady, Phase::ScanComplete, Phase::Connect]);

    let office = network("office");
    let config = &session.device().transport().config;
    assert_eq!(config.len(), 185);
    assert_eq!(config[0], 0);
    assert_eq!(&config[1..3], &office.encryption);
    assert_eq!(&config[3..9], &office.bssid);
    assert_eq!(&config[9..41], &office.essid);
    assert_eq!(&config[57..70], b"correct horse");
    assert!(config[70..].iter().all(|b| *b == 0));
}

#[test]
fn empty_scan_stops_before_config() {
    let mut printer = printer(&[2]);
    printer.networks.clear();
    let mut session = session(printer);

    assert!(matches!(session.run(&mut operator(0)), Err(Error::NoNetworks)));
    assert!(!session.device().transport().log.contains(&0x02));
}

#[test]
fn out_of_range_choice_is_invalid_input() {
    let mut session = session(printer(&[2]));

    assert!(matches!(session.run(&mut operator(2)), Err(Error::InvalidInput(_))));
    assert!(!session.device().transport().log.contains(&0x02));
}

#[test]
fn scan_that_never_finishes_times_out() {
    let stuck = Printer::with_statuses([status(|_| {}), status(|s| s.wifi_scan_status = 1)]);
    let config = SessionConfig {
        scan_timeout: Some(Duration::from_secs(4)),
        ..Default::default()
    };
    let mut session = Session::with_clock(LabelManager::new(stuck), config, ManualClock::new());
    let mut op = operator(0);

    session.bring_up_radio(&mut op).unwrap();
    match session.scan(&mut op) {
        Err(Error::Timeout { phase, waited, ticks }) => {
            assert_eq!(phase, Phase::ScanComplete);
            assert_eq!(waited, Duration::from_secs(4));
            assert_eq!(ticks, 5);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn cancelled_session_sends_nothing() {
    let cancel = CancelToken::new();
    let device = LabelManager::new(printer(&[2])).with_cancel(cancel.clone());
    let mut session = Session::with_clock(device, SessionConfig::default(), ManualClock::new());
    cancel.cancel();

    assert!(matches!(session.run(&mut operator(0)), Err(Error::Cancelled)));
    assert!(session.device().transport().log.is_empty());
}

#[test]
fn device_queries_outside_a_session() {
    let mut device = LabelManager::new(Printer::default());

    let system = device.system_status().unwrap();
    assert!(system.cassette_present);
    assert_eq!(system.raw_battery_voltage, 0x0e10);

    assert_eq!(device.interface_mac().unwrap(), [0x00, 0x80, 0x92, 0x0a, 0x0b, 0x0c]);
    assert_eq!(device.transport().log, [b'A', 0x08]);
}
