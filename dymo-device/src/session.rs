//! Wi-Fi setup sequence
//!
//! The device only accepts the steps in this order:
//!
//! 1. `ESC I 1`, then wait until the radio reports ready
//! 2. start a scan (`0x00`), wait for completion, fetch results (`0x01`)
//! 3. submit network + password (`0x02`), activate (`0x05`), wait for the
//!    connection result
//!
//! Picking the network and typing the password is left to an [`Operator`].

use log::info;

use dymo_proto::{NetworkStatus, ScannedNetwork};

use crate::poll::{Clock, Phase, Poller, SystemClock, Verdict, connection_result, radio_ready, scan_complete};
use crate::{Error, LabelManager, SessionConfig, Transport};

/// The human (or script) driving a session
pub trait Operator {
    /// Index into `networks` of the network to join
    fn choose_network(&mut self, networks: &[ScannedNetwork]) -> Result<usize, Error>;

    fn password(&mut self, network: &ScannedNetwork) -> Result<String, Error>;

    fn phase_started(&mut self, _phase: Phase) {}

    /// Called with every status that did not finish the phase
    fn progress(&mut self, _phase: Phase, _status: &NetworkStatus) {}

    fn phase_finished(&mut self, _phase: Phase, _status: &NetworkStatus) {}
}

pub struct Session<T, C = SystemClock> {
    device: LabelManager<T>,
    config: SessionConfig,
    clock: C,
}

impl<T: Transport> Session<T> {
    pub fn new(device: LabelManager<T>, config: SessionConfig) -> Self {
        Self::with_clock(device, config, SystemClock)
    }
}

impl<T: Transport, C: Clock> Session<T, C> {
    pub fn with_clock(device: LabelManager<T>, config: SessionConfig, clock: C) -> Self {
        let device = device.with_timeouts(config.reply_timeout, config.drain_timeout);
        Self { device, config, clock }
    }

    pub fn device(&mut self) -> &mut LabelManager<T> {
        &mut self.device
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn poll<O: Operator>(
        &mut self,
        phase: Phase,
        judge: fn(&NetworkStatus) -> Verdict,
        operator: &mut O,
    ) -> Result<NetworkStatus, Error> {
        let policy = self.config.policy(phase);
        let cancel = self.device.cancel_token().clone();
        let device = &mut self.device;
        let mut poller = Poller::new(policy, &mut self.clock, cancel);

        operator.phase_started(phase);
        let polled = poller.run(
            phase,
            || device.network_status(),
            judge,
            |status, _| operator.progress(phase, status),
        )?;
        operator.phase_finished(phase, &polled.status);
        info!("{phase}: done ({} status queries)", polled.ticks);
        Ok(polled.status)
    }

    /// Switch the radio on and wait until it reports ready
    pub fn bring_up_radio<O: Operator>(&mut self, operator: &mut O) -> Result<NetworkStatus, Error> {
        self.device.set_wifi_enabled(true)?;
        if self.device.cancel_token().is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.clock.sleep(self.config.settle_delay);
        self.poll(Phase::RadioReady, radio_ready, operator)
    }

    /// Run a scan and fetch its results. The radio must be up.
    pub fn scan<O: Operator>(&mut self, operator: &mut O) -> Result<Vec<ScannedNetwork>, Error> {
        self.device.start_scan()?;
        self.poll(Phase::ScanComplete, scan_complete, operator)?;
        let networks = self.device.scanned_networks()?;
        info!("scan found {} network(s)", networks.len());
        Ok(networks)
    }

    /// Submit the network and password, activate, and wait for the result
    pub fn join<O: Operator>(
        &mut self,
        network: &ScannedNetwork,
        password: &str,
        operator: &mut O,
    ) -> Result<NetworkStatus, Error> {
        info!("configuring network {} ({})", network.name(), network.bssid_str());
        self.device.submit_network_config(network, password)?;
        self.device.activate_network()?;
        self.poll(Phase::Connect, connection_result, operator)
    }

    /// Whole sequence, asking `operator` for the network and password
    pub fn run<O: Operator>(&mut self, operator: &mut O) -> Result<NetworkStatus, Error> {
        self.bring_up_radio(operator)?;
        self.configure(operator)
    }

    /// Scan, let `operator` pick, join. The radio must be up.
    pub fn configure<O: Operator>(&mut self, operator: &mut O) -> Result<NetworkStatus, Error> {
        let networks = self.scan(operator)?;
        if networks.is_empty() {
            return Err(Error::NoNetworks);
        }

        let index = operator.choose_network(&networks)?;
        let network = networks.get(index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "network {} does not exist, scan found {}",
                index + 1,
                networks.len()
            ))
        })?;
        let password = operator.password(network)?;

        self.join(network, &password, operator)
    }
}
