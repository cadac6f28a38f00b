//! Terminal side of a session: network list, prompts, progress dots

use std::io::{self, BufRead, Stdin, StdinLock, Write};
use std::path::Path;

use dymo_device::{Error, NetworkStatus, Operator, Phase, ScannedNetwork, hex_separated};

/// Network picked on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkChoice {
    /// 1-based, as printed in the list
    Number(usize),
    Essid(String),
}

impl NetworkChoice {
    pub fn parse(arg: &str) -> Self {
        match arg.parse::<usize>() {
            Ok(number) => NetworkChoice::Number(number),
            Err(_) => NetworkChoice::Essid(arg.to_string()),
        }
    }

    fn resolve(&self, networks: &[ScannedNetwork]) -> Result<usize, Error> {
        match self {
            NetworkChoice::Number(n) if (1..=networks.len()).contains(n) => Ok(n - 1),
            NetworkChoice::Number(n) => Err(Error::InvalidInput(format!(
                "network {n} is not in the list (1-{})",
                networks.len()
            ))),
            NetworkChoice::Essid(essid) => networks
                .iter()
                .position(|network| network.name() == *essid)
                .ok_or_else(|| Error::InvalidInput(format!("network \"{essid}\" was not found by the scan"))),
        }
    }
}

/// Credentials file: ESSID on line 1, password on line 2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub essid: String,
    pub password: String,
}

impl Credentials {
    pub fn parse(content: &str) -> Result<Self, Error> {
        let mut lines = content.lines();
        let essid = lines
            .next()
            .map(str::trim)
            .filter(|essid| !essid.is_empty())
            .ok_or_else(|| Error::InvalidInput("missing ESSID in credentials file".into()))?;
        // Spaces are legal in a password, only the line ending goes
        let password = lines
            .next()
            .ok_or_else(|| Error::InvalidInput("missing password in credentials file".into()))?;
        Ok(Self {
            essid: essid.to_string(),
            password: password.to_string(),
        })
    }

    pub fn read(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read credentials file {}: {e}", path.display()))?;
        Ok(Self::parse(&content)?)
    }
}

/// `00-80-92-0a-0b-0c`
pub fn mac_address(mac: &[u8; 6]) -> String {
    hex_separated(mac, "-")
}

/// Numbered list, 1-based like the prompt expects
pub fn write_networks<W: Write>(out: &mut W, networks: &[ScannedNetwork]) -> io::Result<()> {
    writeln!(out, "Networks found:")?;
    for (index, network) in networks.iter().enumerate() {
        writeln!(out, "{:2}) {network}", index + 1)?;
    }
    Ok(())
}

fn heading(phase: Phase) -> String {
    let text = phase.to_string();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}

fn io_error(e: io::Error) -> Error {
    Error::InvalidInput(format!("terminal I/O failed: {e}"))
}

/// [`Operator`] reading answers from `input` and writing to `output`.
///
/// Answers given up front (network choice, password) are used instead of
/// prompting.
pub struct Console<R, W> {
    input: R,
    output: W,
    choice: Option<NetworkChoice>,
    password: Option<String>,
}

impl<W: Write> Console<StdinLock<'static>, W> {
    pub fn stdin(output: W) -> Self {
        let stdin: Stdin = io::stdin();
        Console::new(stdin.lock(), output)
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            choice: None,
            password: None,
        }
    }

    pub fn with_choice(mut self, choice: Option<NetworkChoice>) -> Self {
        self.choice = choice;
        self
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print `prompt`, read one line. End of input cancels.
    fn ask(&mut self, prompt: &str) -> Result<String, Error> {
        write!(self.output, "{prompt}").map_err(io_error)?;
        self.output.flush().map_err(io_error)?;
        let mut line = String::new();
        if self.input.read_line(&mut line).map_err(io_error)? == 0 {
            return Err(Error::Cancelled);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    // Progress output is best effort; a closed terminal must not abort the
    // device session halfway through.
    fn show(&mut self, text: &str) {
        let _ = write!(self.output, "{text}");
        let _ = self.output.flush();
    }
}

impl<R: BufRead, W: Write> Operator for Console<R, W> {
    fn choose_network(&mut self, networks: &[ScannedNetwork]) -> Result<usize, Error> {
        write_networks(&mut self.output, networks).map_err(io_error)?;

        if let Some(choice) = &self.choice {
            let index = choice.resolve(networks)?;
            writeln!(self.output, "\nUsing network {}", index + 1).map_err(io_error)?;
            return Ok(index);
        }

        writeln!(self.output, "\nEnter target network number:").map_err(io_error)?;
        loop {
            let answer = self.ask("--> ")?;
            match answer.trim().parse::<usize>() {
                Ok(number) if (1..=networks.len()).contains(&number) => return Ok(number - 1),
                _ => continue,
            }
        }
    }

    fn password(&mut self, _network: &ScannedNetwork) -> Result<String, Error> {
        match self.password.take() {
            Some(password) => Ok(password),
            None => self.ask("Password: "),
        }
    }

    fn phase_started(&mut self, phase: Phase) {
        self.show(&format!("{}: ", heading(phase)));
    }

    fn progress(&mut self, phase: Phase, status: &NetworkStatus) {
        if phase == Phase::RadioReady {
            self.show(&status.wifi_network_status.to_string());
        }
        self.show(".");
    }

    fn phase_finished(&mut self, _phase: Phase, _status: &NetworkStatus) {
        self.show(" done.\n\n");
    }
}
