//! TCP sample source
//!
//! Connects to a TCP server that streams newline-delimited JSON samples:
//! `{"timestamp": 1700000000.25, "channels": [1.0, 2.0, 3.0, 4.0]}`

use std::io::{BufRead, BufReader, ErrorKind};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use eeg_types::{Sample, SensorError};
use log::{info, warn};

use crate::types::{DriverError, PullOutcome, SampleSource, SourceResolver};

// A zero read timeout is rejected by the OS socket API.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

pub struct TcpSource {
    reader: BufReader<TcpStream>,
    peer: SocketAddr,
    pending: Vec<u8>,
    queued: Option<Sample>,
    channels: usize,
    sample_rate: f64,
}

impl TcpSource {
    /// Connects and reads the first sample to learn the channel count.
    pub fn connect(
        addr: &str,
        sample_rate: f64,
        connect_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let peer = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| DriverError::ConfigurationError(format!("Unresolvable address: {}", addr)))?;

        info!("Connecting to sample stream at {}", peer);
        let stream = TcpStream::connect_timeout(&peer, connect_timeout)?;

        let mut source = Self {
            reader: BufReader::new(stream),
            peer,
            pending: Vec::new(),
            queued: None,
            channels: 0,
            sample_rate,
        };

        match source.read_sample(connect_timeout)? {
            PullOutcome::Sample(first) => {
                if first.channels.is_empty() {
                    return Err(DriverError::ConfigurationError(
                        "Stream delivered a sample with no channels".to_string(),
                    ));
                }
                source.channels = first.channel_count();
                source.queued = Some(first);
                Ok(source)
            }
            PullOutcome::Timeout | PullOutcome::Lost => Err(DriverError::HardwareNotFound(format!(
                "No samples received from {} within {:?}",
                peer, connect_timeout
            ))),
        }
    }

    /// Reads one line, giving up once `timeout` has passed in total.
    fn read_sample(&mut self, timeout: Duration) -> Result<PullOutcome, SensorError> {
        let deadline = Instant::now() + timeout;

        loop {
            // Each read may only wait for what is left of the pull.
            let remaining = deadline.saturating_duration_since(Instant::now());
            self.reader
                .get_ref()
                .set_read_timeout(Some(remaining.max(MIN_READ_TIMEOUT)))
                .map_err(|e| SensorError::HardwareFault(e.to_string()))?;

            let (consumed, line_complete) = {
                let available = match self.reader.fill_buf() {
                    Ok(available) => available,
                    Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                        return Ok(PullOutcome::Timeout);
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("Read error on sample stream at {}: {}", self.peer, e);
                        return Ok(PullOutcome::Lost);
                    }
                };
                if available.is_empty() {
                    info!("Sample stream at {} closed by peer", self.peer);
                    return Ok(PullOutcome::Lost);
                }
                match available.iter().position(|&b| b == b'\n') {
                    Some(end) => {
                        self.pending.extend_from_slice(&available[..=end]);
                        (end + 1, true)
                    }
                    None => {
                        self.pending.extend_from_slice(available);
                        (available.len(), false)
                    }
                }
            };
            self.reader.consume(consumed);

            if line_complete {
                // Partial lines survive a timeout in `pending` and are completed on a later pull.
                let line = std::mem::take(&mut self.pending);
                let text = String::from_utf8_lossy(&line);
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let sample: Sample = serde_json::from_str(text)
                    .map_err(|e| SensorError::MalformedSample(e.to_string()))?;
                return Ok(PullOutcome::Sample(sample));
            }
            if Instant::now() >= deadline {
                return Ok(PullOutcome::Timeout);
            }
        }
    }
}

impl SampleSource for TcpSource {
    fn channel_count(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn pull_sample(&mut self, timeout: Duration) -> Result<PullOutcome, SensorError> {
        if let Some(sample) = self.queued.take() {
            return Ok(PullOutcome::Sample(sample));
        }
        self.read_sample(timeout)
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        self.reader.get_ref().shutdown(std::net::Shutdown::Both)?;
        Ok(())
    }
}

/// Resolves a TCP sample stream at a fixed address.
///
/// The remote end declares no signal type; the requested one is taken on trust.
#[derive(Debug, Clone)]
pub struct TcpResolver {
    pub addr: String,
    pub sample_rate: f64,
    pub connect_timeout: Duration,
}

impl SourceResolver for TcpResolver {
    fn resolve(&self, signal_type: &str) -> Result<Box<dyn SampleSource>, DriverError> {
        info!("Resolving {} stream over TCP at {}", signal_type, self.addr);
        let source = TcpSource::connect(&self.addr, self.sample_rate, self.connect_timeout)?;
        Ok(Box::new(source))
    }
}
