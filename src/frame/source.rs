// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::fs;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::path::Path;
use std::str::FromStr;
use std::thread::sleep as thread_sleep;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use serde::de::{Deserialize, IntoDeserializer};
use tracing::{debug, info, trace};

use crate::error::TransportError;

use super::{SEGMENTS_PER_FRAME, SEGMENT_LEN};

/// Something that hands out frame segments, one at a time, in order.
pub(crate) trait SegmentSource {
    /// Block until the next segment is available and copy it into `buffer`.
    ///
    /// Returns the number of bytes received. Fewer bytes than the length of `buffer` means the
    /// segment was short.
    fn read_segment(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError>;
}

/// Receive segments as UDP datagrams, one segment per datagram.
#[derive(Debug)]
pub(crate) struct UdpSource {
    socket: UdpSocket,
}

impl UdpSource {
    /// Bind to `address`.
    ///
    /// If `idle_timeout` is given, a receive that waits longer than that is treated as a transport
    /// failure.
    pub(crate) fn bind(
        address: SocketAddr,
        idle_timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(address)
            .with_context(|| format!("Unable to bind UDP socket to {}", address))?;
        socket
            .set_read_timeout(idle_timeout)
            .context("Unable to set UDP receive timeout")?;
        info!(%address, ?idle_timeout, "listening for frame segments");
        Ok(Self { socket })
    }
}

impl SegmentSource for UdpSource {
    fn read_segment(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError> {
        match self.socket.recv_from(buffer) {
            Ok((received, peer)) => {
                trace!(%peer, received, "received segment datagram");
                Ok(received)
            }
            // Read timeouts show up as either of these depending on the platform.
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "no segment received within the idle timeout",
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Controls how a recording is repeated by [`ReplaySource`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RepeatMode {
    /// Play the recording once, then report the source as closed.
    None,

    /// Start over from the beginning once the end has been reached. This is the default mode.
    Loop,
}

impl Default for RepeatMode {
    fn default() -> Self {
        Self::Loop
    }
}

impl FromStr for RepeatMode {
    type Err = serde::de::value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepeatMode::deserialize(s.into_deserializer())
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepeatMode::None => "none",
            RepeatMode::Loop => "loop",
        };
        write!(f, "{}", s)
    }
}

/// Play back a raw capture of segments, paced at a fixed frame rate.
///
/// A capture is just the received segments concatenated together. A trailing partial segment is
/// handed out as a short segment.
pub(crate) struct ReplaySource {
    data: Vec<u8>,
    position: usize,
    repeat: RepeatMode,
    frame_interval: Duration,
    segments_read: usize,
    last_frame: Option<Instant>,
}

impl ReplaySource {
    pub(crate) fn new(data: Vec<u8>, repeat: RepeatMode, frame_interval: Duration) -> Self {
        Self {
            data,
            position: 0,
            repeat,
            frame_interval,
            segments_read: 0,
            last_frame: None,
        }
    }

    pub(crate) fn open<P: AsRef<Path>>(
        path: P,
        repeat: RepeatMode,
        frame_rate: f32,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .with_context(|| format!("Unable to read capture file {}", path.display()))?;
        if data.len() % SEGMENT_LEN != 0 {
            debug!(
                path = %path.display(),
                "capture file does not end on a segment boundary"
            );
        }
        info!(
            path = %path.display(),
            segments = data.len() / SEGMENT_LEN,
            %repeat,
            "replaying captured segments"
        );
        Ok(Self::new(
            data,
            repeat,
            Duration::from_secs_f32(1.0 / frame_rate),
        ))
    }

    /// Wait until the next frame is due, if this read starts a new frame.
    fn pace(&mut self) {
        if self.segments_read % SEGMENTS_PER_FRAME != 0 {
            return;
        }
        if let Some(last_frame) = self.last_frame {
            let elapsed = last_frame.elapsed();
            if elapsed < self.frame_interval {
                thread_sleep(self.frame_interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
    }
}

impl fmt::Debug for ReplaySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplaySource")
            .field("len", &self.data.len())
            .field("position", &self.position)
            .field("repeat", &self.repeat)
            .field("frame_interval", &self.frame_interval)
            .finish()
    }
}

impl SegmentSource for ReplaySource {
    fn read_segment(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError> {
        if self.position >= self.data.len() {
            match self.repeat {
                RepeatMode::Loop if !self.data.is_empty() => {
                    debug!("restarting capture playback");
                    self.position = 0;
                }
                _ => return Err(TransportError::Closed),
            }
        }
        self.pace();
        let end = (self.position + buffer.len()).min(self.data.len());
        let received = end - self.position;
        buffer[..received].copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        self.segments_read += 1;
        Ok(received)
    }
}
