// SPDX-License-Identifier: GPL-3.0-or-later
use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Failures receiving the segments of a frame.
pub(crate) enum TransportError {
    /// A segment came back with fewer bytes than a full segment.
    ///
    /// Only the current frame is lost, the source itself is still usable.
    ShortSegment { segment: usize, received: usize },

    /// The underlying transport failed.
    Io(io::Error),

    /// The source has no more segments to give.
    Closed,
}

impl TransportError {
    /// Whether the receive loop has to stop after this error.
    pub(crate) fn is_fatal(&self) -> bool {
        !matches!(self, Self::ShortSegment { .. })
    }
}

impl fmt::Debug for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ShortSegment { segment, received } => f
                .debug_struct("ShortSegment")
                .field("segment", segment)
                .field("received", received)
                .finish(),
            Self::Io(e) => f.debug_tuple("Io").field(e).finish(),
            Self::Closed => f.debug_tuple("Closed").finish(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ShortSegment { segment, received } => write!(
                f,
                "segment {} was short, only {} of {} bytes received",
                segment,
                received,
                crate::frame::SEGMENT_LEN
            ),
            Self::Io(e) => write!(f, "{}", e),
            Self::Closed => write!(f, "segment source closed"),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// The bounds computed for a frame leave no room to scale intensities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DegenerateRange {
    pub(crate) min: u16,
    pub(crate) max: u16,
}

impl fmt::Display for DegenerateRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "degenerate intensity range (min {} is not below max {})",
            self.min, self.max
        )
    }
}

impl StdError for DegenerateRange {}
