// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::frame::{Cell, FrameSettings, Reassembler, SegmentSource};
use crate::render::{FrameRenderer, RangeTracker, RenderSettings};

use super::RenderedFrame;

/// The state carried from one frame to the next: the receive buffer, the intensity range, and
/// the rendered images.
#[derive(Debug)]
pub(crate) struct FrameDecoder {
    reassembler: Reassembler,
    cells: Vec<Cell>,
    tracker: RangeTracker,
    renderer: FrameRenderer,
    frame_id: Arc<str>,
    sequence: u64,
}

impl FrameDecoder {
    pub(crate) fn new(frame: &FrameSettings, render: &RenderSettings) -> anyhow::Result<Self> {
        frame.validate()?;
        let tracker = RangeTracker::new(render.range_mode(), render.initial_range()?);
        let renderer = FrameRenderer::new(
            frame.image_width,
            frame.image_height,
            render.palette.clone(),
        );
        info!(
            width = frame.image_width,
            height = frame.image_height,
            range_mode = ?tracker.mode(),
            range_min = tracker.state().min(),
            range_max = tracker.state().max(),
            palette = renderer.palette().name(),
            "created frame decoder"
        );
        Ok(Self {
            reassembler: Reassembler::new(frame.image_width, frame.image_height),
            cells: Vec::with_capacity((frame.image_width * frame.image_height) as usize),
            tracker,
            renderer,
            frame_id: Arc::from(frame.frame_id.as_str()),
            sequence: 0,
        })
    }

    /// Receive, range and render the next frame from `source`.
    ///
    /// Nothing is rendered if receiving the frame fails.
    pub(crate) fn decode<S>(&mut self, source: &mut S) -> Result<RenderedFrame, TransportError>
    where
        S: SegmentSource + ?Sized,
    {
        self.reassembler.receive(source)?;
        Ok(self.render())
    }

    fn render(&mut self) -> RenderedFrame {
        // Only cells that end up in the raster count towards the range.
        let mut cells = self.reassembler.cells();
        self.cells.clear();
        self.cells.extend(cells.by_ref());
        let dropped_lines = cells.dropped_lines();
        let range = match self.tracker.update(self.cells.iter().map(|cell| cell.value)) {
            Ok(range) => range,
            Err(err) => {
                warn!(%err, "keeping the previous intensity range");
                self.tracker.state()
            }
        };
        let rendered = self.renderer.render(self.cells.iter().copied(), &range);
        if dropped_lines > 0 {
            debug!(
                sequence = self.sequence,
                dropped_lines, rendered, "frame had dropped lines"
            );
        }
        let frame = RenderedFrame {
            sequence: self.sequence,
            timestamp: SystemTime::now(),
            frame_id: Arc::clone(&self.frame_id),
            temperatures: self.renderer.temperatures().clone(),
            image: self.renderer.image().clone(),
            range,
            dropped_lines,
        };
        self.sequence += 1;
        frame
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::FrameDecoder;
    use crate::error::TransportError;
    use crate::frame::test_util::{FrameBuilder, ScriptedSource};
    use crate::frame::{FrameSettings, RepeatMode, ReplaySource, SEGMENT_LEN};
    use crate::render::{Palette, RangeState, RenderSettings};

    fn replay(frames: &[FrameBuilder]) -> ReplaySource {
        let data = frames
            .iter()
            .flat_map(|builder| builder.segments())
            .flatten()
            .collect();
        ReplaySource::new(data, RepeatMode::None, Duration::ZERO)
    }

    fn decoder(render: RenderSettings) -> FrameDecoder {
        FrameDecoder::new(&FrameSettings::default(), &render).unwrap()
    }

    #[test]
    fn line_with_dropped_sample() {
        // [header, header, 28000, 0, 30000, ...] at the start of the first segment
        let mut builder = FrameBuilder::filled(29000);
        builder
            .set_sample(0, 2, 28000)
            .set_sample(0, 3, 0)
            .set_sample(0, 4, 30000);
        let mut source = replay(&[builder]);
        let mut decoder = decoder(RenderSettings::default());
        let frame = decoder.decode(&mut source).unwrap();
        assert_eq!(frame.temperatures.get_pixel(0, 0)[0], 7.0);
        assert_eq!(
            *frame.image.get_pixel(0, 0),
            Palette::ironblack().color(42)
        );
        assert_eq!(frame.dropped_lines, 1);
        // The rest of the line was never rendered, so it's still at the initial values.
        assert_eq!(frame.temperatures.get_pixel(2, 0)[0], 0.0);
        assert_eq!(
            *frame.image.get_pixel(2, 0),
            Palette::ironblack().color(0)
        );
        // The right half of the row is fine.
        assert_eq!(frame.temperatures.get_pixel(80, 0)[0], 17.0);
    }

    #[test]
    fn all_zero_frame() {
        let mut source = replay(&[FrameBuilder::new()]);
        let mut decoder = decoder(RenderSettings::default());
        let frame = decoder.decode(&mut source).unwrap();
        assert!(frame.temperatures.iter().all(|t| *t == 0.0));
        let index_zero = Palette::ironblack().color(0);
        assert!(frame.image.pixels().all(|p| *p == index_zero));
        assert_eq!(frame.dropped_lines, 240);
        assert_eq!(frame.range, RangeState::new(27300, 31500).unwrap());
    }

    #[test]
    fn auto_max_follows_new_maximum() {
        let first = FrameBuilder::filled(29000);
        let mut second = FrameBuilder::filled(29000);
        second.set_cell(60, 100, 31234);
        let mut source = replay(&[first, second]);
        let settings = RenderSettings {
            auto_range_max: true,
            ..RenderSettings::default()
        };
        let mut decoder = decoder(settings);
        let first = decoder.decode(&mut source).unwrap();
        assert_eq!(first.range, RangeState::new(27300, 29000).unwrap());
        let second = decoder.decode(&mut source).unwrap();
        assert_eq!(second.range, RangeState::new(27300, 31234).unwrap());
        assert_eq!(*second.image.get_pixel(100, 60), Palette::ironblack().color(255));
    }

    #[test]
    fn degenerate_auto_range_keeps_previous() {
        let mut varied = FrameBuilder::filled(29000);
        varied.set_cell(0, 0, 30000);
        let flat = FrameBuilder::filled(29500);
        let mut source = replay(&[varied, flat]);
        let settings = RenderSettings {
            auto_range_min: true,
            auto_range_max: true,
            ..RenderSettings::default()
        };
        let mut decoder = decoder(settings);
        let expected = RangeState::new(29000, 30000).unwrap();
        assert_eq!(decoder.decode(&mut source).unwrap().range, expected);
        let flat = decoder.decode(&mut source).unwrap();
        assert_eq!(flat.range, expected);
        assert_eq!(*flat.image.get_pixel(5, 5), Palette::ironblack().color(127));
    }

    #[test]
    fn sequence_counts_frames() {
        let frames = vec![FrameBuilder::filled(29000); 3];
        let mut source = replay(&frames);
        let mut decoder = decoder(RenderSettings::default());
        for expected in 0..3 {
            let frame = decoder.decode(&mut source).unwrap();
            assert_eq!(frame.sequence, expected);
            assert_eq!(&*frame.frame_id, "thermal_image");
        }
        assert!(matches!(
            decoder.decode(&mut source),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn short_segment_not_rendered() {
        let mut data: Vec<u8> = FrameBuilder::filled(29000)
            .segments()
            .into_iter()
            .flatten()
            .collect();
        data.truncate(SEGMENT_LEN * 4 - 1);
        let mut source = ReplaySource::new(data, RepeatMode::None, Duration::ZERO);
        let mut decoder = decoder(RenderSettings::default());
        assert!(matches!(
            decoder.decode(&mut source),
            Err(TransportError::ShortSegment { segment: 3, .. })
        ));
        assert_eq!(decoder.sequence, 0);
        assert!(decoder.renderer.temperatures().iter().all(|t| *t == 0.0));
    }

    #[test]
    fn auto_range_ignores_cropped_cells() {
        let mut builder = FrameBuilder::filled(29000);
        builder.set_cell(0, 0, 28000).set_cell(100, 150, 35000);
        let mut source = replay(&[builder]);
        let settings = RenderSettings {
            auto_range_min: true,
            auto_range_max: true,
            ..RenderSettings::default()
        };
        let frame_settings = FrameSettings {
            image_width: 80,
            image_height: 60,
            ..FrameSettings::default()
        };
        let mut decoder = FrameDecoder::new(&frame_settings, &settings).unwrap();
        let frame = decoder.decode(&mut source).unwrap();
        assert_eq!(frame.range, RangeState::new(28000, 29000).unwrap());
    }

    #[test]
    fn auto_range_ignores_dropped_samples() {
        // Everything after the zero is never rendered, including the 35000.
        let mut builder = FrameBuilder::filled(29000);
        builder
            .set_cell(0, 0, 28000)
            .set_cell(0, 1, 0)
            .set_cell(0, 2, 35000);
        let mut source = replay(&[builder]);
        let settings = RenderSettings {
            auto_range_max: true,
            ..RenderSettings::default()
        };
        let frame = decoder(settings).decode(&mut source).unwrap();
        assert_eq!(frame.range, RangeState::new(27300, 29000).unwrap());
        assert_eq!(frame.dropped_lines, 1);
    }

    #[test]
    fn recovers_after_short_segment() {
        let mut broken = FrameBuilder::filled(29000).segments();
        broken[1].truncate(SEGMENT_LEN - 1);
        let mut banded = FrameBuilder::new();
        for (band, value) in [28000u16, 29000, 30000, 31000].iter().enumerate() {
            for row in (band * 30)..(band * 30 + 30) {
                for column in 0..160 {
                    banded.set_cell(row, column, *value);
                }
            }
        }
        let segments = broken.into_iter().chain(banded.segments()).map(Ok);
        let mut source = ScriptedSource::new(segments);
        let mut decoder = decoder(RenderSettings::default());
        assert!(matches!(
            decoder.decode(&mut source),
            Err(TransportError::ShortSegment { segment: 1, .. })
        ));
        let frame = decoder.decode(&mut source).unwrap();
        assert_eq!(frame.sequence, 0);
        for (row, celsius) in [(0, 7.0), (30, 17.0), (60, 27.0), (90, 37.0), (119, 37.0)].iter() {
            assert_eq!(frame.temperatures.get_pixel(10, *row)[0], *celsius);
        }
    }

    #[test]
    fn invalid_settings() {
        let render: RenderSettings = toml::from_str("range_min = 31500").unwrap();
        assert!(FrameDecoder::new(&FrameSettings::default(), &render).is_err());
        let frame = FrameSettings {
            image_height: 0,
            ..FrameSettings::default()
        };
        assert!(FrameDecoder::new(&frame, &RenderSettings::default()).is_err());
    }
}
