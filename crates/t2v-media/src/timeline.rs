//! Visual timeline construction.
//!
//! Turns the narration cues and the generated scene images into an ordered
//! list of `(image, duration)` segments. The segments cover the narration
//! span from the first cue's start to the last cue's end with no gaps:
//!
//! - a cue that gets its own image opens a new segment
//! - any other cue is folded into the segment that is currently open
//! - silence between two cues is absorbed by the segment that precedes it
//!
//! Two modes decide which cues get an image. [`build_timeline`] infers it
//! from timing alone (cues longer than [`SHORT_CUE_THRESHOLD_SECS`] consume
//! the next image in order). [`build_timeline_mapped`] uses the explicit cue
//! index carried by each [`SceneImage`].

use std::collections::HashMap;

use tracing::{debug, warn};

use t2v_models::{covered_span, Cue, ImageRef, SceneImage, TimelineSegment};

use crate::error::{MediaError, MediaResult};

/// Cues at or below this duration do not receive their own image.
pub const SHORT_CUE_THRESHOLD_SECS: f64 = 1.0;

/// Gaps longer than this count as silence between cues (1 ms). Shorter
/// positive gaps are still absorbed so no time is lost.
pub const GAP_EPSILON_SECS: f64 = 0.001;

/// Segment currently accepting time.
#[derive(Debug)]
struct OpenSegment {
    image: ImageRef,
    duration: f64,
}

/// One open segment at most; opening a new one emits the previous.
#[derive(Debug, Default)]
struct SegmentAccumulator {
    open: Option<OpenSegment>,
    emitted: Vec<TimelineSegment>,
}

impl SegmentAccumulator {
    fn open(&mut self, image: ImageRef, duration: f64) {
        self.close();
        self.open = Some(OpenSegment { image, duration });
    }

    /// Returns false when no segment is open.
    fn extend(&mut self, delta: f64) -> bool {
        match self.open.as_mut() {
            Some(segment) => {
                segment.duration += delta;
                true
            }
            None => false,
        }
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn close(&mut self) {
        if let Some(segment) = self.open.take() {
            self.emitted
                .push(TimelineSegment::new(segment.image, segment.duration));
        }
    }

    fn finish(mut self) -> Vec<TimelineSegment> {
        self.close();
        self.emitted
    }
}

/// Configurable timeline builder.
#[derive(Debug, Clone, Copy)]
pub struct TimelineBuilder {
    threshold_secs: f64,
}

impl Default for TimelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self {
            threshold_secs: SHORT_CUE_THRESHOLD_SECS,
        }
    }

    /// Override the short-cue threshold. Negative values are clamped to 0.
    pub fn with_threshold(mut self, secs: f64) -> Self {
        self.threshold_secs = secs.max(0.0);
        self
    }

    pub fn threshold_secs(&self) -> f64 {
        self.threshold_secs
    }

    /// Narration time a timeline built from `cues` must cover.
    pub fn span(cues: &[Cue]) -> f64 {
        covered_span(cues)
    }

    /// Whether a cue is long enough to get its own image.
    pub fn is_long(&self, cue: &Cue) -> bool {
        cue.duration() > self.threshold_secs
    }

    /// Build the timeline, assigning images to long cues in order.
    ///
    /// Fails when the first cue is short (no segment exists to fold it
    /// into), when a long cue finds no unused image left, or when a cue ends
    /// before it starts.
    pub fn build(&self, cues: &[Cue], images: &[ImageRef]) -> MediaResult<Vec<TimelineSegment>> {
        let mut cursor = 0usize;

        let segments = self.walk(cues, |cue| {
            if !self.is_long(cue) {
                return Ok(None);
            }
            let image = images.get(cursor).cloned().ok_or_else(|| {
                MediaError::invalid_timeline(format!(
                    "cue {} needs an image but only {} were generated",
                    cue.index,
                    images.len()
                ))
            })?;
            cursor += 1;
            Ok(Some(image))
        })?;

        if cursor < images.len() {
            warn!(
                used = cursor,
                available = images.len(),
                "Timeline left generated images unused"
            );
        }

        Ok(segments)
    }

    /// Build the timeline from an explicit cue-to-image mapping.
    ///
    /// A cue with an image opens a segment whatever its length; every other
    /// cue folds into the open one. Fails when the first cue has no image,
    /// or when the mapping is missing a cue index, names an unknown cue, or
    /// names a cue twice.
    pub fn build_mapped(
        &self,
        cues: &[Cue],
        scenes: &[SceneImage],
    ) -> MediaResult<Vec<TimelineSegment>> {
        let mut by_cue: HashMap<u32, ImageRef> = HashMap::with_capacity(scenes.len());
        for scene in scenes {
            let index = scene.cue_index.ok_or_else(|| {
                MediaError::invalid_timeline(format!("image {} has no cue index", scene.image))
            })?;
            if !cues.iter().any(|c| c.index == index) {
                return Err(MediaError::invalid_timeline(format!(
                    "image {} refers to unknown cue {}",
                    scene.image, index
                )));
            }
            if by_cue.insert(index, scene.image.clone()).is_some() {
                return Err(MediaError::invalid_timeline(format!(
                    "cue {} has more than one image",
                    index
                )));
            }
        }

        self.walk(cues, |cue| {
            let image = by_cue.remove(&cue.index);
            if image.is_some() && cue.duration() <= GAP_EPSILON_SECS {
                warn!(cue = cue.index, "Dropping image for zero-length cue");
                return Ok(None);
            }
            Ok(image)
        })
    }

    /// Shared forward pass. `image_for` decides whether a cue opens a new
    /// segment (and with which image) or folds into the open one.
    fn walk<F>(&self, cues: &[Cue], mut image_for: F) -> MediaResult<Vec<TimelineSegment>>
    where
        F: FnMut(&Cue) -> MediaResult<Option<ImageRef>>,
    {
        let mut acc = SegmentAccumulator::default();

        for (i, cue) in cues.iter().enumerate() {
            let duration = cue.duration();
            if duration < 0.0 {
                return Err(MediaError::invalid_timeline(format!(
                    "cue {} ends before it starts",
                    cue.index
                )));
            }

            if i > 0 && acc.is_open() {
                let gap = cue.start - cues[i - 1].end;
                if gap > 0.0 {
                    acc.extend(gap);
                }
                if gap > GAP_EPSILON_SECS {
                    debug!(cue = cue.index, gap_secs = gap, "Silence absorbed into open segment");
                }
            }

            match image_for(cue)? {
                Some(image) => acc.open(image, duration),
                None => {
                    if !acc.extend(duration) {
                        return Err(MediaError::invalid_timeline(format!(
                            "cue {} has no image and no earlier segment to extend",
                            cue.index
                        )));
                    }
                }
            }
        }

        let segments = acc.finish();
        debug!(cues = cues.len(), segments = segments.len(), "Built timeline");
        Ok(segments)
    }
}

/// Build the timeline with the default threshold, assigning images to long
/// cues in order.
pub fn build_timeline(cues: &[Cue], images: &[ImageRef]) -> MediaResult<Vec<TimelineSegment>> {
    TimelineBuilder::new().build(cues, images)
}

/// Build the timeline from an explicit cue-to-image mapping.
pub fn build_timeline_mapped(
    cues: &[Cue],
    scenes: &[SceneImage],
) -> MediaResult<Vec<TimelineSegment>> {
    TimelineBuilder::new().build_mapped(cues, scenes)
}
