use chrono::{DateTime, Duration, Utc};

/// The visible time range of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineWindow {
    /// The leftmost visible instant.
    pub start: DateTime<Utc>,
    /// The rightmost visible instant.
    pub end: DateTime<Utc>,
}

impl TimelineWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// `[start - margin, finish + margin]`.
    pub fn around(start: DateTime<Utc>, finish: DateTime<Utc>, margin: Duration) -> Self {
        Self::new(start - margin, finish + margin)
    }

    /// Like [`around`](Self::around), but `None` when a bound would leave the
    /// representable range.
    pub fn try_around(
        start: DateTime<Utc>,
        finish: DateTime<Utc>,
        margin: Duration,
    ) -> Option<Self> {
        Some(Self::new(
            start.checked_sub_signed(margin)?,
            finish.checked_add_signed(margin)?,
        ))
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    pub fn center(&self) -> DateTime<Utc> {
        self.start + self.length() / 2
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Narrow the window around its center by `ratio` of its length.
    pub fn zoom_in(&self, ratio: f64) -> Self {
        let delta = scaled(self.length(), ratio.clamp(0.0, 0.9) / 2.0);
        Self::new(self.start + delta, self.end - delta)
    }

    /// Widen the window around its center by `ratio` of its length.
    pub fn zoom_out(&self, ratio: f64) -> Self {
        let delta = scaled(self.length(), ratio.max(0.0) / 2.0);
        Self::new(self.start - delta, self.end + delta)
    }

    /// Shift the window by `ratio` of its length; positive moves back in time.
    pub fn shift(&self, ratio: f64) -> Self {
        let delta = scaled(self.length(), ratio);
        Self::new(self.start - delta, self.end - delta)
    }

    /// Convert an instant to an x offset, given the pixel width of the window.
    pub fn time_to_x(&self, at: DateTime<Utc>, width: f32) -> f32 {
        let total = self.length().num_milliseconds().max(1) as f64;
        let offset = (at - self.start).num_milliseconds() as f64;
        (offset / total * width as f64) as f32
    }

    /// Convert an x offset back to an instant.
    pub fn x_to_time(&self, x: f32, width: f32) -> DateTime<Utc> {
        let total = self.length().num_milliseconds() as f64;
        let offset = (x as f64 / width.max(1.0) as f64 * total).round() as i64;
        self.start + Duration::milliseconds(offset)
    }
}

fn scaled(length: Duration, ratio: f64) -> Duration {
    Duration::milliseconds((length.num_milliseconds() as f64 * ratio).round() as i64)
}
