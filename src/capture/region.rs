//! Capture rectangles and the fixed bid/ask pair.

use serde::{Deserialize, Serialize};

use crate::error::InvalidRegion;

/// Screen rectangle in absolute pixel coordinates, `(x1, y1)` top-left
/// inclusive and `(x2, y2)` bottom-right exclusive.
///
/// Serialized as `[x1, y1, x2, y2]`, the same shape the region selector
/// stores in config.json.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        span(self.x1, self.x2)
    }

    pub fn height(&self) -> u32 {
        span(self.y1, self.y2)
    }

    /// Returns an error if the rectangle covers no pixels.
    pub fn validate(&self) -> Result<(), InvalidRegion> {
        if self.width() == 0 || self.height() == 0 {
            return Err(InvalidRegion::ZeroArea {
                x1: self.x1,
                y1: self.y1,
                x2: self.x2,
                y2: self.y2,
            });
        }
        Ok(())
    }

    /// Returns an error unless the rectangle has area and fits inside a
    /// `width` x `height` surface whose origin is `(0, 0)`.
    pub fn validate_within(&self, width: u32, height: u32) -> Result<(), InvalidRegion> {
        self.validate()?;
        let fits = self.x1 >= 0
            && self.y1 >= 0
            && self.x2 as i64 <= width as i64
            && self.y2 as i64 <= height as i64;
        if !fits {
            return Err(InvalidRegion::OutOfBounds {
                x1: self.x1,
                y1: self.y1,
                x2: self.x2,
                y2: self.y2,
                width,
                height,
            });
        }
        Ok(())
    }
}

impl From<[i32; 4]> for Rect {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<Rect> for [i32; 4] {
    fn from(r: Rect) -> Self {
        [r.x1, r.y1, r.x2, r.y2]
    }
}

/// `end - start` clamped to `0..=u32::MAX`, computed without `i32` overflow.
fn span(start: i32, end: i32) -> u32 {
    (end as i64 - start as i64).clamp(0, u32::MAX as i64) as u32
}

/// Which ladder column a region covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Bid, Side::Ask];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per ladder column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sides<T> {
    pub bid: T,
    pub ask: T,
}

impl<T> Sides<T> {
    pub fn new(bid: T, ask: T) -> Self {
        Self { bid, ask }
    }

    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Bid => &self.bid,
            Side::Ask => &self.ask,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Bid => &mut self.bid,
            Side::Ask => &mut self.ask,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Side, T) -> U) -> Sides<U> {
        Sides {
            bid: f(Side::Bid, self.bid),
            ask: f(Side::Ask, self.ask),
        }
    }
}

/// A named capture rectangle. Replaced wholesale when the user reselects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureRegion {
    pub side: Side,
    pub rect: Rect,
}

impl CaptureRegion {
    /// Names both rectangles of a bid/ask pair.
    pub fn pair(rects: Sides<Rect>) -> Sides<CaptureRegion> {
        rects.map(|side, rect| CaptureRegion { side, rect })
    }
}
