// Copyright (c) 2026 rezky_nightky

use crate::color::{pack, unpack, Color, PackedColor};

/// Logical pixel grid, row-major with the origin at the top-left.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<PackedColor>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![pack(Color::BLACK); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, c: Color) {
        self.pixels.fill(pack(c));
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// Writes one pixel. Coordinates outside the grid are ignored.
    pub fn draw_pixel(&mut self, x: i32, y: i32, c: Color) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = pack(c);
        }
    }

    /// DDA line between two points, inclusive of both ends. Points that
    /// fall outside the grid are clipped by `draw_pixel`.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, c: Color) {
        let dx = x1 as i64 - x0 as i64;
        let dy = y1 as i64 - y0 as i64;
        let steps = dx.abs().max(dy.abs());

        if steps == 0 {
            self.draw_pixel(x0, y0, c);
            return;
        }

        // Both coordinates are monotone in `i`, so the steps that can land
        // on the grid form one contiguous span.
        let Some((x_lo, x_hi)) = visible_steps(x0, dx, steps, self.width) else {
            return;
        };
        let Some((y_lo, y_hi)) = visible_steps(y0, dy, steps, self.height) else {
            return;
        };

        for i in x_lo.max(y_lo)..=x_hi.min(y_hi) {
            let x = interpolate(x0, dx, steps, i);
            let y = interpolate(y0, dy, steps, i);
            self.draw_pixel(x as i32, y as i32, c);
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|i| unpack(self.pixels[i]))
    }

    pub fn row(&self, y: usize) -> &[PackedColor] {
        let start = y * self.width;
        &self.pixels[start..start + self.width]
    }
}

/// `p0 + i * d / steps`, truncated toward zero. Exact: the sum is taken
/// as one fraction over `steps` before dividing.
fn interpolate(p0: i32, d: i64, steps: i64, i: i64) -> i64 {
    let num = p0 as i128 * steps as i128 + i as i128 * d as i128;
    (num / steps as i128) as i64
}

/// Inclusive range of steps whose coordinate falls in `[0, len)`.
fn visible_steps(p0: i32, d: i64, steps: i64, len: usize) -> Option<(i64, i64)> {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let at = |i: i64| interpolate(p0, d, steps, i);

    let (lo, end) = if d >= 0 {
        (
            first_step(steps, |i| at(i) >= 0),
            first_step(steps, |i| at(i) >= len),
        )
    } else {
        (
            first_step(steps, |i| at(i) < len),
            first_step(steps, |i| at(i) < 0),
        )
    };

    (lo < end).then(|| (lo, end - 1))
}

/// Smallest `i` in `0..=steps` where `pred` holds, or `steps + 1`. `pred`
/// must be false-then-true over the range.
fn first_step(steps: i64, pred: impl Fn(i64) -> bool) -> i64 {
    let (mut lo, mut hi) = (0i64, steps + 1);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}
