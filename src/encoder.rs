// Copyright (c) 2026 rezky_nightky

use std::fmt::Write;

use crate::canvas::Canvas;
use crate::color::{unpack, PackedColor};

/// Lower half block: foreground paints the bottom pixel, background the top.
pub const HALF_BLOCK: char = '\u{2584}';

const CLEAR_SCREEN: &str = "\x1b[2J";
const CURSOR_HOME: &str = "\x1b[H";
const RESET: &str = "\x1b[0m";
const LINE_BREAK: &str = "\r\n";

/// Builds a whole frame of true-color escape output in one reusable buffer.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    buf: String,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes `canvas` for a terminal of `cols` x `rows` cells. Each cell
    /// carries two vertically adjacent pixels; anything that does not fit is
    /// clipped. With `clear` the frame starts by erasing the screen.
    pub fn encode(&mut self, canvas: &Canvas, cols: u16, rows: u16, clear: bool) -> &str {
        let cell_rows = (canvas.height() / 2).min(rows as usize);
        let cell_cols = canvas.width().min(cols as usize);

        self.buf.clear();
        // Roughly two 19-byte escapes plus the 3-byte glyph per cell.
        self.buf.reserve(cell_rows * (cell_cols * 41 + 8) + 16);
        if clear {
            self.buf.push_str(CLEAR_SCREEN);
        }
        self.buf.push_str(CURSOR_HOME);

        for row in 0..cell_rows {
            let upper = &canvas.row(row * 2)[..cell_cols];
            let lower = &canvas.row(row * 2 + 1)[..cell_cols];

            let mut cur_bg: Option<PackedColor> = None;
            let mut cur_fg: Option<PackedColor> = None;

            for (&top, &bottom) in upper.iter().zip(lower) {
                if cur_bg != Some(top) {
                    push_sgr_rgb(&mut self.buf, 48, top);
                    cur_bg = Some(top);
                }
                if cur_fg != Some(bottom) {
                    push_sgr_rgb(&mut self.buf, 38, bottom);
                    cur_fg = Some(bottom);
                }
                self.buf.push(HALF_BLOCK);
            }

            self.buf.push_str(RESET);
            // A break after the terminal's last line would scroll the frame.
            let on_last_line = row + 1 == rows as usize;
            if !on_last_line {
                self.buf.push_str(LINE_BREAK);
            }
        }

        &self.buf
    }
}

fn push_sgr_rgb(buf: &mut String, layer: u8, packed: PackedColor) {
    let c = unpack(packed);
    // Writing into a String cannot fail.
    let _ = write!(buf, "\x1b[{};2;{};{};{}m", layer, c.r, c.g, c.b);
}
