use super::paint::Canvas;

const GLYPH_COLUMNS: i32 = 3;
const GLYPH_ROWS: usize = 5;
const LABEL_SCALE: i32 = 2;
const GLYPH_ADVANCE: i32 = (GLYPH_COLUMNS + 1) * LABEL_SCALE;
pub const LABEL_HEIGHT: i32 = GLYPH_ROWS as i32 * LABEL_SCALE;
const OUTLINE_PX: i32 = 1;

/// Printable ASCII, `' '` through `'~'`, three bits per row.
const GLYPHS: [[u8; GLYPH_ROWS]; 95] = [
    [0b000, 0b000, 0b000, 0b000, 0b000],
    [0b010, 0b010, 0b010, 0b000, 0b010],
    [0b101, 0b101, 0b000, 0b000, 0b000],
    [0b101, 0b111, 0b101, 0b111, 0b101],
    [0b111, 0b110, 0b111, 0b011, 0b111],
    [0b101, 0b001, 0b010, 0b100, 0b101],
    [0b010, 0b101, 0b010, 0b101, 0b011],
    [0b010, 0b010, 0b000, 0b000, 0b000],
    [0b001, 0b010, 0b010, 0b010, 0b001],
    [0b100, 0b010, 0b010, 0b010, 0b100],
    [0b000, 0b101, 0b010, 0b101, 0b000],
    [0b000, 0b010, 0b111, 0b010, 0b000],
    [0b000, 0b000, 0b000, 0b010, 0b100],
    [0b000, 0b000, 0b111, 0b000, 0b000],
    [0b000, 0b000, 0b000, 0b000, 0b010],
    [0b001, 0b001, 0b010, 0b100, 0b100],
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
    [0b000, 0b010, 0b000, 0b010, 0b000],
    [0b000, 0b010, 0b000, 0b010, 0b100],
    [0b001, 0b010, 0b100, 0b010, 0b001],
    [0b000, 0b111, 0b000, 0b111, 0b000],
    [0b100, 0b010, 0b001, 0b010, 0b100],
    [0b111, 0b001, 0b011, 0b000, 0b010],
    [0b111, 0b101, 0b111, 0b100, 0b111],
    [0b010, 0b101, 0b111, 0b101, 0b101],
    [0b110, 0b101, 0b110, 0b101, 0b110],
    [0b111, 0b100, 0b100, 0b100, 0b111],
    [0b110, 0b101, 0b101, 0b101, 0b110],
    [0b111, 0b100, 0b110, 0b100, 0b111],
    [0b111, 0b100, 0b110, 0b100, 0b100],
    [0b111, 0b100, 0b101, 0b101, 0b111],
    [0b101, 0b101, 0b111, 0b101, 0b101],
    [0b111, 0b010, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b001, 0b101, 0b111],
    [0b101, 0b101, 0b110, 0b101, 0b101],
    [0b100, 0b100, 0b100, 0b100, 0b111],
    [0b101, 0b111, 0b111, 0b101, 0b101],
    [0b101, 0b111, 0b111, 0b111, 0b101],
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b110, 0b101, 0b110, 0b100, 0b100],
    [0b111, 0b101, 0b101, 0b111, 0b001],
    [0b110, 0b101, 0b110, 0b101, 0b101],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b010, 0b010, 0b010, 0b010],
    [0b101, 0b101, 0b101, 0b101, 0b111],
    [0b101, 0b101, 0b101, 0b101, 0b010],
    [0b101, 0b101, 0b111, 0b111, 0b101],
    [0b101, 0b101, 0b010, 0b101, 0b101],
    [0b101, 0b101, 0b010, 0b010, 0b010],
    [0b111, 0b001, 0b010, 0b100, 0b111],
    [0b110, 0b100, 0b100, 0b100, 0b110],
    [0b100, 0b100, 0b010, 0b001, 0b001],
    [0b011, 0b001, 0b001, 0b001, 0b011],
    [0b010, 0b101, 0b000, 0b000, 0b000],
    [0b000, 0b000, 0b000, 0b000, 0b111],
    [0b100, 0b010, 0b000, 0b000, 0b000],
    [0b000, 0b111, 0b001, 0b111, 0b111],
    [0b100, 0b100, 0b110, 0b101, 0b110],
    [0b000, 0b111, 0b100, 0b100, 0b111],
    [0b001, 0b001, 0b111, 0b101, 0b111],
    [0b000, 0b111, 0b110, 0b100, 0b111],
    [0b011, 0b100, 0b110, 0b100, 0b100],
    [0b000, 0b111, 0b101, 0b111, 0b001],
    [0b100, 0b100, 0b110, 0b101, 0b101],
    [0b010, 0b000, 0b010, 0b010, 0b010],
    [0b001, 0b000, 0b001, 0b101, 0b010],
    [0b100, 0b101, 0b110, 0b101, 0b101],
    [0b100, 0b100, 0b100, 0b100, 0b111],
    [0b000, 0b110, 0b111, 0b101, 0b101],
    [0b000, 0b110, 0b101, 0b101, 0b101],
    [0b000, 0b111, 0b101, 0b101, 0b111],
    [0b000, 0b110, 0b101, 0b110, 0b100],
    [0b000, 0b111, 0b101, 0b111, 0b001],
    [0b000, 0b110, 0b101, 0b100, 0b100],
    [0b000, 0b111, 0b110, 0b001, 0b111],
    [0b010, 0b111, 0b010, 0b010, 0b011],
    [0b000, 0b101, 0b101, 0b101, 0b111],
    [0b000, 0b101, 0b101, 0b101, 0b010],
    [0b000, 0b101, 0b101, 0b111, 0b010],
    [0b000, 0b101, 0b010, 0b010, 0b101],
    [0b000, 0b101, 0b101, 0b111, 0b001],
    [0b000, 0b111, 0b001, 0b010, 0b111],
    [0b011, 0b010, 0b110, 0b010, 0b011],
    [0b010, 0b010, 0b010, 0b010, 0b010],
    [0b110, 0b010, 0b011, 0b010, 0b110],
    [0b000, 0b011, 0b110, 0b000, 0b000],
];

fn glyph(ch: char) -> [u8; GLYPH_ROWS] {
    let code = ch as u32;
    if (0x20..=0x7e).contains(&code) {
        GLYPHS[(code - 0x20) as usize]
    } else {
        GLYPHS[('?' as u32 - 0x20) as usize]
    }
}

pub fn label_width(text: &str) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        return 0;
    }
    count * GLYPH_ADVANCE - LABEL_SCALE
}

/// Reusable coverage masks so labels allocate only when they grow.
#[derive(Debug, Default)]
pub struct LabelPainter {
    fill: Vec<bool>,
}

impl LabelPainter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws `text` horizontally centred on `center_x` with its bottom edge on
    /// `baseline_y`, filled with `fill` over an `outline` halo.
    pub fn draw_outlined(
        &mut self,
        canvas: &mut Canvas<'_>,
        text: &str,
        center_x: i32,
        baseline_y: i32,
        fill: [u8; 4],
        outline: [u8; 4],
    ) {
        let text_w = label_width(text);
        if text_w == 0 {
            return;
        }
        let left = center_x.saturating_sub(text_w / 2);
        let top = baseline_y.saturating_sub(LABEL_HEIGHT);

        let mask_w = text_w + 2 * OUTLINE_PX;
        let mask_h = LABEL_HEIGHT + 2 * OUTLINE_PX;
        let off_canvas = left.saturating_add(mask_w) < 0
            || top.saturating_add(mask_h) < 0
            || left.saturating_sub(OUTLINE_PX) >= canvas.width() as i32
            || top.saturating_sub(OUTLINE_PX) >= canvas.height() as i32;
        if off_canvas {
            return;
        }
        self.fill.clear();
        self.fill.resize((mask_w * mask_h) as usize, false);
        for (index, ch) in text.chars().enumerate() {
            let origin_x = OUTLINE_PX + index as i32 * GLYPH_ADVANCE;
            for (row, bits) in glyph(ch).iter().enumerate() {
                for col in 0..GLYPH_COLUMNS {
                    if bits & (1 << (GLYPH_COLUMNS - 1 - col)) == 0 {
                        continue;
                    }
                    for sy in 0..LABEL_SCALE {
                        for sx in 0..LABEL_SCALE {
                            let x = origin_x + col * LABEL_SCALE + sx;
                            let y = OUTLINE_PX + row as i32 * LABEL_SCALE + sy;
                            self.fill[(y * mask_w + x) as usize] = true;
                        }
                    }
                }
            }
        }

        let covered = |x: i32, y: i32| {
            x >= 0 && y >= 0 && x < mask_w && y < mask_h && self.fill[(y * mask_w + x) as usize]
        };
        for y in 0..mask_h {
            for x in 0..mask_w {
                let screen_x = left - OUTLINE_PX + x;
                let screen_y = top - OUTLINE_PX + y;
                if covered(x, y) {
                    canvas.blend_pixel(screen_x, screen_y, fill);
                    continue;
                }
                let near_fill = (-OUTLINE_PX..=OUTLINE_PX).any(|oy| {
                    (-OUTLINE_PX..=OUTLINE_PX).any(|ox| covered(x + ox, y + oy))
                });
                if near_fill {
                    canvas.blend_pixel(screen_x, screen_y, outline);
                }
            }
        }
    }
}
