use crate::assets::SpriteImage;

/// Destination rectangle in framebuffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRect {
    pub fn right(self) -> i32 {
        self.left.saturating_add(self.width as i32)
    }

    pub fn bottom(self) -> i32 {
        self.top.saturating_add(self.height as i32)
    }
}

/// RGBA8 framebuffer view. Every write is clipped to the buffer.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.byte_offset(x, y)?;
        let mut out = [0; 4];
        out.copy_from_slice(&self.frame[offset..offset + 4]);
        Some(out)
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    /// Copies `image[src_x.., src_y..]` to the canvas origin, unscaled. The copied
    /// region is the intersection of the canvas with what remains of the image.
    pub fn blit_region(&mut self, image: &SpriteImage, src_x: u32, src_y: u32) -> (u32, u32) {
        let copy_w = self.width.min(image.width.saturating_sub(src_x));
        let copy_h = self.height.min(image.height.saturating_sub(src_y));
        if copy_w == 0 || copy_h == 0 {
            return (0, 0);
        }
        let row_bytes = copy_w as usize * 4;
        for row in 0..copy_h {
            let src_start = ((src_y + row) as usize * image.width as usize + src_x as usize) * 4;
            let Some(dst_start) = self.byte_offset(0, row as i32) else {
                break;
            };
            let (Some(src), Some(dst)) = (
                image.rgba.get(src_start..src_start + row_bytes),
                self.frame.get_mut(dst_start..dst_start + row_bytes),
            ) else {
                break;
            };
            dst.copy_from_slice(src);
        }
        (copy_w, copy_h)
    }

    /// Nearest-neighbour scale of `sprite` into `rect`, source-over blended.
    /// A mirrored draw reflects the sprite inside the same rectangle.
    pub fn draw_sprite_scaled(&mut self, sprite: &SpriteImage, rect: ScreenRect, mirrored: bool) {
        if sprite.width == 0 || sprite.height == 0 || rect.width == 0 || rect.height == 0 {
            return;
        }
        if sprite.rgba.len() < sprite.width as usize * sprite.height as usize * 4 {
            return;
        }
        let draw_left = rect.left.max(0);
        let draw_top = rect.top.max(0);
        let draw_right = rect.right().min(self.width as i32);
        let draw_bottom = rect.bottom().min(self.height as i32);
        if draw_left >= draw_right || draw_top >= draw_bottom {
            return;
        }

        let x_ratio = sprite.width as f64 / rect.width as f64;
        let y_ratio = sprite.height as f64 / rect.height as f64;
        for out_y in draw_top..draw_bottom {
            let dy = (out_y - rect.top) as f64;
            let src_y = ((dy * y_ratio) as u32).min(sprite.height - 1);
            for out_x in draw_left..draw_right {
                let mut dx = (out_x - rect.left) as u32;
                if mirrored {
                    dx = rect.width - 1 - dx;
                }
                let src_x = ((dx as f64 * x_ratio) as u32).min(sprite.width - 1);
                let Some(color) = sprite.pixel(src_x, src_y) else {
                    continue;
                };
                self.blend_pixel(out_x, out_y, color);
            }
        }
    }

    /// Fills pixels whose centres fall inside the ellipse.
    pub fn fill_ellipse_blended(&mut self, cx: i32, cy: i32, rx: u32, ry: u32, color: [u8; 4]) {
        if rx == 0 || ry == 0 {
            return;
        }
        let (rx_f, ry_f) = (rx as f64, ry as f64);
        let rx_i = i32::try_from(rx).unwrap_or(i32::MAX);
        let ry_i = i32::try_from(ry).unwrap_or(i32::MAX);
        let top = cy.saturating_sub(ry_i).max(0);
        let bottom = cy.saturating_add(ry_i).min(self.height as i32);
        let left = cx.saturating_sub(rx_i).max(0);
        let right = cx.saturating_add(rx_i).min(self.width as i32);
        for y in top..bottom {
            let ny = (y as f64 + 0.5 - cy as f64) / ry_f;
            for x in left..right {
                let nx = (x as f64 + 0.5 - cx as f64) / rx_f;
                if nx * nx + ny * ny <= 1.0 {
                    self.blend_pixel(x, y, color);
                }
            }
        }
    }

    pub fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        let alpha = color[3];
        if alpha == 0 {
            return;
        }
        let Some(offset) = self.byte_offset(x, y) else {
            return;
        };
        let dst = &mut self.frame[offset..offset + 4];
        if alpha == u8::MAX {
            dst.copy_from_slice(&color);
            return;
        }
        let a = alpha as u32;
        for channel in 0..3 {
            let blended = (color[channel] as u32 * a + dst[channel] as u32 * (255 - a) + 127) / 255;
            dst[channel] = blended as u8;
        }
        dst[3] = u8::MAX;
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let pixel = (y as usize).checked_mul(self.width as usize)?.checked_add(x as usize)?;
        let offset = pixel.checked_mul(4)?;
        (offset.checked_add(4)? <= self.frame.len()).then_some(offset)
    }
}
