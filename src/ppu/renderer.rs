use arrayvec::ArrayVec;

use crate::ppu::{LcdControl, OAM_SIZE, Ppu, VRAM_SIZE, WIDTH};

const TILE_LENGTH: usize = 16;
const TILE_MAP_LOW: usize = 0x1800; // vram-relative 0x9800
const TILE_MAP_HIGH: usize = 0x1c00; // vram-relative 0x9c00

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u8 {
        const PRIORITY = 1 << 7;
        const Y_FLIP = 1 << 6;
        const X_FLIP = 1 << 5;
        const DMG_PALETTE = 1 << 4;
    }
}

#[derive(Clone, Copy)]
pub struct ObjectAttribute {
    pub y: u8,
    pub x: u8,
    pub tile_index: u8,
    pub flags: ObjectFlags,
}

impl From<[u8; 4]> for ObjectAttribute {
    fn from([y, x, tile_index, flags]: [u8; 4]) -> Self {
        Self {
            y,
            x,
            tile_index,
            flags: ObjectFlags::from_bits_retain(flags),
        }
    }
}

/// 2-bit color index of column `x` within a decoded tile line.
fn color_index(line: [u8; 2], x: usize) -> u8 {
    let bit = 7 - x;
    (line[1] >> bit & 1) << 1 | (line[0] >> bit & 1)
}

fn tile_line(vram: &[u8; VRAM_SIZE], tile_offset: usize, row: usize) -> [u8; 2] {
    [vram[tile_offset + row * 2], vram[tile_offset + row * 2 + 1]]
}

// https://gbdev.io/pandocs/Tile_Data.html: the low block is addressed
// unsigned from 0x8000, the high block signed from 0x9000.
fn bg_tile_offset(index: u8, signed_addressing: bool) -> usize {
    if signed_addressing {
        0x1000usize.strict_add_signed(isize::from(index.cast_signed()) * TILE_LENGTH as isize)
    } else {
        usize::from(index) * TILE_LENGTH
    }
}

fn palette_shade(palette: u8, index: u8) -> usize {
    usize::from(palette >> (index * 2) & 0b11)
}

impl Ppu {
    pub(super) fn render_scanline(&mut self, vram: &[u8; VRAM_SIZE], oam: &[u8; OAM_SIZE]) {
        // background color indices drive sprite priority
        let mut line_indices = [0u8; WIDTH];

        if self.lcdc.contains(LcdControl::BG_AND_WINDOW_ENABLE) {
            self.render_background(vram, &mut line_indices);
            if self.lcdc.contains(LcdControl::WINDOW_ENABLE) {
                self.render_window(vram, &mut line_indices);
            }
        } else {
            for x in 0..WIDTH {
                self.set_pixel(x, palette_shade(self.bgp, 0));
            }
        }

        if self.lcdc.contains(LcdControl::OBJ_ENABLE) {
            self.render_objects(vram, oam, &line_indices);
        }
    }

    fn render_background(&mut self, vram: &[u8; VRAM_SIZE], line_indices: &mut [u8; WIDTH]) {
        let map = if self.lcdc.contains(LcdControl::BG_TILE_MAP) {
            TILE_MAP_HIGH
        } else {
            TILE_MAP_LOW
        };
        let signed = !self.lcdc.contains(LcdControl::BG_AND_WINDOW_TILES);
        let by = usize::from(self.ly.wrapping_add(self.scy));

        for x in 0..WIDTH {
            let bx = usize::from(self.scx).wrapping_add(x) & 0xff;
            let tile_index = vram[map + by / 8 * 32 + bx / 8];
            let line = tile_line(vram, bg_tile_offset(tile_index, signed), by % 8);
            let index = color_index(line, bx % 8);
            line_indices[x] = index;
            self.set_pixel(x, palette_shade(self.bgp, index));
        }
    }

    fn render_window(&mut self, vram: &[u8; VRAM_SIZE], line_indices: &mut [u8; WIDTH]) {
        if self.wy > self.ly {
            return;
        }
        let map = if self.lcdc.contains(LcdControl::WINDOW_TILE_MAP) {
            TILE_MAP_HIGH
        } else {
            TILE_MAP_LOW
        };
        let signed = !self.lcdc.contains(LcdControl::BG_AND_WINDOW_TILES);
        let wy = usize::from(self.ly - self.wy);
        // WX holds the left edge plus seven
        let left = i32::from(self.wx) - 7;

        for x in 0..WIDTH {
            let Ok(wx) = usize::try_from(x as i32 - left) else {
                continue;
            };
            let tile_index = vram[map + wy / 8 * 32 + wx / 8];
            let line = tile_line(vram, bg_tile_offset(tile_index, signed), wy % 8);
            let index = color_index(line, wx % 8);
            line_indices[x] = index;
            self.set_pixel(x, palette_shade(self.bgp, index));
        }
    }

    fn render_objects(
        &mut self,
        vram: &[u8; VRAM_SIZE],
        oam: &[u8; OAM_SIZE],
        line_indices: &[u8; WIDTH],
    ) {
        let height = if self.lcdc.contains(LcdControl::OBJ_SIZE) {
            16
        } else {
            8
        };

        // up to ten objects per line, picked by ascending position in oam
        let mut visible: ArrayVec<ObjectAttribute, 10> = ArrayVec::new();
        for entry in oam.chunks_exact(4) {
            let object = ObjectAttribute::from(<[u8; 4]>::try_from(entry).unwrap());
            let top = i32::from(object.y) - 16;
            if top <= i32::from(self.ly) && i32::from(self.ly) < top + height {
                visible.push(object);
                if visible.is_full() {
                    break;
                }
            }
        }

        // drawn back to front so the earliest oam entry ends up on top
        for object in visible.iter().rev() {
            let mut row = i32::from(self.ly) - (i32::from(object.y) - 16);
            if object.flags.contains(ObjectFlags::Y_FLIP) {
                row = height - 1 - row;
            }
            let tile_index = if height == 16 {
                // the hardware ignores the low bit for tall objects
                if row < 8 {
                    object.tile_index & 0xfe
                } else {
                    object.tile_index | 0x01
                }
            } else {
                object.tile_index
            };
            let tile_offset = usize::from(tile_index) * TILE_LENGTH;
            let line = tile_line(vram, tile_offset, (row % 8) as usize);

            let palette = if object.flags.contains(ObjectFlags::DMG_PALETTE) {
                self.obp1
            } else {
                self.obp0
            };

            for px in 0..8usize {
                let Ok(x) = usize::try_from(i32::from(object.x) - 8 + px as i32) else {
                    continue;
                };
                if x >= WIDTH {
                    continue;
                }
                let column = if object.flags.contains(ObjectFlags::X_FLIP) {
                    7 - px
                } else {
                    px
                };
                let index = color_index(line, column);
                // color zero is transparent for objects, whatever the palette
                if index == 0 {
                    continue;
                }
                if object.flags.contains(ObjectFlags::PRIORITY) && line_indices[x] != 0 {
                    continue;
                }
                self.set_pixel(x, palette_shade(palette, index));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::InterruptController;

    const GREEN_LIGHTEST: [u8; 4] = [0x9b, 0xbb, 0x0f, 0xff];
    const GREEN_LIGHT: [u8; 4] = [0x8b, 0xac, 0x0f, 0xff];
    const GREEN_DARKEST: [u8; 4] = [0x0f, 0x38, 0x0f, 0xff];

    fn render_one_line(ppu: &mut Ppu, vram: &[u8; VRAM_SIZE], oam: &[u8; OAM_SIZE]) {
        let mut ic = InterruptController::default();
        ppu.write_lcdc(ppu.read_lcdc() | 0x80, &mut ic);
        ppu.advance(80 + 172, vram, oam, &mut ic);
    }

    #[test]
    fn color_index_is_msb_lsb_pair() {
        assert_eq!(0b01, color_index([0x80, 0x00], 0));
        assert_eq!(0b10, color_index([0x00, 0x80], 0));
        assert_eq!(0b11, color_index([0x01, 0x01], 7));
        assert_eq!(0, color_index([0x7f, 0x7f], 0));
    }

    #[test]
    fn signed_addressing_maps_tile_0xff_below_base() {
        assert_eq!(0x1000 - TILE_LENGTH, bg_tile_offset(0xff, true));
        assert_eq!(0x1000, bg_tile_offset(0, true));
        assert_eq!(0xff * TILE_LENGTH, bg_tile_offset(0xff, false));
    }

    #[test]
    fn background_pixel_goes_through_bgp() {
        let mut vram = Box::new([0u8; VRAM_SIZE]);
        // tile 1, solid color 3
        vram[16..32].fill(0xff);
        // top-left tile map entry points at tile 1
        vram[TILE_MAP_LOW] = 1;
        let mut ppu = Ppu {
            bgp: 0b11100100,
            ..Default::default()
        };
        ppu.lcdc = LcdControl::BG_AND_WINDOW_ENABLE | LcdControl::BG_AND_WINDOW_TILES;
        render_one_line(&mut ppu, &vram, &[0; OAM_SIZE]);
        assert_eq!(&GREEN_DARKEST[..], &ppu.framebuffer()[0..4]);
        // past the first tile the map holds tile 0, which is blank
        assert_eq!(&GREEN_LIGHTEST[..], &ppu.framebuffer()[8 * 4..8 * 4 + 4]);
    }

    #[test]
    fn window_overlays_the_background_from_wx_minus_seven() {
        let mut vram = Box::new([0u8; VRAM_SIZE]);
        // window map uses the high tile map, pointing at a solid tile
        vram[3 * 16..4 * 16].fill(0xff);
        vram[TILE_MAP_HIGH..TILE_MAP_HIGH + 32].fill(3);
        let mut ppu = Ppu {
            bgp: 0b11100100,
            wy: 0,
            wx: 7 + 100, // window starts at screen x 100
            ..Default::default()
        };
        ppu.lcdc = LcdControl::BG_AND_WINDOW_ENABLE
            | LcdControl::WINDOW_ENABLE
            | LcdControl::WINDOW_TILE_MAP
            | LcdControl::BG_AND_WINDOW_TILES;
        render_one_line(&mut ppu, &vram, &[0; OAM_SIZE]);
        assert_eq!(&GREEN_LIGHTEST[..], &ppu.framebuffer()[99 * 4..99 * 4 + 4]);
        assert_eq!(&GREEN_DARKEST[..], &ppu.framebuffer()[100 * 4..100 * 4 + 4]);
        assert_eq!(&GREEN_DARKEST[..], &ppu.framebuffer()[159 * 4..159 * 4 + 4]);
    }

    #[test]
    fn window_waits_for_its_start_line() {
        let mut vram = Box::new([0u8; VRAM_SIZE]);
        vram[3 * 16..4 * 16].fill(0xff);
        vram[TILE_MAP_HIGH..TILE_MAP_HIGH + 32].fill(3);
        let mut ppu = Ppu {
            bgp: 0b11100100,
            wy: 40, // below the rendered line
            wx: 7,
            ..Default::default()
        };
        ppu.lcdc = LcdControl::BG_AND_WINDOW_ENABLE
            | LcdControl::WINDOW_ENABLE
            | LcdControl::WINDOW_TILE_MAP
            | LcdControl::BG_AND_WINDOW_TILES;
        render_one_line(&mut ppu, &vram, &[0; OAM_SIZE]);
        assert_eq!(&GREEN_LIGHTEST[..], &ppu.framebuffer()[0..4]);
    }

    #[test]
    fn behind_background_priority_only_shows_over_color_zero() {
        let mut vram = Box::new([0u8; VRAM_SIZE]);
        // background tile 1: left half color 1, right half color 0
        vram[16] = 0xf0;
        vram[TILE_MAP_LOW] = 1;
        // object tile 2: solid color 3
        vram[2 * 16..3 * 16].fill(0xff);
        let mut oam = [0u8; OAM_SIZE];
        oam[0..4].copy_from_slice(&[16, 8, 2, 0x80]); // behind-background flag
        let mut ppu = Ppu {
            bgp: 0b11100100,
            obp0: 0b11100100,
            ..Default::default()
        };
        ppu.lcdc = LcdControl::BG_AND_WINDOW_ENABLE
            | LcdControl::BG_AND_WINDOW_TILES
            | LcdControl::OBJ_ENABLE;
        render_one_line(&mut ppu, &vram, &oam);
        // the background color 1 wins on the left
        assert_eq!(&GREEN_LIGHT[..], &ppu.framebuffer()[0..4]);
        // the object shows through where the background is color 0
        assert_eq!(&GREEN_DARKEST[..], &ppu.framebuffer()[4 * 4..4 * 4 + 4]);
    }

    #[test]
    fn earlier_oam_entries_draw_on_top() {
        let mut vram = Box::new([0u8; VRAM_SIZE]);
        vram[16..32].fill(0xff); // tile 1: color 3
        vram[2 * 16] = 0xff; // tile 2: color 1
        let mut oam = [0u8; OAM_SIZE];
        oam[0..4].copy_from_slice(&[16, 8, 1, 0]); // entry 0 on top
        oam[4..8].copy_from_slice(&[16, 8, 2, 0]);
        let mut ppu = Ppu {
            obp0: 0b11100100,
            ..Default::default()
        };
        ppu.lcdc = LcdControl::OBJ_ENABLE;
        render_one_line(&mut ppu, &vram, &oam);
        assert_eq!(&GREEN_DARKEST[..], &ppu.framebuffer()[0..4]);
    }

    #[test]
    fn at_most_ten_objects_per_scanline() {
        let mut vram = Box::new([0u8; VRAM_SIZE]);
        vram[16..32].fill(0xff);
        let mut oam = [0u8; OAM_SIZE];
        // eleven objects side by side on the same line
        for entry in 0..11usize {
            oam[entry * 4..entry * 4 + 4]
                .copy_from_slice(&[16, 8 + 8 * entry as u8, 1, 0]);
        }
        let mut ppu = Ppu {
            obp0: 0b11111111,
            ..Default::default()
        };
        ppu.lcdc = LcdControl::OBJ_ENABLE;
        render_one_line(&mut ppu, &vram, &oam);
        // the tenth entry painted, the eleventh lost the selection
        assert_eq!(&GREEN_DARKEST[..], &ppu.framebuffer()[9 * 8 * 4..9 * 8 * 4 + 4]);
        assert_eq!(&GREEN_LIGHTEST[..], &ppu.framebuffer()[10 * 8 * 4..10 * 8 * 4 + 4]);
    }

    #[test]
    fn tall_objects_force_the_tile_index_parity() {
        let mut vram = Box::new([0u8; VRAM_SIZE]);
        vram[4 * 16] = 0x0f; // tile 4 row 0: right half color 1
        vram[5 * 16..6 * 16].fill(0xff); // tile 5 would be solid color 3
        let mut oam = [0u8; OAM_SIZE];
        // odd index requested; the hardware uses 4 for the top half anyway
        oam[0..4].copy_from_slice(&[16, 8, 5, 0]);
        let mut ppu = Ppu {
            obp0: 0b11100100,
            ..Default::default()
        };
        ppu.lcdc = LcdControl::OBJ_ENABLE | LcdControl::OBJ_SIZE;
        render_one_line(&mut ppu, &vram, &oam);
        // tile 4 row 0 is [0x0f, 0x00]: right half color 1
        assert_eq!(&GREEN_LIGHTEST[..], &ppu.framebuffer()[0..4]);
        assert_eq!(&GREEN_LIGHT[..], &ppu.framebuffer()[4 * 4..4 * 4 + 4]);
    }

    #[test]
    fn object_color_zero_is_transparent() {
        let mut vram = Box::new([0u8; VRAM_SIZE]);
        // object tile 2: low bit set on left half only
        vram[2 * 16] = 0xf0;
        let mut oam = [0u8; OAM_SIZE];
        oam[0..4].copy_from_slice(&[16, 8, 2, 0]); // screen (0, 0)
        let mut ppu = Ppu {
            obp0: 0b11100100,
            ..Default::default()
        };
        ppu.lcdc = LcdControl::OBJ_ENABLE;
        render_one_line(&mut ppu, &vram, &oam);
        // left half painted with object color 1, right half transparent
        assert_eq!(&GREEN_LIGHT[..], &ppu.framebuffer()[0..4]);
        assert_eq!(&GREEN_LIGHT[..], &ppu.framebuffer()[3 * 4..3 * 4 + 4]);
        assert_eq!(&GREEN_LIGHTEST[..], &ppu.framebuffer()[4 * 4..4 * 4 + 4]);
    }
}
