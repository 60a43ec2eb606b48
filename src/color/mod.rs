//! Packed-ARGB color math.
//!
//! Pure, stateless helpers over packed 32-bit ARGB values (alpha, red,
//! green, blue, one byte each, alpha in the highest byte). This module is
//! the only place raw color bit-manipulation occurs; everything else in
//! the pipeline treats colors as opaque `u32`s.

/// Fully transparent black, the "unrendered" pixel value.
pub const TRANSPARENT: u32 = 0;

/// Packs ARGB channel bytes into a single value.
#[inline]
pub const fn pack(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Unpacks a color into its (alpha, red, green, blue) bytes.
#[inline]
pub const fn unpack(color: u32) -> (u8, u8, u8, u8) {
    (alpha(color), red(color), green(color), blue(color))
}

#[inline]
pub const fn alpha(color: u32) -> u8 {
    (color >> 24) as u8
}

#[inline]
pub const fn red(color: u32) -> u8 {
    (color >> 16) as u8
}

#[inline]
pub const fn green(color: u32) -> u8 {
    (color >> 8) as u8
}

#[inline]
pub const fn blue(color: u32) -> u8 {
    color as u8
}

/// Replaces the alpha byte of a color.
#[inline]
pub const fn with_alpha(color: u32, a: u8) -> u32 {
    (color & 0x00FF_FFFF) | ((a as u32) << 24)
}

#[inline]
fn lerp_channel(from: u8, to: u8, t: f32) -> u8 {
    (from as f32 + (to as f32 - from as f32) * t).round().clamp(0.0, 255.0) as u8
}

/// Linear per-channel interpolation between two colors.
///
/// `t` is clamped to `0.0..=1.0`; `t = 0` returns `from`, `t = 1` returns
/// `to`. Interpolates alpha as well.
pub fn lerp(from: u32, to: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let (fa, fr, fg, fb) = unpack(from);
    let (ta, tr, tg, tb) = unpack(to);
    pack(
        lerp_channel(fa, ta, t),
        lerp_channel(fr, tr, t),
        lerp_channel(fg, tg, t),
        lerp_channel(fb, tb, t),
    )
}

/// Composites a foreground color over a background using "over" alpha math.
///
/// Output alpha is `a0 + a1·(1−a0)` and each channel is the alpha-weighted
/// average of the two contributions, un-premultiplied afterwards. A fully
/// opaque foreground wins entirely; a fully transparent foreground leaves
/// the background untouched.
pub fn blend(fg: u32, bg: u32) -> u32 {
    let (fa, fr, fg_g, fb) = unpack(fg);
    let (ba, br, bg_g, bb) = unpack(bg);

    if fa == 255 || ba == 0 {
        return fg;
    }
    if fa == 0 {
        return bg;
    }

    let a0 = fa as f32 / 255.0;
    let a1 = ba as f32 / 255.0;
    let out_a = a0 + a1 * (1.0 - a0);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }

    let channel = |f: u8, b: u8| -> u8 {
        let premul = f as f32 * a0 + b as f32 * a1 * (1.0 - a0);
        (premul / out_a).round().clamp(0.0, 255.0) as u8
    };

    pack(
        (out_a * 255.0).round() as u8,
        channel(fr, br),
        channel(fg_g, bg_g),
        channel(fb, bb),
    )
}

/// Converts RGB bytes to (hue, saturation, brightness), each in `0.0..=1.0`.
fn rgb_to_hsb(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let rf = r as f32 / 255.0;
    let gf = g as f32 / 255.0;
    let bf = b as f32 / 255.0;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let brightness = max;
    let saturation = if max > 0.0 { delta / max } else { 0.0 };

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if (max - rf).abs() <= f32::EPSILON {
        (((gf - bf) / delta) / 6.0).rem_euclid(1.0)
    } else if (max - gf).abs() <= f32::EPSILON {
        ((bf - rf) / delta + 2.0) / 6.0
    } else {
        ((rf - gf) / delta + 4.0) / 6.0
    };

    (hue, saturation, brightness)
}

/// Converts (hue, saturation, brightness) in `0.0..=1.0` back to RGB bytes.
fn hsb_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(1.0) * 6.0;
    let sector = h.floor() as i32 % 6;
    let f = h - h.floor();

    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

/// Interpolates between two colors in hue/saturation/brightness space.
///
/// With `shortest_hue` set, the hue component travels the shorter way
/// around the color wheel, so a blue→red ramp passes through magenta
/// instead of sweeping green and yellow. Alpha interpolates linearly.
pub fn lerp_hsb(from: u32, to: u32, t: f32, shortest_hue: bool) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let (fa, fr, fg, fb) = unpack(from);
    let (ta, tr, tg, tb) = unpack(to);

    let (fh, fs, fv) = rgb_to_hsb(fr, fg, fb);
    let (th, ts, tv) = rgb_to_hsb(tr, tg, tb);

    let mut dh = th - fh;
    if shortest_hue {
        if dh > 0.5 {
            dh -= 1.0;
        } else if dh < -0.5 {
            dh += 1.0;
        }
    }

    let h = (fh + dh * t).rem_euclid(1.0);
    let s = fs + (ts - fs) * t;
    let v = fv + (tv - fv) * t;

    let (r, g, b) = hsb_to_rgb(h, s, v);
    pack(lerp_channel(fa, ta, t), r, g, b)
}

/// Separable box blur over a row-major `u8` grid, in place.
///
/// Runs a horizontal pass then a vertical pass; each output cell is the
/// average of the `2·radius+1` window clamped at the grid edges. Used to
/// soften elevation shading so hillsides shade smoothly.
///
/// Radius 0 is a no-op.
pub fn box_blur(grid: &mut [u8], width: usize, height: usize, radius: usize) {
    debug_assert_eq!(grid.len(), width * height);
    if radius == 0 || width == 0 || height == 0 {
        return;
    }

    let mut scratch = vec![0u8; grid.len()];

    // Horizontal pass: grid -> scratch
    for row in 0..height {
        let base = row * width;
        for x in 0..width {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(width - 1);
            let sum: u32 = grid[base + lo..=base + hi].iter().map(|&v| v as u32).sum();
            scratch[base + x] = (sum / (hi - lo + 1) as u32) as u8;
        }
    }

    // Vertical pass: scratch -> grid
    for x in 0..width {
        for row in 0..height {
            let lo = row.saturating_sub(radius);
            let hi = (row + radius).min(height - 1);
            let mut sum = 0u32;
            for r in lo..=hi {
                sum += scratch[r * width + x] as u32;
            }
            grid[row * width + x] = (sum / (hi - lo + 1) as u32) as u8;
        }
    }
}
