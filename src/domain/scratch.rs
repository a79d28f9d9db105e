use serde::{Deserialize, Serialize};

use crate::domain::random::RandomSource;

pub const DEFAULT_WIDTH: u32 = 300;
pub const DEFAULT_HEIGHT: u32 = 200;
pub const DEFAULT_BRUSH_RADIUS: f64 = 20.0;
pub const DEFAULT_REVEAL_THRESHOLD: f64 = 0.30;

/// Coverage above which the "keep scratching" hint is shown.
const PROGRESS_HINT_FLOOR: f64 = 0.10;

/// Prizes drawn when the caller does not supply one.
pub const PRIZE_TABLE: [(u32, &str); 6] = [
    (10, "Cashback"),
    (25, "Cashback"),
    (50, "Cashback"),
    (100, "Bonus"),
    (5, "Cashback"),
    (20, "Discount"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    pub amount: u32,
    pub label: String,
}

impl Prize {
    pub fn new(amount: u32, label: impl Into<String>) -> Self {
        Self {
            amount,
            label: label.into(),
        }
    }

    /// Prize for a caller-supplied amount.
    pub fn cashback(amount: u32) -> Self {
        Self::new(amount, "Cashback")
    }

    pub fn draw(rng: &mut dyn RandomSource) -> Self {
        let (amount, label) = PRIZE_TABLE[rng.pick(PRIZE_TABLE.len()) % PRIZE_TABLE.len()];
        Self::new(amount, label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub brush_radius: f64,
    pub reveal_threshold: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            brush_radius: DEFAULT_BRUSH_RADIUS,
            reveal_threshold: DEFAULT_REVEAL_THRESHOLD,
        }
    }
}

/// Pointer position in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EraseEvent {
    /// No gesture was active.
    Ignored,
    Progress { fraction: f64 },
    /// Emitted once, by the erase that first pushes coverage past the threshold.
    Revealed { fraction: f64 },
}

/// Opaque overlay hiding a prize, erased by pointer strokes.
///
/// The mask holds one cell per logical unit. A cell is cleared when its
/// center lies inside the brush circle. The cleared count is maintained
/// incrementally, so the coverage fraction never needs a full rescan.
#[derive(Debug, Clone)]
pub struct ScratchSurface {
    config: SurfaceConfig,
    display_width: f64,
    display_height: f64,
    cleared: Vec<bool>,
    cleared_count: usize,
    erasing: bool,
    revealed: bool,
    prize: Prize,
}

impl ScratchSurface {
    pub fn new(config: SurfaceConfig, prize: Option<Prize>, rng: &mut dyn RandomSource) -> Self {
        let cells = config.width as usize * config.height as usize;
        let mut surface = Self {
            config,
            display_width: config.width as f64,
            display_height: config.height as f64,
            cleared: vec![false; cells],
            cleared_count: 0,
            erasing: false,
            revealed: false,
            prize: Prize::cashback(0),
        };
        surface.initialize(prize, rng);
        surface
    }

    /// Restores a fully opaque mask and picks the prize.
    pub fn initialize(&mut self, prize: Option<Prize>, rng: &mut dyn RandomSource) {
        self.prize = prize.unwrap_or_else(|| Prize::draw(rng));
        self.cleared.iter_mut().for_each(|cell| *cell = false);
        self.cleared_count = 0;
        self.erasing = false;
        self.revealed = false;
    }

    /// Size the surface is rendered at. Non-positive sizes are ignored.
    pub fn set_display_size(&mut self, width: f64, height: f64) {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            self.display_width = width;
            self.display_height = height;
        }
    }

    pub fn begin_erase(&mut self) {
        self.erasing = true;
    }

    pub fn continue_erase(&mut self, point: Point) -> EraseEvent {
        if !self.erasing {
            return EraseEvent::Ignored;
        }

        let (x, y) = self.to_mask(point);
        self.clear_circle(x, y);

        let fraction = self.coverage_fraction();
        if !self.revealed && fraction > self.config.reveal_threshold {
            self.revealed = true;
            return EraseEvent::Revealed { fraction };
        }
        EraseEvent::Progress { fraction }
    }

    pub fn end_erase(&mut self) {
        self.erasing = false;
    }

    pub fn coverage_fraction(&self) -> f64 {
        if self.cleared.is_empty() {
            return 0.0;
        }
        self.cleared_count as f64 / self.cleared.len() as f64
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn is_erasing(&self) -> bool {
        self.erasing
    }

    pub fn prize(&self) -> &Prize {
        &self.prize
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Rounded percentage to show while the prize is still hidden.
    pub fn progress_hint(&self) -> Option<u8> {
        let fraction = self.coverage_fraction();
        if self.revealed || fraction <= PROGRESS_HINT_FLOOR {
            return None;
        }
        Some((fraction * 100.0).round() as u8)
    }

    /// Hands the prize to `on_complete` and consumes the surface.
    ///
    /// Before the reveal the surface is returned untouched and the callback
    /// is never called.
    pub fn dismiss<F>(self, on_complete: F) -> Result<(), Self>
    where
        F: FnOnce(Prize),
    {
        if !self.revealed {
            return Err(self);
        }
        on_complete(self.prize);
        Ok(())
    }

    fn to_mask(&self, point: Point) -> (f64, f64) {
        let width = self.config.width as f64;
        let height = self.config.height as f64;
        let x = finite_or_zero(point.x) * width / self.display_width;
        let y = finite_or_zero(point.y) * height / self.display_height;
        (x.clamp(0.0, width), y.clamp(0.0, height))
    }

    fn clear_circle(&mut self, cx: f64, cy: f64) {
        let radius = self.config.brush_radius.max(0.0);
        let radius_sq = radius * radius;
        let width = self.config.width;
        let height = self.config.height;

        let x_start = (cx - radius).floor().max(0.0) as u32;
        let x_end = ((cx + radius).ceil() as u32).min(width);
        let y_start = (cy - radius).floor().max(0.0) as u32;
        let y_end = ((cy + radius).ceil() as u32).min(height);

        for y in y_start..y_end {
            let dy = y as f64 + 0.5 - cy;
            for x in x_start..x_end {
                let dx = x as f64 + 0.5 - cx;
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                let index = y as usize * width as usize + x as usize;
                if !self.cleared[index] {
                    self.cleared[index] = true;
                    self.cleared_count += 1;
                }
            }
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
