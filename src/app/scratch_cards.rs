use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::random::RandomSource;
use crate::domain::scratch::{EraseEvent, Point, Prize, ScratchSurface, SurfaceConfig};

/// Live cards one session may hold at once.
pub const MAX_LIVE_CARDS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokePhase {
    Begin,
    Move,
    End,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Stroke {
    pub phase: StrokePhase,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub display_width: Option<f64>,
    pub display_height: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScratchCardView {
    pub id: Uuid,
    pub width: u32,
    pub height: u32,
    pub coverage: f64,
    pub revealed: bool,
    /// Set once the card is revealed.
    pub prize: Option<Prize>,
    pub progress_hint: Option<u8>,
    /// True only on the stroke that revealed the card.
    pub just_revealed: bool,
}

#[derive(Debug)]
pub enum DismissOutcome {
    Completed(Prize),
    NotRevealed,
    NotFound,
}

#[derive(Debug)]
pub struct CardLimitReached;

/// Scratch cards issued to one session.
pub struct ScratchCardRegistry {
    config: SurfaceConfig,
    cards: HashMap<Uuid, ScratchSurface>,
}

impl ScratchCardRegistry {
    pub fn new(config: SurfaceConfig) -> Self {
        Self {
            config,
            cards: HashMap::new(),
        }
    }

    /// Issues a card. An amount of zero counts as absent and draws a prize.
    pub fn issue(
        &mut self,
        amount: Option<u32>,
        rng: &mut dyn RandomSource,
    ) -> Result<ScratchCardView, CardLimitReached> {
        if self.cards.len() >= MAX_LIVE_CARDS {
            return Err(CardLimitReached);
        }

        let prize = amount.filter(|amount| *amount > 0).map(Prize::cashback);
        let surface = ScratchSurface::new(self.config, prize, rng);
        let id = Uuid::new_v4();
        let view = view(id, &surface, false);
        self.cards.insert(id, surface);
        Ok(view)
    }

    pub fn get(&self, id: Uuid) -> Option<ScratchCardView> {
        self.cards.get(&id).map(|surface| view(id, surface, false))
    }

    pub fn stroke(&mut self, id: Uuid, stroke: Stroke) -> Option<ScratchCardView> {
        let surface = self.cards.get_mut(&id)?;

        if let (Some(width), Some(height)) = (stroke.display_width, stroke.display_height) {
            surface.set_display_size(width, height);
        }

        let point = Point::new(stroke.x, stroke.y);
        let event = match stroke.phase {
            StrokePhase::Begin => {
                surface.begin_erase();
                EraseEvent::Ignored
            }
            StrokePhase::Move => surface.continue_erase(point),
            StrokePhase::End => {
                surface.end_erase();
                EraseEvent::Ignored
            }
        };

        let just_revealed = matches!(event, EraseEvent::Revealed { .. });
        if just_revealed {
            tracing::info!(
                card_id = %id,
                amount = surface.prize().amount,
                label = %surface.prize().label,
                "scratch card revealed"
            );
        }

        Some(view(id, surface, just_revealed))
    }

    pub fn dismiss(&mut self, id: Uuid) -> DismissOutcome {
        let Some(surface) = self.cards.remove(&id) else {
            return DismissOutcome::NotFound;
        };

        let mut completed = None;
        match surface.dismiss(|prize| completed = Some(prize)) {
            Ok(()) => match completed {
                Some(prize) => DismissOutcome::Completed(prize),
                None => DismissOutcome::NotFound,
            },
            Err(surface) => {
                tracing::warn!(card_id = %id, "scratch card dismissed before reveal");
                self.cards.insert(id, surface);
                DismissOutcome::NotRevealed
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

fn view(id: Uuid, surface: &ScratchSurface, just_revealed: bool) -> ScratchCardView {
    let config = surface.config();
    ScratchCardView {
        id,
        width: config.width,
        height: config.height,
        coverage: surface.coverage_fraction(),
        revealed: surface.is_revealed(),
        prize: surface.is_revealed().then(|| surface.prize().clone()),
        progress_hint: surface.progress_hint(),
        just_revealed,
    }
}
