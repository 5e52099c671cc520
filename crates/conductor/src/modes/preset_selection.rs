//! Program changes from the pads, with per-instrument favourites.
//!
//! The 128 programs are spread over two pages of 64. A long press toggles the
//! program as a favourite of the selected track's instrument; favourites are
//! saved to a JSON file on every change.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use conductor_core::{
    Button, Color, ControlEvent, ControlSurface, DisplaySurface, EventResult, MidiMessage, Mode,
    ModeContext, ModeId, PadColor, PressDurationClassifier, PressKind, XorGroup,
};

use super::{PADS, PRESET_SELECTION};

const PRESETS_PER_PAGE: u8 = 64;
const NUM_PAGES: u8 = 2;

/// Bank sent alongside every program; banks are not switched yet.
const DEFAULT_BANK: u8 = 0;

/// Favourite `(program, bank)` pairs per instrument short name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavouritePresets {
    presets: BTreeMap<String, Vec<(u8, u8)>>,
}

impl FavouritePresets {
    /// A missing file means no favourites yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read favourites from {}", path.display()))?;
        let presets = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse favourites in {}", path.display()))?;
        Ok(Self { presets })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.presets)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write favourites to {}", path.display()))
    }

    pub fn contains(&self, instrument: &str, program: u8, bank: u8) -> bool {
        self.presets
            .get(instrument)
            .map(|list| list.contains(&(program, bank)))
            .unwrap_or(false)
    }

    /// Add or remove a favourite, returns whether it is now a favourite.
    pub fn toggle(&mut self, instrument: &str, program: u8, bank: u8) -> bool {
        let list = self.presets.entry(instrument.to_string()).or_default();
        match list.iter().position(|entry| *entry == (program, bank)) {
            Some(index) => {
                list.remove(index);
                false
            }
            None => {
                list.push((program, bank));
                true
            }
        }
    }
}

pub struct PresetSelectionMode {
    favourites_path: PathBuf,
    favourites: FavouritePresets,
    presses: PressDurationClassifier<(u8, u8)>,
    page: u8,
}

impl PresetSelectionMode {
    pub fn new(favourites_path: PathBuf, quick_press: Duration) -> Self {
        let favourites = match FavouritePresets::load(&favourites_path) {
            Ok(favourites) => favourites,
            Err(e) => {
                log::warn!("{:#}, starting without favourite presets", e);
                FavouritePresets::default()
            }
        };
        Self {
            favourites_path,
            favourites,
            presses: PressDurationClassifier::new(quick_press),
            page: 0,
        }
    }

    fn program_for_pad(&self, row: u8, col: u8) -> u8 {
        self.page * PRESETS_PER_PAGE + row * 8 + col
    }

    fn instrument(ctx: &ModeContext) -> String {
        ctx.state
            .selected_track_info()
            .map(|track| track.instrument_short_name.clone())
            .unwrap_or_default()
    }

    fn on_pad_released(&mut self, row: u8, col: u8, ctx: &mut ModeContext) {
        let program = self.program_for_pad(row, col);
        match self.presses.on_release(&(row, col), ctx.now) {
            PressKind::Tap => {
                let channel = ctx.midi.out_channel();
                ctx.midi
                    .send(&MidiMessage::ProgramChange { channel, program });
            }
            PressKind::Hold => {
                let instrument = Self::instrument(ctx);
                let added = self.favourites.toggle(&instrument, program, DEFAULT_BANK);
                log::info!(
                    "Preset {} {} favourites of {}",
                    program,
                    if added { "added to" } else { "removed from" },
                    instrument
                );
                if let Err(e) = self.favourites.save(&self.favourites_path) {
                    log::error!("{:#}", e);
                }
                ctx.mark_pads();
            }
        }
    }

    fn change_page(&mut self, ctx: &ModeContext, forward: bool) {
        let page = if forward {
            (self.page + 1).min(NUM_PAGES - 1)
        } else {
            self.page.saturating_sub(1)
        };
        if page != self.page {
            self.page = page;
            ctx.dirty.mark_all();
        }
    }
}

impl Mode for PresetSelectionMode {
    fn id(&self) -> ModeId {
        PRESET_SELECTION
    }

    fn xor_group(&self) -> Option<XorGroup> {
        Some(PADS)
    }

    fn activate(&mut self, _ctx: &mut ModeContext) {
        self.presses.clear();
    }

    fn deactivate(&mut self, _ctx: &mut ModeContext) {
        self.presses.clear();
    }

    fn on_event(&mut self, event: &ControlEvent, ctx: &mut ModeContext) -> EventResult {
        match *event {
            ControlEvent::PadPressed { row, col, .. } => {
                self.presses.on_press((row, col), ctx.now);
                EventResult::Handled
            }
            ControlEvent::PadReleased { row, col, .. } => {
                self.on_pad_released(row, col, ctx);
                EventResult::Handled
            }
            ControlEvent::PadAftertouch { .. } => EventResult::Handled,
            ControlEvent::ButtonPressed(Button::PageLeft) => {
                self.change_page(ctx, false);
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(Button::PageRight) => {
                self.change_page(ctx, true);
                EventResult::Handled
            }
            _ => EventResult::Ignored,
        }
    }

    fn paint_pads(&self, ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        let instrument = Self::instrument(ctx);
        let color = ctx.state.selected_track_color();
        for row in 0..8 {
            for col in 0..8 {
                let program = self.program_for_pad(row, col);
                let led = if self.favourites.contains(&instrument, program, DEFAULT_BANK) {
                    PadColor::new(color)
                } else {
                    PadColor::dimmed(color)
                };
                surface.set_pad(row, col, led);
            }
        }
    }

    fn paint_buttons(&self, _ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        let lit = |available: bool| {
            if available {
                PadColor::new(Color::White)
            } else {
                PadColor::off()
            }
        };
        surface.set_button(Button::PageLeft, lit(self.page > 0));
        surface.set_button(Button::PageRight, lit(self.page + 1 < NUM_PAGES));
    }

    fn paint_display(&self, ctx: &ModeContext, display: &mut dyn DisplaySurface) {
        let first = u16::from(self.page) * u16::from(PRESETS_PER_PAGE) + 1;
        let last = first + u16::from(PRESETS_PER_PAGE) - 1;
        display.text(0, 0, "PRESETS", Color::White);
        display.text(0, 1, &format!("{}-{}", first, last), Color::White);
        display.text(
            1,
            0,
            &Self::instrument(ctx),
            ctx.state.selected_track_color(),
        );
    }

    fn on_track_selected(&mut self, ctx: &mut ModeContext) {
        self.presses.clear();
        ctx.mark_pads();
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::modes::testing::{context, sent, Canvas};

    const QUICK: Duration = Duration::from_millis(400);

    fn release_after(mode: &mut PresetSelectionMode, ctx: &mut ModeContext, held: Duration) {
        mode.on_event(
            &ControlEvent::PadPressed {
                row: 1,
                col: 3,
                velocity: 100,
            },
            ctx,
        );
        ctx.now += held;
        mode.on_event(
            &ControlEvent::PadReleased {
                row: 1,
                col: 3,
                velocity: 0,
            },
            ctx,
        );
    }

    #[test]
    fn test_tap_sends_program_change() {
        let dir = TempDir::new().unwrap();
        let (mut ctx, sink) = context();
        let mut mode = PresetSelectionMode::new(dir.path().join("favourites.json"), QUICK);

        release_after(&mut mode, &mut ctx, Duration::from_millis(50));
        mode.on_event(&ControlEvent::ButtonPressed(Button::PageRight), &mut ctx);
        release_after(&mut mode, &mut ctx, Duration::from_millis(50));

        assert_eq!(
            sent(&sink),
            vec![
                MidiMessage::ProgramChange {
                    channel: 0,
                    program: 11
                },
                MidiMessage::ProgramChange {
                    channel: 0,
                    program: 75
                },
            ]
        );
    }

    #[test]
    fn test_hold_toggles_and_persists_favourite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favourites.json");
        let (mut ctx, sink) = context();
        let mut mode = PresetSelectionMode::new(path.clone(), QUICK);

        release_after(&mut mode, &mut ctx, Duration::from_millis(600));
        assert!(sent(&sink).is_empty());

        let mut canvas = Canvas::default();
        mode.paint_pads(&ctx, &mut canvas);
        assert_eq!(canvas.pad(1, 3), PadColor::new(Color::Orange));
        assert_eq!(canvas.pad(1, 4), PadColor::dimmed(Color::Orange));

        let reloaded = FavouritePresets::load(&path).unwrap();
        assert!(reloaded.contains("-", 11, 0));

        release_after(&mut mode, &mut ctx, Duration::from_millis(600));
        assert!(!FavouritePresets::load(&path).unwrap().contains("-", 11, 0));
    }

    #[test]
    fn test_missing_or_broken_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favourites.json");
        assert_eq!(FavouritePresets::load(&path).unwrap(), FavouritePresets::default());

        fs::write(&path, "not json").unwrap();
        assert!(FavouritePresets::load(&path).is_err());
        // The mode still starts
        let mode = PresetSelectionMode::new(path, QUICK);
        assert_eq!(mode.favourites, FavouritePresets::default());
    }

    #[test]
    fn test_page_buttons() {
        let dir = TempDir::new().unwrap();
        let (mut ctx, _) = context();
        let mut mode = PresetSelectionMode::new(dir.path().join("f.json"), QUICK);

        let mut canvas = Canvas::default();
        mode.paint_buttons(&ctx, &mut canvas);
        assert!(canvas.button(Button::PageLeft).is_off());
        assert!(!canvas.button(Button::PageRight).is_off());

        mode.on_event(&ControlEvent::ButtonPressed(Button::PageRight), &mut ctx);
        mode.on_event(&ControlEvent::ButtonPressed(Button::PageRight), &mut ctx);
        assert_eq!(mode.page, 1);

        let mut canvas = Canvas::default();
        mode.paint_display(&ctx, &mut canvas);
        assert_eq!(canvas.text_at(0, 1), "65-128");
    }
}
