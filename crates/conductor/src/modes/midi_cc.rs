//! MIDI CC controls of the selected track's instrument on the eight track
//! encoders.
//!
//! Controls come from the instrument definition's `midi_cc` sections. An
//! instrument without any gets all 128 controllers in sections of 16. The
//! upper-row buttons pick a section, page left/right moves through a section
//! eight controls at a time.

use std::collections::HashMap;

use conductor_core::{
    Button, Color, ControlEvent, ControlSurface, DisplaySurface, Encoder, EventResult,
    InstrumentDefinition, MidiMessage, Mode, ModeContext, ModeId, PadColor,
};

use super::{MIDI_CC, SETTINGS};

const CONTROLS_PER_PAGE: usize = 8;
const DEFAULT_SECTION_SIZE: u8 = 16;
const INITIAL_VALUE: u8 = 64;

const SECTIONS_LINE: usize = 0;
const NAMES_LINE: usize = 1;
const VALUES_LINE: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct CcControl {
    pub name: String,
    pub section: String,
    pub cc_number: u8,
    pub value: u8,
    /// Labels shown instead of raw values, keyed by the value as text
    pub value_labels: HashMap<String, String>,
}

impl CcControl {
    fn new(name: String, section: String, cc_number: u8) -> Self {
        Self {
            name,
            section,
            cc_number,
            value: INITIAL_VALUE,
            value_labels: HashMap::new(),
        }
    }

    /// Apply an encoder increment, returns whether the value changed.
    pub fn update_value(&mut self, increment: i8) -> bool {
        let value = (i16::from(self.value) + i16::from(increment)).clamp(0, 127) as u8;
        let changed = value != self.value;
        self.value = value;
        changed
    }

    pub fn value_label(&self) -> String {
        let raw = self.value.to_string();
        self.value_labels.get(&raw).cloned().unwrap_or(raw)
    }
}

/// Controls of one instrument plus where the user left off.
#[derive(Debug, Clone)]
struct InstrumentControls {
    controls: Vec<CcControl>,
    section: String,
    page: usize,
}

impl InstrumentControls {
    fn from_definition(definition: &InstrumentDefinition) -> Self {
        let controls = match &definition.midi_cc {
            Some(sections) if !sections.is_empty() => sections
                .iter()
                .flat_map(|section| {
                    section.controls.iter().map(move |(name, cc)| {
                        let mut control =
                            CcControl::new(name.clone(), section.section.clone(), *cc);
                        if let Some(labels) = section.control_value_label_maps.get(name) {
                            control.value_labels = labels.clone();
                        }
                        control
                    })
                })
                .collect(),
            _ => default_controls(),
        };
        let section = controls
            .first()
            .map(|control| control.section.clone())
            .unwrap_or_default();
        Self {
            controls,
            section,
            page: 0,
        }
    }

    fn section_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for control in &self.controls {
            if !names.contains(&control.section.as_str()) {
                names.push(&control.section);
            }
        }
        names
    }

    fn section_len(&self) -> usize {
        self.controls
            .iter()
            .filter(|control| control.section == self.section)
            .count()
    }

    fn has_previous_page(&self) -> bool {
        self.page > 0
    }

    fn has_next_page(&self) -> bool {
        (self.page + 1) * CONTROLS_PER_PAGE < self.section_len()
    }

    /// Indices into `controls` of the page on the encoders.
    fn page_indices(&self) -> Vec<usize> {
        self.controls
            .iter()
            .enumerate()
            .filter(|(_, control)| control.section == self.section)
            .map(|(index, _)| index)
            .skip(self.page * CONTROLS_PER_PAGE)
            .take(CONTROLS_PER_PAGE)
            .collect()
    }
}

fn default_controls() -> Vec<CcControl> {
    (0..=127u8)
        .map(|cc| {
            let start = (cc / DEFAULT_SECTION_SIZE) * DEFAULT_SECTION_SIZE;
            let end = start + DEFAULT_SECTION_SIZE - 1;
            CcControl::new(format!("CC {}", cc), format!("{} to {}", start, end), cc)
        })
        .collect()
}

#[derive(Default)]
pub struct MidiCcMode {
    instruments: HashMap<String, InstrumentControls>,
}

impl MidiCcMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build controls for every instrument in the listing not seen yet.
    fn load_instruments(&mut self, ctx: &ModeContext) {
        for track in ctx.state.tracks.iter() {
            if !self.instruments.contains_key(&track.instrument_short_name) {
                let controls = InstrumentControls::from_definition(&track.definition);
                log::debug!(
                    "Loaded {} MIDI CC controls for {}",
                    controls.controls.len(),
                    track.instrument_short_name
                );
                self.instruments
                    .insert(track.instrument_short_name.clone(), controls);
            }
        }
    }

    fn current(&self, ctx: &ModeContext) -> Option<&InstrumentControls> {
        let track = ctx.state.selected_track_info()?;
        self.instruments.get(&track.instrument_short_name)
    }

    fn current_mut(&mut self, ctx: &ModeContext) -> Option<&mut InstrumentControls> {
        let track = ctx.state.selected_track_info()?;
        self.instruments.get_mut(&track.instrument_short_name)
    }

    fn select_section(&mut self, ctx: &ModeContext, index: usize) {
        let Some(instrument) = self.current_mut(ctx) else {
            return;
        };
        let Some(name) = instrument.section_names().get(index).map(|s| s.to_string()) else {
            return;
        };
        instrument.section = name;
        instrument.page = 0;
        ctx.mark_buttons();
    }

    fn change_page(&mut self, ctx: &ModeContext, forward: bool) {
        let Some(instrument) = self.current_mut(ctx) else {
            return;
        };
        if forward && instrument.has_next_page() {
            instrument.page += 1;
        } else if !forward && instrument.has_previous_page() {
            instrument.page -= 1;
        } else {
            return;
        }
        ctx.mark_buttons();
    }

    fn rotate(&mut self, ctx: &ModeContext, encoder: usize, increment: i8) {
        let Some(instrument) = self.current_mut(ctx) else {
            return;
        };
        let Some(&index) = instrument.page_indices().get(encoder) else {
            return;
        };
        let control = &mut instrument.controls[index];
        control.update_value(increment);
        let msg = MidiMessage::ControlChange {
            channel: ctx.midi.out_channel(),
            controller: control.cc_number,
            value: control.value,
        };
        ctx.midi.send(&msg);
    }
}

impl Mode for MidiCcMode {
    fn id(&self) -> ModeId {
        MIDI_CC
    }

    fn activate(&mut self, ctx: &mut ModeContext) {
        self.load_instruments(ctx);
    }

    fn on_event(&mut self, event: &ControlEvent, ctx: &mut ModeContext) -> EventResult {
        if ctx.state.is_mode_active(SETTINGS) {
            return EventResult::Ignored;
        }
        match *event {
            ControlEvent::ButtonPressed(Button::Upper(index)) => {
                self.select_section(ctx, usize::from(index));
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(Button::PageLeft) => {
                self.change_page(ctx, false);
                EventResult::Handled
            }
            ControlEvent::ButtonPressed(Button::PageRight) => {
                self.change_page(ctx, true);
                EventResult::Handled
            }
            ControlEvent::EncoderRotated {
                encoder: Encoder::Track(index),
                increment,
            } => {
                self.rotate(ctx, usize::from(index), increment);
                EventResult::Handled
            }
            // No encoder reaches modes below this one
            ControlEvent::EncoderRotated { .. } => EventResult::Handled,
            _ => EventResult::Ignored,
        }
    }

    fn paint_buttons(&self, ctx: &ModeContext, surface: &mut dyn ControlSurface) {
        if ctx.state.is_mode_active(SETTINGS) {
            return;
        }
        let lit = |on: bool| {
            if on {
                PadColor::new(Color::White)
            } else {
                PadColor::off()
            }
        };
        let current = self.current(ctx);
        let n_sections = current.map(|i| i.section_names().len()).unwrap_or(0);
        for index in 0..8u8 {
            surface.set_button(Button::Upper(index), lit(usize::from(index) < n_sections));
        }
        surface.set_button(
            Button::PageLeft,
            lit(current.map(InstrumentControls::has_previous_page).unwrap_or(false)),
        );
        surface.set_button(
            Button::PageRight,
            lit(current.map(InstrumentControls::has_next_page).unwrap_or(false)),
        );
    }

    fn paint_display(&self, ctx: &ModeContext, display: &mut dyn DisplaySurface) {
        // The settings pages cover this one
        if ctx.state.is_mode_active(SETTINGS) {
            return;
        }
        let Some(instrument) = self.current(ctx) else {
            return;
        };
        let color = ctx.state.selected_track_color();

        for (column, name) in instrument.section_names().into_iter().take(8).enumerate() {
            if name == instrument.section {
                display.highlight(column, color);
                display.text(column, SECTIONS_LINE, name, Color::Black);
            } else {
                display.text(column, SECTIONS_LINE, name, color);
            }
        }

        for (column, index) in instrument.page_indices().into_iter().enumerate() {
            let control = &instrument.controls[index];
            display.text(column, NAMES_LINE, &control.name, Color::White);
            display.text(column, VALUES_LINE, &control.value_label(), color);
        }
    }

    fn on_track_selected(&mut self, ctx: &mut ModeContext) {
        self.load_instruments(ctx);
        ctx.mark_buttons();
    }
}
