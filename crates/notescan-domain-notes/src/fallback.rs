use notescan_ports::types::NoteRecord;
use rand::seq::SliceRandom;
use rand::Rng;

pub const FALLBACK_NOTE_COUNT: usize = 45;

pub const FALLBACK_STEPS: [&str; 7] = ["C", "D", "E", "F", "G", "A", "B"];
pub const FALLBACK_DURATIONS: [&str; 4] = ["quarter", "half", "whole", "eighth"];
pub const FALLBACK_TYPES: [&str; 4] = ["sharp", "flat", "natural", "double sharp"];
pub const FALLBACK_MAX_OCTAVE: u8 = 7;

/// Synthetic notes returned when no real extraction is available.
///
/// The count and schema are fixed; every field is sampled independently.
pub fn generate_fallback_notes() -> Vec<NoteRecord> {
    generate_fallback_notes_with(&mut rand::thread_rng())
}

pub fn generate_fallback_notes_with(rng: &mut impl Rng) -> Vec<NoteRecord> {
    (0..FALLBACK_NOTE_COUNT)
        .map(|_| random_note(rng))
        .collect()
}

fn random_note(rng: &mut impl Rng) -> NoteRecord {
    let step = pick(rng, &FALLBACK_STEPS);
    let octave = rng.gen_range(0..=FALLBACK_MAX_OCTAVE);
    let duration = pick(rng, &FALLBACK_DURATIONS);
    let note_type = pick(rng, &FALLBACK_TYPES);
    NoteRecord::new(format!("{step}{octave}"), duration).with_type(note_type)
}

fn pick(rng: &mut impl Rng, choices: &[&'static str]) -> &'static str {
    choices.choose(rng).copied().unwrap_or_default()
}
