//! Preset bundles and the preset library.
//!
//! A [`Preset`] is an immutable snapshot of every parameter a voice
//! copies at trigger time. The engine consumes presets as in-memory
//! bundles; the TOML form here is a control-side convenience for
//! loading catalogs from disk and for the bundled factory sounds.
//!
//! Presets are added to the [`PresetLibrary`] before playback starts
//! and are never mutated afterwards — commands in flight hold `Arc`
//! references into the catalog.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use murmullo_core::{FilterMode, LfoWaveform, NoiseColor, Waveform};

/// Errors from preset catalog operations.
#[derive(Debug, Error)]
pub enum PresetError {
    /// Failed to read a preset file.
    #[error("failed to read preset file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse preset TOML.
    #[error("failed to parse preset: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize a preset.
    #[error("failed to serialize preset: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Two presets share a name.
    #[error("duplicate preset name: {0}")]
    DuplicateName(String),

    /// A trigger referenced a name the library does not hold.
    #[error("preset not found: {0}")]
    NotFound(String),
}

/// Immutable voice parameter bundle.
///
/// Envelope times are in seconds; levels and sustain in [0, 1];
/// cutoff in Hz. `osc2_detune` is in *fractional semitones* — a value
/// of 0.05 detunes oscillator 2 by five cents' worth of a semitone
/// scale, and producers working in true cents should divide by 100 at
/// this boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Preset {
    /// Stable name triggers refer to.
    pub name: String,

    // Oscillator section
    pub osc1_level: f32,
    pub osc2_level: f32,
    pub noise_level: f32,
    pub osc1_waveform: Waveform,
    pub osc2_waveform: Waveform,
    /// Oscillator 2 coarse offset in semitones.
    pub osc2_semitones: i32,
    /// Oscillator 2 fine offset in fractional semitones.
    pub osc2_detune: f32,
    /// Square duty cycle base, [0.05, 0.95].
    pub pulse_width: f32,
    pub noise_color: NoiseColor,

    // Filter section
    pub filter_mode: FilterMode,
    /// Base cutoff in Hz.
    pub filter_cutoff: f32,
    /// Resonance in [0, 1].
    pub filter_resonance: f32,
    /// Filter-envelope depth in Hz, signed.
    pub filter_env_amount: f32,

    // Amp envelope (seconds / level)
    pub amp_attack: f32,
    pub amp_decay: f32,
    pub amp_sustain: f32,
    pub amp_release: f32,

    // Filter envelope (seconds / level)
    pub filter_attack: f32,
    pub filter_decay: f32,
    pub filter_sustain: f32,
    pub filter_release: f32,

    // LFO section
    pub lfo1_rate: f32,
    pub lfo1_waveform: LfoWaveform,
    pub lfo2_rate: f32,
    pub lfo2_waveform: LfoWaveform,
    /// Scale applied to the matrix cutoff accumulator, in Hz.
    pub lfo1_to_filter: f32,
    /// Velocity-to-cutoff depth in Hz.
    pub velocity_to_filter: f32,

    /// Steal resistance, 0..=10. Higher is harder to steal.
    pub priority: u8,
    /// Pitch used when a trigger omits one.
    pub default_note: u8,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            name: String::new(),
            osc1_level: 1.0,
            osc2_level: 0.0,
            noise_level: 0.0,
            osc1_waveform: Waveform::Saw,
            osc2_waveform: Waveform::Saw,
            osc2_semitones: 0,
            osc2_detune: 0.0,
            pulse_width: 0.5,
            noise_color: NoiseColor::White,
            filter_mode: FilterMode::Lowpass,
            filter_cutoff: 2000.0,
            filter_resonance: 0.0,
            filter_env_amount: 0.0,
            amp_attack: 0.01,
            amp_decay: 0.1,
            amp_sustain: 0.7,
            amp_release: 0.2,
            filter_attack: 0.01,
            filter_decay: 0.1,
            filter_sustain: 0.5,
            filter_release: 0.2,
            lfo1_rate: 5.0,
            lfo1_waveform: LfoWaveform::Sine,
            lfo2_rate: 0.5,
            lfo2_waveform: LfoWaveform::Triangle,
            lfo1_to_filter: 0.0,
            velocity_to_filter: 0.0,
            priority: 5,
            default_note: 60,
        }
    }
}

impl Preset {
    /// Create a named preset with default parameters.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a preset from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, PresetError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a preset from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PresetError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Serialize to TOML text.
    pub fn to_toml(&self) -> Result<String, PresetError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Catalog of presets, keyed by stable name.
///
/// Built once at init, then treated as an immutable bundle for the
/// rest of the session. Lookups hand out `Arc<Preset>` so commands can
/// carry references without lifetimes crossing the thread boundary.
#[derive(Debug, Default)]
pub struct PresetLibrary {
    by_name: HashMap<String, Arc<Preset>>,
    order: Vec<String>,
}

impl PresetLibrary {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Library preloaded with the bundled factory sounds.
    pub fn with_factory_presets() -> Result<Self, PresetError> {
        let mut library = Self::new();
        for preset in factory_presets()? {
            library.add(preset)?;
        }
        Ok(library)
    }

    /// Add a preset. Names must be unique.
    pub fn add(&mut self, preset: Preset) -> Result<(), PresetError> {
        if self.by_name.contains_key(&preset.name) {
            return Err(PresetError::DuplicateName(preset.name));
        }
        tracing::debug!(name = %preset.name, "preset added to library");
        self.order.push(preset.name.clone());
        self.by_name.insert(preset.name.clone(), Arc::new(preset));
        Ok(())
    }

    /// Look up a preset by name.
    pub fn get(&self, name: &str) -> Option<Arc<Preset>> {
        self.by_name.get(name).cloned()
    }

    /// Preset names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of presets.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True when no presets are loaded.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Load every `*.toml` file in a directory. Returns the number of
    /// presets added.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, PresetError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| PresetError::ReadFile {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut added = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                self.add(Preset::load(&path)?)?;
                added += 1;
            }
        }
        tracing::info!(count = added, dir = %dir.display(), "presets loaded");
        Ok(added)
    }
}

/// The bundled factory sounds, embedded as TOML at compile time.
pub fn factory_presets() -> Result<Vec<Preset>, PresetError> {
    FACTORY_PRESETS_TOML
        .iter()
        .map(|text| Preset::from_toml(text))
        .collect()
}

static FACTORY_PRESETS_TOML: &[&str] = &[
    WARM_PAD,
    GLASS_PLUCK,
    DEEP_BASS,
    WIND_CHIME,
    NOISE_WASH,
];

const WARM_PAD: &str = r#"
name = "warm_pad"
osc1_level = 0.7
osc2_level = 0.7
osc1_waveform = "saw"
osc2_waveform = "saw"
osc2_detune = 0.07
filter_cutoff = 900.0
filter_resonance = 0.2
filter_env_amount = 1200.0
amp_attack = 0.8
amp_decay = 0.5
amp_sustain = 0.8
amp_release = 1.5
filter_attack = 1.2
filter_decay = 0.8
filter_sustain = 0.6
filter_release = 1.5
lfo1_rate = 0.3
lfo1_to_filter = 250.0
priority = 3
default_note = 57
"#;

const GLASS_PLUCK: &str = r#"
name = "glass_pluck"
osc1_level = 0.9
osc2_level = 0.4
osc1_waveform = "triangle"
osc2_waveform = "sine"
osc2_semitones = 12
filter_cutoff = 3000.0
filter_resonance = 0.35
filter_env_amount = 4000.0
amp_attack = 0.002
amp_decay = 0.4
amp_sustain = 0.0
amp_release = 0.4
filter_attack = 0.001
filter_decay = 0.25
filter_sustain = 0.1
filter_release = 0.3
velocity_to_filter = 2000.0
priority = 6
default_note = 72
"#;

const DEEP_BASS: &str = r#"
name = "deep_bass"
osc1_level = 1.0
osc2_level = 0.5
osc1_waveform = "square"
osc2_waveform = "saw"
osc2_semitones = -12
pulse_width = 0.35
filter_cutoff = 350.0
filter_resonance = 0.5
filter_env_amount = 900.0
amp_attack = 0.005
amp_decay = 0.2
amp_sustain = 0.9
amp_release = 0.25
filter_attack = 0.004
filter_decay = 0.3
filter_sustain = 0.3
filter_release = 0.2
velocity_to_filter = 1200.0
priority = 8
default_note = 36
"#;

const WIND_CHIME: &str = r#"
name = "wind_chime"
osc1_level = 0.8
osc2_level = 0.3
osc1_waveform = "sine"
osc2_waveform = "triangle"
osc2_semitones = 19
osc2_detune = 0.04
filter_cutoff = 6000.0
filter_resonance = 0.15
amp_attack = 0.001
amp_decay = 1.8
amp_sustain = 0.0
amp_release = 1.8
filter_attack = 0.001
filter_decay = 1.0
filter_sustain = 0.2
filter_release = 1.0
priority = 2
default_note = 84
"#;

const NOISE_WASH: &str = r#"
name = "noise_wash"
osc1_level = 0.0
osc2_level = 0.0
noise_level = 0.9
noise_color = "pink"
filter_mode = "bandpass"
filter_cutoff = 1200.0
filter_resonance = 0.6
amp_attack = 2.5
amp_decay = 1.0
amp_sustain = 0.7
amp_release = 3.0
filter_attack = 2.0
filter_decay = 1.5
filter_sustain = 0.5
filter_release = 2.5
lfo1_rate = 0.1
lfo1_to_filter = 600.0
priority = 1
default_note = 60
"#;
