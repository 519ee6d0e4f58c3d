//! Fixed-topology modulation matrix.
//!
//! Sources and destinations are closed enums; routes are plain
//! {source, destination, amount, active} records in a fixed array.
//! Processing zeroes the destination accumulator and sums
//! `source · amount` for every active route, so the per-voice cost is
//! one multiply-add per route per control tick. No allocation, no
//! indirection.

/// Maximum number of routes a matrix holds.
pub const MAX_ROUTES: usize = 32;

/// Modulation sources, written into the matrix before processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModSource {
    /// Note velocity, 0 to 1.
    Velocity,
    /// LFO 1, -1 to 1.
    Lfo1,
    /// LFO 2, -1 to 1.
    Lfo2,
    /// Filter envelope, 0 to 1.
    FilterEnv,
    /// Amplitude envelope, 0 to 1.
    AmpEnv,
    /// Mod wheel, 0 to 1.
    ModWheel,
    /// Aftertouch, 0 to 1.
    Aftertouch,
}

/// Number of modulation sources.
pub const SOURCE_COUNT: usize = 7;

/// Modulation destinations, read back after processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModDestination {
    /// Both oscillators' pitch, in semitones.
    Pitch,
    /// Filter cutoff accumulator (scaled downstream).
    FilterCutoff,
    /// Filter resonance offset.
    FilterRes,
    /// Oscillator 2 pitch, in semitones.
    Osc2Pitch,
    /// Square pulse width offset.
    PulseWidth,
    /// Output amplitude trim.
    Amplitude,
}

/// Number of modulation destinations.
pub const DESTINATION_COUNT: usize = 6;

/// A single modulation route.
#[derive(Clone, Copy, Debug)]
pub struct ModRoute {
    pub source: ModSource,
    pub destination: ModDestination,
    /// Scaling applied to the source value; negative inverts.
    pub amount: f32,
    /// Inactive routes are skipped without being removed.
    pub active: bool,
}

impl ModRoute {
    /// Create an active route.
    pub fn new(source: ModSource, destination: ModDestination, amount: f32) -> Self {
        Self {
            source,
            destination,
            amount,
            active: true,
        }
    }
}

/// Fixed-capacity modulation matrix.
///
/// Two routes are installed at construction, matching the synth's
/// hard-wired behavior: `FilterEnv → FilterCutoff` and
/// `Velocity → FilterCutoff`, both at amount 1.0. The voice scales
/// those contributions by its own envelope/velocity depth settings.
///
/// # Example
///
/// ```rust
/// use murmullo_core::{ModDestination, ModMatrix, ModRoute, ModSource};
///
/// let mut matrix = ModMatrix::new();
/// matrix.add_route(ModRoute::new(ModSource::Lfo1, ModDestination::Pitch, 0.5));
///
/// matrix.set_source(ModSource::Lfo1, 1.0);
/// matrix.process();
/// assert!((matrix.destination(ModDestination::Pitch) - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct ModMatrix {
    routes: [Option<ModRoute>; MAX_ROUTES],
    route_count: usize,
    sources: [f32; SOURCE_COUNT],
    destinations: [f32; DESTINATION_COUNT],
}

impl Default for ModMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl ModMatrix {
    /// Create a matrix with the default filter-envelope and velocity
    /// routes installed.
    pub fn new() -> Self {
        let mut matrix = Self {
            routes: [None; MAX_ROUTES],
            route_count: 0,
            sources: [0.0; SOURCE_COUNT],
            destinations: [0.0; DESTINATION_COUNT],
        };
        matrix.add_route(ModRoute::new(
            ModSource::FilterEnv,
            ModDestination::FilterCutoff,
            1.0,
        ));
        matrix.add_route(ModRoute::new(
            ModSource::Velocity,
            ModDestination::FilterCutoff,
            1.0,
        ));
        matrix
    }

    /// Add a route. Returns false when the matrix is full.
    pub fn add_route(&mut self, route: ModRoute) -> bool {
        if self.route_count >= MAX_ROUTES {
            return false;
        }
        self.routes[self.route_count] = Some(route);
        self.route_count += 1;
        true
    }

    /// Remove every route, including the defaults.
    pub fn clear_routes(&mut self) {
        self.routes = [None; MAX_ROUTES];
        self.route_count = 0;
    }

    /// Number of installed routes.
    pub fn route_count(&self) -> usize {
        self.route_count
    }

    /// Route by index, for enabling/disabling or retuning amounts.
    pub fn route_mut(&mut self, index: usize) -> Option<&mut ModRoute> {
        if index < self.route_count {
            self.routes[index].as_mut()
        } else {
            None
        }
    }

    /// Write a source value.
    #[inline]
    pub fn set_source(&mut self, source: ModSource, value: f32) {
        self.sources[source as usize] = value;
    }

    /// Read a source value back.
    #[inline]
    pub fn source(&self, source: ModSource) -> f32 {
        self.sources[source as usize]
    }

    /// Run all active routes: destinations are zeroed, then each route
    /// adds `source · amount` into its destination.
    #[inline]
    pub fn process(&mut self) {
        self.destinations = [0.0; DESTINATION_COUNT];
        for route in self.routes[..self.route_count].iter().flatten() {
            if route.active {
                self.destinations[route.destination as usize] +=
                    self.sources[route.source as usize] * route.amount;
            }
        }
    }

    /// Read a destination accumulator after [`process`](Self::process).
    #[inline]
    pub fn destination(&self, destination: ModDestination) -> f32 {
        self.destinations[destination as usize]
    }
}
