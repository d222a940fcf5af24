use crate::algorithms::switching::{SwitchValues, Switching};
use crate::algorithms::vicsek::{normalize_or_zero, OrientationInputs, Vicsek};
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::events::{Event, EventContext, EventOutcome, FoodEvent, FoodEventRecord};
use crate::geometry::Domain;
use crate::metrics::{global_order, threshold_values};
use crate::models::swarm::SwarmState;
use crate::visibility::{neighbour_sets, NeighbourSet};
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, trace};

/// Display class of an agent in a recorded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Colour {
    Black,
    /// Alive and fed during the step that produced the frame.
    Green,
    White,
}

/// Snapshot of every agent after a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub step: usize,
    pub time: f64,
    pub positions: Vec<[f64; 2]>,
    pub orientations: Vec<[f64; 2]>,
    pub stress: Vec<f64>,
    pub hunger: Vec<f64>,
    pub alive: Vec<bool>,
    pub colours: Vec<Colour>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationOutput {
    pub times: Vec<f64>,
    pub frames: Vec<Frame>,
    pub food_events: Vec<FoodEventRecord>,
    /// Step during which the last agent died.
    pub extinct_at: Option<usize>,
}

/// Per-step combination of every event outcome.
struct EventEffects {
    headings: Vec<Option<Vector2<f64>>>,
    blocked: Vec<bool>,
    meals: Vec<usize>,
}

impl EventEffects {
    fn new(n: usize) -> Self {
        Self {
            headings: vec![None; n],
            blocked: vec![false; n],
            meals: vec![0; n],
        }
    }

    fn absorb(&mut self, outcome: EventOutcome) {
        match outcome {
            EventOutcome::Inactive => {}
            EventOutcome::Reoriented { headings, blocked } => {
                for (i, h) in headings {
                    self.headings[i] = Some(h);
                }
                for i in blocked {
                    self.blocked[i] = true;
                }
            }
            EventOutcome::Fed { agents } => {
                for i in agents {
                    self.meals[i] += 1;
                }
            }
        }
    }
}

/// Discrete-time driver. Owns the agent arrays exclusively; every step reads
/// the committed state and commits a freshly assembled one.
#[derive(Debug)]
pub struct Simulator {
    config: SimConfig,
    domain: Domain,
    state: SwarmState,
    vicsek: Vicsek,
    switching: Option<Switching>,
    events: Vec<Event>,
    rng: ChaCha8Rng,
    colours: Vec<Colour>,
    frames: Vec<Frame>,
    timestep: usize,
    extinct_at: Option<usize>,
}

impl Simulator {
    /// Validate `config` and draw the initial state from its distribution.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let (positions, orientations) =
            config.initial.generate(&config.domain, config.particles, &mut rng);
        Self::assemble(config, positions, orientations, rng)
    }

    /// Start from explicit positions and headings. Headings are normalized,
    /// positions wrapped into the domain.
    pub fn with_initial_state(
        config: SimConfig,
        positions: Vec<Vector2<f64>>,
        orientations: Vec<Vector2<f64>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        for got in [positions.len(), orientations.len()] {
            if got != config.particles {
                return Err(ConfigError::InitialStateMismatch { expected: config.particles, got });
            }
        }
        let positions = positions.iter().map(|p| config.domain.wrap(p)).collect();
        let orientations = orientations
            .iter()
            .map(|o| {
                let h = normalize_or_zero(o);
                if h == Vector2::zeros() { Vector2::new(1.0, 0.0) } else { h }
            })
            .collect();
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::assemble(config, positions, orientations, rng)
    }

    fn assemble(
        config: SimConfig,
        positions: Vec<Vector2<f64>>,
        orientations: Vec<Vector2<f64>>,
        rng: ChaCha8Rng,
    ) -> Result<Self, ConfigError> {
        let n = config.particles;
        let delays = if config.activation_time_delays.is_empty() {
            vec![1; n]
        } else {
            config.activation_time_delays.clone()
        };
        let hunger = match &config.food {
            Some(food) => vec![food.max_food; n],
            None => vec![0.0; n],
        };
        let state = SwarmState {
            positions,
            orientations,
            switches: SwitchValues {
                mechanisms: vec![config.neighbour_selection; n],
                ks: vec![config.k; n],
                speeds: vec![config.speed; n],
                delays,
            },
            stress: vec![0.0; n],
            hunger,
            alive: vec![true; n],
        };

        let mut events: Vec<Event> = config.stimuli.iter().cloned().map(Event::Stimulus).collect();
        if let Some(food) = &config.food {
            let radius = config.food_radius();
            for spec in &food.events {
                events.push(Event::Food(FoodEvent::from_spec(spec, radius)?));
            }
        }

        let switching = config
            .switching
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| Switching::new(s.clone(), n));

        let mut sim = Self {
            domain: config.domain,
            vicsek: Vicsek::new(config.vicsek_params()),
            config,
            state,
            switching,
            events,
            rng,
            colours: vec![Colour::Black; n],
            frames: Vec::new(),
            timestep: 0,
            extinct_at: None,
        };
        if sim.config.record_history {
            sim.record_frame();
        }
        Ok(sim)
    }

    pub fn config(&self) -> &SimConfig { &self.config }
    pub fn domain(&self) -> &Domain { &self.domain }
    pub fn state(&self) -> &SwarmState { &self.state }
    pub fn colours(&self) -> &[Colour] { &self.colours }
    pub fn frames(&self) -> &[Frame] { &self.frames }
    pub fn events(&self) -> &[Event] { &self.events }
    pub fn timestep(&self) -> usize { self.timestep }
    pub fn time(&self) -> f64 { self.timestep as f64 * self.config.dt }
    pub fn extinct_at(&self) -> Option<usize> { self.extinct_at }
    pub fn is_finished(&self) -> bool { self.timestep >= self.config.num_steps() }

    /// Visible sets of the committed state.
    pub fn neighbour_sets(&self) -> Vec<NeighbourSet> {
        neighbour_sets(
            &self.domain,
            &self.state.positions,
            &self.state.orientations,
            &self.state.alive,
            &self.config.vision,
        )
    }

    pub fn global_order(&self) -> f64 {
        global_order(&self.state.orientations, &self.state.alive)
    }

    pub fn food_records(&self) -> Vec<FoodEventRecord> {
        self.events.iter().filter_map(Event::as_food).map(FoodEvent::record).collect()
    }

    /// Advance one step.
    pub fn step(&mut self) {
        let t = self.timestep;
        let n = self.state.len();
        self.spawn_food(t);

        let state = &self.state;
        let sets = neighbour_sets(
            &self.domain,
            &state.positions,
            &state.orientations,
            &state.alive,
            &self.config.vision,
        );
        let ready = state.ready(t);

        let stress = match &self.config.stress {
            Some(params) => params.update(&state.stress, &sets, &state.alive),
            None => state.stress.clone(),
        };

        if let Some(switching) = &mut self.switching {
            let values = threshold_values(
                self.config.threshold_evaluation,
                &state.orientations,
                &state.alive,
                &sets,
            );
            switching.record(&values);
        }

        let stimulus_eligible = if self.config.delay_relevant_for_events {
            ready.clone()
        } else {
            state.alive.clone()
        };
        let ctx = EventContext {
            timestep: t,
            domain: &self.domain,
            positions: &state.positions,
            alive: &state.alive,
            stimulus_eligible: &stimulus_eligible,
        };
        let mut effects = EventEffects::new(n);
        for event in &mut self.events {
            effects.absorb(event.evaluate(&ctx, &mut self.rng));
        }

        let switches = match &self.switching {
            Some(switching) => {
                let eligible: Vec<bool> =
                    ready.iter().zip(&effects.blocked).map(|(r, b)| *r && !b).collect();
                switching.decide(&state.switches, &eligible)
            }
            None => state.switches.clone(),
        };

        let noise = self.vicsek.sample_noise(&mut self.rng, n);
        let mut orientations = self.vicsek.orientations(&OrientationInputs {
            orientations: &state.orientations,
            sets: &sets,
            mechanisms: &switches.mechanisms,
            ks: &switches.ks,
            ready: &ready,
            noise: &noise,
        });
        for (orientation, heading) in orientations.iter_mut().zip(&effects.headings) {
            if let Some(h) = heading {
                *orientation = *h;
            }
        }

        let food = self.config.food.as_ref();
        let (hunger, alive) = match food {
            Some(food) => food.next_hunger(&state.hunger, &effects.meals, &state.alive),
            None => (state.hunger.clone(), state.alive.clone()),
        };
        // satiation is judged on the level after this step's meals
        let speeds: Vec<f64> = (0..n)
            .map(|i| {
                let halted = effects.meals[i] > 0 && !food.is_some_and(|f| f.is_sated(hunger[i]));
                if !state.alive[i] || halted { 0.0 } else { switches.speeds[i] }
            })
            .collect();
        let positions = self.vicsek.integrate(
            &self.domain,
            &state.positions,
            &orientations,
            &speeds,
            self.config.dt,
        );
        let colours = (0..n)
            .map(|i| match (alive[i], effects.meals[i] > 0) {
                (false, _) => Colour::White,
                (true, true) => Colour::Green,
                (true, false) => Colour::Black,
            })
            .collect();

        let was_living = state.living();
        self.state = SwarmState { positions, orientations, switches, stress, hunger, alive };
        self.colours = colours;

        let living = self.state.living();
        if living < was_living {
            debug!(step = t, died = was_living - living, living, "agents starved");
        }
        if living == 0 && n > 0 && self.extinct_at.is_none() {
            info!(step = t, "all agents are dead");
            self.extinct_at = Some(t);
        }

        self.timestep += 1;
        trace!(step = self.timestep, order = self.global_order(), "step committed");
        if self.config.record_history && self.timestep % self.config.history_interval == 0 {
            self.record_frame();
        }
    }

    fn spawn_food(&mut self, t: usize) {
        let Some(food) = &self.config.food else { return };
        if food.appearance_probability <= 0.0 || !self.rng.gen_bool(food.appearance_probability) {
            return;
        }
        let origin = Vector2::new(
            self.rng.gen_range(0.0..self.domain.width()),
            self.rng.gen_range(0.0..self.domain.height()),
        );
        match FoodEvent::new(t, origin, self.config.food_radius(), food.source_amount) {
            Ok(event) => {
                debug!(
                    step = t,
                    x = origin.x,
                    y = origin.y,
                    amount = food.source_amount,
                    "food source appeared"
                );
                self.events.push(Event::Food(event));
            }
            Err(err) => debug!(%err, "food source rejected"),
        }
    }

    fn record_frame(&mut self) {
        let s = &self.state;
        self.frames.push(Frame {
            step: self.timestep,
            time: self.time(),
            positions: s.positions.iter().map(|p| [p.x, p.y]).collect(),
            orientations: s.orientations.iter().map(|o| [o.x, o.y]).collect(),
            stress: s.stress.clone(),
            hunger: s.hunger.clone(),
            alive: s.alive.clone(),
            colours: self.colours.clone(),
        });
    }

    /// Run the remaining steps and hand over the collected output.
    pub fn run(mut self) -> SimulationOutput {
        let steps = self.config.num_steps();
        info!(particles = self.state.len(), steps, seed = self.config.seed, "simulation started");
        while !self.is_finished() {
            self.step();
        }
        let food_events = self.food_records();
        info!(
            living = self.state.living(),
            order = self.global_order(),
            food_events = food_events.len(),
            "simulation finished"
        );
        SimulationOutput {
            times: self.frames.iter().map(|f| f.time).collect(),
            frames: self.frames,
            food_events,
            extinct_at: self.extinct_at,
        }
    }
}
