use std::collections::VecDeque;
use std::time::Instant;

use launcher_logging::launch_trace;

use crate::dispatch::{self, Collaborators};
use crate::{update, Classifier, Effect, IntakeLoop, LaunchSettings, Msg, SetupState};

/// Owns all state of one launch attempt. Every call runs to completion
/// before the next event is handled.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    state: SetupState,
    intake: IntakeLoop,
    classifier: Classifier,
}

impl Orchestrator {
    pub fn new(settings: LaunchSettings) -> Result<Self, regex::Error> {
        let classifier = Classifier::from_settings(&settings)?;
        Ok(Self::with_classifier(settings, classifier))
    }

    pub fn with_classifier(settings: LaunchSettings, classifier: Classifier) -> Self {
        let intake = IntakeLoop::new(settings.line_separator, settings.quiet_period());
        Self {
            state: SetupState::new(settings),
            intake,
            classifier,
        }
    }

    pub fn state(&self) -> &SetupState {
        &self.state
    }

    pub fn intake(&self) -> &IntakeLoop {
        &self.intake
    }

    pub fn consume_dirty(&mut self) -> bool {
        self.state.consume_dirty()
    }

    pub fn start(&mut self) -> Vec<Effect> {
        self.apply(Msg::Start)
    }

    pub fn teardown(&mut self) -> Vec<Effect> {
        self.apply(Msg::TeardownRequested)
    }

    pub fn apply(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        effects
    }

    /// Buffers raw session output; classification waits for the quiet period.
    pub fn on_output(&mut self, chunk: &[u8], now: Instant) {
        self.intake.on_output(chunk, now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.intake.deadline()
    }

    /// Runs the classification pass if the quiet period has elapsed.
    pub fn on_timer(&mut self, now: Instant) -> Vec<Effect> {
        let Some(range) = self.intake.poll(now) else {
            return Vec::new();
        };
        let stage = self.state.stage();
        if stage.is_terminal() || self.state.is_closed() {
            return Vec::new();
        }
        let lines = &self.intake.log().lines()[range];
        launch_trace!("classifying {} new lines in {:?}", lines.len(), stage);
        let classification = self.classifier.scan(stage, lines);
        self.apply(Msg::QuietPeriodElapsed { classification })
    }

    /// Performs effects one at a time, feeding each result back before the
    /// next effect is dispatched.
    pub fn drive(&mut self, collaborators: &mut dyn Collaborators, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            if let Some(msg) = dispatch::perform(collaborators, effect) {
                queue.extend(self.apply(msg));
            }
        }
    }
}
