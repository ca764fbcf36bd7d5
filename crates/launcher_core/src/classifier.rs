use regex::Regex;

use crate::{LaunchSettings, Stage};

/// Something the terminal output can tell us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Milestone {
    RuntimeVersion,
    RuntimeInstalled,
    RuntimeInstallFailed,
    BundleUnpacked,
    BundleUnpackFailed,
    ServerListening,
    ServerReady,
}

#[derive(Debug, Clone)]
pub struct Recognizer {
    milestone: Milestone,
    pattern: Regex,
    payload_check: Option<fn(&str) -> bool>,
}

impl Recognizer {
    pub fn new(milestone: Milestone, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            milestone,
            pattern: Regex::new(pattern)?,
            payload_check: None,
        })
    }

    /// Payloads rejected by `check` are dropped; the match still fires.
    pub fn with_payload_check(mut self, check: fn(&str) -> bool) -> Self {
        self.payload_check = Some(check);
        self
    }

    pub fn milestone(&self) -> Milestone {
        self.milestone
    }

    /// Matches a trimmed line. A match whose capture group is absent or empty
    /// still yields an observation, just without a payload.
    fn recognize(&self, line: &str) -> Option<Observation> {
        let captures = self.pattern.captures(line)?;
        let payload = captures
            .get(1)
            .map(|m| m.as_str().trim())
            .filter(|value| !value.is_empty())
            .filter(|value| self.payload_check.map_or(true, |check| check(value)))
            .map(ToOwned::to_owned);
        Some(Observation {
            milestone: self.milestone,
            payload,
            line: line.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub milestone: Milestone,
    pub payload: Option<String>,
    /// The trimmed line that matched.
    pub line: String,
}

/// Result of one classification pass, in scan order. Holds the first
/// observation of each milestone, plus the first one carrying a payload
/// when that came later.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    observations: Vec<Observation>,
}

impl Classification {
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn first(&self, milestone: Milestone) -> Option<&Observation> {
        self.observations
            .iter()
            .find(|observation| observation.milestone == milestone)
    }

    /// First observation of `milestone` that carries a payload.
    pub fn first_with_payload(&self, milestone: Milestone) -> Option<&Observation> {
        self.observations
            .iter()
            .find(|observation| observation.milestone == milestone && observation.payload.is_some())
    }

    /// Earliest observation among `milestones`.
    pub fn earliest_of(&self, milestones: &[Milestone]) -> Option<&Observation> {
        self.observations
            .iter()
            .find(|observation| milestones.contains(&observation.milestone))
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Declarative per-stage recognizer table.
#[derive(Debug, Clone)]
pub struct Classifier {
    table: Vec<(Stage, Vec<Recognizer>)>,
}

impl Classifier {
    pub fn new(table: Vec<(Stage, Vec<Recognizer>)>) -> Self {
        Self { table }
    }

    pub fn from_settings(settings: &LaunchSettings) -> Result<Self, regex::Error> {
        let markers = &settings.markers;
        let mut server = vec![Recognizer::new(
            Milestone::ServerListening,
            &markers.server_listening,
        )?
        .with_payload_check(|candidate| url::Url::parse(candidate).is_ok())];
        if settings.requires_ready_marker() {
            server.push(Recognizer::new(Milestone::ServerReady, &markers.server_ready)?);
        }

        Ok(Self::new(vec![
            (
                Stage::AwaitRuntimeInstalled,
                vec![
                    Recognizer::new(Milestone::RuntimeInstallFailed, &markers.failure)?,
                    Recognizer::new(Milestone::RuntimeInstalled, &markers.runtime_installed)?,
                    Recognizer::new(Milestone::RuntimeVersion, &markers.runtime_version)?,
                ],
            ),
            (
                Stage::AwaitBundleReady,
                vec![
                    Recognizer::new(Milestone::BundleUnpackFailed, &markers.failure)?,
                    Recognizer::new(Milestone::BundleUnpacked, &markers.bundle_unpacked)?,
                ],
            ),
            (Stage::AwaitServerReady, server),
        ]))
    }

    pub fn recognizers(&self, stage: Stage) -> &[Recognizer] {
        self.table
            .iter()
            .find(|(candidate, _)| *candidate == stage)
            .map(|(_, recognizers)| recognizers.as_slice())
            .unwrap_or(&[])
    }

    /// Scans only the given (newly appended) lines. Returns `None` when
    /// nothing matched.
    pub fn scan(&self, stage: Stage, lines: &[String]) -> Option<Classification> {
        let recognizers = self.recognizers(stage);
        if recognizers.is_empty() {
            return None;
        }

        let mut classification = Classification::default();
        for line in lines.iter().map(|line| line.trim()).filter(|line| !line.is_empty()) {
            for recognizer in recognizers {
                if classification.first_with_payload(recognizer.milestone).is_some() {
                    continue;
                }
                let Some(observation) = recognizer.recognize(line) else {
                    continue;
                };
                // A bare match is kept once; a later one with a payload still counts.
                if observation.payload.is_some()
                    || classification.first(recognizer.milestone).is_none()
                {
                    classification.observations.push(observation);
                }
            }
        }

        if classification.is_empty() {
            None
        } else {
            Some(classification)
        }
    }
}
