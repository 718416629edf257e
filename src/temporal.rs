//! State machines behind history-dependent condition nodes.
//!
//! Each temporal condition owns one [`TemporalState`]. It is created at compile
//! time (or recovered from the state store), advanced once per tick and written
//! back after every change. Times are seconds since the Unix epoch.

use crate::error::PersistenceError;
use crate::graph::GraphNode;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalKind {
    Duration,
    Sequence,
}

/// Tracks how long an input has been continuously true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationState {
    pub active: bool,
    pub start_time: Option<f64>,
    pub elapsed: f64,
}

/// Tracks recent true events and when the sequence last completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceState {
    pub events: Vec<f64>,
    pub last_trigger: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemporalState {
    Duration(DurationState),
    Sequence(SequenceState),
}

impl TemporalState {
    pub fn zero(kind: TemporalKind) -> Self {
        match kind {
            TemporalKind::Duration => TemporalState::Duration(DurationState::default()),
            TemporalKind::Sequence => TemporalState::Sequence(SequenceState::default()),
        }
    }

    pub fn kind(&self) -> TemporalKind {
        match self {
            TemporalState::Duration(_) => TemporalKind::Duration,
            TemporalState::Sequence(_) => TemporalKind::Sequence,
        }
    }

    pub fn to_blob(&self) -> Result<Vec<u8>, PersistenceError> {
        encode_to_vec(self, standard()).map_err(|e| PersistenceError::Codec(e.to_string()))
    }

    pub fn from_blob(bytes: &[u8]) -> Result<Self, PersistenceError> {
        decode_from_slice(bytes, standard())
            .map(|(state, _)| state)
            .map_err(|e| PersistenceError::Codec(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationParams {
    pub duration_seconds: f64,
    pub reset_on_false: bool,
}

impl DurationParams {
    pub fn from_node(node: &GraphNode) -> Self {
        Self {
            duration_seconds: node.param_f64("duration_seconds").unwrap_or(60.0),
            reset_on_false: node.param_bool("reset_on_false").unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceParams {
    pub required_events: usize,
    pub max_gap_seconds: f64,
}

impl SequenceParams {
    pub fn from_node(node: &GraphNode) -> Self {
        Self {
            required_events: node
                .param_f64("required_events")
                .map(|n| n.max(1.0) as usize)
                .unwrap_or(3),
            max_gap_seconds: node.param_f64("max_gap_seconds").unwrap_or(300.0),
        }
    }
}

impl DurationState {
    /// Advances the machine by one observation and reports whether the input
    /// has now held for at least `duration_seconds`.
    ///
    /// Without `reset_on_false`, a false input pauses accumulation and the next
    /// true input resumes from the elapsed time reached so far.
    pub fn update(&mut self, input: bool, now: f64, params: &DurationParams) -> bool {
        if !input {
            if params.reset_on_false {
                *self = DurationState::default();
            } else {
                self.active = false;
                self.start_time = None;
            }
            return false;
        }

        match (self.active, self.start_time) {
            (true, Some(start)) => self.elapsed = (now - start).max(0.0),
            _ => {
                self.active = true;
                self.start_time = Some(now - self.elapsed);
            }
        }
        self.elapsed >= params.duration_seconds
    }
}

impl SequenceState {
    /// Records a true input as an event. Fires, and starts over, once
    /// `required_events` events arrived with no gap above `max_gap_seconds`.
    pub fn update(&mut self, input: bool, now: f64, params: &SequenceParams) -> bool {
        if let Some(&last) = self.events.last() {
            if now - last > params.max_gap_seconds {
                self.events.clear();
            }
        }
        if !input {
            return false;
        }

        self.events.push(now);
        if self.events.len() >= params.required_events {
            self.last_trigger = Some(now);
            self.events.clear();
            true
        } else {
            false
        }
    }
}
