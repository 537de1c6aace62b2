use std::collections::HashMap;

use nnet::{Float, ObjectiveType};

/// Running totals of one output's objective.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimpleObjectiveInfo {
    pub tot_weight: Float,
    pub tot_objective: Float,
}

impl SimpleObjectiveInfo {
    /// The objective per frame. Not a number when no weight was accumulated.
    pub fn per_frame(&self) -> Float {
        self.tot_objective / self.tot_weight
    }
}

/// Accumulated objectives keyed by output name.
#[derive(Debug, Clone, Default)]
pub struct ObjectiveStats {
    infos: HashMap<String, SimpleObjectiveInfo>,
}

impl ObjectiveStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one minibatch's totals to the entry of `name`, creating it if needed.
    pub fn add(&mut self, name: &str, tot_objective: Float, tot_weight: Float) {
        let info = self.infos.entry(name.to_string()).or_default();
        info.tot_weight += tot_weight;
        info.tot_objective += tot_objective;
    }

    pub fn get(&self, name: &str) -> Option<&SimpleObjectiveInfo> {
        self.infos.get(name)
    }

    pub fn clear(&mut self) {
        self.infos.clear();
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Iterates over the entries sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SimpleObjectiveInfo)> {
        let mut entries: Vec<_> = self.infos.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }
}

/// Formats the report line of one output. Tooling parses this line, keep it stable.
pub fn report_line(name: &str, objective: ObjectiveType, info: &SimpleObjectiveInfo) -> String {
    let kind = match objective {
        ObjectiveType::Linear => "log-likelihood",
        ObjectiveType::Quadratic => "objective",
    };

    format!(
        "Overall {kind} for '{name}' is {} per frame, over {} frames.",
        info.per_frame(),
        info.tot_weight
    )
}
