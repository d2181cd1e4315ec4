//! Conflict policies and decisions.
//!
//! Decisions are taken while classifying, before anything is written. The
//! "apply to all" choice lives in a [`Resolver`] created per run.

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    #[default]
    Skip,
    Overwrite,
    Backup,
}

impl ConflictPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictPolicy::Skip => "skip",
            ConflictPolicy::Overwrite => "overwrite",
            ConflictPolicy::Backup => "backup",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(ConflictPolicy::Skip),
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            "backup" => Ok(ConflictPolicy::Backup),
            other => Err(format!("unknown conflict policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub policy: ConflictPolicy,
    /// Reuse `policy` for every later conflict of the run.
    pub apply_to_all: bool,
}

impl Decision {
    pub fn once(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            apply_to_all: false,
        }
    }

    pub fn for_all(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            apply_to_all: true,
        }
    }
}

/// An existing file whose content differs from the planned content.
#[derive(Debug, Clone, Copy)]
pub struct Conflict<'a> {
    pub path: &'a Path,
    /// The file still matches what the last run wrote.
    pub pristine: bool,
}

pub trait ConflictDecider {
    /// `None` leaves the file untouched.
    fn decide(&mut self, conflict: &Conflict<'_>) -> Option<Decision>;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy(pub ConflictPolicy);

impl ConflictDecider for FixedPolicy {
    fn decide(&mut self, _conflict: &Conflict<'_>) -> Option<Decision> {
        Some(Decision::for_all(self.0))
    }
}

/// Per-run decision state.
pub struct Resolver<'a> {
    decider: Option<&'a mut dyn ConflictDecider>,
    overwrite_pristine: bool,
    sticky: Option<ConflictPolicy>,
}

impl<'a> Resolver<'a> {
    pub fn new(decider: Option<&'a mut dyn ConflictDecider>, overwrite_pristine: bool) -> Self {
        Self {
            decider,
            overwrite_pristine,
            sticky: None,
        }
    }

    pub fn resolve(&mut self, conflict: &Conflict<'_>) -> ConflictPolicy {
        if conflict.pristine && self.overwrite_pristine {
            return ConflictPolicy::Overwrite;
        }
        if let Some(policy) = self.sticky {
            return policy;
        }
        let Some(decider) = self.decider.as_deref_mut() else {
            return ConflictPolicy::Skip;
        };
        match decider.decide(conflict) {
            Some(decision) => {
                if decision.apply_to_all {
                    self.sticky = Some(decision.policy);
                }
                decision.policy
            }
            None => ConflictPolicy::Skip,
        }
    }
}
