//! Specialist tools.
//!
//! A closed set: each tool is a concrete struct with a typed `execute`
//! signature, and [`ToolId`] is the static dispatch key specialists use to
//! report which tools contributed to a response. No runtime name matching —
//! adding a tool means a new module, a new variant, and a new registration
//! in the specialist that uses it.
//!
//! Common contract: deterministic tools never propagate internal failures —
//! they are captured into `{success: false, error, echoed input}` envelopes.
//! The knowledge base, being generation-backed, additionally propagates
//! `ServiceUnavailable`.

pub mod calculator;
pub mod constants;
pub mod knowledge;

pub use calculator::{CalcValue, Calculation, Calculator, ResultKind};
pub use constants::{ConstantEntry, ConstantLookup, PhysicsConstants};
pub use knowledge::{KnowledgeBase, KnowledgeOutcome};

use serde::{Serialize, Serializer};

/// Identifier for every tool a specialist can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolId {
    Calculator,
    PhysicsConstants,
    KnowledgeBase,
}

impl ToolId {
    pub fn name(&self) -> &'static str {
        match self {
            ToolId::Calculator => "Calculator",
            ToolId::PhysicsConstants => "PhysicsConstants",
            ToolId::KnowledgeBase => "KnowledgeBase",
        }
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ToolId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
