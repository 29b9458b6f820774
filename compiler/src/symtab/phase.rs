//! Phase chain and periods
//!
//! Phases form an ordered chain built once per compiler setup. Each phase
//! accumulates the flags visible at or before it, and derived predicates such
//! as `erased_types` are computed from the *name* of an earlier phase so that
//! host tools can insert their own phases without sharing a phase type.

use super::flags::Flags;
use super::id_types::{PhaseId, RunId};
use std::fmt;

/// Upper bound on the number of phases in one chain
pub const MAX_PHASES: usize = 256;

/// A (run, phase) pair packed into one word. `Period::NONE` is "not valid".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Period(u32);

impl Period {
    pub const NONE: Period = Period(0);

    pub const fn new(run: RunId, phase: PhaseId) -> Self {
        Self((run << 8) | phase as u32)
    }

    pub const fn run_id(self) -> RunId {
        self.0 >> 8
    }

    pub const fn phase_id(self) -> PhaseId {
        (self.0 & 0xFF) as PhaseId
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    pub const fn with_phase(self, phase: PhaseId) -> Self {
        Self::new(self.run_id(), phase)
    }
}

impl fmt::Debug for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Period(none)")
        } else {
            write!(f, "Period(run {}, phase {})", self.run_id(), self.phase_id())
        }
    }
}

/// Late-bound markers used by the derived phase predicates.
///
/// A predicate holds once a phase with the marker's name has run, matched by
/// name rather than by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseMarker {
    Erasure,
    Flatten,
    Specialize,
    RefChecks,
    Fields,
}

impl PhaseMarker {
    pub const ALL: [PhaseMarker; 5] = [
        PhaseMarker::Erasure,
        PhaseMarker::Flatten,
        PhaseMarker::Specialize,
        PhaseMarker::RefChecks,
        PhaseMarker::Fields,
    ];

    pub const fn phase_name(self) -> &'static str {
        match self {
            PhaseMarker::Erasure => "erasure",
            PhaseMarker::Flatten => "flatten",
            PhaseMarker::Specialize => "specialize",
            PhaseMarker::RefChecks => "refchecks",
            PhaseMarker::Fields => "fields",
        }
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Static description of a phase used to build a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSpec {
    pub name: String,
    /// Flags that become visible entering this phase
    pub new_flags: Flags,
    /// Flags that become visible in the phase after this one
    pub next_flags: Flags,
}

impl PhaseSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            new_flags: Flags::NONE,
            next_flags: Flags::NONE,
        }
    }

    pub fn with_new_flags(mut self, flags: Flags) -> Self {
        self.new_flags = flags;
        self
    }

    pub fn with_next_flags(mut self, flags: Flags) -> Self {
        self.next_flags = flags;
        self
    }
}

/// One link of the phase chain
#[derive(Debug, Clone)]
pub struct Phase {
    pub id: PhaseId,
    pub name: String,
    pub prev: Option<PhaseId>,
    pub new_flags: Flags,
    pub next_flags: Flags,
    flag_mask: Flags,
    /// Markers that hold in this phase, fixed at construction
    markers: u8,
}

impl Phase {
    pub fn flag_mask(&self) -> Flags {
        self.flag_mask
    }

    pub fn holds(&self, marker: PhaseMarker) -> bool {
        self.markers & marker.bit() != 0
    }

    pub fn erased_types(&self) -> bool {
        self.holds(PhaseMarker::Erasure)
    }

    pub fn flat_classes(&self) -> bool {
        self.holds(PhaseMarker::Flatten)
    }

    pub fn specialized(&self) -> bool {
        self.holds(PhaseMarker::Specialize)
    }

    pub fn ref_checked(&self) -> bool {
        self.holds(PhaseMarker::RefChecks)
    }

    pub fn assigns_fields(&self) -> bool {
        self.holds(PhaseMarker::Fields)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An ordered chain of phases rooted at `<no phase>`
#[derive(Debug, Clone)]
pub struct PhaseChain {
    phases: Vec<Phase>,
}

impl PhaseChain {
    pub const NO_PHASE: PhaseId = 0;
    pub const NO_PHASE_NAME: &'static str = "<no phase>";
    pub const SOME_PHASE_NAME: &'static str = "<some phase>";

    /// Build a chain from phase specs; `<no phase>` is prepended as id 0.
    ///
    /// Panics if more than `MAX_PHASES - 1` phases are given.
    pub fn new(specs: &[PhaseSpec]) -> Self {
        assert!(specs.len() < MAX_PHASES, "too many phases: {}", specs.len());
        let mut phases: Vec<Phase> = Vec::with_capacity(specs.len() + 1);
        phases.push(Phase {
            id: Self::NO_PHASE,
            name: Self::NO_PHASE_NAME.to_string(),
            prev: None,
            new_flags: Flags::NONE,
            next_flags: Flags::NONE,
            flag_mask: Flags::INITIAL_FLAGS,
            markers: 0,
        });
        for spec in specs {
            let prev = &phases[phases.len() - 1];
            let id = prev.id + 1;
            let flag_mask = prev.flag_mask | prev.next_flags | spec.new_flags;
            // The first real phase has <no phase> as prev and inherits nothing.
            let markers = if prev.id == Self::NO_PHASE {
                0
            } else {
                PhaseMarker::ALL
                    .iter()
                    .filter(|m| prev.name == m.phase_name())
                    .fold(prev.markers, |acc, m| acc | m.bit())
            };
            phases.push(Phase {
                id,
                name: spec.name.clone(),
                prev: Some(prev.id),
                new_flags: spec.new_flags,
                next_flags: spec.next_flags,
                flag_mask,
                markers,
            });
        }
        Self { phases }
    }

    /// The placeholder chain installed before a real one is configured
    pub fn placeholder() -> Self {
        Self::new(&[PhaseSpec::new(Self::SOME_PHASE_NAME)])
    }

    /// The standard phase plan of a full compiler pipeline
    pub fn standard() -> Self {
        Self::new(&standard_phase_specs())
    }

    pub fn get(&self, id: PhaseId) -> &Phase {
        self.phases.get(id as usize).unwrap_or(&self.phases[0])
    }

    pub fn by_name(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// The phase after `id`; the last phase is its own successor
    pub fn next(&self, id: PhaseId) -> PhaseId {
        if (id as usize) + 1 < self.phases.len() {
            id + 1
        } else {
            id
        }
    }

    pub fn has_next(&self, id: PhaseId) -> bool {
        self.next(id) != id
    }

    pub fn prev(&self, id: PhaseId) -> Option<PhaseId> {
        self.get(id).prev
    }

    /// The first real phase (or `<no phase>` for an empty chain)
    pub fn first(&self) -> PhaseId {
        self.next(Self::NO_PHASE)
    }

    pub fn last(&self) -> PhaseId {
        (self.phases.len() - 1) as PhaseId
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.len() <= 1
    }

    /// Iterate over the real phases starting at `from`
    pub fn iter_from(&self, from: PhaseId) -> impl Iterator<Item = &Phase> {
        self.phases.iter().skip((from as usize).max(1))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Phase> {
        self.iter_from(self.first())
    }
}

impl Default for PhaseChain {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Phase plan of a full pipeline, with the late flags each phase admits
pub fn standard_phase_specs() -> Vec<PhaseSpec> {
    vec![
        PhaseSpec::new("parser"),
        PhaseSpec::new("namer"),
        PhaseSpec::new("packageobjects"),
        PhaseSpec::new("typer"),
        PhaseSpec::new("pickler"),
        PhaseSpec::new("refchecks").with_new_flags(Flags::LATE_METHOD),
        PhaseSpec::new("uncurry"),
        PhaseSpec::new("fields"),
        PhaseSpec::new("tailcalls"),
        PhaseSpec::new("specialize"),
        PhaseSpec::new("explicitouter").with_new_flags(Flags::NOT_PROTECTED),
        PhaseSpec::new("erasure")
            .with_next_flags(Flags::LATE_DEFERRED | Flags::LATE_INTERFACE),
        PhaseSpec::new("posterasure"),
        PhaseSpec::new("lambdalift").with_next_flags(Flags::LATE_FINAL),
        PhaseSpec::new("constructors"),
        PhaseSpec::new("flatten"),
        PhaseSpec::new("mixin").with_new_flags(Flags::LATE_MODULE | Flags::NOT_OVERRIDE),
        PhaseSpec::new("cleanup"),
        PhaseSpec::new("jvm").with_new_flags(Flags::NOT_PRIVATE | Flags::LATE_PRIVATE),
        PhaseSpec::new("terminal"),
    ]
}
