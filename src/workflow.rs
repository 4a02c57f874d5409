//! Kiosk workflow state machine.
//!
//! The FSM is purely input driven: it has no timers and never looks at the
//! clock. Every (state, input) pair is handled by the single `match` in
//! [`WorkflowFsm::handle`]; pairs without an explicit arm leave the context
//! untouched.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

pub const ACTION_SCAN: &str = "SCAN";
pub const ACTION_NEXT: &str = "NEXT";
pub const ACTION_BACK: &str = "BACK";
pub const ACTION_RETRY: &str = "RETRY";

/// Default number of assembly steps per set.
pub const DEFAULT_TOTAL_STEPS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Start,
    Scan,
    Choose,
    Assembly,
    Finish,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Start => "start",
            WorkflowState::Scan => "scan",
            WorkflowState::Choose => "choose",
            WorkflowState::Assembly => "assembly",
            WorkflowState::Finish => "finish",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs accepted by the workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowInput<'a> {
    /// A named action, normally the name of an activated button.
    Action(&'a str),
    /// Emitted once per scan cycle after detection has run.
    ScanComplete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowContext {
    pub state: WorkflowState,
    pub step_index: usize,
    pub selected_set: Option<String>,
}

impl Default for WorkflowContext {
    fn default() -> Self {
        Self {
            state: WorkflowState::Start,
            step_index: 0,
            selected_set: None,
        }
    }
}

/// A state change produced by [`WorkflowFsm::handle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: WorkflowState,
    pub to: WorkflowState,
}

/// Lookup for the number of assembly steps in a set.
pub trait StepCatalog: Send {
    fn total_steps(&self, set: &str) -> usize;
}

/// Same step count for every set.
#[derive(Clone, Copy, Debug)]
pub struct FixedSteps(pub usize);

impl Default for FixedSteps {
    fn default() -> Self {
        Self(DEFAULT_TOTAL_STEPS)
    }
}

impl StepCatalog for FixedSteps {
    fn total_steps(&self, _set: &str) -> usize {
        self.0
    }
}

/// Per-set step counts with a fallback for sets not listed.
#[derive(Clone, Debug)]
pub struct PerSetSteps {
    default: usize,
    overrides: HashMap<String, usize>,
}

impl PerSetSteps {
    pub fn new(default: usize, overrides: HashMap<String, usize>) -> Self {
        Self { default, overrides }
    }
}

impl StepCatalog for PerSetSteps {
    fn total_steps(&self, set: &str) -> usize {
        self.overrides.get(set).copied().unwrap_or(self.default)
    }
}

pub struct WorkflowFsm {
    context: WorkflowContext,
    known_sets: Vec<String>,
    catalog: Box<dyn StepCatalog>,
}

impl WorkflowFsm {
    pub fn new(known_sets: Vec<String>, catalog: Box<dyn StepCatalog>) -> Self {
        Self {
            context: WorkflowContext::default(),
            known_sets,
            catalog,
        }
    }

    /// FSM with the given sets and the default fixed step count.
    pub fn with_sets<I, S>(sets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            sets.into_iter().map(Into::into).collect(),
            Box::new(FixedSteps::default()),
        )
    }

    pub fn handle_input(&mut self, action: &str) -> Option<Transition> {
        self.handle(WorkflowInput::Action(action))
    }

    /// Apply one input. Returns the transition when the state changed.
    pub fn handle(&mut self, input: WorkflowInput<'_>) -> Option<Transition> {
        use WorkflowInput::{Action, ScanComplete};
        use WorkflowState::*;

        let from = self.context.state;
        let next = match (from, input) {
            (Start, Action(ACTION_SCAN)) => Some(Scan),
            (Start, _) => None,

            (Scan, _) => Some(Choose),

            (Choose, Action(set)) if self.is_known_set(set) => {
                self.context.selected_set = Some(set.to_string());
                self.context.step_index = 0;
                Some(Assembly)
            }
            (Choose, _) => None,

            (Assembly, Action(ACTION_NEXT)) => {
                self.context.step_index += 1;
                if self.context.step_index >= self.total_steps() {
                    Some(Finish)
                } else {
                    log::debug!("workflow: step {}", self.context.step_index + 1);
                    None
                }
            }
            (Assembly, Action(ACTION_BACK)) => {
                self.context.step_index = self.context.step_index.saturating_sub(1);
                log::debug!("workflow: step {}", self.context.step_index + 1);
                None
            }
            (Assembly, _) => None,

            (Finish, Action(ACTION_RETRY)) => Some(Start),
            (Finish, _) => None,
        };

        if input == ScanComplete && from != Scan {
            log::debug!("workflow: scan completion ignored in state {}", from);
        }

        next.map(|to| self.transition(to))
    }

    fn transition(&mut self, to: WorkflowState) -> Transition {
        let from = self.context.state;
        log::info!("workflow: {} -> {}", from, to);
        self.context.state = to;
        if to == WorkflowState::Start {
            self.reset();
        }
        Transition { from, to }
    }

    fn reset(&mut self) {
        self.context.step_index = 0;
        self.context.selected_set = None;
    }

    fn is_known_set(&self, action: &str) -> bool {
        self.known_sets.iter().any(|set| set == action)
    }

    /// Step count for the currently selected set.
    pub fn total_steps(&self) -> usize {
        self.context
            .selected_set
            .as_deref()
            .map(|set| self.catalog.total_steps(set))
            .unwrap_or(0)
    }

    pub fn current_state(&self) -> WorkflowState {
        self.context.state
    }

    pub fn current_step(&self) -> usize {
        self.context.step_index
    }

    pub fn current_selection(&self) -> Option<&str> {
        self.context.selected_set.as_deref()
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.context
    }

    pub fn known_sets(&self) -> &[String] {
        &self.known_sets
    }
}

impl fmt::Debug for WorkflowFsm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowFsm")
            .field("context", &self.context)
            .field("known_sets", &self.known_sets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETS: [&str; 4] = ["SET 1", "SET 2", "SET 3", "SET 4"];

    fn fsm() -> WorkflowFsm {
        WorkflowFsm::with_sets(SETS)
    }

    fn fsm_in(state: WorkflowState) -> WorkflowFsm {
        let mut fsm = fsm();
        match state {
            WorkflowState::Start => {}
            WorkflowState::Scan => {
                fsm.handle_input("SCAN");
            }
            WorkflowState::Choose => {
                fsm.handle_input("SCAN");
                fsm.handle(WorkflowInput::ScanComplete);
            }
            WorkflowState::Assembly => {
                fsm.handle_input("SCAN");
                fsm.handle(WorkflowInput::ScanComplete);
                fsm.handle_input("SET 3");
                fsm.handle_input("NEXT");
            }
            WorkflowState::Finish => {
                fsm.handle_input("SCAN");
                fsm.handle(WorkflowInput::ScanComplete);
                fsm.handle_input("SET 3");
                for _ in 0..DEFAULT_TOTAL_STEPS {
                    fsm.handle_input("NEXT");
                }
            }
        }
        assert_eq!(fsm.current_state(), state);
        fsm
    }

    #[test]
    fn unlisted_inputs_leave_context_unchanged() {
        let cases: [(WorkflowState, &[&str]); 4] = [
            (WorkflowState::Start, &["NEXT", "BACK", "RETRY", "SET 1", "scan", ""]),
            (WorkflowState::Choose, &["SCAN", "NEXT", "BACK", "RETRY", "SET 9", "set 1"]),
            (WorkflowState::Assembly, &["SCAN", "RETRY", "SET 1", "next"]),
            (WorkflowState::Finish, &["SCAN", "NEXT", "BACK", "SET 2", "retry"]),
        ];
        for (state, actions) in cases {
            for action in actions {
                let mut fsm = fsm_in(state);
                let before = fsm.context().clone();
                assert_eq!(fsm.handle_input(action), None, "{state} / {action}");
                assert_eq!(fsm.context(), &before, "{state} / {action}");
            }
        }
    }

    #[test]
    fn scan_complete_is_ignored_outside_scan() {
        for state in [
            WorkflowState::Start,
            WorkflowState::Choose,
            WorkflowState::Assembly,
            WorkflowState::Finish,
        ] {
            let mut fsm = fsm_in(state);
            let before = fsm.context().clone();
            assert_eq!(fsm.handle(WorkflowInput::ScanComplete), None);
            assert_eq!(fsm.context(), &before);
        }
    }

    #[test]
    fn any_input_leaves_scan_for_choose() {
        for input in ["SCAN", "whatever", "SET 1"] {
            let mut fsm = fsm_in(WorkflowState::Scan);
            let transition = fsm.handle_input(input);
            assert_eq!(
                transition,
                Some(Transition {
                    from: WorkflowState::Scan,
                    to: WorkflowState::Choose
                })
            );
            assert_eq!(fsm.current_selection(), None);
        }
    }

    #[test]
    fn choosing_a_set_enters_assembly_at_step_zero() {
        let mut fsm = fsm_in(WorkflowState::Choose);
        fsm.handle_input("SET 2");
        assert_eq!(fsm.current_state(), WorkflowState::Assembly);
        assert_eq!(fsm.current_step(), 0);
        assert_eq!(fsm.current_selection(), Some("SET 2"));
    }

    #[test]
    fn back_at_first_step_is_a_noop() {
        let mut fsm = fsm_in(WorkflowState::Choose);
        fsm.handle_input("SET 1");
        fsm.handle_input("BACK");
        fsm.handle_input("BACK");
        assert_eq!(fsm.current_step(), 0);
        assert_eq!(fsm.current_state(), WorkflowState::Assembly);

        fsm.handle_input("NEXT");
        fsm.handle_input("NEXT");
        fsm.handle_input("BACK");
        assert_eq!(fsm.current_step(), 1);
    }

    #[test]
    fn finish_is_reached_exactly_at_total_steps() {
        let mut fsm = fsm_in(WorkflowState::Choose);
        fsm.handle_input("SET 4");
        for step in 1..DEFAULT_TOTAL_STEPS {
            assert_eq!(fsm.handle_input("NEXT"), None);
            assert_eq!(fsm.current_step(), step);
            assert_eq!(fsm.current_state(), WorkflowState::Assembly);
        }
        let transition = fsm.handle_input("NEXT");
        assert_eq!(transition.map(|t| t.to), Some(WorkflowState::Finish));
        assert_eq!(fsm.current_step(), DEFAULT_TOTAL_STEPS);
    }

    #[test]
    fn retry_resets_context() {
        let mut fsm = fsm_in(WorkflowState::Finish);
        assert_eq!(fsm.current_selection(), Some("SET 3"));
        fsm.handle_input("RETRY");
        assert_eq!(fsm.context(), &WorkflowContext::default());

        // a second full cycle starts from the same clean context
        fsm.handle_input("SCAN");
        fsm.handle(WorkflowInput::ScanComplete);
        fsm.handle_input("SET 1");
        fsm.handle_input("NEXT");
        for _ in 0..DEFAULT_TOTAL_STEPS {
            fsm.handle_input("NEXT");
        }
        fsm.handle_input("RETRY");
        assert_eq!(fsm.context(), &WorkflowContext::default());
    }

    #[test]
    fn per_set_catalog_controls_finish() {
        let mut overrides = HashMap::new();
        overrides.insert("SET 2".to_string(), 2);
        let mut fsm = WorkflowFsm::new(
            SETS.iter().map(|s| s.to_string()).collect(),
            Box::new(PerSetSteps::new(7, overrides)),
        );
        fsm.handle_input("SCAN");
        fsm.handle(WorkflowInput::ScanComplete);
        fsm.handle_input("SET 2");
        assert_eq!(fsm.total_steps(), 2);
        fsm.handle_input("NEXT");
        fsm.handle_input("NEXT");
        assert_eq!(fsm.current_state(), WorkflowState::Finish);

        fsm.handle_input("RETRY");
        fsm.handle_input("SCAN");
        fsm.handle(WorkflowInput::ScanComplete);
        fsm.handle_input("SET 1");
        assert_eq!(fsm.total_steps(), 7);
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&WorkflowState::Assembly).unwrap(),
            "\"assembly\""
        );
        assert_eq!(WorkflowState::Choose.to_string(), "choose");
    }
}
