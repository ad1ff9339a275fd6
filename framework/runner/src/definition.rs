use crate::cli::ProbeScenarioCli;
use crate::context::{StepContext, UserValuesConstraint};

pub type HookResult = anyhow::Result<()>;

pub type StepHook<V> = fn(&mut StepContext<V>) -> HookResult;

pub(crate) struct Step<V: UserValuesConstraint> {
    pub(crate) name: String,
    pub(crate) hook: StepHook<V>,
}

/// The builder for a scenario definition.
///
/// A scenario is an ordered pipeline of named steps with an optional setup hook before them and
/// an optional teardown hook that is guaranteed to run after them, whatever happened in between.
pub struct ScenarioDefinitionBuilder<V: UserValuesConstraint> {
    /// The name of the scenario, which should be unique within the test suite.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: ProbeScenarioCli,
    setup_fn: Option<StepHook<V>>,
    steps: Vec<Step<V>>,
    teardown_fn: Option<StepHook<V>>,
}

pub(crate) struct ScenarioDefinition<V: UserValuesConstraint> {
    pub(crate) name: String,
    pub(crate) cli: ProbeScenarioCli,
    pub(crate) setup_fn: Option<StepHook<V>>,
    pub(crate) steps: Vec<Step<V>>,
    pub(crate) teardown_fn: Option<StepHook<V>>,
}

impl<V: UserValuesConstraint> ScenarioDefinitionBuilder<V> {
    /// Initialise a new scenario definition from the scenario name and parsed command line
    /// arguments.
    pub fn new(name: &str, cli: ProbeScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            setup_fn: None,
            steps: Vec::new(),
            teardown_fn: None,
        }
    }

    /// Initialise logging, parse the command line and create the builder from them.
    pub fn new_with_init(name: &str) -> Self {
        let cli = crate::init::init();
        Self::new(name, cli)
    }

    /// Set the setup hook for this scenario. It runs once, before the first step; an error here
    /// is fatal to the scenario.
    pub fn use_setup(mut self, setup_fn: StepHook<V>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Append a step to the pipeline. Steps run in the order they were added and their label
    /// carries their 1-based position.
    pub fn add_step(mut self, name: &str, hook: StepHook<V>) -> Self {
        if self.steps.iter().any(|s| s.name == name) {
            panic!("Step [{}] is already defined", name);
        }

        self.steps.push(Step {
            name: name.to_string(),
            hook,
        });
        self
    }

    /// Set the teardown hook. It runs after the last step on every path, including a bailed or
    /// interrupted run; its errors are logged and never affect the verdict.
    pub fn use_teardown(mut self, teardown_fn: StepHook<V>) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    pub fn cli(&self) -> &ProbeScenarioCli {
        &self.cli
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition<V>> {
        if self.steps.is_empty() {
            anyhow::bail!("Scenario [{}] has no steps", self.name);
        }

        Ok(ScenarioDefinition {
            name: self.name,
            cli: self.cli,
            setup_fn: self.setup_fn,
            steps: self.steps,
            teardown_fn: self.teardown_fn,
        })
    }
}
