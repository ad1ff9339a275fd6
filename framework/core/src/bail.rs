/// Return this error from a step hook to abandon the remaining steps of a scenario.
///
/// This is reserved for conditions that make every following step meaningless, such as
/// configuration that prevents a backend client from being constructed at all. Ordinary backend
/// failures should be folded into the step's measurements instead, so that the scenario keeps
/// running and the report reflects the partial outcome.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct StepBailError {
    msg: String,
}

impl StepBailError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl Default for StepBailError {
    fn default() -> Self {
        Self {
            msg: "Step is bailing".to_string(),
        }
    }
}
