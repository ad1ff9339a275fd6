mod bail;
mod shutdown;

pub mod prelude {
    pub use crate::bail::StepBailError;
    pub use crate::shutdown::{ShutdownHandle, ShutdownListener, ShutdownSignalError};
}
