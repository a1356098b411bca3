use crate::RuntimeError;
use natpack_schema::Platform;
use std::path::Path;

/// Everything an initializer receives once the bundle is in place.
#[derive(Debug)]
pub struct LaunchRequest<'a, S> {
    pub install_dir: &'a Path,
    pub platform: Platform,
    /// Final argument list, reserved keys already applied.
    pub args: Vec<String>,
    /// Opaque settings, passed through unchanged.
    pub settings: &'a S,
}

/// Loads the native runtime from a prepared install directory.
///
/// Called at most once per orchestrator. The returned handle is published
/// and then shared by reference with every caller.
pub trait RuntimeInitializer: Send + Sync {
    type Settings: Clone + Send + Sync;
    type Handle: Send + Sync;

    fn name(&self) -> &str;

    fn initialize(
        &self,
        request: &LaunchRequest<'_, Self::Settings>,
    ) -> Result<Self::Handle, RuntimeError>;
}
