use natpack_schema::DEFAULT_INSTALL_DIR;
use std::path::PathBuf;

/// Per-orchestrator build configuration.
///
/// Each orchestrator owns its own value: settings are moved in when the
/// config is built and never shared with other instances.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig<S> {
    pub install_dir: PathBuf,
    /// Extra runtime arguments, in order.
    pub args: Vec<String>,
    pub settings: S,
}

impl<S: Default> Default for BuildConfig<S> {
    fn default() -> Self {
        Self::with_settings(S::default())
    }
}

impl<S: Default> BuildConfig<S> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> BuildConfig<S> {
    pub fn with_settings(settings: S) -> Self {
        Self {
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            args: Vec::new(),
            settings,
        }
    }

    #[must_use]
    pub fn install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = dir.into();
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_owned());
        self
    }

    #[must_use]
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}
