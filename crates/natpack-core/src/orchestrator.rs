use crate::config::BuildConfig;
use crate::flight::SingleFlight;
use crate::lifecycle::BuildState;
use crate::progress::{Estimate, LogProgress, ProgressSink, ProgressStage};
use crate::CoreError;
use natpack_remote::{ArtifactFetcher, HttpFetcher, RemoteConfig};
use natpack_runtime::{
    plan_launch_args, select_hardener, LaunchRequest, PlatformHardener, RuntimeInitializer,
};
use natpack_schema::{BuildInfo, Platform};
use natpack_store::{
    check_installation, extract_tar_gz, open_inner_archive, BundleLocator, ExtractReport,
    InstallLayout, LocalBundleLocator, INNER_ARCHIVE_SUFFIX,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prepares the native bundle once and initializes the runtime from it.
///
/// `build()` may be called from any number of threads. The first call
/// checks the install directory, installs the bundle if needed and calls
/// the initializer; every call, concurrent or later, returns the same
/// handle or the same error. A failed orchestrator stays failed: build a
/// new one to retry.
///
/// Two processes pointing at the same install directory are not
/// coordinated with each other.
pub struct Orchestrator<I: RuntimeInitializer> {
    config: BuildConfig<I::Settings>,
    info: BuildInfo,
    platform: Platform,
    initializer: I,
    locator: Box<dyn BundleLocator>,
    fetcher: Box<dyn ArtifactFetcher>,
    hardener: Box<dyn PlatformHardener>,
    progress: Box<dyn ProgressSink>,
    flight: SingleFlight<I::Handle>,
}

impl<I: RuntimeInitializer> Orchestrator<I> {
    /// Orchestrator for the current platform with the default locator,
    /// mirrors, hardener and log-based progress.
    pub fn new(
        config: BuildConfig<I::Settings>,
        info: BuildInfo,
        initializer: I,
    ) -> Result<Self, CoreError> {
        let platform = Platform::current()?;
        Ok(Self::for_platform(config, info, initializer, platform))
    }

    pub fn for_platform(
        config: BuildConfig<I::Settings>,
        info: BuildInfo,
        initializer: I,
        platform: Platform,
    ) -> Self {
        Self {
            config,
            info,
            platform,
            initializer,
            locator: Box::new(LocalBundleLocator::default()),
            fetcher: Box::new(HttpFetcher::new(RemoteConfig::default())),
            hardener: select_hardener(platform.os),
            progress: Box::new(LogProgress::new()),
            flight: SingleFlight::new(),
        }
    }

    #[must_use]
    pub fn with_locator(mut self, locator: impl BundleLocator + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    #[must_use]
    pub fn with_fetcher(mut self, fetcher: impl ArtifactFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    #[must_use]
    pub fn with_hardener(mut self, hardener: impl PlatformHardener + 'static) -> Self {
        self.hardener = Box::new(hardener);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn config(&self) -> &BuildConfig<I::Settings> {
        &self.config
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.info
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn initializer(&self) -> &I {
        &self.initializer
    }

    pub fn status(&self) -> BuildState {
        self.flight.state()
    }

    /// The handle, if a build already completed.
    pub fn handle(&self) -> Option<&I::Handle> {
        self.flight.get()
    }

    pub fn build(&self) -> Result<&I::Handle, Arc<CoreError>> {
        self.flight.run(
            || self.run_build(),
            |_| self.progress.report(ProgressStage::Initialized, Estimate::Fraction(1.0)),
        )
    }

    fn run_build(&self) -> Result<I::Handle, CoreError> {
        let layout = InstallLayout::new(&self.config.install_dir);
        self.progress.report(ProgressStage::Locating, Estimate::Unknown);

        if check_installation(layout.root(), &self.info) {
            info!(
                "release {} already installed at {}",
                self.info.release_tag,
                layout.root().display()
            );
        } else {
            self.install(&layout)?;
        }

        self.progress.report(ProgressStage::Initializing, Estimate::Unknown);
        let request = LaunchRequest {
            install_dir: layout.root(),
            platform: self.platform,
            args: plan_launch_args(layout.root(), self.platform, &self.config.args),
            settings: &self.config.settings,
        };
        debug!(
            "initializing with {} and {} arguments",
            self.initializer.name(),
            request.args.len()
        );
        let handle = self.initializer.initialize(&request)?;
        Ok(handle)
    }

    fn install(&self, layout: &InstallLayout) -> Result<(), CoreError> {
        info!(
            "installing release {} for {} into {}",
            self.info.release_tag,
            self.platform,
            layout.root().display()
        );
        layout.reset()?;

        let report = match self.locator.locate(&self.info, self.platform)? {
            Some(stream) => {
                info!("using bundle shipped with the application");
                self.progress.report(ProgressStage::Extracting, Estimate::Unknown);
                extract_tar_gz(stream, layout.root())?
            }
            None => self.download_and_extract(layout)?,
        };
        self.progress.report(ProgressStage::Extracting, Estimate::Fraction(1.0));
        debug!("extracted {} files ({} bytes)", report.files, report.bytes);

        layout.ensure_build_meta(&self.info)?;

        self.progress.report(ProgressStage::Installing, Estimate::Unknown);
        if let Err(e) = self.hardener.harden(layout.root()) {
            warn!("{} hardening failed, continuing: {e}", self.hardener.name());
        }
        layout.write_marker()?;
        self.progress.report(ProgressStage::Installing, Estimate::Fraction(1.0));
        Ok(())
    }

    fn download_and_extract(&self, layout: &InstallLayout) -> Result<ExtractReport, CoreError> {
        self.progress.report(ProgressStage::Downloading, Estimate::Unknown);
        let temp = layout.download_temp();
        self.fetcher.fetch(&self.info, self.platform, &temp, &mut |estimate| {
            self.progress.report(ProgressStage::Downloading, estimate);
        })?;

        let mut inner = open_inner_archive(&temp, INNER_ARCHIVE_SUFFIX)?;
        self.progress.report(ProgressStage::Extracting, Estimate::Unknown);
        let report = inner.extract_to(layout.root())?;
        drop(inner);
        layout.remove_download_temp()?;
        Ok(report)
    }
}
