//! Command line arguments trait and default implementation.
//!
//! Uses clap for CLI parsing with:
//! - Help text (`--help`)
//! - Validation and clear error messages
//! - Loader strategy and timeout selection

use std::time::Duration;

use gitech_graphics::{LoadStrategy, LoaderConfig};

use crate::display::DisplaySettings;
use crate::scheme::RenderOptions;

/// Trait for parsing command line arguments.
///
/// Implement this trait to customize how the application is configured.
/// Every method has a default, so an implementation overrides only the
/// options it cares about.
///
/// # Example
///
/// ```ignore
/// use gitech_app::AppArgs;
///
/// struct BenchArgs;
///
/// impl AppArgs for BenchArgs {
///     fn parse() -> Self {
///         Self
///     }
///
///     fn max_frames(&self) -> Option<u64> {
///         Some(600)
///     }
///
///     fn loader_threads(&self) -> usize {
///         1
///     }
/// }
/// ```
pub trait AppArgs: Sized {
    /// Parse command line arguments.
    fn parse() -> Self;

    /// Initial back-buffer width.
    ///
    /// Default: 1280
    fn window_width(&self) -> u32 {
        1280
    }

    /// Initial back-buffer height.
    ///
    /// Default: 720
    fn window_height(&self) -> u32 {
        720
    }

    /// Whether to start fullscreen.
    ///
    /// Default: false
    fn fullscreen(&self) -> bool {
        false
    }

    /// Whether VSync is enabled.
    ///
    /// Default: true
    fn vsync(&self) -> bool {
        true
    }

    /// Window title.
    ///
    /// Default: "Virtual Museum"
    fn window_title(&self) -> &str {
        "Virtual Museum"
    }

    /// Exit after this many frames.
    ///
    /// Useful for automated runs that only need to verify the renderer
    /// starts, draws and shuts down cleanly.
    ///
    /// Default: `None` (run until stopped)
    fn max_frames(&self) -> Option<u64> {
        None
    }

    /// Number of resource loader threads.
    ///
    /// Default: available parallelism
    fn loader_threads(&self) -> usize {
        default_loader_threads()
    }

    /// How loader threads share work.
    ///
    /// Default: [`LoadStrategy::Queue`]
    fn load_strategy(&self) -> LoadStrategy {
        LoadStrategy::Queue
    }

    /// Sleep between registry scans for [`LoadStrategy::Poll`].
    ///
    /// Default: 1 ms
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(1)
    }

    /// Give up loading after this long.
    ///
    /// Default: `None` (wait forever)
    fn load_timeout(&self) -> Option<Duration> {
        None
    }

    /// Whether to open an audio device.
    ///
    /// Default: true
    fn audio(&self) -> bool {
        true
    }

    /// Optional effect switches.
    ///
    /// Default: every effect on
    fn render_options(&self) -> RenderOptions {
        RenderOptions::default()
    }

    /// Display mode assembled from the individual options.
    fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            width: self.window_width(),
            height: self.window_height(),
            fullscreen: self.fullscreen(),
            vsync: self.vsync(),
        }
    }

    /// Loader configuration assembled from the individual options.
    fn loader_config(&self) -> LoaderConfig {
        let config = LoaderConfig::default()
            .with_strategy(self.load_strategy())
            .with_poll_interval(self.poll_interval());
        match self.load_timeout() {
            Some(timeout) => config.with_timeout(timeout),
            None => config.without_timeout(),
        }
    }
}

fn default_loader_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

// ============================================================================
// CLI enums
// ============================================================================

/// Loader strategy selection for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliLoadStrategy {
    /// Shared work queue; idle threads block until loading completes.
    #[default]
    Queue,
    /// Every thread rescans the registry, sleeping between scans.
    Poll,
}

impl From<CliLoadStrategy> for LoadStrategy {
    fn from(cli: CliLoadStrategy) -> Self {
        match cli {
            CliLoadStrategy::Queue => LoadStrategy::Queue,
            CliLoadStrategy::Poll => LoadStrategy::Poll,
        }
    }
}

// ============================================================================
// Default App Args (with clap)
// ============================================================================

/// Default command line arguments implementation.
///
/// # Examples
///
/// ```bash
/// # Show help
/// ./virtual-museum --help
///
/// # Load on 8 threads, give up after 30 seconds
/// ./virtual-museum --loader-threads 8 --load-timeout-secs 30
///
/// # Headless smoke test: 100 frames, no audio
/// ./virtual-museum --max-frames 100 --no-audio
/// ```
#[derive(Debug, Clone)]
pub struct DefaultAppArgs {
    width: u32,
    height: u32,
    fullscreen: bool,
    vsync: bool,
    title: String,
    max_frames: Option<u64>,
    loader_threads: usize,
    load_strategy: LoadStrategy,
    poll_interval: Duration,
    load_timeout: Option<Duration>,
    audio: bool,
    render_options: RenderOptions,
}

impl Default for DefaultAppArgs {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
            title: "Virtual Museum".to_string(),
            max_frames: None,
            loader_threads: default_loader_threads(),
            load_strategy: LoadStrategy::Queue,
            poll_interval: Duration::from_millis(1),
            load_timeout: None,
            audio: true,
            render_options: RenderOptions::default(),
        }
    }
}

impl DefaultAppArgs {
    /// Set the back-buffer size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the maximum number of frames.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Set the number of loader threads.
    pub fn with_loader_threads(mut self, threads: usize) -> Self {
        self.loader_threads = threads;
        self
    }

    /// Set the loader strategy.
    pub fn with_load_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.load_strategy = strategy;
        self
    }

    /// Set a loading timeout.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Disable audio.
    pub fn without_audio(mut self) -> Self {
        self.audio = false;
        self
    }

    /// Set the effect switches.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }
}

mod native {
    use super::*;
    use clap::Parser;

    /// Virtual Museum arguments.
    #[derive(Parser, Debug)]
    #[command(
        name = "virtual-museum",
        about = "GITech virtual museum renderer",
        long_about = "Interactive renderer for the GITech virtual museum.\n\n\
            RESOURCE LOADING:\n\
            Every declared shader, texture, model and render target is created by a\n\
            pool of loader threads before the first frame.\n\
            \n\
            • queue (default): threads take records from a shared queue and block\n\
              until the last one is done.\n\
            \n\
            • poll: threads rescan the whole registry, sleeping between scans.\n\
            \n\
            Without --load-timeout-secs a resource that never finishes loading\n\
            blocks startup forever.\n\
            \n\
            EXAMPLES:\n\
              # Run headless for 10 frames\n\
              ./virtual-museum --max-frames 10 --no-audio\n\
            \n\
              # Poll-based loading on 4 threads\n\
              ./virtual-museum --loader-threads 4 --load-strategy poll",
        version
    )]
    pub(super) struct ClapArgs {
        /// Back-buffer width in pixels.
        #[arg(long, default_value = "1280", value_parser = clap::value_parser!(u32).range(1..))]
        pub width: u32,

        /// Back-buffer height in pixels.
        #[arg(long, default_value = "720", value_parser = clap::value_parser!(u32).range(1..))]
        pub height: u32,

        /// Start in fullscreen mode.
        #[arg(long)]
        pub fullscreen: bool,

        /// Disable vertical sync.
        #[arg(long)]
        pub no_vsync: bool,

        /// Exit after rendering N frames.
        #[arg(long)]
        pub max_frames: Option<u64>,

        /// Number of resource loader threads [default: available parallelism].
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        pub loader_threads: Option<u64>,

        /// How loader threads share work.
        #[arg(long, default_value = "queue", value_enum)]
        pub load_strategy: CliLoadStrategy,

        /// Sleep between registry scans with --load-strategy poll.
        #[arg(long, default_value = "1")]
        pub poll_interval_ms: u64,

        /// Abort startup if loading takes longer than this.
        #[arg(long)]
        pub load_timeout_secs: Option<f64>,

        /// Do not open an audio device.
        #[arg(long)]
        pub no_audio: bool,

        /// Switch an effect off (post_processing, ssao, bloom, lens_flare).
        #[arg(long = "disable", value_name = "EFFECT")]
        pub disabled: Vec<String>,
    }

    impl From<ClapArgs> for DefaultAppArgs {
        fn from(args: ClapArgs) -> Self {
            if args.poll_interval_ms != 1 && args.load_strategy != CliLoadStrategy::Poll {
                log::warn!(
                    "--poll-interval-ms has no effect with --load-strategy {:?}",
                    args.load_strategy
                );
            }

            let load_timeout = args
                .load_timeout_secs
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f64);
            if args.load_timeout_secs.is_some() && load_timeout.is_none() {
                log::warn!("Ignoring non-positive --load-timeout-secs; loading will not time out");
            }

            let mut render_options = RenderOptions::default();
            for name in &args.disabled {
                if !render_options.set(name, false) {
                    log::warn!(
                        "Unknown effect \"{name}\" for --disable; expected one of {:?}",
                        RenderOptions::NAMES
                    );
                }
            }

            Self {
                width: args.width,
                height: args.height,
                fullscreen: args.fullscreen,
                vsync: !args.no_vsync,
                title: "Virtual Museum".to_string(),
                max_frames: args.max_frames,
                loader_threads: args
                    .loader_threads
                    .map(|n| n as usize)
                    .unwrap_or_else(default_loader_threads),
                load_strategy: args.load_strategy.into(),
                poll_interval: Duration::from_millis(args.poll_interval_ms),
                load_timeout,
                audio: !args.no_audio,
                render_options,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn parse(args: &[&str]) -> DefaultAppArgs {
            let argv = std::iter::once("virtual-museum").chain(args.iter().copied());
            ClapArgs::try_parse_from(argv).unwrap().into()
        }

        #[test]
        fn test_defaults() {
            let args = parse(&[]);
            assert_eq!(args.window_width(), 1280);
            assert_eq!(args.window_height(), 720);
            assert!(args.vsync());
            assert!(args.audio());
            assert_eq!(args.load_strategy(), LoadStrategy::Queue);
            assert_eq!(args.load_timeout(), None);
            assert!(args.loader_threads() >= 1);
        }

        #[test]
        fn test_loader_flags() {
            let args = parse(&[
                "--loader-threads",
                "4",
                "--load-strategy",
                "poll",
                "--poll-interval-ms",
                "5",
                "--load-timeout-secs",
                "2.5",
                "--no-audio",
                "--max-frames",
                "10",
            ]);
            let config = args.loader_config();
            assert_eq!(args.loader_threads(), 4);
            assert_eq!(config.strategy, LoadStrategy::Poll);
            assert_eq!(config.poll_interval, Duration::from_millis(5));
            assert_eq!(config.timeout, Some(Duration::from_millis(2500)));
            assert!(!args.audio());
            assert_eq!(args.max_frames(), Some(10));
        }

        #[test]
        fn test_disable_flags() {
            let args = parse(&["--disable", "ssao", "--disable", "lens_flare", "--disable", "chromatic"]);
            let options = args.render_options();
            assert!(!options.ssao);
            assert!(!options.lens_flare);
            assert!(options.bloom);
            assert!(options.post_processing);
        }

        #[test]
        fn test_rejects_zero_sizes() {
            assert!(ClapArgs::try_parse_from(["virtual-museum", "--width", "0"]).is_err());
            assert!(ClapArgs::try_parse_from(["virtual-museum", "--loader-threads", "0"]).is_err());
        }

        #[test]
        fn test_non_positive_timeout_is_ignored() {
            let args = parse(&["--load-timeout-secs", "0"]);
            assert_eq!(args.load_timeout(), None);
        }
    }
}

impl AppArgs for DefaultAppArgs {
    fn parse() -> Self {
        use clap::Parser;
        native::ClapArgs::parse().into()
    }

    fn window_width(&self) -> u32 {
        self.width
    }

    fn window_height(&self) -> u32 {
        self.height
    }

    fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn vsync(&self) -> bool {
        self.vsync
    }

    fn window_title(&self) -> &str {
        &self.title
    }

    fn max_frames(&self) -> Option<u64> {
        self.max_frames
    }

    fn loader_threads(&self) -> usize {
        self.loader_threads
    }

    fn load_strategy(&self) -> LoadStrategy {
        self.load_strategy
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout
    }

    fn audio(&self) -> bool {
        self.audio
    }

    fn render_options(&self) -> RenderOptions {
        self.render_options
    }
}
