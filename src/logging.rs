use std::backtrace::Backtrace;

use tracing_subscriber::{EnvFilter, fmt};

/// How chatty a run is, picked with `-q` or repeated `-v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Trace,
}

impl Verbosity {
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, 0) => Verbosity::Normal,
            (false, 1) => Verbosity::Verbose,
            (false, _) => Verbosity::Trace,
        }
    }

    /// Filter directives that replace `RUST_LOG`; `None` at normal verbosity.
    pub fn directives(self, log_level: &str) -> Option<String> {
        match self {
            Verbosity::Quiet => Some("warn".to_string()),
            Verbosity::Normal => None,
            Verbosity::Verbose => Some(format!("{log_level},oxide_codegen=debug")),
            Verbosity::Trace => Some(format!("{log_level},oxide_codegen=trace")),
        }
    }
}

/// `RUST_LOG` wins over `log_level` unless `-q`/`-v` was given. Output goes
/// to stderr so generated listings on stdout stay machine readable.
pub fn init_tracing(log_level: &str, verbosity: Verbosity) {
    let filter = match verbosity.directives(log_level) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= Verbosity::Verbose)
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();
}

fn set_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let message = if let Some(message) = info.payload().downcast_ref::<&str>() {
            *message
        } else if let Some(message) = info.payload().downcast_ref::<String>() {
            message.as_str()
        } else {
            "unknown panic"
        };

        let backtrace = Backtrace::capture();

        if let Some(location) = info.location() {
            tracing::error!(
                panic = %message,
                location = %location,
                backtrace = %backtrace,
                "codegen panicked"
            );
        } else {
            tracing::error!(panic = %message, backtrace = %backtrace, "codegen panicked");
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_beats_verbose() {
        assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(3, false), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(2, true), Verbosity::Quiet);
    }

    #[test]
    fn verbose_runs_raise_only_this_crate() {
        assert_eq!(Verbosity::Normal.directives("info"), None);
        assert_eq!(Verbosity::Quiet.directives("info").as_deref(), Some("warn"));
        assert_eq!(
            Verbosity::Verbose.directives("info,hyper=warn").as_deref(),
            Some("info,hyper=warn,oxide_codegen=debug")
        );
        let directives = Verbosity::Trace.directives("info").expect("trace directives");
        EnvFilter::try_new(&directives).expect("directives parse");
    }
}
