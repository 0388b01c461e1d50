use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::LevelFilter;
use log::Level;
use env_logger::{Builder, Env, fmt::Color};
use std::io::Write;
use std::sync::OnceLock;

static INSTANCE: OnceLock<Logger> = OnceLock::new();

/// Process-wide logging + progress-bar handle.
///
/// A single [`ProgressBar`] is kept here rather than the `MultiProgress` the
/// teacher crate exposes: this tool drives one input stream at a time, so
/// there is never more than one bar to draw.
#[derive(Debug)]
pub struct Logger {
    progress: ProgressBar,
}

impl Logger {
    /// Initialize the global logger and progress bar.
    ///
    /// `verbosity` follows the CLI's `-v` occurrence count; 0 means
    /// warnings+errors only, higher values progressively enable info, debug
    /// and trace. The `VCFVALIDATE_LOG` environment variable overrides the
    /// computed level, the same convention as the teacher's `GRUPS_LOG`.
    pub fn init(verbosity: u8) {
        let log_level = Self::u8_to_loglevel(verbosity);
        let env = Env::default().filter("VCFVALIDATE_LOG");

        let logger = Builder::new().filter_level(log_level)
            .format(|buf, record| {
                let traceback: String;
                let set_intensity: bool;
                if record.level() == LevelFilter::Error {
                    traceback = format!("(@ {}:{}) ", record.file().unwrap_or("unknown"), record.line().unwrap_or(0));
                    set_intensity = true;
                } else {
                    traceback = String::new();
                    set_intensity = false;
                };

                let mut arg_style = buf.style();
                arg_style.set_intense(set_intensity);

                let mut level_style = buf.style();
                let color = match record.level() {
                    Level::Error => Color::Red,
                    Level::Warn  => Color::Yellow,
                    Level::Info  => Color::Green,
                    Level::Debug => Color::Blue,
                    Level::Trace => Color::Cyan,
                };
                level_style.set_color(color).set_bold(true);

                writeln!(
                    buf,
                    "[{} {: <5} {}] {traceback}{}",
                    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                    level_style.value(record.level()),
                    record.target(),
                    arg_style.value(record.args())
                )
            })
            .parse_env(env)
            .build();

        let progress = ProgressBar::hidden();
        LogWrapper::new(progress.clone(), logger)
            .try_init()
            .expect("Failed to wrap logger with progress bar");
        let _ = INSTANCE.set(Self { progress });
    }

    fn u8_to_loglevel(verbosity: u8) -> LevelFilter {
        match verbosity {
            0            => LevelFilter::Error,
            1            => LevelFilter::Warn,
            2            => LevelFilter::Info,
            3            => LevelFilter::Debug,
            4..= u8::MAX => LevelFilter::Trace,
        }
    }

    pub fn set_level(verbosity: u8) {
        log::set_max_level(Self::u8_to_loglevel(verbosity));
    }

    /// Show a single progress bar tracking bytes consumed out of `total_len`
    /// (use `None` when the total length is unknown, e.g. reading from a
    /// pipe, which draws a spinner instead of a bar).
    pub fn show_progress(total_len: Option<u64>) {
        let Some(logger) = INSTANCE.get() else { return };
        match total_len {
            Some(len) => {
                logger.progress.set_length(len);
                logger.progress.set_style(
                    ProgressStyle::with_template("{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                );
            }
            None => logger.progress.set_style(
                ProgressStyle::with_template("{spinner} {bytes} read")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
            ),
        }
        logger.progress.set_draw_target(ProgressDrawTarget::stderr());
    }

    /// Progress callback usable directly as the `vcf-io` reader's
    /// byte-count hook.
    pub fn progress_callback() -> impl FnMut(u64) {
        move |bytes_read: u64| {
            if let Some(logger) = INSTANCE.get() {
                logger.progress.set_position(bytes_read);
            }
        }
    }

    pub fn finish_progress() {
        if let Some(logger) = INSTANCE.get() {
            logger.progress.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level() {
        Logger::init(0);
        for level in 0..u8::MAX {
            Logger::set_level(level);

            let expected_level = match level {
                0           => LevelFilter::Error,
                1           => LevelFilter::Warn,
                2           => LevelFilter::Info,
                3           => LevelFilter::Debug,
                4..=u8::MAX => LevelFilter::Trace,
            };

            assert_eq!(log::max_level(), expected_level);
        }
    }
}
