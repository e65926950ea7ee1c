use std::path::PathBuf;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;

use crate::util::create_out_directory;

/// Set up the stderr logger and, when a path is given, a run-log file.
/// Returns None (and keeps going) if the logger cannot be installed.
pub fn init_logging(log_filepath: Option<&PathBuf>) -> Option<Handle> {
    let console_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{h({l})} {m}{n}")))
        .build();

    let config = match log_filepath {
        Some(fp) => {
            if let Err(e) = create_out_directory(fp) {
                eprintln!("failed to create log directory for {fp:?}, {e}");
                return None;
            }
            let file_appender = match FileAppender::builder()
                .encoder(Box::new(PatternEncoder::new(
                    "[{d(%Y-%m-%d %H:%M:%S)}] {l} {m}{n}",
                )))
                .build(fp)
            {
                Ok(appender) => appender,
                Err(e) => {
                    eprintln!("failed to create log file at {fp:?}, {e}");
                    return None;
                }
            };
            Config::builder()
                .appender(
                    Appender::builder()
                        .build("stderr", Box::new(console_appender)),
                )
                .appender(
                    Appender::builder().build("file", Box::new(file_appender)),
                )
                .build(
                    Root::builder()
                        .appender("stderr")
                        .appender("file")
                        .build(LevelFilter::Info),
                )
        }
        None => Config::builder()
            .appender(
                Appender::builder().build("stderr", Box::new(console_appender)),
            )
            .build(Root::builder().appender("stderr").build(LevelFilter::Info)),
    };

    match config {
        Ok(config) => match log4rs::init_config(config) {
            Ok(handle) => Some(handle),
            Err(e) => {
                eprintln!("failed to install logger, {e}");
                None
            }
        },
        Err(e) => {
            eprintln!("failed to assemble logging config, {e}");
            None
        }
    }
}
