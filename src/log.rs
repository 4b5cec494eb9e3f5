// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Log module provides various log functions, reference
//! https://docs.rs/log4rs

use log::LevelFilter;
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

/// init logs system
///
/// Writes to the given file. Returns quietly if a logger is already
/// installed so embedding applications keep theirs.
#[allow(unused)]
pub fn init_log(level: LevelFilter, file_path: &str) {
    let logfile = match FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {l} {t} {m}{n}",
        )))
        .build(file_path)
    {
        Ok(f) => f,
        Err(_) => return,
    };
    let config = match Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build("logfile", Box::new(logfile)),
        )
        .build(Root::builder().appender("logfile").build(level))
    {
        Ok(c) => c,
        Err(_) => return,
    };
    let _ = log4rs::init_config(config);
}
