//! Console logging with the structured and sugared handles.

use std::time::Duration;

use pplog::{Config, Field, field};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (logger, sugar) = pplog::new_logger(Config::new().with_console(true).with_level("Debug"))?;

    logger.debug("starting", &[]);
    logger.info(
        "request served",
        &[
            field("path", "/health"),
            Field::duration("took", Duration::from_millis(1500)),
        ],
    );
    sugar.warnf(format_args!("{} retries left", 2));
    sugar.named("db").errorw("query failed", &[("table", &"users")]);

    Ok(())
}
