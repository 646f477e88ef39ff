//! File logging with rotation and compressed backups.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;

    let logger = pplog::builder()
        .with_console(true)
        .with_file(temp_dir.path().to_string_lossy(), "demo.log")
        .with_max_size(1)
        .with_max_backups(2)
        .with_compress(true)
        .build()?;

    let padding = "x".repeat(64 * 1024);
    for i in 0..40 {
        logger.info(&format!("message {} {}", i, padding), &[]);
    }
    logger.sync()?;

    for entry in std::fs::read_dir(temp_dir.path())? {
        println!("{}", entry?.file_name().to_string_lossy());
    }

    Ok(())
}
