use owo_colors::OwoColorize;

/// Sets up `env_logger` from `CRUCIBLE_LOG`, mirroring the teacher's
/// `env_logger::try_init_from_env("JFB_LOG_LEVEL")` call but with a custom
/// format so warnings/errors come out coloured and prefixed per spec section 7.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(
        env_logger::Env::new().filter("CRUCIBLE_LOG").default_filter_or(default_level),
    )
        .format(|buf, record| {
            use std::io::Write;
            let level = record.level();
            let styled = match level {
                log::Level::Error => level.to_string().red().bold().to_string(),
                log::Level::Warn => level.to_string().yellow().bold().to_string(),
                log::Level::Info => level.to_string().green().to_string(),
                log::Level::Debug | log::Level::Trace => level.to_string().dimmed().to_string(),
            };
            writeln!(buf, "[{styled}] {}", record.args())
        })
        .try_init()?;

    Ok(())
}
