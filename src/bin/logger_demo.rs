use warehouse_client::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "warehouse_client=debug,logger_demo=trace".to_string(),
    };
    logger.reload_from_config(&config)?;
    trace!("client trace log");
    debug!("client debug log");
    info!("client info log");

    let invalid = LogConfig {
        filter: "=[".to_string(),
    };
    warn!(rejected = logger.reload_from_config(&invalid).is_err(), "invalid filter");

    Ok(())
}
