use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, PartialEq, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    /// Number of frames in the buffer pool. Frame ids handed to the
    /// replacer are in range [0, pool_size).
    pub pool_size: usize,
    /// Number of access history entries the replacer keeps per frame.
    pub replacer_k: usize,
}

impl Config {
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("log_level", "debug")?
            .set_default("pool_size", 64)?
            .set_default("replacer_k", 2)?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(config::Environment::with_prefix("PRIMERDB"));
        Ok(cfg.build()?.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() -> Result<()> {
        let cfg = Config::new("")?;
        assert_eq!(LogLevel::Debug, cfg.log_level);
        assert_eq!(64, cfg.pool_size);
        assert_eq!(2, cfg.replacer_k);
        Ok(())
    }
}
