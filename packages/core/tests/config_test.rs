//! Loading the engine configuration from disk

#[cfg(test)]
mod config_tests {
    use anyhow::Result;
    use nodegraph_core::EngineConfig;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_from_path() -> Result<()> {
        let file = write_config(r#"{ "default_limit": 25, "max_limit": 50, "log_filter": "debug" }"#)?;

        let config = EngineConfig::from_path(file.path())?;
        assert_eq!(config.default_limit, 25);
        assert_eq!(config.max_limit, 50);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(
            config.event_channel_capacity,
            EngineConfig::default().event_channel_capacity
        );
        Ok(())
    }

    #[test]
    fn test_invalid_files_are_rejected() -> Result<()> {
        let file = write_config(r#"{ "default_limit": 500, "max_limit": 50 }"#)?;
        let err = EngineConfig::from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("default_limit cannot exceed max_limit"));

        let file = write_config("default_limit = 5")?;
        assert!(EngineConfig::from_path(file.path()).is_err());

        let dir = tempfile::tempdir()?;
        let err = EngineConfig::from_path(dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read engine config"));
        Ok(())
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        let config = EngineConfig::default();
        config.init_tracing();
        config.init_tracing();
        tracing::info!("Tracing initialized twice");
    }
}
