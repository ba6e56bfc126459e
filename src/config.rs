use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub capture: CaptureConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Срок, за который браузер должен подтвердить захват (эвристика, не контракт)
    pub confirm_timeout_ms: u64,
    /// Ёмкость широковещательных каналов move/release
    pub feed_capacity: usize,
    /// Значение по умолчанию для CLI-сценариев
    #[serde(default)]
    pub release_on_pointer_up: bool,
}

/// Параметры эмуляции браузера для dry-run запуска
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub policy: String,
    pub release_cooldown_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            policy: "grant".to_string(),
            release_cooldown_ms: 0,
        }
    }
}

impl CaptureConfig {
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }
}

impl SimulationConfig {
    pub fn release_cooldown(&self) -> Duration {
        Duration::from_millis(self.release_cooldown_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
                filter: "pointer_lock=info".to_string(),
            },
            capture: CaptureConfig {
                confirm_timeout_ms: 100,
                feed_capacity: 256,
                release_on_pointer_up: false,
            },
            simulation: SimulationConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        // Файл не обязателен: значения по умолчанию перекрываются файлом, затем окружением
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("POINTER_LOCK_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация настроек захвата
        if self.capture.confirm_timeout_ms == 0 {
            anyhow::bail!("confirm_timeout_ms должно быть больше 0");
        }

        if self.capture.feed_capacity == 0 {
            anyhow::bail!("feed_capacity должно быть больше 0");
        }

        match self.simulation.policy.as_str() {
            "grant" | "ignore" | "throw" => {}
            _ => anyhow::bail!(
                "Неверная политика эмуляции браузера: {}",
                self.simulation.policy
            ),
        }

        Ok(())
    }
}
