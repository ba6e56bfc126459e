use anyhow::Result;
use clap::{Parser, ValueEnum};
use pointer_lock::config::Config;
use pointer_lock::events::{CaptureTarget, PointerButton};
use pointer_lock::services::browser::{create_simulated_browser, LockPolicy, SimulatedBrowser};
use pointer_lock::services::{PointerLockService, SessionConfig};
use std::sync::Arc;
use tokio::signal;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// Сценарии поведения эмулируемого браузера
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Захват выдан, несколько движений, затем браузер отзывает захват
    Revoke,
    /// Захват выдан, движения, затем отпускание основной кнопки
    Release,
    /// Браузер молча игнорирует запрос - срабатывает watchdog
    Timeout,
    /// Запрос завершается синхронной ошибкой
    Deny,
    /// Захват выдан, движения идут до Ctrl+C
    Hold,
}

#[derive(Parser, Debug)]
#[command(name = "pointer-lock")]
#[command(about = "Прогон жизненного цикла захвата указателя на эмулируемом браузере")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "pointer-lock.toml")]
    config: String,

    /// Сценарий эмуляции
    #[arg(long, value_enum, default_value = "revoke")]
    scenario: Scenario,

    /// Количество эмулируемых движений
    #[arg(long, default_value_t = 5)]
    moves: u32,

    /// Уровень логирования
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Инициализация системы логирования
    init_tracing(&args.log_level)?;

    info!("Запуск pointer-lock v{}", env!("CARGO_PKG_VERSION"));

    // Загрузка конфигурации
    let config = Config::load(&args.config)?;
    info!("Конфигурация загружена из: {}", args.config);

    let browser = create_simulated_browser(&config.simulation)?;
    match args.scenario {
        Scenario::Timeout => browser.set_policy(LockPolicy::Ignore),
        Scenario::Deny => browser.set_policy(LockPolicy::Throw),
        _ => {}
    }

    let service = PointerLockService::new(browser.clone(), config.capture.clone());
    service.ensure_initialized();

    let target = CaptureTarget::new(1);
    let session_config = SessionConfig::default().with_release_on_pointer_up(
        config.capture.release_on_pointer_up || args.scenario == Scenario::Release,
    );

    let mut stream = service.create_session(target, session_config)?;
    stream.start();
    info!("Сессия {} запущена, сценарий: {:?}", stream.id(), args.scenario);

    let page = tokio::spawn(drive_page(browser.clone(), args.scenario, args.moves));

    let mut received = 0u32;
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(delta)) => {
                    received += 1;
                    info!("Получено смещение #{}: {}", received, delta);
                }
                Some(Err(e)) if e.is_session_failure() => {
                    warn!("Захват не получен: {}", e);
                }
                Some(Err(e)) => {
                    error!("Сессия завершилась ошибкой: {}", e);
                }
                None => {
                    info!("Поток смещений закрыт");
                    break;
                }
            },
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                    Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
                }
                service.release_all();
            }
        }
    }

    page.abort();

    // Ожидаем освобождения всех сессий (с таймаутом)
    let shutdown_result = tokio::time::timeout(Duration::from_secs(1), async {
        while service.active_sessions() > 0 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    if shutdown_result.is_err() {
        warn!("Таймаут при завершении сессий захвата");
    }

    info!(
        "pointer-lock завершил работу: получено {} смещений, запросов захвата: {}, освобождений: {}",
        received,
        browser.request_count(),
        browser.exit_count()
    );
    Ok(())
}

/// Эмуляция действий пользователя и браузера на странице
async fn drive_page(browser: Arc<SimulatedBrowser>, scenario: Scenario, moves: u32) {
    sleep(Duration::from_millis(10)).await;

    let mut step = 0u32;
    loop {
        if scenario != Scenario::Hold && step >= moves {
            break;
        }
        step += 1;
        let phase = step as f64;
        browser.move_by(phase.sin() * 4.0, phase.cos() * 4.0);
        sleep(Duration::from_millis(16)).await;
    }

    match scenario {
        Scenario::Revoke => browser.revoke(),
        Scenario::Release => browser.release_button(PointerButton::Primary),
        Scenario::Timeout | Scenario::Deny | Scenario::Hold => {}
    }
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}
