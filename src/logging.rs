use std::fs;

use time::UtcOffset;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const FILTER_FILE: &str = "logging.env";

/// Keeps the non-blocking writer alive; drop it and buffered log lines are
/// lost, so hold it for the lifetime of main.
pub struct LoggingHandle {
    _non_blocking_guard: WorkerGuard,
}

pub fn init_logging() -> Result<LoggingHandle, String> {
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        UtcOffset::current_local_offset().unwrap_or_else(|err| {
            eprintln!("Failed to get timezone: {}", err);
            UtcOffset::UTC
        }),
        time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second] +[offset_hour]"
        ),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());

    let env_filter = read_env_filter().unwrap_or_else(|err| {
        eprintln!(
            "Failed to read env filter, using environment variable or default: {}",
            err
        );
        EnvFilter::builder()
            .with_default_directive(Level::INFO.into())
            .from_env_lossy()
    });

    println!("Env Filter: {}", env_filter);

    // Route log-facade records (most of this crate) into tracing.
    tracing_log::LogTracer::init()
        .map_err(|err| format!("failed to initialize log bridge: {}", err))?;

    let subscriber = tracing_subscriber::fmt()
        .with_timer(timer)
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| format!("failed to initialize logger: {}", err))?;

    Ok(LoggingHandle {
        _non_blocking_guard: guard,
    })
}

fn read_env_filter() -> Result<EnvFilter, String> {
    let s = fs::read_to_string(FILTER_FILE)
        .map_err(|err| format!("Failed to read {} file: {}", FILTER_FILE, err))?;
    let first_line = s
        .lines()
        .next()
        .ok_or_else(|| format!("{} should have at least one line", FILTER_FILE))?;
    EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .parse(first_line)
        .map_err(|err| format!("Failed to parse env filter: {}", err))
}
