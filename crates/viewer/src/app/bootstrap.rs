use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use engine::ViewerConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SERVER_URL_ENV_VAR: &str = "WORLDVIEW_SERVER_URL";
const USERNAME_ENV_VAR: &str = "WORLDVIEW_USERNAME";
const MAP_ENV_VAR: &str = "WORLDVIEW_MAP";
const AVATAR_SCALE_ENV_VAR: &str = "WORLDVIEW_AVATAR_SCALE";
const JUMP_MS_ENV_VAR: &str = "WORLDVIEW_JUMP_MS";
const JUMP_HEIGHT_ENV_VAR: &str = "WORLDVIEW_JUMP_HEIGHT_PX";
const LOADER_THREADS_ENV_VAR: &str = "WORLDVIEW_LOADER_THREADS";
const MAX_LOADER_THREADS: usize = 16;

pub(crate) struct AppWiring {
    pub(crate) config: ViewerConfig,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== World Viewer Startup ===");

    AppWiring {
        config: config_from_env(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn config_from_env() -> ViewerConfig {
    config_from_lookup(|var| std::env::var(var).ok())
}

/// Builds the config from a variable lookup. Unset variables keep the default;
/// invalid ones log a warning and keep the default.
fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ViewerConfig {
    let mut config = ViewerConfig::default();

    if let Some(url) = non_empty(&lookup, SERVER_URL_ENV_VAR) {
        if url.starts_with("ws://") || url.starts_with("wss://") {
            config.server_url = url;
        } else {
            warn_invalid(SERVER_URL_ENV_VAR, &url, &config.server_url);
        }
    }
    if let Some(username) = non_empty(&lookup, USERNAME_ENV_VAR) {
        config.username = username;
    }
    if let Some(map) = non_empty(&lookup, MAP_ENV_VAR) {
        config.map_source = map;
    }

    config.avatar_scale = parse_or_default(
        &lookup,
        AVATAR_SCALE_ENV_VAR,
        config.avatar_scale,
        |scale: &f32| scale.is_finite() && *scale > 0.0,
    );
    let jump_ms = parse_or_default(
        &lookup,
        JUMP_MS_ENV_VAR,
        config.jump.duration.as_millis() as u64,
        |millis: &u64| *millis > 0,
    );
    config.jump.duration = Duration::from_millis(jump_ms);
    config.jump.height_px = parse_or_default(
        &lookup,
        JUMP_HEIGHT_ENV_VAR,
        config.jump.height_px,
        |height: &f32| height.is_finite() && *height >= 0.0,
    );
    config.loader_threads = parse_or_default(
        &lookup,
        LOADER_THREADS_ENV_VAR,
        config.loader_threads,
        |threads: &usize| (1..=MAX_LOADER_THREADS).contains(threads),
    );

    config
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Option<String> {
    lookup(var)
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
    is_valid: impl Fn(&T) -> bool,
) -> T
where
    T: FromStr + Display,
{
    let Some(raw) = non_empty(lookup, var) else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) if is_valid(&value) => value,
        _ => {
            warn_invalid(var, &raw, &default);
            default
        }
    }
}

fn warn_invalid(var: &'static str, value: &str, fallback: &dyn Display) {
    warn!(
        var,
        value,
        fallback = %fallback,
        "config_invalid_value_using_default"
    );
}
