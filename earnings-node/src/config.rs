//! Loads [`earnings_core::settings::Settings`] from the environment
//! variables named in §6, falling back to `Settings::default()` for
//! anything unset.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use earnings_core::settings::Settings;
use rust_decimal::Decimal;

pub fn settings_from_env() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Some(pct) = env_parse::<Decimal>("COMMISSION_RATE_PERCENT")? {
        settings.commission_rate_percent = pct;
    }
    if let Some(tz) = env_var("RIDER_PAYOUT_TIMEZONE") {
        settings.payout_timezone = chrono_tz::Tz::from_str(&tz)
            .map_err(|e| anyhow::anyhow!("invalid RIDER_PAYOUT_TIMEZONE {tz:?}: {e}"))?;
    }
    if let Some(hours) = env_parse::<u64>("GRACE_PERIOD_HOURS")? {
        settings.payment_grace_period = Duration::from_secs(hours * 3_600);
    }
    if let Some(hours) = env_parse::<u64>("STRIKE_WINDOW_HOURS")? {
        settings.strike_after = Duration::from_secs(hours * 3_600);
    }
    if let Some(max_strikes) = env_parse::<u32>("MAX_STRIKES")? {
        settings.strikes_before_deactivation = max_strikes;
    }
    if let Some(minutes) = env_parse::<u64>("ENFORCEMENT_TICK_MINUTES")? {
        settings.sweep_interval = Duration::from_secs(minutes * 60);
    }

    Ok(settings)
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_var(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("invalid {key} {value:?}"))
            .map(Some),
        None => Ok(None),
    }
}
