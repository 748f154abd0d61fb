//! Periodic SACCO sweeps.
//!
//! Usage:
//!   sweeper defaults  - Flag loans overdue past the grace period as defaulted
//!   sweeper interest  - Credit monthly interest to interest-bearing accounts
//!   sweeper all       - Both, defaults first
//!
//! Meant to be triggered by an external scheduler (cron, systemd timer).
//! Set `SACCO_LOG_FORMAT=json` for JSON log lines.

use anyhow::{Context, bail};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sacco_db::{AccountService, LoanService, ServiceContext, connect_with_config};
use sacco_shared::SaccoConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    Defaults,
    Interest,
    All,
}

impl Sweep {
    fn parse(arg: &str) -> anyhow::Result<Self> {
        match arg {
            "defaults" => Ok(Self::Defaults),
            "interest" => Ok(Self::Interest),
            "all" => Ok(Self::All),
            other => bail!("unknown sweep '{other}', expected defaults | interest | all"),
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sacco=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("SACCO_LOG_FORMAT").is_ok_and(|format| format == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let sweep = Sweep::parse(&std::env::args().nth(1).unwrap_or_else(|| "all".to_string()))?;

    let config = SaccoConfig::load().context("failed to load configuration")?;
    init_tracing();

    let db = connect_with_config(&config.database)
        .await
        .context("failed to connect to database")?;
    info!(?sweep, "Connected to database");

    let ctx = ServiceContext::new(db, config);

    if matches!(sweep, Sweep::Defaults | Sweep::All) {
        let defaulted = LoanService::new(ctx.clone())
            .process_defaulted_loans()
            .await
            .context("default sweep failed")?;
        info!(defaulted, "Default sweep complete");
    }

    if matches!(sweep, Sweep::Interest | Sweep::All) {
        let credited = AccountService::new(ctx)
            .accrue_monthly_interest()
            .await
            .context("interest sweep failed")?;
        info!(credited, "Interest sweep complete");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sweeps() {
        assert_eq!(Sweep::parse("defaults").unwrap(), Sweep::Defaults);
        assert_eq!(Sweep::parse("interest").unwrap(), Sweep::Interest);
        assert_eq!(Sweep::parse("all").unwrap(), Sweep::All);
        assert!(Sweep::parse("everything").is_err());
    }
}
