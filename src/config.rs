use std::{env, str::FromStr};

use anyhow::Context;

/// Whether merging a temp order writes the recomputed total back onto the
/// order row or only reports it in the merge response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeTotals {
    /// Report the computed total; leave the stored `total_price` as is.
    #[default]
    DisplayOnly,
    /// Persist the computed total onto the order inside the merge transaction.
    WriteBack,
}

impl FromStr for MergeTotals {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "display_only" => Ok(MergeTotals::DisplayOnly),
            "write_back" => Ok(MergeTotals::WriteBack),
            other => {
                anyhow::bail!("MERGE_TOTALS must be display_only or write_back, got '{other}'")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub merge_totals: MergeTotals,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let merge_totals = match env::var("MERGE_TOTALS") {
            Ok(value) => value.parse()?,
            Err(_) => MergeTotals::default(),
        };
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            merge_totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_totals_parses_known_values() {
        assert_eq!(
            "display_only".parse::<MergeTotals>().ok(),
            Some(MergeTotals::DisplayOnly)
        );
        assert_eq!(
            " WRITE_BACK ".parse::<MergeTotals>().ok(),
            Some(MergeTotals::WriteBack)
        );
        assert!("sometimes".parse::<MergeTotals>().is_err());
    }
}
