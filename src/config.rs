//! Shopfront configuration

use clap::{Args, Parser};
use rusty_money::{Findable, iso::Currency};

use crate::{
    catalog::{CategoryFilter, images::DEFAULT_CDN_URL},
    collaborators::http::DEFAULT_API_URL,
};

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    #[default]
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Shopfront configuration
#[derive(Debug, Parser)]
#[command(name = "shopfront", about = "Browse the shop and price a cart", long_about = None)]
pub struct ShopConfig {
    /// Shop API base URL
    #[arg(long, env = "SHOP_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Image CDN base URL
    #[arg(long, env = "SHOP_CDN_URL", default_value = DEFAULT_CDN_URL)]
    pub cdn_url: String,

    /// ISO 4217 currency prices are listed in
    #[arg(long, env = "SHOP_CURRENCY", default_value = "EUR", value_parser = parse_currency)]
    pub currency: &'static Currency,

    /// Logging settings
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Category to list (`all` or a category slug)
    #[arg(short, long, default_value = "all")]
    pub category: CategoryFilter,

    /// Only list products whose name or type contains this text
    #[arg(short, long, default_value = "")]
    pub query: String,

    /// Product id or type to add to the cart (repeatable)
    #[arg(short, long = "add", value_name = "PRODUCT")]
    pub add: Vec<String>,

    /// Coupon code to apply to the cart
    #[arg(long)]
    pub coupon: Option<String>,

    /// Gift card code to apply to the cart
    #[arg(long)]
    pub gift_card: Option<String>,
}

impl ShopConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

fn parse_currency(code: &str) -> Result<&'static Currency, String> {
    Currency::find(&code.to_ascii_uppercase()).ok_or_else(|| format!("unknown currency `{code}`"))
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::products::Category;

    use super::*;

    #[test]
    fn defaults_point_at_local_api() -> TestResult {
        let config = ShopConfig::try_parse_from(["shopfront"])?;

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.category, CategoryFilter::All);
        assert!(config.add.is_empty());

        Ok(())
    }

    #[test]
    fn cli_arguments_are_parsed() -> TestResult {
        let config = ShopConfig::try_parse_from([
            "shopfront",
            "--currency",
            "usd",
            "--category",
            "coins",
            "--add",
            "GOLD_PACK_SMALL",
            "-a",
            "PREMIUM_MONTH",
            "--log-format",
            "json",
        ])?;

        assert_eq!(config.currency, USD);
        assert_eq!(config.category, CategoryFilter::Only(Category::Coins));
        assert_eq!(config.add, vec!["GOLD_PACK_SMALL", "PREMIUM_MONTH"]);
        assert_eq!(config.logging.log_format, LogFormat::Json);

        Ok(())
    }

    #[test]
    fn unknown_currency_is_rejected() {
        assert!(ShopConfig::try_parse_from(["shopfront", "--currency", "XYZ1"]).is_err());
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(ShopConfig::try_parse_from(["shopfront", "--category", "hats"]).is_err());
    }
}
