//! Shopfront command-line entry point

use std::{
    io::{self, Write},
    process::ExitCode,
};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use shopfront::{
    catalog::{Catalog, ImageCdn, write_listing},
    collaborators::{Collaborators, HttpShopApi},
    config::ShopConfig,
    notifications::{Notification, Notifier},
    observability::init_tracing,
    receipt::ReceiptError,
    session::{SessionError, ShopSession},
};

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ShopConfig::load() {
        Ok(config) => config,
        Err(err) => {
            // Help and version requests exit successfully.
            _ = err.print();

            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(err) = init_tracing(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for init errors"
        )]
        {
            eprintln!("Logging error: {err}");
        }

        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "shopfront failed");

            ExitCode::FAILURE
        }
    }
}

async fn run(config: ShopConfig) -> Result<(), AppError> {
    let catalog = Catalog::new(config.currency, ImageCdn::new(config.cdn_url.as_str()))
        .map_err(SessionError::from)?;

    let collaborators = Collaborators::http(HttpShopApi::new(config.api_url.as_str()));
    let (notifier, mut notifications) = Notifier::channel();

    let mut session = ShopSession::new(catalog, collaborators, notifier)?;

    let summary = session.load().await?;

    info!(
        dynamic_products = summary.dynamic_products,
        promo_enabled = summary.promo_enabled,
        "catalog ready"
    );

    let mut stdout = io::stdout().lock();

    write_listing(
        &mut stdout,
        session
            .catalog()
            .search_and_filter(config.category, &config.query),
    )?;

    for key in &config.add {
        if let Err(err) = session.add_by_key(key) {
            warn!(%key, error = %err, "product not added");
        }
    }

    if let Some(code) = &config.coupon {
        let applied = session.apply_coupon(code).await;

        if let Err(err) = applied {
            warn!(error = %err, "coupon not applied");
        }
    }

    if let Some(code) = &config.gift_card {
        match session.check_gift_card(code).await {
            Ok(_) => session.apply_gift_card()?,
            Err(err) => warn!(error = %err, "gift card not applied"),
        }
    }

    if !session.cart().is_empty() {
        session
            .receipt()
            .write_to(&mut stdout, session.cart(), session.promo())?;
    }

    drain_notifications(&mut stdout, &mut notifications)?;

    stdout.flush()?;

    Ok(())
}

fn drain_notifications(
    out: &mut impl Write,
    notifications: &mut UnboundedReceiver<Notification>,
) -> io::Result<()> {
    while let Ok(notification) = notifications.try_recv() {
        writeln!(out, "{notification}")?;
    }

    Ok(())
}
