//! Checkout
//!
//! The orchestrator tracks one checkout attempt at a time:
//! `Idle → ValidatingIdentity → Validated → AwaitingPayment → Completed | Failed`.
//!
//! Network calls happen outside the orchestrator. Each response is handed
//! back together with the [`AttemptId`] that issued the request, and a
//! response for anything other than the current attempt in the expected
//! state is reported as [`Step::Stale`] and ignored.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    collaborators::{ApiError, OrderAck, UsernameVerdict},
    receipt::Receipt,
};

/// Identifies one checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Checkout failures. Every variant is recoverable; the session stays usable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("Your cart is empty!")]
    EmptyCart,

    /// One of the username fields is blank.
    #[error("Please enter your username in both fields")]
    MissingUsername,

    /// The username fields differ.
    #[error("Usernames do not match!")]
    UsernameMismatch,

    /// The username validator does not know the account.
    #[error("Username \"{0}\" not found!")]
    UsernameNotFound(String),

    /// The username validator could not be reached.
    #[error("Failed to validate username. Please try again.")]
    IdentityUnavailable,

    /// The order creator refused the order.
    #[error("{0}")]
    OrderRejected(String),

    /// The order creator could not be reached or answered nonsense.
    #[error("An error occurred. Please try again.")]
    OrderFailed,

    /// The order was accepted but no payment page came back.
    #[error("Failed to initiate payment")]
    PaymentNotInitiated,

    /// A checkout is already running.
    #[error("a checkout is already in progress")]
    InvalidTransition,

    /// The attempt was cancelled before its response arrived.
    #[error("checkout was cancelled")]
    Abandoned,
}

impl CheckoutError {
    /// Whether retrying the same input may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::IdentityUnavailable | Self::OrderFailed | Self::PaymentNotInitiated
        )
    }
}

/// Username fields and message from the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    /// Username.
    pub username: String,

    /// Username, typed again.
    pub username_confirm: String,

    /// Optional message sent with the order.
    pub message: String,
}

impl CheckoutForm {
    /// Creates a form.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        username_confirm: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            username_confirm: username_confirm.into(),
            message: message.into(),
        }
    }
}

/// How a completed checkout ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Send the buyer to the payment page.
    Redirect {
        /// Payment approval URL.
        approval_url: String,
    },

    /// Nothing left to pay; the order is complete.
    Paid {
        /// Optional page to show next.
        redirect: Option<String>,
    },
}

/// Checkout state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CheckoutState {
    /// No attempt is running.
    #[default]
    Idle,

    /// Waiting for the username validator.
    ValidatingIdentity {
        /// Current attempt.
        attempt: AttemptId,

        /// Username as typed.
        username: String,
    },

    /// The username is verified.
    Validated {
        /// Current attempt.
        attempt: AttemptId,

        /// Canonical username.
        username: String,
    },

    /// Waiting for the order creator.
    AwaitingPayment {
        /// Current attempt.
        attempt: AttemptId,

        /// Canonical username.
        username: String,

        /// Whether the gift card covers the whole total.
        fully_covered: bool,
    },

    /// The attempt finished.
    Completed(CheckoutOutcome),

    /// The attempt failed.
    Failed(CheckoutError),
}

impl CheckoutState {
    /// Whether an attempt is waiting on a collaborator.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::ValidatingIdentity { .. } | Self::Validated { .. } | Self::AwaitingPayment { .. }
        )
    }
}

/// Outcome of applying a collaborator response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// The response belonged to the current attempt and was applied.
    Applied(T),

    /// The response belonged to an abandoned attempt and was ignored.
    Stale,
}

/// Drives checkout attempts.
#[derive(Debug, Default)]
pub struct CheckoutOrchestrator {
    state: CheckoutState,
    last_attempt: u64,
}

impl CheckoutOrchestrator {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Starts an attempt after the local entry checks.
    ///
    /// Usernames are trimmed before comparison.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::InvalidTransition`]: an attempt is already running; its state is kept.
    /// - [`CheckoutError::EmptyCart`], [`CheckoutError::MissingUsername`],
    ///   [`CheckoutError::UsernameMismatch`]: the attempt fails without any network call.
    pub fn begin(
        &mut self,
        cart_is_empty: bool,
        form: &CheckoutForm,
    ) -> Result<AttemptId, CheckoutError> {
        if self.state.is_in_progress() {
            return Err(CheckoutError::InvalidTransition);
        }

        let username = form.username.trim();
        let confirm = form.username_confirm.trim();

        let guard = if cart_is_empty {
            Err(CheckoutError::EmptyCart)
        } else if username.is_empty() || confirm.is_empty() {
            Err(CheckoutError::MissingUsername)
        } else if username != confirm {
            Err(CheckoutError::UsernameMismatch)
        } else {
            Ok(())
        };

        if let Err(err) = guard {
            self.state = CheckoutState::Failed(err.clone());

            return Err(err);
        }

        self.last_attempt = self.last_attempt.wrapping_add(1);

        let attempt = AttemptId(self.last_attempt);

        self.state = CheckoutState::ValidatingIdentity {
            attempt,
            username: username.to_string(),
        };

        debug!(%attempt, "checkout started");

        Ok(attempt)
    }

    /// Applies the username validator's answer.
    ///
    /// On success returns the canonical username, which replaces the typed
    /// one for the rest of the attempt.
    pub fn identity_checked(
        &mut self,
        attempt: AttemptId,
        verdict: Result<UsernameVerdict, ApiError>,
    ) -> Step<Result<String, CheckoutError>> {
        let typed = match &self.state {
            CheckoutState::ValidatingIdentity {
                attempt: current,
                username,
            } if *current == attempt => username.clone(),
            _ => return self.stale(attempt, "identity"),
        };

        let result = match verdict {
            Ok(UsernameVerdict::Valid { username }) => {
                let username = username.unwrap_or(typed);

                self.state = CheckoutState::Validated {
                    attempt,
                    username: username.clone(),
                };

                Ok(username)
            }
            Ok(UsernameVerdict::NotFound) => {
                Err(self.fail(CheckoutError::UsernameNotFound(typed)))
            }
            Err(err) => {
                warn!(%attempt, error = %err, "username validation failed");

                Err(self.fail(CheckoutError::IdentityUnavailable))
            }
        };

        Step::Applied(result)
    }

    /// Moves a validated attempt to `AwaitingPayment` for the given receipt.
    ///
    /// Returns the canonical username to put on the order.
    pub fn await_payment(&mut self, attempt: AttemptId, receipt: &Receipt) -> Step<String> {
        let username = match &self.state {
            CheckoutState::Validated {
                attempt: current,
                username,
            } if *current == attempt => username.clone(),
            _ => return self.stale(attempt, "payment"),
        };

        self.state = CheckoutState::AwaitingPayment {
            attempt,
            username: username.clone(),
            fully_covered: receipt.is_fully_covered(),
        };

        Step::Applied(username)
    }

    /// Applies the order creator's answer.
    ///
    /// A fully covered order completes without a payment page. Otherwise the
    /// order needs an approval URL. Collaborator errors return the
    /// orchestrator to `Idle` so the buyer can try again.
    pub fn order_created(
        &mut self,
        attempt: AttemptId,
        ack: Result<OrderAck, ApiError>,
    ) -> Step<Result<CheckoutOutcome, CheckoutError>> {
        let fully_covered = match &self.state {
            CheckoutState::AwaitingPayment {
                attempt: current,
                fully_covered,
                ..
            } if *current == attempt => *fully_covered,
            _ => return self.stale(attempt, "order"),
        };

        let ack = match ack {
            Ok(ack) => ack,
            Err(err) => {
                warn!(%attempt, error = %err, "order creation failed");

                self.state = CheckoutState::Idle;

                return Step::Applied(Err(match err {
                    ApiError::Rejected(message) => CheckoutError::OrderRejected(message),
                    ApiError::Http(_) | ApiError::UnexpectedResponse(_) => {
                        CheckoutError::OrderFailed
                    }
                }));
            }
        };

        let outcome = if fully_covered {
            CheckoutOutcome::Paid {
                redirect: ack.redirect,
            }
        } else if let Some(approval_url) = ack.approval_url {
            CheckoutOutcome::Redirect { approval_url }
        } else {
            return Step::Applied(Err(self.fail(CheckoutError::PaymentNotInitiated)));
        };

        info!(%attempt, paid = fully_covered, "checkout completed");

        self.state = CheckoutState::Completed(outcome.clone());

        Step::Applied(Ok(outcome))
    }

    /// Abandons the current attempt; responses still in flight become stale.
    pub fn cancel(&mut self) {
        if self.state.is_in_progress() {
            debug!("checkout cancelled");
        }

        self.state = CheckoutState::Idle;
    }

    fn fail(&mut self, err: CheckoutError) -> CheckoutError {
        self.state = CheckoutState::Failed(err.clone());

        err
    }

    fn stale<T>(&self, attempt: AttemptId, step: &str) -> Step<T> {
        debug!(%attempt, step, state = ?self.state, "ignoring stale checkout response");

        Step::Stale
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::EUR};
    use testresult::TestResult;

    use crate::{
        cart::Cart,
        gift_cards::GiftCardRedemption,
        pricing::PricingPipeline,
        products::{Category, Product},
    };

    use super::*;

    fn form() -> CheckoutForm {
        CheckoutForm::new(" Wolfie ", "Wolfie", "gg")
    }

    fn receipt(balance_minor: Option<i64>) -> TestResult<Receipt> {
        let mut cart = Cart::new(EUR);

        cart.add(Product::new(
            "GOLD",
            "Gold",
            Money::from_minor(2000, EUR),
            Category::Coins,
        ))?;

        let card = balance_minor
            .map(|balance| GiftCardRedemption::new("GC", Money::from_minor(balance, EUR)))
            .transpose()?;

        Ok(PricingPipeline::default().price(&cart, None, card.as_ref())?)
    }

    fn validated(orchestrator: &mut CheckoutOrchestrator) -> TestResult<AttemptId> {
        let attempt = orchestrator.begin(false, &form())?;

        orchestrator.identity_checked(
            attempt,
            Ok(UsernameVerdict::Valid {
                username: Some("WOLFIE".to_string()),
            }),
        );

        Ok(attempt)
    }

    #[test]
    fn entry_guard_checks_cart_then_usernames() {
        let mut orchestrator = CheckoutOrchestrator::default();

        assert_eq!(
            orchestrator.begin(true, &form()),
            Err(CheckoutError::EmptyCart)
        );
        assert_eq!(
            orchestrator.begin(false, &CheckoutForm::new("Wolfie", " ", "")),
            Err(CheckoutError::MissingUsername)
        );
        assert_eq!(
            orchestrator.begin(false, &CheckoutForm::new("Wolfie", "wolfie", "")),
            Err(CheckoutError::UsernameMismatch)
        );
        assert_eq!(
            orchestrator.state(),
            &CheckoutState::Failed(CheckoutError::UsernameMismatch)
        );
    }

    #[test]
    fn begin_is_rejected_while_in_progress() -> TestResult {
        let mut orchestrator = CheckoutOrchestrator::default();

        orchestrator.begin(false, &form())?;

        assert_eq!(
            orchestrator.begin(false, &form()),
            Err(CheckoutError::InvalidTransition)
        );
        assert!(orchestrator.state().is_in_progress());

        Ok(())
    }

    #[test]
    fn canonical_username_replaces_typed_one() -> TestResult {
        let mut orchestrator = CheckoutOrchestrator::default();
        let attempt = validated(&mut orchestrator)?;

        assert_eq!(
            orchestrator.await_payment(attempt, &receipt(None)?),
            Step::Applied("WOLFIE".to_string())
        );

        Ok(())
    }

    #[test]
    fn unknown_username_fails_and_allows_retry() -> TestResult {
        let mut orchestrator = CheckoutOrchestrator::default();
        let attempt = orchestrator.begin(false, &form())?;

        assert_eq!(
            orchestrator.identity_checked(attempt, Ok(UsernameVerdict::NotFound)),
            Step::Applied(Err(CheckoutError::UsernameNotFound("Wolfie".to_string())))
        );

        let retry = orchestrator.begin(false, &form())?;

        assert_ne!(retry, attempt);

        Ok(())
    }

    #[test]
    fn validator_outage_is_retryable() -> TestResult {
        let mut orchestrator = CheckoutOrchestrator::default();
        let attempt = orchestrator.begin(false, &form())?;

        let Step::Applied(Err(err)) = orchestrator.identity_checked(
            attempt,
            Err(ApiError::UnexpectedResponse("502".to_string())),
        ) else {
            return Err("expected an applied failure".into());
        };

        assert_eq!(err, CheckoutError::IdentityUnavailable);
        assert!(err.is_retryable());

        Ok(())
    }

    #[test]
    fn approval_url_redirects() -> TestResult {
        let mut orchestrator = CheckoutOrchestrator::default();
        let attempt = validated(&mut orchestrator)?;

        orchestrator.await_payment(attempt, &receipt(None)?);

        let step = orchestrator.order_created(
            attempt,
            Ok(OrderAck {
                approval_url: Some("https://pay.example/approve".to_string()),
                redirect: None,
            }),
        );

        assert_eq!(
            step,
            Step::Applied(Ok(CheckoutOutcome::Redirect {
                approval_url: "https://pay.example/approve".to_string()
            }))
        );

        Ok(())
    }

    #[test]
    fn fully_covered_order_completes_without_redirect() -> TestResult {
        let mut orchestrator = CheckoutOrchestrator::default();
        let attempt = validated(&mut orchestrator)?;

        orchestrator.await_payment(attempt, &receipt(Some(3000))?);

        let step = orchestrator.order_created(attempt, Ok(OrderAck::default()));

        assert_eq!(
            step,
            Step::Applied(Ok(CheckoutOutcome::Paid { redirect: None }))
        );
        assert!(matches!(
            orchestrator.state(),
            CheckoutState::Completed(CheckoutOutcome::Paid { .. })
        ));

        Ok(())
    }

    #[test]
    fn missing_approval_url_fails() -> TestResult {
        let mut orchestrator = CheckoutOrchestrator::default();
        let attempt = validated(&mut orchestrator)?;

        orchestrator.await_payment(attempt, &receipt(Some(500))?);

        assert_eq!(
            orchestrator.order_created(attempt, Ok(OrderAck::default())),
            Step::Applied(Err(CheckoutError::PaymentNotInitiated))
        );

        Ok(())
    }

    #[test]
    fn order_collaborator_error_returns_to_idle() -> TestResult {
        let mut orchestrator = CheckoutOrchestrator::default();
        let attempt = validated(&mut orchestrator)?;

        orchestrator.await_payment(attempt, &receipt(None)?);

        assert_eq!(
            orchestrator.order_created(attempt, Err(ApiError::Rejected("Out of stock".to_string()))),
            Step::Applied(Err(CheckoutError::OrderRejected("Out of stock".to_string())))
        );
        assert_eq!(orchestrator.state(), &CheckoutState::Idle);

        Ok(())
    }

    #[test]
    fn late_response_after_cancel_is_stale() -> TestResult {
        let mut orchestrator = CheckoutOrchestrator::default();
        let abandoned = orchestrator.begin(false, &form())?;

        orchestrator.cancel();

        let fresh = orchestrator.begin(false, &form())?;

        assert_eq!(
            orchestrator.identity_checked(abandoned, Ok(UsernameVerdict::NotFound)),
            Step::Stale
        );
        assert_eq!(
            orchestrator.state(),
            &CheckoutState::ValidatingIdentity {
                attempt: fresh,
                username: "Wolfie".to_string()
            }
        );

        Ok(())
    }

    #[test]
    fn responses_out_of_order_are_stale() -> TestResult {
        let mut orchestrator = CheckoutOrchestrator::default();
        let attempt = orchestrator.begin(false, &form())?;

        assert_eq!(
            orchestrator.order_created(attempt, Ok(OrderAck::default())),
            Step::Stale
        );
        assert_eq!(
            orchestrator.await_payment(attempt, &receipt(None)?),
            Step::Stale
        );

        Ok(())
    }
}
