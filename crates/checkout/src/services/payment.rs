//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use domain::Money;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PaymentError;

/// Lifecycle of a payment intent on the provider side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresConfirmation,
    Succeeded,
}

/// A provider-side handle for an in-progress charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// The intent ID assigned by the provider.
    pub id: String,
    pub amount: Money,
    pub currency: String,
    pub status: IntentStatus,
    pub metadata: HashMap<String, String>,
}

/// Trait for an external payment provider.
///
/// A charge is two calls: create an intent for an amount, then confirm it.
/// Neither call is retried by the workflow.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates an intent to charge `amount` in `currency`.
    async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Confirms a previously created intent.
    async fn confirm_payment(&self, intent_id: &str) -> Result<(), PaymentError>;
}

#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError> {
        (**self)
            .create_payment_intent(amount, currency, metadata)
            .await
    }

    async fn confirm_payment(&self, intent_id: &str) -> Result<(), PaymentError> {
        (**self).confirm_payment(intent_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    intents: HashMap<String, PaymentIntent>,
    fail_on_create: bool,
    fail_on_confirm: bool,
    unavailable: bool,
}

/// In-memory payment gateway for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryPaymentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryPaymentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configures the gateway to decline intent creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.write().fail_on_create = fail;
    }

    /// Configures the gateway to decline confirmation.
    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.write().fail_on_confirm = fail;
    }

    /// Makes every call fail as if the provider were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    /// Returns the number of intents created.
    pub fn intent_count(&self) -> usize {
        self.read().intents.len()
    }

    /// Returns the intent with the given ID.
    pub fn intent(&self, intent_id: &str) -> Option<PaymentIntent> {
        self.read().intents.get(intent_id).cloned()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut state = self.write();

        if state.unavailable {
            return Err(PaymentError::Unavailable("connection refused".to_string()));
        }
        if state.fail_on_create {
            return Err(PaymentError::Declined("card declined".to_string()));
        }

        let intent = PaymentIntent {
            id: format!("pi_{}", Uuid::new_v4().simple()),
            amount,
            currency: currency.to_string(),
            status: IntentStatus::RequiresConfirmation,
            metadata,
        };
        state.intents.insert(intent.id.clone(), intent.clone());

        Ok(intent)
    }

    async fn confirm_payment(&self, intent_id: &str) -> Result<(), PaymentError> {
        let mut state = self.write();

        if state.unavailable {
            return Err(PaymentError::Unavailable("connection refused".to_string()));
        }
        if state.fail_on_confirm {
            return Err(PaymentError::Declined(
                "authentication required".to_string(),
            ));
        }

        let intent = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| PaymentError::UnknownIntent(intent_id.to_string()))?;
        intent.status = IntentStatus::Succeeded;
        Ok(())
    }
}
