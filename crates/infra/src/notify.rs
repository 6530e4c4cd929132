//! Outbound notification collaborators: emails and external event forwarding.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cadence_core::{ContractId, CustomerId, TenantId};

use crate::jobs::RemoteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerEmailTemplate {
    NewSubscription,
    #[serde(rename = "SUBSCRIPTION_CANCELED")]
    SubscriptionCancelled,
    SubscriptionPaused,
    SubscriptionResumed,
    SubscriptionSkipped,
    SubscriptionPaymentFailure,
    SubscriptionPaymentFailureRetry,
    SubscriptionPaymentFailureLastAttempt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerEmail {
    pub contract_id: ContractId,
    pub template: CustomerEmailTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle_index: Option<u32>,
}

/// A contract lifecycle event forwarded to the external system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardedEvent {
    /// e.g. `subscription-created`, `subscription-billing-attempt-success`.
    pub event: String,
    pub subscription_data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_note: Option<String>,
}

impl ForwardedEvent {
    pub fn new(event: impl Into<String>, subscription_data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            subscription_data,
            checkout_id: None,
            order_note: None,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_customer_email(
        &self,
        tenant: &TenantId,
        customer: &CustomerId,
        email: &CustomerEmail,
    ) -> Result<(), RemoteError>;

    async fn send_merchant_email(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
    ) -> Result<(), RemoteError>;

    async fn send_inventory_failure_email(&self, tenant: &TenantId) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait EventForwarder: Send + Sync {
    async fn forward(&self, tenant: &TenantId, event: &ForwardedEvent) -> Result<(), RemoteError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Customer {
        tenant: TenantId,
        customer: CustomerId,
        email: CustomerEmail,
    },
    Merchant {
        tenant: TenantId,
        contract: ContractId,
    },
    InventoryFailure {
        tenant: TenantId,
    },
}

#[derive(Debug, Default)]
struct Recording<T> {
    sent: Vec<T>,
    failures: VecDeque<RemoteError>,
}

impl<T> Recording<T> {
    fn record(&mut self, item: T) -> Result<(), RemoteError> {
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        self.sent.push(item);
        Ok(())
    }
}

/// Records notifications instead of sending them (tests/dev).
#[derive(Debug)]
pub struct RecordingNotifier {
    inner: Mutex<Recording<Notification>>,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Recording {
                sent: Vec::new(),
                failures: VecDeque::new(),
            }),
        }
    }
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).sent.clone()
    }

    /// Fail the next send with `err`.
    pub fn fail_next(&self, err: RemoteError) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .failures
            .push_back(err);
    }

    fn record(&self, notification: Notification) -> Result<(), RemoteError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(notification)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_customer_email(
        &self,
        tenant: &TenantId,
        customer: &CustomerId,
        email: &CustomerEmail,
    ) -> Result<(), RemoteError> {
        self.record(Notification::Customer {
            tenant: tenant.clone(),
            customer: customer.clone(),
            email: email.clone(),
        })
    }

    async fn send_merchant_email(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
    ) -> Result<(), RemoteError> {
        self.record(Notification::Merchant {
            tenant: tenant.clone(),
            contract: contract.clone(),
        })
    }

    async fn send_inventory_failure_email(&self, tenant: &TenantId) -> Result<(), RemoteError> {
        self.record(Notification::InventoryFailure {
            tenant: tenant.clone(),
        })
    }
}

/// Records forwarded events instead of delivering them (tests/dev).
#[derive(Debug)]
pub struct RecordingForwarder {
    inner: Mutex<Recording<(TenantId, ForwardedEvent)>>,
}

impl Default for RecordingForwarder {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Recording {
                sent: Vec::new(),
                failures: VecDeque::new(),
            }),
        }
    }
}

impl RecordingForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn forwarded(&self) -> Vec<(TenantId, ForwardedEvent)> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).sent.clone()
    }

    pub fn fail_next(&self, err: RemoteError) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .failures
            .push_back(err);
    }
}

#[async_trait]
impl EventForwarder for RecordingForwarder {
    async fn forward(&self, tenant: &TenantId, event: &ForwardedEvent) -> Result<(), RemoteError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record((tenant.clone(), event.clone()))
    }
}
