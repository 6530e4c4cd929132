//! Customer and merchant emails about contract events.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use cadence_core::{ContractId, CustomerId};

use crate::jobs::error::JobError;
use crate::jobs::job::{Job, JobParameters};
use crate::jobs::runner::JobContext;
use crate::notify::{CustomerEmail, CustomerEmailTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerEmailPayload {
    pub contract_id: ContractId,
    pub template: CustomerEmailTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSendEmailJob {
    parameters: JobParameters<CustomerEmailPayload>,
}

#[async_trait]
impl Job for CustomerSendEmailJob {
    type Payload = CustomerEmailPayload;

    const NAME: &'static str = "CustomerSendEmailJob";
    const QUEUE: &'static str = "webhooks";

    fn new(parameters: JobParameters<CustomerEmailPayload>) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &JobParameters<CustomerEmailPayload> {
        &self.parameters
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError> {
        let tenant = self.tenant();
        let payload = &self.parameters.payload;
        let services = ctx.services();

        let customer = match &payload.customer_id {
            Some(customer) => customer.clone(),
            None => {
                let customer = services
                    .platform
                    .contract_customer_id(tenant, &payload.contract_id)
                    .await?;
                info!(customer = %customer, "resolved customer from contract");
                customer
            }
        };

        let email = CustomerEmail {
            contract_id: payload.contract_id.clone(),
            template: payload.template,
            billing_cycle_index: payload.cycle_index,
        };
        services
            .notifier
            .send_customer_email(tenant, &customer, &email)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantEmailPayload {
    pub contract_id: ContractId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MerchantSendEmailJob {
    parameters: JobParameters<MerchantEmailPayload>,
}

#[async_trait]
impl Job for MerchantSendEmailJob {
    type Payload = MerchantEmailPayload;

    const NAME: &'static str = "MerchantSendEmailJob";
    const QUEUE: &'static str = "webhooks";

    fn new(parameters: JobParameters<MerchantEmailPayload>) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &JobParameters<MerchantEmailPayload> {
        &self.parameters
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError> {
        ctx.services()
            .notifier
            .send_merchant_email(self.tenant(), &self.parameters.payload.contract_id)
            .await?;
        Ok(())
    }
}
