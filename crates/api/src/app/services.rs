use std::sync::Arc;

use cadence_billing::{BillingCycleWindowResolver, InMemoryBillingCycleFeed, ResolverConfig};
use cadence_infra::config::{AppConfig, SchedulerKind};
use cadence_infra::jobs::{
    DurableQueueScheduler, InMemoryServices, InlineScheduler, JobRunner, JobRunnerBuilder,
    JobServices, RegistryError, Scheduler, TestScheduler,
};
use cadence_infra::shop_store::{PostgresShopStore, ShopStore};
use cadence_infra::task_queue::{InMemoryTaskSubmitter, TaskSubmitter};

#[cfg(feature = "redis")]
use cadence_infra::task_queue::RedisStreamsTaskSubmitter;

/// Everything the HTTP handlers reach.
#[derive(Clone)]
pub struct AppServices {
    pub runner: JobRunner,
    pub resolver: BillingCycleWindowResolver,
    /// Feed behind the resolver; in-memory until a platform client is wired.
    pub billing_feed: Arc<InMemoryBillingCycleFeed>,
    /// Set when the Test scheduler is active.
    pub test_scheduler: Option<Arc<TestScheduler>>,
    /// Set when durable tasks go to the in-memory transport.
    pub task_submitter: Option<Arc<InMemoryTaskSubmitter>>,
    pub fakes: InMemoryServices,
}

impl AppServices {
    /// All-in-memory services with the given scheduler (dev/test).
    pub fn in_memory(scheduler: SchedulerKind) -> Result<Self, RegistryError> {
        let config = AppConfig {
            scheduler,
            ..AppConfig::default()
        };
        let fakes = InMemoryServices::new();
        let services = fakes.services(config.job_settings());
        let submitter = (scheduler == SchedulerKind::DurableQueue).then(InMemoryTaskSubmitter::arc);
        assemble(
            &config,
            fakes,
            services,
            submitter.map(Transport::InMemory),
            register_jobs,
        )
    }
}

/// Build services from configuration.
///
/// Collaborators without a configured backend fall back to in-memory ones.
/// A job registry conflict aborts startup.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let fakes = InMemoryServices::new();
    let mut services = fakes.services(config.job_settings());

    match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresShopStore::connect(url).await?;
            services.shops = Arc::new(store) as Arc<dyn ShopStore>;
            tracing::info!("shop store: postgres");
        }
        None => tracing::info!("shop store: in-memory"),
    }

    let transport = match config.scheduler {
        SchedulerKind::DurableQueue => Some(build_transport(config)?),
        SchedulerKind::Inline | SchedulerKind::Test => None,
    };

    Ok(assemble(config, fakes, services, transport, register_jobs)?)
}

enum Transport {
    InMemory(Arc<InMemoryTaskSubmitter>),
    #[cfg(feature = "redis")]
    Redis(Arc<RedisStreamsTaskSubmitter>),
}

#[cfg(feature = "redis")]
fn build_transport(config: &AppConfig) -> anyhow::Result<Transport> {
    let url = config
        .redis_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("REDIS_URL is required for the durable_queue scheduler"))?;
    let submitter = RedisStreamsTaskSubmitter::new(url, Some(config.task_stream_prefix.clone()))?;
    tracing::info!(prefix = %config.task_stream_prefix, "task transport: redis streams");
    Ok(Transport::Redis(Arc::new(submitter)))
}

#[cfg(not(feature = "redis"))]
fn build_transport(_config: &AppConfig) -> anyhow::Result<Transport> {
    tracing::warn!(
        "JOBS_SCHEDULER=durable_queue but redis feature not enabled, falling back to in-memory task queue"
    );
    Ok(Transport::InMemory(InMemoryTaskSubmitter::arc()))
}

type Registrar = fn(&mut JobRunnerBuilder) -> Result<(), RegistryError>;

fn register_jobs(builder: &mut JobRunnerBuilder) -> Result<(), RegistryError> {
    builder.register_all().map(drop)
}

fn assemble(
    config: &AppConfig,
    fakes: InMemoryServices,
    services: JobServices,
    transport: Option<Transport>,
    register: Registrar,
) -> Result<AppServices, RegistryError> {
    let mut test_scheduler = None;
    let mut task_submitter = None;

    let scheduler: Arc<dyn Scheduler> = match (config.scheduler, transport) {
        (SchedulerKind::Test, _) => {
            let scheduler = Arc::new(TestScheduler::new());
            test_scheduler = Some(scheduler.clone());
            scheduler
        }
        (SchedulerKind::DurableQueue, Some(transport)) => {
            let submitter: Arc<dyn TaskSubmitter> = match transport {
                Transport::InMemory(memory) => {
                    task_submitter = Some(memory.clone());
                    memory
                }
                #[cfg(feature = "redis")]
                Transport::Redis(redis) => redis,
            };
            Arc::new(DurableQueueScheduler::new(submitter))
        }
        (SchedulerKind::DurableQueue, None) => {
            let memory = InMemoryTaskSubmitter::arc();
            task_submitter = Some(memory.clone());
            Arc::new(DurableQueueScheduler::new(memory))
        }
        (SchedulerKind::Inline, _) => Arc::new(InlineScheduler::new()),
    };

    let mut builder = JobRunner::builder(scheduler, services);
    register(&mut builder)
        .inspect_err(|e| tracing::error!(error = %e, "job registration failed"))?;
    let runner = builder.build();

    let billing_feed = InMemoryBillingCycleFeed::arc();
    let resolver = BillingCycleWindowResolver::with_config(
        billing_feed.clone(),
        ResolverConfig {
            past_lookahead: config.billing_past_lookahead,
            ..ResolverConfig::default()
        },
    );

    Ok(AppServices {
        runner,
        resolver,
        billing_feed,
        test_scheduler,
        task_submitter,
        fakes,
    })
}
