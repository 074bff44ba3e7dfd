use crate::config::GeneratorConfig;
use crate::domain::injection::{FaultInjection, InjectionTable};
use crate::domain::transaction::{Amount, PaymentMethod, Transaction, TransactionStatus};
use chrono::Utc;
use futures::stream::{self, Stream};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use uuid::Uuid;

const REGIONS: [&str; 3] = ["US-EAST", "US-WEST", "EU-CENTRAL"];
const BASELINE_LATENCY_MS: std::ops::RangeInclusive<u64> = 50..=300;
const LATENCY_JITTER_MS: std::ops::RangeInclusive<i64> = -100..=100;

/// Clears the generator's running flag. Emission halts at the next pacing boundary.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Synthetic transaction source with chaos injection.
///
/// Clones share the injection table and the running flag, so a clone kept by
/// the control surface affects a stream created from the original.
#[derive(Debug, Clone)]
pub struct TransactionGenerator {
    config: GeneratorConfig,
    injections: Arc<RwLock<InjectionTable>>,
    running: Arc<AtomicBool>,
}

impl TransactionGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            injections: Arc::new(RwLock::new(InjectionTable::new())),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Registers or replaces an injection. Returns the one it replaced.
    pub fn inject(&self, injection: FaultInjection) -> Option<FaultInjection> {
        info!(
            id = %injection.id,
            issuer = injection.issuer.as_deref().unwrap_or("ALL"),
            error_code = %injection.error_code,
            failure_rate = injection.failure_rate,
            "Injection started"
        );
        self.injections.write().upsert(injection)
    }

    /// Removes an injection. Returns false if no injection had this id.
    pub fn stop_injection(&self, id: &str) -> bool {
        let removed = self.injections.write().remove(id).is_some();
        if removed {
            info!(id, "Injection stopped");
        }
        removed
    }

    pub fn active_injections(&self) -> Vec<FaultInjection> {
        self.injections.read().iter().cloned().collect()
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn produce_one(&self) -> Transaction {
        self.produce_with(&mut rand::thread_rng())
    }

    /// Synthesizes one transaction, then applies every matching injection in
    /// table order. When several trigger, the last one processed wins.
    pub fn produce_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Transaction {
        let issuer = self
            .config
            .issuers
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let mut status = TransactionStatus::Success;
        let mut error_code = None;
        let mut latency_ms = rng.gen_range(BASELINE_LATENCY_MS);

        for injection in self.injections.read().iter() {
            if injection.applies_to(&issuer) && rng.gen_bool(injection.probability()) {
                status = TransactionStatus::Failed;
                error_code = Some(injection.error_code.clone());
                latency_ms = injection
                    .latency_ms
                    .saturating_add_signed(rng.gen_range(LATENCY_JITTER_MS));
            }
        }

        let payment_method = *PaymentMethod::ALL
            .choose(rng)
            .unwrap_or(&PaymentMethod::CreditCard);
        let region = REGIONS.choose(rng).copied().unwrap_or(REGIONS[0]);
        let simple_id = Uuid::new_v4().simple().to_string();

        Transaction {
            id: format!("tx_{}", &simple_id[..12]),
            timestamp: Utc::now(),
            amount: Amount::from_cents(rng.gen_range(1_000..=50_000)),
            currency: "USD".to_string(),
            payment_method,
            issuer,
            processor: "STRIPE".to_string(),
            status,
            error_code,
            latency_ms,
            retry_count: 0,
            region: region.to_string(),
            metadata: BTreeMap::from([("environment".to_string(), "production".to_string())]),
        }
    }

    /// Lazy, paced, infinite stream of transactions.
    ///
    /// The first transaction is emitted immediately; each later one after a
    /// `1 / tps` sleep. The stream ends at the first boundary where the
    /// running flag is cleared and cannot be resumed.
    pub fn stream(&self) -> impl Stream<Item = Transaction> + Send + 'static {
        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let interval = self.config.interval();

        stream::unfold(
            (self.clone(), rng, false),
            move |(generator, mut rng, started)| async move {
                if started {
                    tokio::time::sleep(interval).await;
                }
                if !generator.is_running() {
                    debug!("Generator stopped, ending stream");
                    return None;
                }
                let tx = generator.produce_with(&mut rng);
                Some((tx, (generator, rng, true)))
            },
        )
    }
}
