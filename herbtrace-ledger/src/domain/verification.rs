//! Herb image verification
//!
//! `HerbVerifier` is the seam where a real image classifier plugs in. The
//! store only depends on the trait, so swapping the simulated verifier for a
//! model-backed one does not touch validation or persistence.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

use super::error::LedgerResult;
use super::event::AiVerification;

/// Reference herbs the simulated classifier may report on a mismatch
pub const REFERENCE_HERBS: &[&str] = &[
    "Ashwagandha",
    "Turmeric",
    "Tulsi",
    "Brahmi",
    "Neem",
    "Amla",
    "Giloy",
    "Shatavari",
    "Arjuna",
    "Triphala",
    "Gokshura",
    "Manjistha",
    "Guduchi",
    "Bala",
    "Vidanga",
];

/// Lowest confidence the simulated classifier reports
pub const MIN_SIMULATED_CONFIDENCE: u8 = 90;
/// Highest confidence the simulated classifier reports
pub const MAX_SIMULATED_CONFIDENCE: u8 = 98;

/// Confidence-scored classification of a submitted herb image
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HerbVerifier: Send + Sync {
    /// Classify the image at `image_ref`, given the herb the farmer claims
    async fn verify(&self, herb_label: &str, image_ref: &str) -> LedgerResult<AiVerification>;
}

/// Placeholder classifier: random confidence, occasional random relabel
#[derive(Debug, Clone)]
pub struct SimulatedVerifier {
    latency: Duration,
    mismatch_probability: f64,
}

impl SimulatedVerifier {
    pub fn new(latency: Duration, mismatch_probability: f64) -> Self {
        Self {
            latency,
            mismatch_probability: mismatch_probability.clamp(0.0, 1.0),
        }
    }

    /// Draw a verification result from `rng`
    pub fn sample<R: Rng + ?Sized>(&self, herb_label: &str, rng: &mut R) -> AiVerification {
        let confidence = rng.gen_range(MIN_SIMULATED_CONFIDENCE..=MAX_SIMULATED_CONFIDENCE);

        let verified_herb = if rng.gen_bool(self.mismatch_probability) {
            REFERENCE_HERBS[rng.gen_range(0..REFERENCE_HERBS.len())].to_string()
        } else {
            herb_label.to_string()
        };

        AiVerification {
            confidence,
            verified_herb,
        }
    }
}

impl Default for SimulatedVerifier {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 0.15)
    }
}

#[async_trait]
impl HerbVerifier for SimulatedVerifier {
    async fn verify(&self, herb_label: &str, image_ref: &str) -> LedgerResult<AiVerification> {
        debug!(herb = herb_label, image = image_ref, "Starting herb verification");

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        // thread_rng is !Send, keep it out of any await
        let result = self.sample(herb_label, &mut rand::thread_rng());

        debug!(
            herb = herb_label,
            verified_herb = %result.verified_herb,
            confidence = result.confidence,
            "Herb verification completed"
        );
        Ok(result)
    }
}
