//! Attribute-fallback plans for rate resolution.
//!
//! A miss on the exact rate key may retry with progressively fewer
//! attributes, in a declared order. Only non-selective attributes may
//! be dropped; the plan itself is validated so that selective fields
//! (and the provider alias, which is not an attribute but is guarded
//! anyway) can never be removed.

use serde::{Deserialize, Serialize};

use crate::error::{PricingError, PricingResult};
use crate::rate_key::RateKey;

/// Attribute names a plan may never drop.
const PROTECTED: &[&str] = &["instance_type", "instance_class", "provider_alias"];

/// An ordered list of droppable attribute names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPlan {
    droppable: Vec<String>,
}

impl FallbackPlan {
    /// Creates a validated plan from an ordered attribute list.
    pub fn new(droppable: impl IntoIterator<Item = impl Into<String>>) -> PricingResult<Self> {
        let droppable: Vec<String> = droppable.into_iter().map(Into::into).collect();
        for name in &droppable {
            if PROTECTED.contains(&name.as_str()) {
                return Err(PricingError::InvalidFallback {
                    attribute: name.clone(),
                });
            }
        }
        Ok(Self { droppable })
    }

    /// Candidate keys in resolution order, starting with the key
    /// itself, then dropping attributes cumulatively in plan order.
    #[must_use]
    pub fn candidates(&self, key: &RateKey) -> Vec<RateKey> {
        let mut out = Vec::with_capacity(self.droppable.len() + 1);
        out.push(key.clone());
        for i in 0..self.droppable.len() {
            let names: Vec<&str> = self.droppable[..=i].iter().map(String::as_str).collect();
            let candidate = key.without_attributes(&names);
            if candidate != *out.last().expect("candidates is non-empty") {
                out.push(candidate);
            }
        }
        out
    }
}
